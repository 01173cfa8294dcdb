//! Durable storage contract shared by the SQLite and key-value adapters.
//!
//! Backends move serialized rows only. Caching, write coalescing and change
//! notification live in [`crate::store::CachedStore`].

use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::db::DbError;
use crate::model::concept::ConceptId;

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug)]
pub enum BackendError {
    Db(DbError),
    Io(std::io::Error),
    Serialization(serde_json::Error),
    /// Persisted data exists but cannot be interpreted.
    Corrupt(String),
    /// Store schema is not at the version this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "storage io error: {err}"),
            Self::Serialization(err) => write!(f, "storage serialization error: {err}"),
            Self::Corrupt(message) => write!(f, "corrupt stored data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "concept store requires schema version {expected_version}, got {actual_version}"
            ),
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::Corrupt(_) | Self::UninitializedConnection { .. } => None,
        }
    }
}

impl From<DbError> for BackendError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for BackendError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<std::io::Error> for BackendError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// One concept ready for durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedConcept {
    pub id: ConceptId,
    /// Content-type id, stored alongside the payload for indexing.
    pub kind: String,
    pub json: String,
}

/// One durable mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    PutConcept(SerializedConcept),
    PutSettings(String),
}

/// Identity of the row a [`WriteOp`] targets; later ops on the same key win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteKey {
    Concept(ConceptId),
    Settings,
}

impl WriteOp {
    pub fn key(&self) -> WriteKey {
        match self {
            Self::PutConcept(concept) => WriteKey::Concept(concept.id),
            Self::PutSettings(_) => WriteKey::Settings,
        }
    }
}

/// Durable storage behind a concept store.
pub trait StorageBackend {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Whether the initialization sentinel is present.
    fn is_initialized(&self) -> BackendResult<bool>;

    /// Writes settings, concepts, data version and the sentinel as one unit.
    ///
    /// Existing concept rows with the same id are overwritten.
    fn initialize(
        &mut self,
        settings_json: &str,
        concepts: &[SerializedConcept],
        data_version: u32,
        now_ms: i64,
    ) -> BackendResult<()>;

    fn read_concept(&self, id: ConceptId) -> BackendResult<Option<String>>;

    fn read_all_concepts(&self) -> BackendResult<Vec<String>>;

    fn read_settings(&self) -> BackendResult<Option<String>>;

    /// Applies all ops in one commit, in order.
    fn write_batch(&mut self, ops: &[WriteOp], now_ms: i64) -> BackendResult<()>;

    fn read_version(&self) -> BackendResult<Option<u32>>;

    fn write_version(&mut self, version: u32) -> BackendResult<()>;

    fn read_last_updated(&self) -> BackendResult<Option<i64>>;
}
