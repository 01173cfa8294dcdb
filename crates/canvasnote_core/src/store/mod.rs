//! Concept and settings persistence.
//!
//! # Responsibility
//! - Define the [`ConceptStore`] contract used by the canvas and app shell.
//! - Provide one cached, write-coalescing implementation over two
//!   interchangeable durable backends (SQLite and key-value).
//!
//! # Invariants
//! - Writes are visible to reads in the same turn through the cache.
//! - Change notifications are delivered only in a later turn, after the
//!   write they describe is durable.
//! - Read failures degrade to "not found"; they never surface as errors.

pub mod backend;
mod cached;
mod hydrate;
pub mod kv;
pub mod sqlite;
mod write_buffer;

use std::error::Error;
use std::fmt::{Display, Formatter};

pub use backend::{BackendError, BackendResult, SerializedConcept, StorageBackend, WriteOp};
pub use cached::{
    CachedStore, ChangeCallback, ChangeEvent, ChangeKind, Channel, FlushStats, StoreOptions,
    TurnOutcome, DATA_VERSION, DEFAULT_MIN_FLUSH_INTERVAL_MS,
};
pub use hydrate::{hydrate_concept, hydrate_settings};
pub use kv::{FileStorage, KeyValueBackend, KeyValueStorage, MemoryStorage};
pub use sqlite::SqliteBackend;

use crate::clock::SystemClock;
use crate::model::concept::{Concept, ConceptId};
use crate::model::settings::Settings;
use crate::pubsub::SubscriptionId;

pub type StoreResult<T> = Result<T, StoreError>;

/// Concept store backed by a SQLite file.
pub type SqliteConceptStore<C = SystemClock> = CachedStore<SqliteBackend, C>;

/// Concept store backed by a key-value storage.
pub type KeyValueConceptStore<S, C = SystemClock> = CachedStore<KeyValueBackend<S>, C>;

#[derive(Debug)]
pub enum StoreError {
    Backend(BackendError),
    Serialization(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backend(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "concept serialization failed: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err),
            Self::Serialization(err) => Some(err),
        }
    }
}

impl From<BackendError> for StoreError {
    fn from(value: BackendError) -> Self {
        Self::Backend(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Persistence contract shared by every platform adapter.
pub trait ConceptStore {
    /// Whether `init` has completed on this store. `false` on a fresh store.
    fn is_valid(&self) -> bool;

    /// Bulk load settings and concepts in one atomic unit.
    ///
    /// Calling it again overwrites rows by id; it never duplicates them.
    fn init(&mut self, settings: &Settings, concepts: &[Concept]) -> StoreResult<()>;

    fn get_concept(&mut self, id: ConceptId) -> Option<Concept>;

    fn get_all_concepts(&mut self) -> Vec<Concept>;

    fn create_concept(&mut self, concept: Concept) -> StoreResult<()>;

    /// Replaces the whole concept.
    fn update_concept(&mut self, concept: Concept) -> StoreResult<()>;

    /// Never absent: defaults are created and persisted on first read.
    fn get_settings(&mut self) -> Settings;

    fn save_settings(&mut self, settings: Settings) -> StoreResult<()>;

    fn get_last_updated_time(&self) -> Option<i64>;

    fn get_version(&self) -> Option<u32>;

    fn set_version(&mut self, version: u32) -> StoreResult<()>;

    fn subscribe_concept(&mut self, channel: Channel, callback: ChangeCallback) -> SubscriptionId;

    fn unsubscribe_concept(&mut self, subscription: SubscriptionId) -> bool;

    /// Runs one event-loop turn: delivers notifications from earlier flushes,
    /// then flushes queued writes if the coalescing window allows it.
    fn run_turn(&mut self) -> StoreResult<TurnOutcome>;

    /// Flushes everything and delivers every notification.
    fn run_until_idle(&mut self) -> StoreResult<TurnOutcome>;
}
