//! App-level settings singleton.
//!
//! # Invariants
//! - Exactly one settings record exists per store once read.
//! - `viewing_concept_id` always names a concept to open; it defaults to home.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::concept::ConceptId;

/// Well-known home concept id used when no settings were ever saved.
pub const DEFAULT_HOME_CONCEPT_ID: ConceptId = Uuid::from_u128(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DevFlags {
    /// Read by hosts that draw hit boxes and gesture state over the canvas.
    #[serde(default)]
    pub show_debug_overlay: bool,
    /// Enables per-action dispatch logging; see `GestureConfig::with_dev_flags`.
    #[serde(default)]
    pub log_gestures: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub home_concept_id: ConceptId,
    pub viewing_concept_id: ConceptId,
    #[serde(default)]
    pub dev: DevFlags,
}

impl Settings {
    pub fn new(home_concept_id: ConceptId) -> Self {
        Self {
            home_concept_id,
            viewing_concept_id: home_concept_id,
            dev: DevFlags::default(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(DEFAULT_HOME_CONCEPT_ID)
    }
}
