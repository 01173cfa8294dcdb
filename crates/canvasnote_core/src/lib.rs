//! Core domain logic for the canvas note-taking app.
//! This crate is the single source of truth for canvas, content and
//! persistence invariants; hosts only feed it input and draw its output.

pub mod canvas;
pub mod clock;
pub mod config;
pub mod db;
pub mod embed;
pub mod factory;
pub mod geometry;
pub mod gesture;
pub mod logging;
pub mod model;
pub mod pubsub;
pub mod search;
pub mod store;

pub use canvas::{block_elements, CanvasState, ElementRegistry};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, CoreConfig};
pub use embed::get_embed_url;
pub use factory::{
    builtin_registry, DisplayNode, DisplayProps, Factory, FactoryRegistry, FactoryRegistryError,
};
pub use geometry::{cartesian_to_polar, polar_to_cartesian, Camera, Polar, Rect};
pub use gesture::{
    ActionSink, BlockGesture, CanvasAction, GestureConfig, GestureInput, HitTarget, LinkGesture,
    PointerButton,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::block::{Block, BlockId, BlockMode};
pub use model::concept::{Concept, ConceptId};
pub use model::content::Content;
pub use model::relation::{Entity, EntityRef, Relation};
pub use model::settings::Settings;
pub use pubsub::{EventBus, SubscriptionId};
pub use search::{search_concepts, SearchHit, SearchQuery};
pub use store::{
    CachedStore, ChangeEvent, ChangeKind, Channel, ConceptStore, KeyValueConceptStore,
    SqliteConceptStore, StoreError, StoreOptions, StoreResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
