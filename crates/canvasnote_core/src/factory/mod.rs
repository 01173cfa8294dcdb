//! Content-type plugin registry.
//!
//! # Responsibility
//! - Decouple the canvas from concrete content renderers.
//! - Ship the first-party factories as a lazily-built process-wide registry.

pub mod builtin;
pub mod registry;

pub use builtin::{builtin_registry, builtin_registry_builder, SEARCH_TOOL_ID};
pub use registry::{
    ContentRenderer, DisplayNode, DisplayProps, Factory, FactoryRegistry, FactoryRegistryBuilder,
    FactoryRegistryError, ToText,
};
