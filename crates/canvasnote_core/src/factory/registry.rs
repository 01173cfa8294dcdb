//! Content-type factory registry.
//!
//! # Responsibility
//! - Map content-type ids to renderers and metadata.
//! - Resolve displays and search text without the canvas knowing concrete
//!   content types.
//!
//! # Invariants
//! - Registration happens only through [`FactoryRegistryBuilder`]; a built
//!   registry is immutable.
//! - Listing order is registration order.
//! - Lookups for unknown ids never panic: `get` returns `None` and displays
//!   fall back to [`DisplayNode::UnknownType`].

use glam::Vec2;
use log::{debug, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use crate::model::block::BlockId;
use crate::model::concept::Concept;
use crate::model::content::Content;
use crate::model::status::TaskStatus;

/// Serializer from a concept to searchable text.
pub type ToText = fn(&Concept) -> Option<String>;

/// Props handed to a renderer for one concept display.
#[derive(Debug, Clone, Copy)]
pub struct DisplayProps<'a> {
    pub concept: &'a Concept,
    /// Block hosting the display, `None` when opened full-screen.
    pub block_id: Option<BlockId>,
    pub read_only: bool,
}

impl<'a> DisplayProps<'a> {
    pub fn new(concept: &'a Concept) -> Self {
        Self {
            concept,
            block_id: None,
            read_only: false,
        }
    }
}

/// Headless render output for one concept.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayNode {
    Text {
        text: String,
        editable: bool,
    },
    Image {
        src: String,
        alt: Option<String>,
    },
    Status {
        status: TaskStatus,
        label: String,
    },
    Embed {
        source: String,
        embed_url: Option<String>,
    },
    Tool {
        factory_id: String,
        name: String,
    },
    /// Visible placeholder naming a type this build cannot render.
    UnknownType {
        type_id: String,
    },
}

/// Renderer bound to one factory.
pub trait ContentRenderer: Send + Sync {
    fn render(&self, props: &DisplayProps<'_>) -> DisplayNode;
}

/// One registry entry.
#[derive(Clone)]
pub struct Factory {
    /// Content-type id, e.g. `text`.
    pub id: String,
    pub name: String,
    /// Tools are listed separately from content types.
    pub is_tool: bool,
    /// Default viewport placement for blocks created from this factory.
    pub origin: Option<Vec2>,
    pub renderer: Arc<dyn ContentRenderer>,
    /// `None` marks the type as not searchable by content.
    pub to_text: Option<ToText>,
    /// Content of a freshly created concept of this type.
    pub empty_content: fn() -> Content,
}

impl Debug for Factory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("is_tool", &self.is_tool)
            .field("origin", &self.origin)
            .field("searchable", &self.to_text.is_some())
            .finish()
    }
}

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactoryRegistryError {
    InvalidFactoryId(String),
    DuplicateFactoryId(String),
    MissingDefault,
    DefaultNotRegistered(String),
    DefaultIsTool(String),
}

impl Display for FactoryRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFactoryId(value) => write!(f, "factory id is invalid: `{value}`"),
            Self::DuplicateFactoryId(value) => write!(f, "factory id already registered: {value}"),
            Self::MissingDefault => write!(f, "no default content factory configured"),
            Self::DefaultNotRegistered(value) => {
                write!(f, "default content factory is not registered: {value}")
            }
            Self::DefaultIsTool(value) => {
                write!(f, "default content factory must not be a tool: {value}")
            }
        }
    }
}

impl Error for FactoryRegistryError {}

/// Collects factories before freezing them into a [`FactoryRegistry`].
#[derive(Default)]
pub struct FactoryRegistryBuilder {
    factories: Vec<Factory>,
    index: HashMap<String, usize>,
    default_content: Option<String>,
}

impl FactoryRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one factory. Ids must be unique lowercase slugs.
    pub fn register(mut self, factory: Factory) -> Result<Self, FactoryRegistryError> {
        let id = factory.id.trim().to_string();
        if !is_valid_factory_id(&id) {
            return Err(FactoryRegistryError::InvalidFactoryId(factory.id));
        }
        if self.index.contains_key(id.as_str()) {
            return Err(FactoryRegistryError::DuplicateFactoryId(id));
        }
        self.index.insert(id.clone(), self.factories.len());
        self.factories.push(Factory { id, ..factory });
        Ok(self)
    }

    pub fn default_content(mut self, factory_id: impl Into<String>) -> Self {
        self.default_content = Some(factory_id.into());
        self
    }

    pub fn build(self) -> Result<FactoryRegistry, FactoryRegistryError> {
        let default_id = self
            .default_content
            .ok_or(FactoryRegistryError::MissingDefault)?;
        let default_index = *self
            .index
            .get(default_id.trim())
            .ok_or_else(|| FactoryRegistryError::DefaultNotRegistered(default_id.clone()))?;
        if self.factories[default_index].is_tool {
            return Err(FactoryRegistryError::DefaultIsTool(default_id));
        }

        debug!(
            "event=factory_registry_build module=factory status=ok factories={} default={}",
            self.factories.len(),
            default_id.trim()
        );
        Ok(FactoryRegistry {
            factories: self.factories,
            index: self.index,
            default_index,
        })
    }
}

/// Immutable content-type registry.
pub struct FactoryRegistry {
    factories: Vec<Factory>,
    index: HashMap<String, usize>,
    default_index: usize,
}

impl Debug for FactoryRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("factories", &self.factories)
            .field("default", &self.factories[self.default_index].id)
            .finish()
    }
}

impl FactoryRegistry {
    pub fn builder() -> FactoryRegistryBuilder {
        FactoryRegistryBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Non-tool factories in registration order.
    pub fn content_factories(&self) -> Vec<&Factory> {
        self.factories.iter().filter(|factory| !factory.is_tool).collect()
    }

    /// Tool factories in registration order.
    pub fn tool_factories(&self) -> Vec<&Factory> {
        self.factories.iter().filter(|factory| factory.is_tool).collect()
    }

    pub fn get(&self, factory_id: &str) -> Option<&Factory> {
        self.index
            .get(factory_id.trim())
            .and_then(|index| self.factories.get(*index))
    }

    pub fn default_content_factory(&self) -> &Factory {
        &self.factories[self.default_index]
    }

    /// Creates an untyped new concept using the default content factory.
    pub fn new_default_concept(&self) -> Concept {
        Concept::new((self.default_content_factory().empty_content)())
    }

    /// Creates a new concept of the given type, or `None` if unregistered.
    pub fn new_concept(&self, factory_id: &str) -> Option<Concept> {
        self.get(factory_id)
            .map(|factory| Concept::new((factory.empty_content)()))
    }

    /// Renders a concept through the named factory.
    ///
    /// Unknown ids render a visible placeholder instead of dropping content.
    pub fn create_concept_display(&self, factory_id: &str, props: &DisplayProps<'_>) -> DisplayNode {
        match self.get(factory_id) {
            Some(factory) => factory.renderer.render(props),
            None => {
                warn!(
                    "event=concept_display module=factory status=fallback type_id={} concept_id={}",
                    factory_id, props.concept.id
                );
                DisplayNode::UnknownType {
                    type_id: factory_id.to_string(),
                }
            }
        }
    }

    /// Renders a concept through the factory named by its own content type.
    pub fn display_concept(&self, props: &DisplayProps<'_>) -> DisplayNode {
        self.create_concept_display(props.concept.kind(), props)
    }

    /// Searchable text of a concept.
    ///
    /// Returns `None` for unregistered types and for factories without a
    /// serializer.
    pub fn concept_string(&self, concept: &Concept) -> Option<String> {
        let to_text = self.get(concept.kind())?.to_text?;
        to_text(concept)
    }
}

fn is_valid_factory_id(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::{
        ContentRenderer, DisplayNode, DisplayProps, Factory, FactoryRegistry,
        FactoryRegistryError,
    };
    use crate::model::concept::Concept;
    use crate::model::content::Content;
    use serde_json::Value;
    use std::sync::Arc;

    struct EchoRenderer;

    impl ContentRenderer for EchoRenderer {
        fn render(&self, props: &DisplayProps<'_>) -> DisplayNode {
            DisplayNode::Text {
                text: props.concept.kind().to_string(),
                editable: !props.read_only,
            }
        }
    }

    fn factory(id: &str, is_tool: bool) -> Factory {
        Factory {
            id: id.to_string(),
            name: id.to_uppercase(),
            is_tool,
            origin: None,
            renderer: Arc::new(EchoRenderer),
            to_text: None,
            empty_content: || Content::Unknown {
                kind: "echo".to_string(),
                data: Value::Null,
            },
        }
    }

    #[test]
    fn lists_keep_registration_order() {
        let registry = FactoryRegistry::builder()
            .register(factory("zeta", false))
            .and_then(|builder| builder.register(factory("alpha", false)))
            .and_then(|builder| builder.register(factory("tool", true)))
            .and_then(|builder| builder.default_content("alpha").build())
            .expect("registry should build");

        let ids: Vec<&str> = registry
            .content_factories()
            .iter()
            .map(|factory| factory.id.as_str())
            .collect();
        assert_eq!(ids, vec!["zeta", "alpha"]);
        assert_eq!(registry.tool_factories().len(), 1);
        assert_eq!(registry.default_content_factory().id, "alpha");
    }

    #[test]
    fn rejects_invalid_and_duplicate_ids() {
        let invalid = FactoryRegistry::builder().register(factory("Rich Text", false));
        assert!(matches!(invalid, Err(FactoryRegistryError::InvalidFactoryId(_))));

        let duplicate = FactoryRegistry::builder()
            .register(factory("text", false))
            .and_then(|builder| builder.register(factory("text", false)));
        assert!(matches!(
            duplicate,
            Err(FactoryRegistryError::DuplicateFactoryId(_))
        ));
    }

    #[test]
    fn default_must_be_registered_content_factory() {
        let missing = FactoryRegistry::builder()
            .register(factory("text", false))
            .and_then(|builder| builder.build());
        assert!(matches!(missing, Err(FactoryRegistryError::MissingDefault)));

        let tool_default = FactoryRegistry::builder()
            .register(factory("search", true))
            .and_then(|builder| builder.default_content("search").build());
        assert!(matches!(
            tool_default,
            Err(FactoryRegistryError::DefaultIsTool(_))
        ));

        let unknown_default = FactoryRegistry::builder()
            .register(factory("text", false))
            .and_then(|builder| builder.default_content("image").build());
        assert!(matches!(
            unknown_default,
            Err(FactoryRegistryError::DefaultNotRegistered(_))
        ));
    }

    #[test]
    fn unknown_id_renders_placeholder_and_is_not_searchable() {
        let registry = FactoryRegistry::builder()
            .register(factory("text", false))
            .and_then(|builder| builder.default_content("text").build())
            .expect("registry should build");
        let concept = Concept::new(Content::Unknown {
            kind: "kanban".to_string(),
            data: Value::Null,
        });

        assert!(registry.get("kanban").is_none());
        assert_eq!(
            registry.display_concept(&DisplayProps::new(&concept)),
            DisplayNode::UnknownType {
                type_id: "kanban".to_string()
            }
        );
        assert!(registry.concept_string(&concept).is_none());
    }
}
