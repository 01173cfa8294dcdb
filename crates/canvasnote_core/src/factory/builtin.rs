//! First-party content types and tools.

use glam::Vec2;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;

use crate::embed::get_embed_url;
use crate::factory::registry::{
    ContentRenderer, DisplayNode, DisplayProps, Factory, FactoryRegistry, FactoryRegistryBuilder,
    FactoryRegistryError,
};
use crate::model::concept::Concept;
use crate::model::content::{
    Content, ImageContent, StatusContent, TextContent, YoutubeContent, IMAGE_TYPE, STATUS_TYPE,
    TEXT_TYPE, YOUTUBE_TYPE,
};

/// Factory id of the search/link tool.
pub const SEARCH_TOOL_ID: &str = "search";

static BUILTIN_REGISTRY: Lazy<FactoryRegistry> = Lazy::new(|| {
    builtin_registry_builder()
        .and_then(|builder| builder.build())
        .expect("builtin factories are valid")
});

/// Process-wide registry with all first-party factories.
pub fn builtin_registry() -> &'static FactoryRegistry {
    &BUILTIN_REGISTRY
}

/// Builder preloaded with first-party factories, for hosts that register
/// extra types before freezing.
pub fn builtin_registry_builder() -> Result<FactoryRegistryBuilder, FactoryRegistryError> {
    FactoryRegistry::builder()
        .register(text_factory())?
        .register(image_factory())?
        .register(status_factory())?
        .register(youtube_factory())?
        .register(search_tool_factory())
        .map(|builder| builder.default_content(TEXT_TYPE))
}

fn text_factory() -> Factory {
    Factory {
        id: TEXT_TYPE.to_string(),
        name: "Text".to_string(),
        is_tool: false,
        origin: None,
        renderer: Arc::new(TextRenderer),
        to_text: Some(text_to_string),
        empty_content: || Content::Text(TextContent::default()),
    }
}

fn image_factory() -> Factory {
    Factory {
        id: IMAGE_TYPE.to_string(),
        name: "Image".to_string(),
        is_tool: false,
        origin: None,
        renderer: Arc::new(ImageRenderer),
        to_text: None,
        empty_content: || {
            Content::Image(ImageContent {
                src: String::new(),
                alt: None,
            })
        },
    }
}

fn status_factory() -> Factory {
    Factory {
        id: STATUS_TYPE.to_string(),
        name: "Status".to_string(),
        is_tool: false,
        origin: None,
        renderer: Arc::new(StatusRenderer),
        to_text: Some(status_to_string),
        empty_content: || {
            Content::Status(StatusContent {
                status: Default::default(),
                label: String::new(),
            })
        },
    }
}

fn youtube_factory() -> Factory {
    Factory {
        id: YOUTUBE_TYPE.to_string(),
        name: "YouTube".to_string(),
        is_tool: false,
        origin: None,
        renderer: Arc::new(YoutubeRenderer),
        to_text: Some(youtube_to_string),
        empty_content: || Content::Youtube(YoutubeContent { url: String::new() }),
    }
}

fn search_tool_factory() -> Factory {
    Factory {
        id: SEARCH_TOOL_ID.to_string(),
        name: "Search".to_string(),
        is_tool: true,
        origin: Some(Vec2::new(16.0, 16.0)),
        renderer: Arc::new(ToolRenderer {
            factory_id: SEARCH_TOOL_ID,
            name: "Search",
        }),
        to_text: None,
        empty_content: || Content::Unknown {
            kind: SEARCH_TOOL_ID.to_string(),
            data: Value::Null,
        },
    }
}

fn text_to_string(concept: &Concept) -> Option<String> {
    match &concept.summary {
        Content::Text(text) => Some(text.plain_text()),
        _ => None,
    }
}

fn status_to_string(concept: &Concept) -> Option<String> {
    match &concept.summary {
        Content::Status(status) if status.label.is_empty() => {
            Some(status.status.as_str().to_string())
        }
        Content::Status(status) => Some(format!("{} {}", status.label, status.status.as_str())),
        _ => None,
    }
}

fn youtube_to_string(concept: &Concept) -> Option<String> {
    match &concept.summary {
        Content::Youtube(video) => Some(video.url.clone()),
        _ => None,
    }
}

/// Placeholder used when a factory receives content of another type.
fn mismatch(props: &DisplayProps<'_>) -> DisplayNode {
    DisplayNode::UnknownType {
        type_id: props.concept.kind().to_string(),
    }
}

struct TextRenderer;

impl ContentRenderer for TextRenderer {
    fn render(&self, props: &DisplayProps<'_>) -> DisplayNode {
        match &props.concept.summary {
            Content::Text(text) => DisplayNode::Text {
                text: text.plain_text(),
                editable: !props.read_only,
            },
            _ => mismatch(props),
        }
    }
}

struct ImageRenderer;

impl ContentRenderer for ImageRenderer {
    fn render(&self, props: &DisplayProps<'_>) -> DisplayNode {
        match &props.concept.summary {
            Content::Image(image) => DisplayNode::Image {
                src: image.src.clone(),
                alt: image.alt.clone(),
            },
            _ => mismatch(props),
        }
    }
}

struct StatusRenderer;

impl ContentRenderer for StatusRenderer {
    fn render(&self, props: &DisplayProps<'_>) -> DisplayNode {
        match &props.concept.summary {
            Content::Status(status) => DisplayNode::Status {
                status: status.status,
                label: status.label.clone(),
            },
            _ => mismatch(props),
        }
    }
}

struct YoutubeRenderer;

impl ContentRenderer for YoutubeRenderer {
    fn render(&self, props: &DisplayProps<'_>) -> DisplayNode {
        match &props.concept.summary {
            Content::Youtube(video) => DisplayNode::Embed {
                source: video.url.clone(),
                embed_url: get_embed_url(&video.url),
            },
            _ => mismatch(props),
        }
    }
}

struct ToolRenderer {
    factory_id: &'static str,
    name: &'static str,
}

impl ContentRenderer for ToolRenderer {
    fn render(&self, _props: &DisplayProps<'_>) -> DisplayNode {
        DisplayNode::Tool {
            factory_id: self.factory_id.to_string(),
            name: self.name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{builtin_registry, SEARCH_TOOL_ID};
    use crate::factory::registry::{DisplayNode, DisplayProps};
    use crate::model::concept::Concept;
    use crate::model::content::{Content, ImageContent, YoutubeContent};

    #[test]
    fn builtin_registry_splits_tools_from_content() {
        let registry = builtin_registry();
        let content: Vec<&str> = registry
            .content_factories()
            .iter()
            .map(|factory| factory.id.as_str())
            .collect();
        assert_eq!(content, vec!["text", "image", "status", "youtube"]);

        let tools = registry.tool_factories();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].id, SEARCH_TOOL_ID);
        assert!(tools[0].origin.is_some());
    }

    #[test]
    fn default_concept_is_empty_text() {
        let concept = builtin_registry().new_default_concept();
        assert_eq!(concept.kind(), "text");
        assert_eq!(builtin_registry().concept_string(&concept).as_deref(), Some(""));
    }

    #[test]
    fn youtube_display_carries_embed_url() {
        let concept = Concept::new(Content::Youtube(YoutubeContent {
            url: "https://youtu.be/PUv66718DII?t=2".to_string(),
        }));
        let node = builtin_registry().display_concept(&DisplayProps::new(&concept));
        assert_eq!(
            node,
            DisplayNode::Embed {
                source: "https://youtu.be/PUv66718DII?t=2".to_string(),
                embed_url: Some("https://www.youtube.com/embed/PUv66718DII?start=2".to_string()),
            }
        );
    }

    #[test]
    fn youtube_display_survives_out_of_range_timestamp() {
        let url = "https://youtu.be/PUv66718DII?t=9999999999999999h";
        let concept = Concept::new(Content::Youtube(YoutubeContent {
            url: url.to_string(),
        }));
        let node = builtin_registry().display_concept(&DisplayProps::new(&concept));
        assert_eq!(
            node,
            DisplayNode::Embed {
                source: url.to_string(),
                embed_url: Some("https://www.youtube.com/embed/PUv66718DII".to_string()),
            }
        );
    }

    #[test]
    fn image_is_not_searchable_by_content() {
        let concept = Concept::new(Content::Image(ImageContent {
            src: "cat.png".to_string(),
            alt: Some("cat".to_string()),
        }));
        assert!(builtin_registry().concept_string(&concept).is_none());
    }

    #[test]
    fn mismatched_renderer_shows_placeholder() {
        let concept = Concept::new(Content::text("hi"));
        let node = builtin_registry().create_concept_display("image", &DisplayProps::new(&concept));
        assert_eq!(
            node,
            DisplayNode::UnknownType {
                type_id: "text".to_string()
            }
        );
    }
}
