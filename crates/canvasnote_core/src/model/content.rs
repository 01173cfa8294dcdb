//! Typed concept content.
//!
//! # Responsibility
//! - Map the persisted `{ "type": <id>, "data": <payload> }` envelope onto a
//!   closed set of known content types.
//! - Preserve anything unrecognized verbatim so newer or damaged payloads
//!   survive a load/save cycle.
//!
//! # Invariants
//! - `Content::kind()` always equals the persisted `type` string.
//! - A known `type` whose payload fails to decode becomes `Content::Unknown`
//!   with the original payload.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::model::status::TaskStatus;

pub const TEXT_TYPE: &str = "text";
pub const IMAGE_TYPE: &str = "image";
pub const STATUS_TYPE: &str = "status";
pub const YOUTUBE_TYPE: &str = "youtube";

/// Content payload of a concept, tagged by content-type id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawContent", into = "RawContent")]
pub enum Content {
    Text(TextContent),
    Image(ImageContent),
    Status(StatusContent),
    Youtube(YoutubeContent),
    /// Content type this build does not know, kept as raw JSON.
    Unknown { kind: String, data: Value },
}

impl Content {
    /// Content-type id used for factory lookup.
    pub fn kind(&self) -> &str {
        match self {
            Self::Text(_) => TEXT_TYPE,
            Self::Image(_) => IMAGE_TYPE,
            Self::Status(_) => STATUS_TYPE,
            Self::Youtube(_) => YOUTUBE_TYPE,
            Self::Unknown { kind, .. } => kind.as_str(),
        }
    }

    pub fn text(value: impl AsRef<str>) -> Self {
        Self::Text(TextContent::from_plain(value.as_ref()))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }
}

impl Default for Content {
    fn default() -> Self {
        Self::Text(TextContent::default())
    }
}

/// Rich-text document tree produced by the embedded editor.
///
/// The tree is opaque to the core except for text extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextContent {
    pub doc: Value,
}

impl Default for TextContent {
    fn default() -> Self {
        Self {
            doc: json!({ "type": "doc", "content": [] }),
        }
    }
}

impl TextContent {
    /// Builds a one-paragraph-per-line document.
    pub fn from_plain(text: &str) -> Self {
        let paragraphs: Vec<Value> = text
            .lines()
            .map(|line| {
                if line.is_empty() {
                    json!({ "type": "paragraph" })
                } else {
                    json!({
                        "type": "paragraph",
                        "content": [{ "type": "text", "text": line }]
                    })
                }
            })
            .collect();
        Self {
            doc: json!({ "type": "doc", "content": paragraphs }),
        }
    }

    /// Flattens the document into plain text, one line per block node.
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::new();
        collect_blocks(&self.doc, &mut lines);
        lines.join("\n")
    }
}

fn collect_blocks(node: &Value, lines: &mut Vec<String>) {
    let Some(children) = node.get("content").and_then(Value::as_array) else {
        return;
    };
    let inline = children
        .iter()
        .all(|child| child.get("type").and_then(Value::as_str) == Some("text"));
    if inline && node.get("type").and_then(Value::as_str) != Some("doc") {
        let mut line = String::new();
        collect_inline(node, &mut line);
        lines.push(line);
        return;
    }
    for child in children {
        if child.get("type").and_then(Value::as_str) == Some("text") {
            let mut line = String::new();
            collect_inline(child, &mut line);
            lines.push(line);
        } else if child.get("content").is_some() {
            collect_blocks(child, lines);
        } else {
            lines.push(String::new());
        }
    }
}

fn collect_inline(node: &Value, out: &mut String) {
    if let Some(text) = node.get("text").and_then(Value::as_str) {
        out.push_str(text);
    }
    if let Some(children) = node.get("content").and_then(Value::as_array) {
        for child in children {
            collect_inline(child, out);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageContent {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// Status chip: a labelled task state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusContent {
    pub status: TaskStatus,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YoutubeContent {
    pub url: String,
}

/// Wire envelope for [`Content`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

impl From<RawContent> for Content {
    fn from(raw: RawContent) -> Self {
        let decoded = match raw.kind.as_str() {
            TEXT_TYPE => serde_json::from_value(raw.data.clone()).map(Content::Text).ok(),
            IMAGE_TYPE => serde_json::from_value(raw.data.clone()).map(Content::Image).ok(),
            STATUS_TYPE => serde_json::from_value(raw.data.clone()).map(Content::Status).ok(),
            YOUTUBE_TYPE => serde_json::from_value(raw.data.clone()).map(Content::Youtube).ok(),
            _ => None,
        };
        decoded.unwrap_or(Content::Unknown {
            kind: raw.kind,
            data: raw.data,
        })
    }
}

impl From<Content> for RawContent {
    fn from(content: Content) -> Self {
        let kind = content.kind().to_string();
        let data = match content {
            Content::Text(text) => text.doc,
            Content::Image(image) => serde_json::to_value(image).unwrap_or(Value::Null),
            Content::Status(status) => serde_json::to_value(status).unwrap_or(Value::Null),
            Content::Youtube(video) => serde_json::to_value(video).unwrap_or(Value::Null),
            Content::Unknown { data, .. } => data,
        };
        RawContent { kind, data }
    }
}

#[cfg(test)]
mod tests {
    use super::{Content, TextContent};
    use serde_json::json;

    #[test]
    fn unknown_type_is_preserved_verbatim() {
        let raw = json!({ "type": "kanban", "data": { "columns": [1, 2] } });
        let content: Content = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(content.kind(), "kanban");
        assert!(content.is_unknown());
        assert_eq!(serde_json::to_value(&content).unwrap(), raw);
    }

    #[test]
    fn malformed_known_payload_degrades_to_unknown() {
        let raw = json!({ "type": "image", "data": { "source": 3 } });
        let content: Content = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(content.kind(), "image");
        assert!(content.is_unknown());
        assert_eq!(serde_json::to_value(&content).unwrap(), raw);
    }

    #[test]
    fn status_payload_decodes() {
        let raw = json!({ "type": "status", "data": { "status": "in_progress", "label": "draft" } });
        let content: Content = serde_json::from_value(raw).unwrap();
        assert!(matches!(content, Content::Status(ref status) if status.label == "draft"));
    }

    #[test]
    fn plain_text_joins_paragraphs() {
        let text = TextContent::from_plain("first\n\nthird");
        assert_eq!(text.plain_text(), "first\n\nthird");
    }

    #[test]
    fn plain_text_reads_nested_marks() {
        let text = TextContent {
            doc: json!({
                "type": "doc",
                "content": [{
                    "type": "bullet_list",
                    "content": [{
                        "type": "list_item",
                        "content": [{
                            "type": "paragraph",
                            "content": [
                                { "type": "text", "text": "buy " },
                                { "type": "text", "text": "milk", "marks": [{ "type": "bold" }] }
                            ]
                        }]
                    }]
                }]
            }),
        };
        assert_eq!(text.plain_text(), "buy milk");
    }
}
