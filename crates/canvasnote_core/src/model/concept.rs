//! Concept domain model.
//!
//! # Responsibility
//! - Define the canonical note/content unit persisted by the store.
//! - Carry the blocks placed on a concept when it is opened as a canvas.
//!
//! # Invariants
//! - `id` is stable and never reused for another concept.
//! - `summary` owns the payload shape; see [`crate::model::content`].
//! - Updates replace the whole concept; there is no partial patch.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::system_now_ms;
use crate::model::block::{Block, BlockId};
use crate::model::content::Content;
use crate::model::relation::Relation;

/// Stable identifier of a concept.
pub type ConceptId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub id: ConceptId,
    pub summary: Content,
    /// Blocks shown when this concept is opened as a canvas.
    #[serde(default)]
    pub details: Vec<Block>,
    /// Concepts linked from this one's content.
    #[serde(default)]
    pub references: Vec<ConceptId>,
    /// Older persisted shapes lack this field; the store backfills it.
    pub relations: Vec<Relation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawing: Option<Drawing>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Concept {
    /// Creates a concept with a generated id.
    pub fn new(summary: Content) -> Self {
        Self::with_id(Uuid::new_v4(), summary)
    }

    /// Creates a concept with a caller-provided id (import, home concept).
    pub fn with_id(id: ConceptId, summary: Content) -> Self {
        let now = system_now_ms();
        Self {
            id,
            summary,
            details: Vec::new(),
            references: Vec::new(),
            relations: Vec::new(),
            drawing: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Content-type id of the summary.
    pub fn kind(&self) -> &str {
        self.summary.kind()
    }

    /// Whether the concept hosts blocks (a canvas of other concepts).
    pub fn is_high_order(&self) -> bool {
        !self.details.is_empty()
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.details.iter().find(|block| block.id == id)
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.details.iter_mut().find(|block| block.id == id)
    }

    /// Adds a block and records the reference to its target concept.
    pub fn add_block(&mut self, block: Block) {
        if !self.references.contains(&block.concept_id) {
            self.references.push(block.concept_id);
        }
        self.details.push(block);
    }

    pub fn touch(&mut self, now_ms: i64) {
        self.updated_at = now_ms;
    }
}

/// Freehand strokes drawn over a concept canvas.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Drawing {
    pub strokes: Vec<Stroke>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub points: Vec<Vec2>,
    pub color: String,
    pub width: f32,
}
