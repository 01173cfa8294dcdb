//! Block placement model.
//!
//! # Invariants
//! - One `Block` is one on-screen placement; `id` is unique per placement.
//! - `size` components are never below [`MIN_BLOCK_SIZE`] once normalized.
//! - `position` is in environment space for `Free` blocks and a viewport
//!   offset from the pinned corner for `Pinned` blocks.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::system_now_ms;
use crate::geometry::{Camera, Rect};
use crate::model::concept::ConceptId;

pub type BlockId = Uuid;

/// Smallest width/height a block can be resized to.
pub const MIN_BLOCK_SIZE: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "corner")]
pub enum PositionType {
    /// Lives in environment space and moves with the camera.
    #[default]
    Free,
    /// Stays attached to a viewport corner.
    Pinned(Corner),
}

/// Interaction mode owned by the canvas reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockMode {
    #[default]
    Idle,
    Moving,
    Resizing,
    /// Content editor has focus; native pointer behavior wins.
    Focusing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub concept_id: ConceptId,
    #[serde(default)]
    pub position_type: PositionType,
    pub position: Vec2,
    pub size: Vec2,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub mode: BlockMode,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub highlighted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Block {
    pub fn new(concept_id: ConceptId, position: Vec2, size: Vec2) -> Self {
        let now = system_now_ms();
        let mut block = Self {
            id: Uuid::new_v4(),
            concept_id,
            position_type: PositionType::Free,
            position,
            size,
            color: None,
            mode: BlockMode::Idle,
            selected: false,
            highlighted: false,
            created_at: now,
            updated_at: now,
        };
        block.normalize_size();
        block
    }

    pub fn pinned(mut self, corner: Corner) -> Self {
        self.position_type = PositionType::Pinned(corner);
        self
    }

    pub fn normalize_size(&mut self) {
        self.size = self.size.max(Vec2::splat(MIN_BLOCK_SIZE));
    }

    /// Environment-space rectangle of this block for the given view.
    ///
    /// Pinned blocks are resolved against the viewport so they keep their
    /// on-screen size regardless of zoom.
    pub fn environment_rect(&self, camera: &Camera, viewport: Vec2) -> Rect {
        match self.position_type {
            PositionType::Free => Rect::new(self.position, self.size),
            PositionType::Pinned(corner) => {
                let anchor = match corner {
                    Corner::TopLeft => Vec2::ZERO,
                    Corner::TopRight => Vec2::new(viewport.x - self.size.x, 0.0),
                    Corner::BottomLeft => Vec2::new(0.0, viewport.y - self.size.y),
                    Corner::BottomRight => viewport - self.size,
                };
                let origin = camera.viewport_to_environment(anchor + self.position);
                Rect::new(origin, camera.viewport_delta_to_environment(self.size))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Block, Corner, MIN_BLOCK_SIZE};
    use crate::geometry::Camera;
    use glam::Vec2;
    use uuid::Uuid;

    #[test]
    fn new_block_clamps_size() {
        let block = Block::new(Uuid::new_v4(), Vec2::ZERO, Vec2::new(5.0, 300.0));
        assert_eq!(block.size, Vec2::new(MIN_BLOCK_SIZE, 300.0));
    }

    #[test]
    fn pinned_block_follows_viewport_corner() {
        let block = Block::new(Uuid::new_v4(), Vec2::new(-10.0, 0.0), Vec2::new(100.0, 50.0))
            .pinned(Corner::TopRight);
        let camera = Camera::new(Vec2::new(1000.0, 0.0), 2.0);
        let rect = block.environment_rect(&camera, Vec2::new(800.0, 600.0));
        assert_eq!(rect.origin, Vec2::new(1000.0 + 690.0 / 2.0, 0.0));
        assert_eq!(rect.size, Vec2::new(50.0, 25.0));
    }

    #[test]
    fn block_serializes_position_type() {
        let block = Block::new(Uuid::new_v4(), Vec2::ZERO, Vec2::splat(40.0)).pinned(Corner::BottomLeft);
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["position_type"]["kind"], "pinned");
        assert_eq!(value["position_type"]["corner"], "bottom_left");
    }
}
