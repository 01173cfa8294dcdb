//! Canvas reducer: the consumer side of the dispatched action contract.
//!
//! # Responsibility
//! - Apply [`CanvasAction`]s to the blocks and relations of one open
//!   concept.
//! - Track transient UI state: drag offsets, relation draft, context menu,
//!   pending navigation.
//!
//! # Invariants
//! - Block positions are stored in environment space (free blocks) or as a
//!   viewport offset (pinned blocks); incoming viewport positions are
//!   converted with the current camera.
//! - Block sizes never drop below the minimum block size.
//! - A relation is created only between two distinct blocks and never
//!   duplicated.
//! - Actions naming an unknown block are ignored.

use std::collections::HashMap;

use glam::Vec2;
use log::{debug, trace, warn};

use crate::clock::system_now_ms;
use crate::geometry::Camera;
use crate::gesture::actions::{ActionSink, CanvasAction};
use crate::model::block::{Block, BlockId, BlockMode, PositionType};
use crate::model::concept::{Concept, ConceptId};
use crate::model::relation::{EntityRef, Relation};

/// Size of a block created by dropping a concept on the canvas.
pub const DEFAULT_BLOCK_SIZE: Vec2 = Vec2::new(240.0, 120.0);

/// Relation arrow being drawn from a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelationDraft {
    pub from: BlockId,
    /// Environment-space pointer position.
    pub current: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextMenu {
    pub block_id: BlockId,
    /// Viewport position.
    pub position: Vec2,
}

#[derive(Debug, Clone)]
pub struct CanvasState {
    concept_id: ConceptId,
    pub camera: Camera,
    /// Viewport size, used to resolve pinned blocks.
    pub viewport: Vec2,
    blocks: Vec<Block>,
    relations: Vec<Relation>,
    drag_offsets: HashMap<BlockId, Vec2>,
    relation_draft: Option<RelationDraft>,
    context_menu: Option<ContextMenu>,
    open_request: Option<ConceptId>,
    dirty: bool,
}

impl CanvasState {
    /// Opens `concept` as a canvas.
    pub fn from_concept(concept: &Concept, camera: Camera, viewport: Vec2) -> Self {
        Self {
            concept_id: concept.id,
            camera,
            viewport,
            blocks: concept.details.clone(),
            relations: concept.relations.clone(),
            drag_offsets: HashMap::new(),
            relation_draft: None,
            context_menu: None,
            open_request: None,
            dirty: false,
        }
    }

    pub fn concept_id(&self) -> ConceptId {
        self.concept_id
    }

    /// Blocks in paint order; later blocks are on top.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|block| block.id == id)
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn relation_draft(&self) -> Option<RelationDraft> {
        self.relation_draft
    }

    pub fn context_menu(&self) -> Option<ContextMenu> {
        self.context_menu
    }

    pub fn close_context_menu(&mut self) {
        self.context_menu = None;
    }

    /// Concept the user asked to open as a canvas, consumed once.
    pub fn take_open_request(&mut self) -> Option<ConceptId> {
        self.open_request.take()
    }

    /// Whether persisted state changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Writes blocks and relations back into the canvas concept.
    pub fn write_into(&self, concept: &mut Concept) {
        concept.details = self.blocks.clone();
        concept.relations = self.relations.clone();
        for block in &self.blocks {
            if !concept.references.contains(&block.concept_id) {
                concept.references.push(block.concept_id);
            }
        }
        concept.touch(system_now_ms());
    }

    pub fn reduce(&mut self, action: CanvasAction) {
        trace!("event=canvas_reduce module=canvas status=start action={action:?}");
        match action {
            CanvasAction::BlockMoveStart { block_id, position } => {
                self.context_menu = None;
                let pointer = self.pointer_space(block_id, position);
                for block in &mut self.blocks {
                    block.selected = block.id == block_id;
                }
                let offset = self.block_mut(block_id).map(|block| block.position - pointer);
                if let Some(offset) = offset {
                    self.drag_offsets.insert(block_id, offset);
                }
            }
            CanvasAction::BlockMove { block_id, position } => {
                let pointer = self.pointer_space(block_id, position);
                let offset = self.drag_offsets.get(&block_id).copied();
                if let (Some(offset), Some(block)) = (offset, self.block_mut(block_id)) {
                    block.position = pointer + offset;
                }
            }
            CanvasAction::BlockMoveEnd { block_id } => {
                self.drag_offsets.remove(&block_id);
                let moved = self.block_mut(block_id).map(|block| {
                    block.updated_at = system_now_ms();
                });
                self.dirty |= moved.is_some();
            }
            CanvasAction::BlockResize { block_id, delta } => {
                let camera = self.camera;
                let resized = self.block_mut(block_id).map(|block| {
                    let delta = match block.position_type {
                        PositionType::Free => camera.viewport_delta_to_environment(delta),
                        PositionType::Pinned(_) => delta,
                    };
                    block.size += delta;
                    block.normalize_size();
                    block.updated_at = system_now_ms();
                });
                self.dirty |= resized.is_some();
            }
            CanvasAction::BlockSetMode { block_id, mode } => {
                if let Some(block) = self.block_mut(block_id) {
                    block.mode = mode;
                }
            }
            CanvasAction::ContextMenuOpen { block_id, position } => {
                if self.block(block_id).is_some() {
                    self.context_menu = Some(ContextMenu { block_id, position });
                }
            }
            CanvasAction::RelationDrawStart { block_id, position } => {
                if self.block(block_id).is_some() {
                    self.relation_draft = Some(RelationDraft {
                        from: block_id,
                        current: self.camera.viewport_to_environment(position),
                    });
                }
            }
            CanvasAction::RelationDrawMove { block_id, position } => {
                let current = self.camera.viewport_to_environment(position);
                if let Some(draft) = self.relation_draft.as_mut().filter(|d| d.from == block_id) {
                    draft.current = current;
                }
            }
            CanvasAction::RelationDrawEnd { block_id, position } => {
                self.finish_relation(block_id, position);
            }
            CanvasAction::BlockOpenAsCanvas { concept_id } => {
                self.open_request = Some(concept_id);
            }
            CanvasAction::BlockCreate {
                concept_id,
                position,
            } => {
                let block = Block::new(concept_id, position, DEFAULT_BLOCK_SIZE);
                debug!(
                    "event=canvas_block_create module=canvas status=ok block_id={} concept_id={}",
                    block.id, concept_id
                );
                self.blocks.push(block);
                self.dirty = true;
            }
        }
    }

    /// Topmost block under an environment-space point.
    pub fn block_at(&self, point: Vec2) -> Option<&Block> {
        self.blocks
            .iter()
            .rev()
            .find(|block| block.environment_rect(&self.camera, self.viewport).contains(point))
    }

    fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        let found = self.blocks.iter_mut().find(|block| block.id == id);
        if found.is_none() {
            warn!("event=canvas_reduce module=canvas status=error reason=unknown_block block_id={id}");
        }
        found
    }

    /// Converts a pointer into the space the block's `position` lives in.
    fn pointer_space(&self, block_id: BlockId, position: Vec2) -> Vec2 {
        match self.block(block_id).map(|block| block.position_type) {
            Some(PositionType::Pinned(_)) => position,
            _ => self.camera.viewport_to_environment(position),
        }
    }

    fn finish_relation(&mut self, block_id: BlockId, position: Vec2) {
        let Some(draft) = self.relation_draft.take() else {
            return;
        };
        if draft.from != block_id {
            return;
        }
        let drop = self.camera.viewport_to_environment(position);
        let Some(target) = self
            .block_at(drop)
            .filter(|block| block.id != block_id)
            .map(|block| block.id)
        else {
            debug!("event=canvas_relation module=canvas status=ok result=no_target");
            return;
        };

        let from = EntityRef::block(block_id);
        let to = EntityRef::block(target);
        let exists = self
            .relations
            .iter()
            .any(|relation| relation.from == from && relation.to == to);
        if exists {
            return;
        }
        self.relations.push(Relation::new(from, to));
        self.dirty = true;
        debug!(
            "event=canvas_relation module=canvas status=ok from={} to={}",
            block_id, target
        );
    }

    /// Mode of one block, `Idle` when unknown.
    pub fn block_mode(&self, id: BlockId) -> BlockMode {
        self.block(id).map_or(BlockMode::Idle, |block| block.mode)
    }
}

impl ActionSink for CanvasState {
    fn dispatch(&mut self, action: CanvasAction) {
        self.reduce(action);
    }
}
