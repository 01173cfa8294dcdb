//! Dispatched action contract between gesture machines and the canvas
//! reducer.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::model::block::{BlockId, BlockMode};
use crate::model::concept::ConceptId;

/// Pointer button as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    Primary,
    Auxiliary,
    Secondary,
}

impl PointerButton {
    pub fn is_primary(self) -> bool {
        self == Self::Primary
    }
}

/// Closed set of actions a gesture can dispatch.
///
/// Positions are viewport coordinates unless the variant says otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanvasAction {
    BlockMoveStart {
        block_id: BlockId,
        position: Vec2,
    },
    BlockMove {
        block_id: BlockId,
        position: Vec2,
    },
    BlockMoveEnd {
        block_id: BlockId,
    },
    /// Viewport-space size delta since the previous resize event.
    BlockResize {
        block_id: BlockId,
        delta: Vec2,
    },
    BlockSetMode {
        block_id: BlockId,
        mode: BlockMode,
    },
    ContextMenuOpen {
        block_id: BlockId,
        position: Vec2,
    },
    RelationDrawStart {
        block_id: BlockId,
        position: Vec2,
    },
    RelationDrawMove {
        block_id: BlockId,
        position: Vec2,
    },
    RelationDrawEnd {
        block_id: BlockId,
        position: Vec2,
    },
    BlockOpenAsCanvas {
        concept_id: ConceptId,
    },
    /// `position` is in environment space.
    BlockCreate {
        concept_id: ConceptId,
        position: Vec2,
    },
}

impl CanvasAction {
    /// Block the action targets, if any.
    pub fn block_id(&self) -> Option<BlockId> {
        match self {
            Self::BlockMoveStart { block_id, .. }
            | Self::BlockMove { block_id, .. }
            | Self::BlockMoveEnd { block_id }
            | Self::BlockResize { block_id, .. }
            | Self::BlockSetMode { block_id, .. }
            | Self::ContextMenuOpen { block_id, .. }
            | Self::RelationDrawStart { block_id, .. }
            | Self::RelationDrawMove { block_id, .. }
            | Self::RelationDrawEnd { block_id, .. } => Some(*block_id),
            Self::BlockOpenAsCanvas { .. } | Self::BlockCreate { .. } => None,
        }
    }
}

/// Receiver of dispatched actions (the owning view's `dispatch`).
pub trait ActionSink {
    fn dispatch(&mut self, action: CanvasAction);
}

impl<F> ActionSink for F
where
    F: FnMut(CanvasAction),
{
    fn dispatch(&mut self, action: CanvasAction) {
        self(action)
    }
}

#[cfg(test)]
mod tests {
    use super::{ActionSink, CanvasAction};
    use glam::Vec2;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        let mut sink = |action: CanvasAction| seen.push(action);
        sink.dispatch(CanvasAction::BlockMoveEnd {
            block_id: Uuid::nil(),
        });
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn actions_serialize_with_type_tag() {
        let action = CanvasAction::BlockMove {
            block_id: Uuid::nil(),
            position: Vec2::new(1.0, 2.0),
        };
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["type"], json!("block_move"));
        assert_eq!(value["position"], json!([1.0, 2.0]));
        assert_eq!(action.block_id(), Some(Uuid::nil()));
    }
}
