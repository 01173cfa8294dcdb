//! Pointer gesture machine for one canvas block.
//!
//! # Responsibility
//! - Turn raw pointer/touch input on a block into move, resize, relation
//!   and context-menu actions.
//! - Decide when window-level listeners must be attached or detached.
//!
//! # Invariants
//! - [`transition`] is pure; [`BlockGesture`] only stores its result.
//! - Displacement at or below the move threshold never dispatches a move.
//! - Single-axis resizes always zero the other axis.
//! - A non-primary release is ignored and the gesture continues.
//! - Relation draw end uses the last recorded pointer position, not the
//!   release position.
//! - Every path back to `Idle` from a listening state detaches listeners.

use glam::Vec2;
use log::debug;

use crate::gesture::actions::{ActionSink, CanvasAction, PointerButton};
use crate::gesture::hit_test::HitTarget;
use crate::gesture::GestureConfig;
use crate::model::block::{BlockId, BlockMode};

/// Axes a resize handle changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAxis {
    Width,
    Height,
    Both,
}

impl ResizeAxis {
    /// Zeroes the component this axis does not change.
    pub fn mask(self, delta: Vec2) -> Vec2 {
        match self {
            Self::Width => Vec2::new(delta.x, 0.0),
            Self::Height => Vec2::new(0.0, delta.y),
            Self::Both => delta,
        }
    }

    fn from_target(target: HitTarget) -> Option<Self> {
        match target {
            HitTarget::ResizeWidthHeight => Some(Self::Both),
            HitTarget::ResizeWidth => Some(Self::Width),
            HitTarget::ResizeHeight => Some(Self::Height),
            HitTarget::RelationHandle | HitTarget::Body => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    /// Pointer is down on the body; movement not confirmed yet.
    ReadyToMove { origin: Vec2 },
    Moving { last: Vec2 },
    Resizing { axis: ResizeAxis, last: Vec2 },
    DrawingRelation { last: Vec2 },
}

impl GestureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ReadyToMove { .. } => "ready_to_move",
            Self::Moving { .. } => "move",
            Self::Resizing {
                axis: ResizeAxis::Width,
                ..
            } => "resize_w",
            Self::Resizing {
                axis: ResizeAxis::Height,
                ..
            } => "resize_h",
            Self::Resizing {
                axis: ResizeAxis::Both,
                ..
            } => "resize_wh",
            Self::DrawingRelation { .. } => "draw_arrow",
        }
    }
}

/// Raw input, in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureInput {
    PointerDown {
        button: PointerButton,
        position: Vec2,
        target: HitTarget,
    },
    PointerMove {
        position: Vec2,
    },
    PointerUp {
        button: PointerButton,
        position: Vec2,
    },
    /// Touch releases carry no button and may report a degenerate position.
    TouchEnd {
        position: Vec2,
    },
    TouchCancel {
        position: Vec2,
    },
}

/// Window-level listener bookkeeping requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerEffect {
    AttachWindow,
    DetachWindow,
}

/// Per-event inputs owned by someone else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureContext {
    pub block_id: BlockId,
    /// Block mode as currently held by the canvas reducer.
    pub mode: BlockMode,
    pub move_threshold: f32,
}

/// Result of one transition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Step {
    pub next: GestureState,
    pub actions: Vec<CanvasAction>,
    pub effects: Vec<ListenerEffect>,
    /// Host should prevent the native default for this event.
    pub suppress_default: bool,
}

impl Step {
    fn stay(state: GestureState) -> Self {
        Self {
            next: state,
            ..Self::default()
        }
    }
}

pub fn transition(state: GestureState, input: GestureInput, ctx: &GestureContext) -> Step {
    match input {
        GestureInput::PointerDown {
            button,
            position,
            target,
        } => pointer_down(state, button, position, target, ctx),
        GestureInput::PointerMove { position } => pointer_move(state, position, ctx),
        GestureInput::PointerUp { button, .. } if !button.is_primary() => Step::stay(state),
        GestureInput::PointerUp { .. }
        | GestureInput::TouchEnd { .. }
        | GestureInput::TouchCancel { .. } => release(state, ctx),
    }
}

fn pointer_down(
    state: GestureState,
    button: PointerButton,
    position: Vec2,
    target: HitTarget,
    ctx: &GestureContext,
) -> Step {
    if !button.is_primary() {
        if ctx.mode == BlockMode::Focusing {
            return Step::stay(state);
        }
        let mut step = Step::stay(state);
        step.suppress_default = true;
        if button == PointerButton::Secondary && ctx.mode == BlockMode::Idle {
            step.actions.push(CanvasAction::ContextMenuOpen {
                block_id: ctx.block_id,
                position,
            });
        }
        return step;
    }

    if !state.is_idle() {
        return Step::stay(state);
    }

    let mut actions = Vec::new();
    let next = if let Some(axis) = ResizeAxis::from_target(target) {
        GestureState::Resizing {
            axis,
            last: position,
        }
    } else if target == HitTarget::RelationHandle {
        actions.push(CanvasAction::RelationDrawStart {
            block_id: ctx.block_id,
            position,
        });
        GestureState::DrawingRelation { last: position }
    } else if ctx.mode != BlockMode::Focusing {
        GestureState::ReadyToMove { origin: position }
    } else {
        return Step::stay(state);
    };

    Step {
        next,
        actions,
        effects: vec![ListenerEffect::AttachWindow],
        suppress_default: true,
    }
}

fn pointer_move(state: GestureState, position: Vec2, ctx: &GestureContext) -> Step {
    let block_id = ctx.block_id;
    match state {
        GestureState::Idle => Step::stay(state),
        GestureState::ReadyToMove { origin } => {
            if position.distance(origin) <= ctx.move_threshold {
                return Step::stay(state);
            }
            Step {
                next: GestureState::Moving { last: position },
                actions: vec![CanvasAction::BlockMoveStart { block_id, position }],
                ..Step::default()
            }
        }
        GestureState::Moving { .. } => Step {
            next: GestureState::Moving { last: position },
            actions: vec![
                CanvasAction::BlockMove { block_id, position },
                CanvasAction::BlockSetMode {
                    block_id,
                    mode: BlockMode::Moving,
                },
            ],
            ..Step::default()
        },
        GestureState::Resizing { axis, last } => Step {
            next: GestureState::Resizing {
                axis,
                last: position,
            },
            actions: vec![
                CanvasAction::BlockResize {
                    block_id,
                    delta: axis.mask(position - last),
                },
                CanvasAction::BlockSetMode {
                    block_id,
                    mode: BlockMode::Resizing,
                },
            ],
            ..Step::default()
        },
        GestureState::DrawingRelation { .. } => Step {
            next: GestureState::DrawingRelation { last: position },
            actions: vec![CanvasAction::RelationDrawMove { block_id, position }],
            ..Step::default()
        },
    }
}

fn release(state: GestureState, ctx: &GestureContext) -> Step {
    if state.is_idle() {
        return Step::stay(state);
    }

    let block_id = ctx.block_id;
    let mut actions = Vec::new();
    if let GestureState::DrawingRelation { last } = state {
        actions.push(CanvasAction::RelationDrawEnd {
            block_id,
            position: last,
        });
    }
    if ctx.mode == BlockMode::Moving {
        actions.push(CanvasAction::BlockMoveEnd { block_id });
    }
    if matches!(ctx.mode, BlockMode::Moving | BlockMode::Resizing) {
        actions.push(CanvasAction::BlockSetMode {
            block_id,
            mode: BlockMode::Idle,
        });
    }

    Step {
        next: GestureState::Idle,
        actions,
        effects: vec![ListenerEffect::DetachWindow],
        suppress_default: false,
    }
}

/// What the host must do after an input was handled.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GestureResponse {
    pub effects: Vec<ListenerEffect>,
    pub suppress_default: bool,
}

/// Per-block controller owning the machine state.
#[derive(Debug, Clone)]
pub struct BlockGesture {
    block_id: BlockId,
    move_threshold: f32,
    log_dispatch: bool,
    state: GestureState,
    listening: bool,
}

impl BlockGesture {
    pub fn new(block_id: BlockId, config: &GestureConfig) -> Self {
        Self {
            block_id,
            move_threshold: config.move_threshold,
            log_dispatch: config.log_dispatch,
            state: GestureState::Idle,
            listening: false,
        }
    }

    pub fn block_id(&self) -> BlockId {
        self.block_id
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn logs_dispatch(&self) -> bool {
        self.log_dispatch
    }

    /// Whether window-level listeners are currently attached.
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Feeds one input; actions go to `sink` in emission order.
    pub fn handle(
        &mut self,
        input: GestureInput,
        mode: BlockMode,
        sink: &mut impl ActionSink,
    ) -> GestureResponse {
        let ctx = GestureContext {
            block_id: self.block_id,
            mode,
            move_threshold: self.move_threshold,
        };
        let step = transition(self.state, input, &ctx);

        if step.next.name() != self.state.name() {
            debug!(
                "event=block_gesture module=gesture status=ok block_id={} from={} to={}",
                self.block_id,
                self.state.name(),
                step.next.name()
            );
        }
        for effect in &step.effects {
            self.listening = matches!(effect, ListenerEffect::AttachWindow);
        }
        self.state = step.next;
        for action in step.actions {
            if self.log_dispatch {
                debug!(
                    "event=block_dispatch module=gesture status=ok block_id={} action={:?}",
                    self.block_id,
                    action
                );
            }
            sink.dispatch(action);
        }
        GestureResponse {
            effects: step.effects,
            suppress_default: step.suppress_default,
        }
    }

    /// Ends any in-progress gesture as if the touch was cancelled, e.g. when
    /// the view switches to read-only.
    pub fn abort(&mut self, mode: BlockMode, sink: &mut impl ActionSink) -> GestureResponse {
        let position = match self.state {
            GestureState::Idle => return GestureResponse::default(),
            GestureState::ReadyToMove { origin } => origin,
            GestureState::Moving { last }
            | GestureState::Resizing { last, .. }
            | GestureState::DrawingRelation { last } => last,
        };
        self.handle(GestureInput::TouchCancel { position }, mode, sink)
    }
}

/// Which auxiliary buttons a hovered block shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HoverControls {
    pub open_as_canvas: bool,
    pub relation_handle: bool,
}

/// Mouse enter/leave state, independent from the gesture machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockHover {
    hovered: bool,
}

impl BlockHover {
    pub fn enter(&mut self) {
        self.hovered = true;
    }

    pub fn leave(&mut self) {
        self.hovered = false;
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn controls(&self, mode: BlockMode, read_only: bool) -> HoverControls {
        if !self.hovered {
            return HoverControls::default();
        }
        HoverControls {
            open_as_canvas: !matches!(mode, BlockMode::Moving | BlockMode::Resizing),
            relation_handle: !read_only && mode == BlockMode::Idle,
        }
    }
}
