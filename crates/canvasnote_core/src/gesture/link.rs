//! Drag-to-link gesture over the search result list.
//!
//! # Responsibility
//! - Turn a press on a search result into "open as canvas" (click) or
//!   "create block" (drag onto the canvas).
//! - Minimize the search panel and report a floating preview while linking.
//!
//! # Invariants
//! - Row enter/leave updates one shared hover slot; leaving a row never
//!   forgets the last valid target, so a fast drag that exits the row before
//!   release still links the pressed result.
//! - The drop position is converted to environment space with the camera
//!   current at release.

use glam::Vec2;
use log::debug;

use crate::geometry::Camera;
use crate::gesture::actions::{ActionSink, CanvasAction, PointerButton};
use crate::gesture::block::{GestureResponse, ListenerEffect};
use crate::gesture::GestureConfig;
use crate::model::concept::ConceptId;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LinkState {
    #[default]
    Idle,
    Ready {
        origin: Vec2,
        concept_id: ConceptId,
    },
    Linking {
        concept_id: ConceptId,
        position: Vec2,
    },
}

/// Floating preview drawn under the pointer while linking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkPreview {
    pub concept_id: ConceptId,
    /// Viewport position.
    pub position: Vec2,
}

#[derive(Debug, Clone)]
pub struct LinkGesture {
    move_threshold: f32,
    state: LinkState,
    hovered: Option<ConceptId>,
    last_valid_target: Option<ConceptId>,
}

impl LinkGesture {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            move_threshold: config.move_threshold,
            state: LinkState::Idle,
            hovered: None,
            last_valid_target: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn last_valid_target(&self) -> Option<ConceptId> {
        self.last_valid_target
    }

    /// Search panel collapses while a result is dragged.
    pub fn is_panel_minimized(&self) -> bool {
        matches!(self.state, LinkState::Linking { .. })
    }

    pub fn preview(&self) -> Option<LinkPreview> {
        match self.state {
            LinkState::Linking {
                concept_id,
                position,
            } => Some(LinkPreview {
                concept_id,
                position,
            }),
            LinkState::Idle | LinkState::Ready { .. } => None,
        }
    }

    pub fn row_enter(&mut self, concept_id: ConceptId) {
        self.hovered = Some(concept_id);
        self.last_valid_target = Some(concept_id);
    }

    pub fn row_leave(&mut self, concept_id: ConceptId) {
        if self.hovered == Some(concept_id) {
            self.hovered = None;
        }
    }

    pub fn pointer_down(&mut self, button: PointerButton, position: Vec2) -> GestureResponse {
        if !button.is_primary() || !matches!(self.state, LinkState::Idle) {
            return GestureResponse::default();
        }
        let Some(concept_id) = self.hovered else {
            return GestureResponse::default();
        };
        self.state = LinkState::Ready {
            origin: position,
            concept_id,
        };
        GestureResponse {
            effects: vec![ListenerEffect::AttachWindow],
            suppress_default: true,
        }
    }

    pub fn pointer_move(&mut self, position: Vec2) {
        match self.state {
            LinkState::Idle => {}
            LinkState::Ready { origin, concept_id } => {
                if position.distance(origin) > self.move_threshold {
                    debug!(
                        "event=link_gesture module=gesture status=ok from=ready to=linking concept_id={concept_id}"
                    );
                    self.state = LinkState::Linking {
                        concept_id,
                        position,
                    };
                }
            }
            LinkState::Linking { concept_id, .. } => {
                self.state = LinkState::Linking {
                    concept_id,
                    position,
                };
            }
        }
    }

    /// Completes the gesture. A drag drops at the last recorded pointer
    /// position, since touch releases may report a degenerate one.
    pub fn pointer_up(
        &mut self,
        button: PointerButton,
        camera: &Camera,
        sink: &mut impl ActionSink,
    ) -> GestureResponse {
        if !button.is_primary() {
            return GestureResponse::default();
        }
        self.finish(Some(camera), sink)
    }

    /// Drops the gesture without dispatching anything.
    pub fn cancel(&mut self) -> GestureResponse {
        let mut discard = |_: CanvasAction| {};
        self.finish(None, &mut discard)
    }

    fn finish(&mut self, camera: Option<&Camera>, sink: &mut impl ActionSink) -> GestureResponse {
        let state = std::mem::take(&mut self.state);
        let action = match (state, camera) {
            (LinkState::Idle, _) => return GestureResponse::default(),
            (_, None) => None,
            (LinkState::Ready { concept_id, .. }, Some(_)) => {
                Some(CanvasAction::BlockOpenAsCanvas { concept_id })
            }
            (
                LinkState::Linking {
                    concept_id,
                    position,
                },
                Some(camera),
            ) => Some(CanvasAction::BlockCreate {
                concept_id,
                position: camera.viewport_to_environment(position),
            }),
        };
        if let Some(action) = action {
            debug!("event=link_dispatch module=gesture status=ok action={action:?}");
            sink.dispatch(action);
        }
        GestureResponse {
            effects: vec![ListenerEffect::DetachWindow],
            suppress_default: false,
        }
    }
}
