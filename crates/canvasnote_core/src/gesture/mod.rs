//! Pointer gesture machines.
//!
//! Both machines are host-agnostic: they take viewport-space input and emit
//! [`CanvasAction`]s plus listener effects for the host to apply.

pub mod actions;
pub mod block;
pub mod link;

pub use actions::{ActionSink, CanvasAction, PointerButton};
pub use block::{
    transition, BlockGesture, BlockHover, GestureContext, GestureInput, GestureResponse,
    GestureState, HoverControls, ListenerEffect, ResizeAxis, Step,
};
pub use hit_test::{hit_test, HandleMetrics, HitTarget};
pub use link::{LinkGesture, LinkPreview, LinkState};

use crate::model::settings::DevFlags;

/// Distance a pointer must travel before a press becomes a drag.
pub const DEFAULT_MOVE_THRESHOLD: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    pub move_threshold: f32,
    pub handles: HandleMetrics,
    /// Log every action a block gesture dispatches at `debug`.
    pub log_dispatch: bool,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            move_threshold: DEFAULT_MOVE_THRESHOLD,
            handles: HandleMetrics::default(),
            log_dispatch: false,
        }
    }
}

impl GestureConfig {
    /// Applies the developer toggles persisted in settings.
    pub fn with_dev_flags(mut self, flags: &DevFlags) -> Self {
        self.log_dispatch = flags.log_gestures;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::GestureConfig;
    use crate::model::settings::DevFlags;

    #[test]
    fn dev_flags_toggle_dispatch_logging() {
        let base = GestureConfig::default();
        assert!(!base.log_dispatch);

        let flags = DevFlags {
            log_gestures: true,
            ..DevFlags::default()
        };
        let config = base.with_dev_flags(&flags);
        assert!(config.log_dispatch);
        assert_eq!(config.move_threshold, base.move_threshold);
        assert!(!config.with_dev_flags(&DevFlags::default()).log_dispatch);
    }
}
