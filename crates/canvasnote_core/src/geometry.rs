//! Vector math and coordinate transforms for the canvas.
//!
//! # Responsibility
//! - Convert between viewport (screen) and environment (canvas) space.
//! - Provide the small rectangle/polar helpers used by hit testing and
//!   relation drawing.
//!
//! # Invariants
//! - `Camera::zoom` is strictly positive; constructors clamp it.
//! - `viewport_to_environment` and `environment_to_viewport` are inverses for
//!   the same camera.

use glam::Vec2;
use serde::{Deserialize, Serialize};

const MIN_ZOOM: f32 = 0.05;
const MAX_ZOOM: f32 = 8.0;

/// Camera transform of one canvas view.
///
/// `position` is the environment-space point shown at the viewport origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub position: Vec2,
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Camera {
    pub fn new(position: Vec2, zoom: f32) -> Self {
        Self {
            position,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    /// Maps a viewport point into environment space.
    pub fn viewport_to_environment(&self, point: Vec2) -> Vec2 {
        self.position + point / self.zoom
    }

    /// Maps an environment point into viewport space.
    pub fn environment_to_viewport(&self, point: Vec2) -> Vec2 {
        (point - self.position) * self.zoom
    }

    /// Scales a viewport-space delta into environment space.
    pub fn viewport_delta_to_environment(&self, delta: Vec2) -> Vec2 {
        delta / self.zoom
    }

    /// Zooms around a fixed viewport point, keeping that point stable.
    pub fn zoom_at(&mut self, anchor: Vec2, zoom: f32) {
        let anchored = self.viewport_to_environment(anchor);
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.position = anchored - anchor / self.zoom;
    }
}

/// Axis-aligned rectangle in whichever space the caller works in.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    pub fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(Vec2::new(x, y), Vec2::new(width, height))
    }

    pub fn min(&self) -> Vec2 {
        self.origin
    }

    pub fn max(&self) -> Vec2 {
        self.origin + self.size
    }

    pub fn center(&self) -> Vec2 {
        self.origin + self.size * 0.5
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Vec2) -> bool {
        let max = self.max();
        point.x >= self.origin.x && point.y >= self.origin.y && point.x <= max.x && point.y <= max.y
    }

    /// Returns the rectangle grown by `amount` on every side.
    pub fn inflate(&self, amount: f32) -> Self {
        Self::new(
            self.origin - Vec2::splat(amount),
            self.size + Vec2::splat(amount * 2.0),
        )
    }
}

/// Polar coordinates with the angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polar {
    pub radius: f32,
    pub degrees: f32,
}

/// Converts cartesian coordinates to polar (radius, degrees).
///
/// Angles follow `atan2`, so they fall in `(-180, 180]`.
pub fn cartesian_to_polar(x: f32, y: f32) -> Polar {
    Polar {
        radius: x.hypot(y),
        degrees: y.atan2(x).to_degrees(),
    }
}

pub fn polar_to_cartesian(radius: f32, degrees: f32) -> Vec2 {
    let radians = degrees.to_radians();
    Vec2::new(radius * radians.cos(), radius * radians.sin())
}

/// Returns the point where the ray from `rect`'s center toward `toward`
/// leaves the rectangle.
///
/// Relation arrows are anchored at this point so they start on the block
/// border instead of its center.
pub fn border_anchor(rect: &Rect, toward: Vec2) -> Vec2 {
    let center = rect.center();
    let direction = toward - center;
    if direction == Vec2::ZERO {
        return center;
    }
    let half = rect.size * 0.5;
    let scale_x = if direction.x != 0.0 {
        half.x / direction.x.abs()
    } else {
        f32::INFINITY
    };
    let scale_y = if direction.y != 0.0 {
        half.y / direction.y.abs()
    } else {
        f32::INFINITY
    };
    center + direction * scale_x.min(scale_y).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::{border_anchor, cartesian_to_polar, polar_to_cartesian, Camera, Rect};
    use glam::Vec2;

    #[test]
    fn cartesian_to_polar_rounds_to_expected_values() {
        let polar = cartesian_to_polar(1.0, 3f32.sqrt());
        assert_eq!(polar.radius.round(), 2.0);
        assert_eq!(polar.degrees.round(), 60.0);
    }

    #[test]
    fn polar_to_cartesian_inverts_cartesian_to_polar() {
        let polar = cartesian_to_polar(-3.0, 4.0);
        let point = polar_to_cartesian(polar.radius, polar.degrees);
        assert!((point.x + 3.0).abs() < 1e-4);
        assert!((point.y - 4.0).abs() < 1e-4);
    }

    #[test]
    fn camera_transforms_are_inverse() {
        let camera = Camera::new(Vec2::new(100.0, -50.0), 2.0);
        let viewport = Vec2::new(40.0, 60.0);
        let env = camera.viewport_to_environment(viewport);
        assert_eq!(env, Vec2::new(120.0, -20.0));
        assert_eq!(camera.environment_to_viewport(env), viewport);
    }

    #[test]
    fn camera_zoom_is_clamped() {
        let camera = Camera::new(Vec2::ZERO, 0.0);
        assert!(camera.zoom > 0.0);
    }

    #[test]
    fn zoom_at_keeps_anchor_stable() {
        let mut camera = Camera::new(Vec2::new(10.0, 10.0), 1.0);
        let anchor = Vec2::new(200.0, 100.0);
        let before = camera.viewport_to_environment(anchor);
        camera.zoom_at(anchor, 2.0);
        let after = camera.viewport_to_environment(anchor);
        assert!((before - after).length() < 1e-4);
    }

    #[test]
    fn rect_contains_is_inclusive() {
        let rect = Rect::from_xywh(0.0, 0.0, 10.0, 10.0);
        assert!(rect.contains(Vec2::new(10.0, 10.0)));
        assert!(!rect.contains(Vec2::new(10.1, 5.0)));
    }

    #[test]
    fn border_anchor_hits_right_edge() {
        let rect = Rect::from_xywh(0.0, 0.0, 10.0, 10.0);
        let anchor = border_anchor(&rect, Vec2::new(100.0, 5.0));
        assert_eq!(anchor, Vec2::new(10.0, 5.0));
    }
}
