//! The world/terrain collaborator consumed by movable objects.
//!
//! Terrain storage and spatial queries live elsewhere; objects only need the
//! global acceleration, a bounds test and an altitude probe.

use crate::math::Vec2;

/// Engine-facing view of the world an object moves through.
pub trait World {
    /// Global acceleration (gravity) in meters per second squared.
    fn global_acc(&self) -> Vec2;

    /// Whether `(x, y)` lies inside the world, allowing `margin` units of slack
    /// past every edge.
    fn is_within_bounds(&self, x: f32, y: f32, margin: f32) -> bool;

    /// Distance from `pos` down to the terrain surface, capped at `max`, probing
    /// every `accuracy` units.
    fn altitude(&self, pos: Vec2, max: f32, accuracy: f32) -> f32;
}

/// Rectangular world with a flat floor. Enough for headless simulation and tests.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundedWorld {
    pub width: f32,
    pub height: f32,
    /// Height of the floor surface, in world units from the top edge.
    pub floor: f32,
    pub gravity: Vec2,
}

impl BoundedWorld {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            floor: height,
            gravity: Vec2::new(0.0, 9.81),
        }
    }

    #[must_use]
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    #[must_use]
    pub fn with_floor(mut self, floor: f32) -> Self {
        self.floor = floor.clamp(0.0, self.height);
        self
    }
}

impl World for BoundedWorld {
    fn global_acc(&self) -> Vec2 {
        self.gravity
    }

    fn is_within_bounds(&self, x: f32, y: f32, margin: f32) -> bool {
        x >= -margin && y >= -margin && x < self.width + margin && y < self.height + margin
    }

    /// Distance to the floor, rounded up to the probing step.
    fn altitude(&self, pos: Vec2, max: f32, accuracy: f32) -> f32 {
        let step = accuracy.max(1.0);
        let gap = self.floor - pos.y;
        let probed = if gap > 0.0 { (gap / step).ceil() * step } else { 0.0 };
        probed.min(max)
    }
}
