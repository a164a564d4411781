use super::{MovableObject, MIN_MASS};
use crate::math::Vec2;
use crate::time::SimClock;
use crate::world::World;

impl MovableObject {
    /// Set the mass, clamping anything not strictly positive up to [`MIN_MASS`].
    pub fn set_mass(&mut self, mass: f32) {
        self.mass = if mass > 0.0 { mass } else { MIN_MASS };
    }

    pub fn is_pinned(&self) -> bool {
        self.tuning.pin_strength > 0.0
    }

    /// Queue a continuous force, applied over the next tick. `offset` is relative
    /// to the object's center.
    pub fn add_force(&mut self, force: Vec2, offset: Vec2) {
        self.forces.push((force, offset));
    }

    /// Queue an instantaneous impulse in kg·m/s.
    pub fn add_impulse(&mut self, impulse: Vec2, offset: Vec2) {
        self.impulses.push((impulse, offset));
    }

    pub fn pending_forces(&self) -> usize {
        self.forces.len()
    }

    pub fn pending_impulses(&self) -> usize {
        self.impulses.len()
    }

    /// Apply global acceleration, drag and the queued forces to the velocity,
    /// then empty the force queue. Impulses are left alone.
    pub fn apply_forces(&mut self, world: &dyn World, clock: &SimClock) {
        if self.is_pinned() {
            self.forces.clear();
            return;
        }

        let dt = clock.delta_secs();
        self.vel += world.global_acc() * self.tuning.global_acc_scalar * dt;

        if self.tuning.air_resistance > 0.0 && self.vel.largest() >= self.tuning.air_threshold {
            self.vel *= 1.0 - self.tuning.air_resistance * dt;
        }

        for (force, _offset) in self.forces.drain(..) {
            self.vel += force / self.mass * dt;
        }
    }

    /// Apply the queued impulses to the velocity and empty the impulse queue.
    /// Impulses are already momentum, so they are not scaled by the timestep.
    pub fn apply_impulses(&mut self) {
        if self.is_pinned() {
            self.impulses.clear();
            return;
        }

        for (impulse, _offset) in self.impulses.drain(..) {
            self.vel += impulse / self.mass;
        }
    }

    /// Track velocity reversals and movement to decide whether the object is settling.
    pub fn rest_detection(&mut self, clock: &SimClock) {
        if self.is_pinned() {
            return;
        }

        if self.vel.dot(self.prev_vel) < 0.0 {
            if self.vel_oscillations >= 2 && self.rest_threshold_ms >= 0 {
                self.to_settle = true;
            } else {
                self.vel_oscillations = (self.vel_oscillations + 1).min(2);
            }
        } else {
            self.vel_oscillations = 0;
        }

        if (self.pos - self.prev_pos).largest() >= 1.0 {
            self.rest_timer.reset(clock);
        }
    }

    /// Whether the object has stayed put for longer than its rest threshold.
    pub fn is_at_rest(&self, clock: &SimClock) -> bool {
        if self.is_pinned() || self.rest_threshold_ms < 0 {
            return false;
        }
        self.rest_timer
            .is_past_ms(clock, f64::from(self.rest_threshold_ms))
    }

    pub fn velocity_oscillations(&self) -> u8 {
        self.vel_oscillations
    }

    /// Rescale runaway velocities down to `max_speed`.
    pub(super) fn fix_too_fast(&mut self, max_speed: f32) {
        if self.vel.largest() > max_speed {
            self.vel.set_magnitude(max_speed);
        }
    }

    /// Height above the terrain, capped at `max`.
    pub fn altitude(&self, world: &dyn World, max: f32, accuracy: f32) -> f32 {
        world.altitude(self.pos, max, accuracy)
    }
}
