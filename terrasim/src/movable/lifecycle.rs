use super::{FrameHit, MovableObject};
use crate::config::SimConfig;
use crate::time::SimClock;
use crate::world::World;

impl MovableObject {
    /// Snapshot position and velocity and clear last frame's hit scratch.
    /// Always called right before travel.
    pub fn pre_travel(&mut self) {
        self.prev_pos = self.pos;
        self.prev_vel = self.vel;
        self.frame_hit = FrameHit::default();
    }

    /// Bookkeeping after travel: collision toggles, expiry, bounds and speed
    /// checks. Mission-critical objects leave this with `to_settle` cleared.
    pub fn post_travel(&mut self, world: &dyn World, clock: &SimClock, config: &SimConfig) {
        let slower_than = self.collision.ignores_ag_hits_when_slower_than;
        if slower_than > 0.0 {
            self.collision.ignores_atom_group_hits = self.vel.largest() < slower_than;
        }

        if self.collision.gets_hit_by_mos {
            self.collision.clear_already_hit_by();
        }

        if self.lifetime_ms > 0 && self.age_timer.is_past_ms(clock, self.lifetime_ms as f64) {
            log::trace!("{} {} expired", self.class_name(), self.unique_id);
            self.to_delete = true;
        }

        if !world.is_within_bounds(self.pos.x, self.pos.y, config.bounds_margin) {
            log::debug!(
                "{} {} left the world at ({}, {})",
                self.class_name(),
                self.unique_id,
                self.pos.x,
                self.pos.y
            );
            self.to_delete = true;
        }

        self.fix_too_fast(config.max_speed);

        if self.flags.mission_critical {
            self.to_settle = false;
        }

        self.check_terrain_intersection = false;
    }

    /// Per-frame update after travel.
    pub fn update(&mut self) {
        self.effect.tick();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::math::Vec2;
    use crate::movable::ObjectKind;
    use crate::registry::{UniqueId, UniqueIdCounter};
    use crate::world::BoundedWorld;

    fn setup() -> (SimClock, BoundedWorld, SimConfig, MovableObject) {
        let clock = SimClock::new();
        let mut ids = UniqueIdCounter::new();
        let mut object = MovableObject::new(ObjectKind::Particle, &mut ids, &clock);
        object.pos = Vec2::new(50.0, 50.0);
        (clock, BoundedWorld::new(100.0, 100.0), SimConfig::default(), object)
    }

    #[test]
    fn mission_critical_never_ends_settling() {
        let (clock, world, config, mut object) = setup();
        object.flags.mission_critical = true;
        object.set_to_settle(true);

        object.post_travel(&world, &clock, &config);
        assert!(!object.to_settle());
    }

    #[test]
    fn lifetime_expiry_is_strict() {
        let (mut clock, world, config, mut object) = setup();
        object.lifetime_ms = 1000;

        clock.advance(Duration::from_millis(1000));
        object.post_travel(&world, &clock, &config);
        assert!(!object.to_delete());

        clock.advance(Duration::from_millis(1));
        object.post_travel(&world, &clock, &config);
        assert!(object.to_delete());
    }

    #[test]
    fn leaving_the_world_requests_deletion() {
        let (clock, world, config, mut object) = setup();
        object.pos = Vec2::new(50.0, 150.0);
        object.post_travel(&world, &clock, &config);
        assert!(!object.to_delete());

        object.pos = Vec2::new(50.0, 250.0);
        object.post_travel(&world, &clock, &config);
        assert!(object.to_delete());
    }

    #[test]
    fn slow_objects_ignore_atom_group_hits() {
        let (clock, world, config, mut object) = setup();
        object.collision.ignores_ag_hits_when_slower_than = 5.0;

        object.vel = Vec2::new(1.0, -2.0);
        object.post_travel(&world, &clock, &config);
        assert!(object.collision.ignores_atom_group_hits);

        object.vel = Vec2::new(0.0, 8.0);
        object.post_travel(&world, &clock, &config);
        assert!(!object.collision.ignores_atom_group_hits);
    }

    #[test]
    fn hit_scratch_is_per_frame() {
        let (clock, world, config, mut object) = setup();
        object.collision.gets_hit_by_mos = true;
        object.register_terrain_hit(7);
        object.register_hit_by(UniqueId::NONE);
        object.request_terrain_intersection_check();

        object.post_travel(&world, &clock, &config);
        assert!(!object.was_hit_by(UniqueId::NONE));
        assert!(!object.check_terrain_intersection());

        object.pre_travel();
        assert_eq!(object.frame_hit().terrain_material, crate::movable::MATERIAL_AIR);
    }
}
