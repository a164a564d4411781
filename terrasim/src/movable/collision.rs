use std::collections::HashSet;
use std::time::Duration;

use super::MovableObject;
use crate::math::Vec2;
use crate::moid::Moid;
use crate::registry::UniqueId;
use crate::time::{SimClock, SimTimer};

/// Material index of empty space. Terrain hits report something else.
pub const MATERIAL_AIR: u8 = 0;

/// Which side of a collision an object is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitRole {
    Hitter,
    Hittee,
}

impl HitRole {
    pub fn other(self) -> Self {
        match self {
            Self::Hitter => Self::Hittee,
            Self::Hittee => Self::Hitter,
        }
    }

    fn slot(self) -> usize {
        match self {
            Self::Hitter => 0,
            Self::Hittee => 1,
        }
    }
}

/// One participant of a collision, as seen by the other.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitBody {
    pub id: UniqueId,
    pub moid: Moid,
    pub team: Option<i32>,
}

/// Collision record shared by both participants while the hit is resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct HitData {
    bodies: [HitBody; 2],
    /// Impulse each side receives.
    pub impulse: [Vec2; 2],
    terminate: [bool; 2],
}

impl HitData {
    pub fn new(hitter: HitBody, hittee: HitBody) -> Self {
        Self {
            bodies: [hitter, hittee],
            impulse: [Vec2::ZERO; 2],
            terminate: [false; 2],
        }
    }

    pub fn body(&self, role: HitRole) -> &HitBody {
        &self.bodies[role.slot()]
    }

    /// Whether the object playing `role` asked for its travel to stop at this hit.
    pub fn terminates(&self, role: HitRole) -> bool {
        self.terminate[role.slot()]
    }
}

/// Per-frame record of what the object ran into during travel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameHit {
    pub moid: Moid,
    pub terrain_material: u8,
    pub particle: UniqueId,
}

impl Default for FrameHit {
    fn default() -> Self {
        Self {
            moid: Moid::NONE,
            terrain_material: MATERIAL_AIR,
            particle: UniqueId::NONE,
        }
    }
}

/// Who an object collides with and how hard collisions hurt.
#[derive(Clone, Debug)]
pub struct CollisionPolicy {
    pub hits_mos: bool,
    pub gets_hit_by_mos: bool,
    pub ignores_team_hits: bool,
    pub ignores_atom_group_hits: bool,
    /// Speed below which atom-group hits are ignored. Non-positive disables the toggle.
    pub ignores_ag_hits_when_slower_than: f32,
    pub damage_on_collision: f32,
    pub damage_on_penetration: f32,
    pub wound_damage_multiplier: f32,
    mo_to_not_hit: Option<UniqueId>,
    mo_ignore_timer: SimTimer,
    already_hit_by: HashSet<UniqueId>,
}

impl Default for CollisionPolicy {
    fn default() -> Self {
        Self {
            hits_mos: false,
            gets_hit_by_mos: false,
            ignores_team_hits: false,
            ignores_atom_group_hits: false,
            ignores_ag_hits_when_slower_than: -1.0,
            damage_on_collision: 0.0,
            damage_on_penetration: 0.0,
            wound_damage_multiplier: 1.0,
            mo_to_not_hit: None,
            mo_ignore_timer: SimTimer::default(),
            already_hit_by: HashSet::new(),
        }
    }
}

impl CollisionPolicy {
    /// Copy of the tunable part. The per-frame hit set is not carried over.
    pub(super) fn duplicate(&self) -> Self {
        Self {
            already_hit_by: HashSet::new(),
            ..self.clone()
        }
    }

    pub(super) fn clear_already_hit_by(&mut self) {
        self.already_hit_by.clear();
    }
}

impl MovableObject {
    /// Ignore collisions with `other` for `duration` of simulated time, or until
    /// replaced when `duration` is `None`. Passing `None` as `other` clears it.
    pub fn set_which_mo_to_not_hit(
        &mut self,
        other: Option<UniqueId>,
        duration: Option<Duration>,
        clock: &SimClock,
    ) {
        self.collision.mo_to_not_hit = other;
        self.collision.mo_ignore_timer.reset(clock);
        self.collision.mo_ignore_timer.set_limit(duration);
    }

    /// The object currently excluded from collisions, if its exclusion has not expired.
    pub fn which_mo_to_not_hit(&self, clock: &SimClock) -> Option<UniqueId> {
        if self.collision.mo_ignore_timer.is_past_limit(clock) {
            None
        } else {
            self.collision.mo_to_not_hit
        }
    }

    /// Whether a hit from `other` should be resolved against this object this frame.
    pub fn accepts_hit_from(&self, other: &HitBody, clock: &SimClock) -> bool {
        let policy = &self.collision;
        if !policy.gets_hit_by_mos || other.id == self.unique_id() {
            return false;
        }
        if policy.already_hit_by.contains(&other.id) {
            return false;
        }
        if self.which_mo_to_not_hit(clock) == Some(other.id) {
            return false;
        }
        if policy.ignores_team_hits && self.team.is_some() && self.team == other.team {
            return false;
        }
        true
    }

    /// Remember that `hitter` already hit this object during the current frame.
    /// Returns false if it had already been recorded.
    pub fn register_hit_by(&mut self, hitter: UniqueId) -> bool {
        self.collision.already_hit_by.insert(hitter)
    }

    pub fn was_hit_by(&self, hitter: UniqueId) -> bool {
        self.collision.already_hit_by.contains(&hitter)
    }

    /// Handle a collision with another movable object. Records the hit in this
    /// frame's scratch and writes whether this side's travel terminates into
    /// `hit`, which is also returned.
    pub fn on_mo_hit(&mut self, hit: &mut HitData, role: HitRole) -> bool {
        let other = *hit.body(role.other());
        self.frame_hit.moid = other.moid;
        if role == HitRole::Hittee {
            self.register_hit_by(other.id);
        }

        let terminate = self.handles_hit_from(&other);
        hit.terminate[role.slot()] = terminate;
        terminate
    }

    /// Base objects never stop travelling because of what they hit.
    fn handles_hit_from(&self, _other: &HitBody) -> bool {
        false
    }

    /// Record a terrain hit for this frame.
    pub fn register_terrain_hit(&mut self, material: u8) {
        self.frame_hit.terrain_material = material;
    }

    /// Record a particle hit for this frame.
    pub fn register_particle_hit(&mut self, particle: UniqueId) {
        self.frame_hit.particle = particle;
    }

    pub fn frame_hit(&self) -> &FrameHit {
        &self.frame_hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movable::ObjectKind;
    use crate::registry::UniqueIdCounter;

    fn body(id: UniqueId, team: Option<i32>) -> HitBody {
        HitBody {
            id,
            moid: Moid::NONE,
            team,
        }
    }

    #[test]
    fn team_hits_are_ignored_on_request() {
        let clock = SimClock::new();
        let mut ids = UniqueIdCounter::new();
        let mut object = MovableObject::new(ObjectKind::Actor, &mut ids, &clock);
        object.collision.gets_hit_by_mos = true;
        object.collision.ignores_team_hits = true;
        object.team = Some(1);

        let friend = body(ids.next_id(), Some(1));
        let foe = body(ids.next_id(), Some(2));
        assert!(!object.accepts_hit_from(&friend, &clock));
        assert!(object.accepts_hit_from(&foe, &clock));
    }

    #[test]
    fn exclusion_expires_with_its_timer() {
        let mut clock = SimClock::new();
        let mut ids = UniqueIdCounter::new();
        let mut object = MovableObject::new(ObjectKind::Particle, &mut ids, &clock);
        object.collision.gets_hit_by_mos = true;
        let shooter = body(ids.next_id(), None);

        object.set_which_mo_to_not_hit(Some(shooter.id), Some(Duration::from_millis(50)), &clock);
        assert!(!object.accepts_hit_from(&shooter, &clock));

        clock.advance(Duration::from_millis(51));
        assert_eq!(object.which_mo_to_not_hit(&clock), None);
        assert!(object.accepts_hit_from(&shooter, &clock));
    }

    #[test]
    fn hittee_remembers_hitter_until_post_travel() {
        let clock = SimClock::new();
        let mut ids = UniqueIdCounter::new();
        let mut object = MovableObject::new(ObjectKind::Sprite, &mut ids, &clock);
        object.collision.gets_hit_by_mos = true;
        let hitter = body(ids.next_id(), None);
        let mut hit = HitData::new(hitter, body(object.unique_id(), None));

        assert!(!object.on_mo_hit(&mut hit, HitRole::Hittee));
        assert!(!hit.terminates(HitRole::Hittee));
        assert!(object.was_hit_by(hitter.id));
        assert!(!object.accepts_hit_from(&hitter, &clock));
    }
}
