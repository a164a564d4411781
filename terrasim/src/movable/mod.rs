//! Movable objects: everything that moves, collides and persists in the world.
//!
//! A [`MovableObject`] is advanced once per tick by the simulation in a fixed
//! order: `pre_travel`, `apply_forces`, `apply_impulses`, travel, `rest_detection`,
//! `post_travel`, `update`, `update_scripts`. After every object has been stepped
//! and the ones flagged `to_delete` are destroyed, the survivors re-register their
//! MOIDs against a freshly cleared index.

mod collision;
mod effect;
mod frame_id;
mod kind;
mod lifecycle;
mod physics;
mod properties;
mod scripts;

use std::time::Duration;

use crate::math::Vec2;
use crate::moid::Moid;
use crate::registry::{LiveEntry, LiveRegistry, UniqueId, UniqueIdCounter};
use crate::script::ScriptRuntime;
use crate::time::{SimClock, SimTimer};

pub use self::collision::{CollisionPolicy, FrameHit, HitBody, HitData, HitRole, MATERIAL_AIR};
pub use self::effect::ScreenEffect;
pub use self::kind::ObjectKind;
pub use self::properties::PropertyError;
pub use self::scripts::ScriptEntry;

use self::scripts::ScriptBindings;

/// Smallest mass an object may have. Anything lower is clamped up to it.
pub const MIN_MASS: f32 = 0.0001;

/// Largest radius, in pixels, of terrain an object may knock loose as orphaned debris.
pub const MAX_ORPHAN_RADIUS: i32 = 11;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsTuning {
    /// Multiplier on the world's global acceleration. May be negative.
    pub global_acc_scalar: f32,
    /// Drag per second. Zero disables drag.
    pub air_resistance: f32,
    /// Drag only applies once the largest velocity component reaches this.
    pub air_threshold: f32,
    /// Anything above zero pins the object in place.
    pub pin_strength: f32,
    pub sharpness: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            global_acc_scalar: 1.0,
            air_resistance: 0.0,
            air_threshold: 5.0,
            pin_strength: 0.0,
            sharpness: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectFlags {
    /// Never settles and is never squished into the terrain.
    pub mission_critical: bool,
    pub can_be_squished: bool,
    pub hud_visible: bool,
    pub provides_pie_menu_context: bool,
}

impl Default for ObjectFlags {
    fn default() -> Self {
        Self {
            mission_critical: false,
            can_be_squished: true,
            hud_visible: true,
            provides_pie_menu_context: false,
        }
    }
}

/// How the object interacts with terrain it passes through.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TerrainInteraction {
    pub ignore_terrain: bool,
    pub remove_orphan_radius: i32,
    pub remove_orphan_max_area: i32,
    pub remove_orphan_rate: f32,
}

/// A sub-object carried by its parent. Attachments share the parent's root MOID
/// and are destroyed with it.
#[derive(Debug)]
pub struct Attachment {
    pub object: MovableObject,
    /// Whether the attachment gets its own MOID or shares the last one assigned.
    pub new_moid: bool,
}

#[derive(Debug)]
pub struct MovableObject {
    kind: ObjectKind,
    unique_id: UniqueId,
    registered: bool,

    pub preset_name: String,
    pub description: String,
    pub team: Option<i32>,

    pub pos: Vec2,
    pub vel: Vec2,
    prev_pos: Vec2,
    prev_vel: Vec2,
    mass: f32,
    pub scale: f32,
    pub tuning: PhysicsTuning,
    /// Milliseconds without moving before the object counts as at rest.
    /// Negative disables rest detection.
    pub rest_threshold_ms: i32,
    /// Milliseconds the object lives for. Zero lives forever.
    pub lifetime_ms: u64,

    pub flags: ObjectFlags,
    pub collision: CollisionPolicy,
    pub terrain: TerrainInteraction,
    pub effect: ScreenEffect,

    forces: Vec<(Vec2, Vec2)>,
    impulses: Vec<(Vec2, Vec2)>,

    age_timer: SimTimer,
    rest_timer: SimTimer,
    vel_oscillations: u8,
    to_settle: bool,
    to_delete: bool,
    check_terrain_intersection: bool,
    frame_hit: FrameHit,

    moid: Moid,
    root_moid: Moid,
    footprint: usize,
    attachments: Vec<Attachment>,

    scripts: ScriptBindings,
    pie_menu_actor: Option<UniqueId>,
}

impl MovableObject {
    /// A fresh object with default properties and a new unique ID, not yet
    /// registered as live. Presets are built this way.
    pub fn new(kind: ObjectKind, ids: &mut UniqueIdCounter, clock: &SimClock) -> Self {
        Self {
            kind,
            unique_id: ids.next_id(),
            registered: false,
            preset_name: String::new(),
            description: String::new(),
            team: None,
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            prev_pos: Vec2::ZERO,
            prev_vel: Vec2::ZERO,
            mass: 1.0,
            scale: 1.0,
            tuning: PhysicsTuning::default(),
            rest_threshold_ms: 500,
            lifetime_ms: 0,
            flags: ObjectFlags::default(),
            collision: CollisionPolicy::default(),
            terrain: TerrainInteraction::default(),
            effect: ScreenEffect::default(),
            forces: Vec::new(),
            impulses: Vec::new(),
            age_timer: SimTimer::started(clock),
            rest_timer: SimTimer::started(clock),
            vel_oscillations: 0,
            to_settle: false,
            to_delete: false,
            check_terrain_intersection: false,
            frame_hit: FrameHit::default(),
            moid: Moid::NONE,
            root_moid: Moid::NONE,
            footprint: 0,
            attachments: Vec::new(),
            scripts: ScriptBindings::default(),
            pie_menu_actor: None,
        }
    }

    /// A fresh object registered with the live registry.
    pub fn create(
        kind: ObjectKind,
        ids: &mut UniqueIdCounter,
        registry: &mut LiveRegistry,
        clock: &SimClock,
    ) -> Self {
        let mut object = Self::new(kind, ids, clock);
        object.register(registry);
        object
    }

    /// Deep copy of `reference` with a new identity.
    ///
    /// Tuning, flags, script entries and the shared preset namespace are copied.
    /// Timers restart, queued forces are dropped, and the copy gets its own
    /// instance namespace the first time its scripts run. Attachments are not copied.
    pub fn create_from(
        reference: &MovableObject,
        ids: &mut UniqueIdCounter,
        registry: &mut LiveRegistry,
        clock: &SimClock,
    ) -> Self {
        let mut effect = reference.effect.clone();
        if effect.randomize_rot_angle {
            effect.randomize_rotation();
        }

        let mut object = Self {
            kind: reference.kind,
            unique_id: ids.next_id(),
            registered: false,
            preset_name: reference.preset_name.clone(),
            description: reference.description.clone(),
            team: reference.team,
            pos: reference.pos,
            vel: reference.vel,
            prev_pos: reference.pos,
            prev_vel: reference.vel,
            mass: reference.mass,
            scale: reference.scale,
            tuning: reference.tuning,
            rest_threshold_ms: reference.rest_threshold_ms,
            lifetime_ms: reference.lifetime_ms,
            flags: reference.flags,
            collision: reference.collision.duplicate(),
            terrain: reference.terrain,
            effect,
            forces: Vec::new(),
            impulses: Vec::new(),
            age_timer: SimTimer::started(clock),
            rest_timer: SimTimer::started(clock),
            vel_oscillations: 0,
            to_settle: false,
            to_delete: false,
            check_terrain_intersection: reference.check_terrain_intersection,
            frame_hit: reference.frame_hit,
            moid: Moid::NONE,
            root_moid: Moid::NONE,
            footprint: 0,
            attachments: Vec::new(),
            scripts: reference.scripts.for_copy(),
            pie_menu_actor: reference.pie_menu_actor,
        };
        object.effect.settle_stop_time(object.lifetime_ms);
        object.register(registry);
        object
    }

    fn register(&mut self, registry: &mut LiveRegistry) {
        registry.register(
            self.unique_id,
            LiveEntry {
                class_name: self.class_name(),
                preset_name: self.preset_name.clone(),
            },
        );
        self.registered = true;
    }

    /// Tear the object down: run `Destroy` for every enabled script, release the
    /// instance namespace, destroy attachments, then leave the live registry.
    pub fn destroy(mut self, rt: &mut ScriptRuntime, registry: &mut LiveRegistry) {
        self.run_destroy_scripts(rt);

        for attachment in self.attachments.drain(..) {
            attachment.object.destroy(rt, registry);
        }

        if self.registered {
            assert!(
                registry.unregister(self.unique_id),
                "object {} left the live registry before it was destroyed",
                self.unique_id
            );
        }
        log::debug!("destroyed {} {}", self.class_name(), self.unique_id);
    }

    pub fn unique_id(&self) -> UniqueId {
        self.unique_id
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn prev_pos(&self) -> Vec2 {
        self.prev_pos
    }

    pub fn prev_vel(&self) -> Vec2 {
        self.prev_vel
    }

    /// Simulated time since the object was created.
    pub fn age(&self, clock: &SimClock) -> Duration {
        self.age_timer.elapsed(clock)
    }

    pub fn to_settle(&self) -> bool {
        self.to_settle
    }

    /// Ask for the object to be settled into the terrain.
    pub fn set_to_settle(&mut self, settle: bool) {
        self.to_settle = settle;
    }

    pub fn to_delete(&self) -> bool {
        self.to_delete
    }

    /// Ask for the object to be removed at the end of the tick.
    pub fn set_to_delete(&mut self, delete: bool) {
        self.to_delete = delete;
    }

    pub fn check_terrain_intersection(&self) -> bool {
        self.check_terrain_intersection
    }

    /// Ask the travel step to check this object for terrain overlap this frame.
    pub fn request_terrain_intersection_check(&mut self) {
        self.check_terrain_intersection = true;
    }

    pub fn pie_menu_actor(&self) -> Option<UniqueId> {
        self.pie_menu_actor
    }

    /// Carry `child` along with this object.
    pub fn attach(&mut self, child: MovableObject, new_moid: bool) {
        self.attachments.push(Attachment {
            object: child,
            new_moid,
        });
    }

    /// Remove the attachment with `id`, handing it back to the caller.
    pub fn detach(&mut self, id: UniqueId) -> Option<MovableObject> {
        let index = self
            .attachments
            .iter()
            .position(|attachment| attachment.object.unique_id == id)?;
        Some(self.attachments.remove(index).object)
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::testing::RecordingEngine;

    #[test]
    fn unique_ids_keep_increasing_across_destruction() {
        let clock = SimClock::new();
        let mut ids = UniqueIdCounter::new();
        let mut registry = LiveRegistry::new();
        let (engine, _state) = RecordingEngine::new();
        let mut rt = ScriptRuntime::new(engine);

        let first = MovableObject::create(ObjectKind::Particle, &mut ids, &mut registry, &clock);
        let first_id = first.unique_id();
        first.destroy(&mut rt, &mut registry);

        let second = MovableObject::create(ObjectKind::Particle, &mut ids, &mut registry, &clock);
        assert!(second.unique_id() > first_id);
        assert!(!registry.is_alive(first_id));
        assert!(registry.is_alive(second.unique_id()));
    }

    #[test]
    fn copies_get_fresh_identity_and_timers() {
        let mut clock = SimClock::new();
        let mut ids = UniqueIdCounter::new();
        let mut registry = LiveRegistry::new();

        let mut preset = MovableObject::new(ObjectKind::Sprite, &mut ids, &clock);
        preset.preset_name = "Crate".into();
        preset.lifetime_ms = 2000;
        preset.tuning.air_resistance = 3.0;
        preset.add_force(Vec2::new(5.0, 0.0), Vec2::ZERO);

        clock.advance(Duration::from_millis(300));
        let copy = MovableObject::create_from(&preset, &mut ids, &mut registry, &clock);

        assert_ne!(copy.unique_id(), preset.unique_id());
        assert_eq!(copy.preset_name, "Crate");
        assert_eq!(copy.tuning.air_resistance, 3.0);
        assert_eq!(copy.age(&clock), Duration::ZERO);
        assert_eq!(copy.effect.stop_time_ms, 2000);
        assert_eq!(copy.pending_forces(), 0);
        assert!(registry.is_alive(copy.unique_id()));
        assert!(!registry.is_alive(preset.unique_id()));
    }

    #[test]
    fn destroying_a_parent_unregisters_its_attachments() {
        let clock = SimClock::new();
        let mut ids = UniqueIdCounter::new();
        let mut registry = LiveRegistry::new();
        let (engine, _state) = RecordingEngine::new();
        let mut rt = ScriptRuntime::new(engine);

        let mut parent = MovableObject::create(ObjectKind::Actor, &mut ids, &mut registry, &clock);
        let arm = MovableObject::create(ObjectKind::Attachable, &mut ids, &mut registry, &clock);
        let arm_id = arm.unique_id();
        parent.attach(arm, true);
        assert_eq!(registry.len(), 2);

        parent.destroy(&mut rt, &mut registry);
        assert!(registry.is_empty());
        assert!(!registry.is_alive(arm_id));
    }

    #[test]
    fn detach_hands_the_child_back() {
        let clock = SimClock::new();
        let mut ids = UniqueIdCounter::new();
        let mut parent = MovableObject::new(ObjectKind::Actor, &mut ids, &clock);
        let child = MovableObject::new(ObjectKind::Device, &mut ids, &clock);
        let child_id = child.unique_id();
        parent.attach(child, false);

        let detached = parent.detach(child_id).expect("attached");
        assert_eq!(detached.unique_id(), child_id);
        assert!(parent.attachments().is_empty());
        assert!(parent.detach(child_id).is_none());
    }
}
