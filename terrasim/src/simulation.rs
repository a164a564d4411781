use std::path::Path;
use std::time::Duration;

use anyhow::Result;

use crate::config::{LoadReport, SimConfig};
use crate::moid::{Moid, MoidIndex};
use crate::movable::{MovableObject, ObjectKind};
use crate::preset::PresetStore;
use crate::registry::{LiveRegistry, UniqueId, UniqueIdCounter};
use crate::script::ScriptRuntime;
use crate::time::SimClock;
use crate::world::{BoundedWorld, World};

/// Moves an object along its velocity for one tick, resolving whatever it runs into.
pub trait Travel {
    fn travel(&mut self, object: &mut MovableObject, world: &dyn World, clock: &SimClock);
}

/// Straight-line travel with no collision resolution.
#[derive(Clone, Copy, Debug)]
pub struct Ballistic {
    pub pixels_per_meter: f32,
}

impl Travel for Ballistic {
    fn travel(&mut self, object: &mut MovableObject, _world: &dyn World, clock: &SimClock) {
        object.pos += object.vel * (self.pixels_per_meter * clock.delta_secs());
    }
}

/// Owns every live object and steps them with a fixed timestep.
pub struct Simulation {
    config: SimConfig,
    clock: SimClock,
    accumulator: Duration,
    ids: UniqueIdCounter,
    registry: LiveRegistry,
    presets: PresetStore,
    scripts: ScriptRuntime,
    world: Box<dyn World>,
    traveler: Box<dyn Travel>,
    objects: Vec<MovableObject>,
    moid_index: MoidIndex,
}

impl Simulation {
    pub fn new(config: SimConfig, scripts: ScriptRuntime) -> Self {
        let world = BoundedWorld::new(config.world_width, config.world_height)
            .with_gravity(config.gravity);
        let traveler = Ballistic {
            pixels_per_meter: config.pixels_per_meter,
        };
        let scripts = scripts.with_recovery_limit(config.max_script_recoveries_per_sec);

        Self {
            config,
            clock: SimClock::new(),
            accumulator: Duration::ZERO,
            ids: UniqueIdCounter::new(),
            registry: LiveRegistry::new(),
            presets: PresetStore::new(),
            scripts,
            world: Box::new(world),
            traveler: Box::new(traveler),
            objects: Vec::new(),
            moid_index: MoidIndex::new(),
        }
    }

    /// Simulation configured from a JSON file, scripted with Lua.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = SimConfig::load(path)?;
        Ok(Self::new(config, ScriptRuntime::lua()?))
    }

    #[must_use]
    pub fn with_world(mut self, world: impl World + 'static) -> Self {
        self.world = Box::new(world);
        self
    }

    #[must_use]
    pub fn with_travel(mut self, traveler: impl Travel + 'static) -> Self {
        self.traveler = Box::new(traveler);
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn registry(&self) -> &LiveRegistry {
        &self.registry
    }

    pub fn presets(&self) -> &PresetStore {
        &self.presets
    }

    pub fn scripts(&self) -> &ScriptRuntime {
        &self.scripts
    }

    pub fn scripts_mut(&mut self) -> &mut ScriptRuntime {
        &mut self.scripts
    }

    pub fn world(&self) -> &dyn World {
        self.world.as_ref()
    }

    pub fn moid_index(&self) -> &MoidIndex {
        &self.moid_index
    }

    pub fn objects(&self) -> &[MovableObject] {
        &self.objects
    }

    pub fn object(&self, id: UniqueId) -> Option<&MovableObject> {
        self.objects.iter().find(|object| object.unique_id() == id)
    }

    pub fn object_mut(&mut self, id: UniqueId) -> Option<&mut MovableObject> {
        self.objects.iter_mut().find(|object| object.unique_id() == id)
    }

    pub fn load_presets(&mut self, path: impl AsRef<Path>) -> Result<LoadReport> {
        self.presets
            .load_file(path, &mut self.ids, &self.clock, &mut self.scripts)
    }

    /// Register `preset` directly, bypassing preset files.
    pub fn add_preset(&mut self, preset: MovableObject, overwrite: bool) -> bool {
        self.presets.add(preset, overwrite)
    }

    /// Unregistered template of `kind`, for building presets in code.
    pub fn new_template(&mut self, kind: ObjectKind) -> MovableObject {
        MovableObject::new(kind, &mut self.ids, &self.clock)
    }

    /// Create a live object of `kind` with default properties.
    pub fn create_object(&mut self, kind: ObjectKind) -> &mut MovableObject {
        let object = MovableObject::create(kind, &mut self.ids, &mut self.registry, &self.clock);
        self.push(object)
    }

    /// Create a live copy of the preset called `name` under class tag `tag`.
    pub fn spawn_from_preset(&mut self, tag: &str, name: &str) -> Option<&mut MovableObject> {
        let preset = self.presets.get(tag, name)?;
        let object =
            MovableObject::create_from(preset, &mut self.ids, &mut self.registry, &self.clock);
        Some(self.push(object))
    }

    fn push(&mut self, object: MovableObject) -> &mut MovableObject {
        log::debug!("spawned {} {}", object.class_name(), object.unique_id());
        let index = self.objects.len();
        self.objects.push(object);
        &mut self.objects[index]
    }

    /// Attach an enabled script to the live object `id`. Failures are reported
    /// on the console.
    pub fn add_script(&mut self, id: UniqueId, path: &str) -> bool {
        match self.objects.iter_mut().find(|object| object.unique_id() == id) {
            Some(object) => object.add_script(&mut self.scripts, path),
            None => {
                self.scripts
                    .console()
                    .error(format!("no live object {id} to add {path} to"));
                false
            }
        }
    }

    /// Feed real elapsed time and run as many fixed steps as it covers, up to
    /// the configured cap. Returns the number of steps run.
    pub fn advance(&mut self, real_delta: Duration) -> u32 {
        self.accumulator += real_delta;

        let mut steps = 0;
        while steps < self.config.max_steps_per_advance && self.should_run_fixed_update() {
            self.step();
            steps += 1;
        }

        if self.accumulator >= self.config.fixed_delta() {
            log::warn!(
                "simulation is falling behind, dropping {:?} of accumulated time",
                self.accumulator
            );
            self.accumulator = Duration::ZERO;
        }
        steps
    }

    fn should_run_fixed_update(&mut self) -> bool {
        let fixed = self.config.fixed_delta();
        if self.accumulator >= fixed {
            self.accumulator -= fixed;
            true
        } else {
            false
        }
    }

    /// How far through the next fixed step the accumulated time is, in `0.0..=1.0`.
    pub fn fixed_update_alpha(&self) -> f32 {
        let fixed = self.config.fixed_delta().as_secs_f32();
        (self.accumulator.as_secs_f32() / fixed).min(1.0)
    }

    /// Run exactly one fixed step.
    pub fn step(&mut self) {
        self.clock.advance(self.config.fixed_delta());
        self.scripts.begin_frame(&self.clock);

        let world = self.world.as_ref();
        for object in &mut self.objects {
            object.pre_travel();
            object.apply_forces(world, &self.clock);
            object.apply_impulses();
            self.traveler.travel(object, world, &self.clock);
            object.rest_detection(&self.clock);
            object.post_travel(world, &self.clock, &self.config);
            object.update();

            if object.scripts().is_empty() {
                continue;
            }
            if let Err(err) = object.update_scripts(&mut self.scripts, Some(&mut self.presets)) {
                self.scripts.console().error(format!(
                    "scripts of {} {} failed ({}): {err}",
                    object.class_name(),
                    object.unique_id(),
                    err.code()
                ));
            }
        }

        self.reap();
        self.register_moids();
    }

    fn register_moids(&mut self) {
        self.moid_index.clear();
        for object in &mut self.objects {
            object.update_moid(&mut self.moid_index, Moid::NONE, true);
        }
    }

    fn reap(&mut self) {
        let objects = std::mem::take(&mut self.objects);
        for object in objects {
            if object.to_delete() {
                object.destroy(&mut self.scripts, &mut self.registry);
            } else {
                self.objects.push(object);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;
    use crate::script::testing::RecordingEngine;
    use crate::script::ScriptCallback;

    fn simulation(config: SimConfig) -> Simulation {
        let (engine, _state) = RecordingEngine::new();
        Simulation::new(config, ScriptRuntime::new(engine))
    }

    #[test]
    fn advance_runs_whole_steps_and_keeps_the_remainder() {
        let mut sim = simulation(SimConfig::default().with_fixed_delta(0.01));

        assert_eq!(sim.advance(Duration::from_millis(25)), 2);
        assert_eq!(sim.clock().now(), Duration::from_millis(20));
        assert!(sim.fixed_update_alpha() > 0.4);

        assert_eq!(sim.advance(Duration::from_millis(5)), 1);
    }

    #[test]
    fn advance_drops_time_beyond_the_step_cap() {
        let mut config = SimConfig::default().with_fixed_delta(0.01);
        config.max_steps_per_advance = 3;
        let mut sim = simulation(config);

        assert_eq!(sim.advance(Duration::from_secs(1)), 3);
        assert_eq!(sim.fixed_update_alpha(), 0.0);
    }

    #[test]
    fn objects_fall_and_get_moids() {
        let mut sim = simulation(SimConfig::default().with_gravity(Vec2::new(0.0, 10.0)));
        let id = sim.create_object(ObjectKind::Particle).unique_id();
        sim.object_mut(id).expect("object").pos = Vec2::new(100.0, 100.0);
        let other = sim.create_object(ObjectKind::Sprite).unique_id();
        sim.object_mut(other).expect("object").pos = Vec2::new(200.0, 100.0);

        sim.step();

        let object = sim.object(id).expect("object");
        assert!(object.vel.y > 0.0);
        assert!(object.pos.y > 100.0);
        assert_eq!(object.moid().index(), 1);
        assert_eq!(sim.object(other).map(|o| o.moid().index()), Some(2));
        assert_eq!(sim.moid_index().get(object.moid()), Some(id));
    }

    #[test]
    fn deleted_objects_leave_the_registry() {
        let mut sim = simulation(SimConfig::default());
        let id = sim.create_object(ObjectKind::Particle).unique_id();
        sim.object_mut(id).expect("object").pos = Vec2::new(-5000.0, 0.0);

        sim.step();
        assert!(sim.object(id).is_none());
        assert!(!sim.registry().is_alive(id));
    }

    #[test]
    fn script_failures_go_to_the_console() {
        let (engine, state) = RecordingEngine::with_script("a.lua");
        state
            .borrow_mut()
            .failing
            .insert(("a.lua".to_string(), ScriptCallback::Update));
        let mut sim = Simulation::new(SimConfig::default(), ScriptRuntime::new(engine));

        let id = sim.create_object(ObjectKind::Actor).unique_id();
        assert!(sim.add_script(id, "a.lua"));
        assert!(!sim.add_script(UniqueId::NONE, "a.lua"));

        sim.step();
        let lines = sim.scripts().console().drain();
        assert!(lines.iter().any(|line| line.text.contains("Update failed in a.lua")));
        assert_eq!(state.borrow().count(ScriptCallback::Create), 1);
    }

    #[test]
    fn every_object_recovers_after_an_engine_reset() {
        let (engine, state) = RecordingEngine::with_script("a.lua");
        let config = SimConfig::default().with_script_recoveries(4);
        let mut sim = Simulation::new(config, ScriptRuntime::new(engine));

        for _ in 0..10 {
            let id = sim.create_object(ObjectKind::Actor).unique_id();
            assert!(sim.add_script(id, "a.lua"));
        }
        sim.step();
        assert_eq!(state.borrow().count(ScriptCallback::Update), 10);

        state.borrow_mut().reset();
        sim.step();

        assert_eq!(state.borrow().count(ScriptCallback::Update), 20);
        assert_eq!(state.borrow().count(ScriptCallback::Create), 10);
        assert!(sim.scripts().console().drain().is_empty());
    }
}
