//! Terrasim - per-frame movable-object simulation core.
//!
//! Movable objects integrate forces and impulses, detect when they come to
//! rest, age and expire, carry Lua script bindings, and take part in the
//! per-frame MOID (movable-object ID) allocation used for collision lookups.

pub mod config;
pub mod console;
pub mod math;
pub mod moid;
pub mod movable;
pub mod preset;
pub mod registry;
pub mod script;
pub mod simulation;
pub mod time;
pub mod world;

pub use crate::config::{ConfigError, LoadReport, SimConfig};
pub use crate::console::{Console, ConsoleLevel, ConsoleLine};
pub use crate::math::Vec2;
pub use crate::moid::{Moid, MoidIndex};
pub use crate::movable::{MovableObject, ObjectKind};
pub use crate::preset::PresetStore;
pub use crate::registry::{LiveRegistry, UniqueId, UniqueIdCounter};
pub use crate::script::{LuaEngine, ScriptCallback, ScriptEngine, ScriptError, ScriptRuntime};
pub use crate::simulation::{Ballistic, Simulation, Travel};
pub use crate::time::{SimClock, SimTimer};
pub use crate::world::{BoundedWorld, World};
