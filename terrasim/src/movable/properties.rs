use serde_json::Value;
use thiserror::Error;

use super::{MovableObject, ScreenEffect, MAX_ORPHAN_RADIUS};
use crate::math::Vec2;
use crate::script::{ScriptError, ScriptRuntime};

/// Drag used to be configured per frame at 60 fps. Stored values are per second.
const LEGACY_FRAME_SECS: f32 = 0.01666;

#[derive(Debug, Error)]
pub enum PropertyError {
    #[error("unrecognized property {0}")]
    Unrecognized(String),
    #[error("property {property} must be {expected}")]
    Malformed {
        property: String,
        expected: &'static str,
    },
    #[error("duplicate script path {0}")]
    DuplicateScript(String),
    #[error(transparent)]
    Script(ScriptError),
}

fn malformed(property: &str, expected: &'static str) -> PropertyError {
    PropertyError::Malformed {
        property: property.to_string(),
        expected,
    }
}

fn number(property: &str, value: &Value) -> Result<f32, PropertyError> {
    value
        .as_f64()
        .map(|v| v as f32)
        .ok_or_else(|| malformed(property, "a number"))
}

fn integer(property: &str, value: &Value) -> Result<i64, PropertyError> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|v| v as i64))
        .ok_or_else(|| malformed(property, "an integer"))
}

fn unsigned(property: &str, value: &Value) -> Result<u64, PropertyError> {
    let v = integer(property, value)?;
    u64::try_from(v).map_err(|_| malformed(property, "a non-negative integer"))
}

/// Booleans may also be written as 0 or 1.
fn flag(property: &str, value: &Value) -> Result<bool, PropertyError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().map_or(false, |v| v != 0.0)),
        _ => Err(malformed(property, "a boolean")),
    }
}

fn text(property: &str, value: &Value) -> Result<String, PropertyError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| malformed(property, "a string"))
}

/// Vectors are either `{"x": .., "y": ..}` or `[x, y]`.
fn vector(property: &str, value: &Value) -> Result<Vec2, PropertyError> {
    serde_json::from_value::<Vec2>(value.clone())
        .or_else(|_| serde_json::from_value::<(f32, f32)>(value.clone()).map(Vec2::from))
        .map_err(|_| malformed(property, "a vector"))
}

impl MovableObject {
    /// Apply one configuration property. Names this level does not know are
    /// passed on to the scene-object properties.
    pub fn read_property(
        &mut self,
        name: &str,
        value: &Value,
        rt: &mut ScriptRuntime,
    ) -> Result<(), PropertyError> {
        match name {
            "Mass" => self.set_mass(number(name, value)?),
            "Velocity" => self.vel = vector(name, value)?,
            "Scale" => self.scale = number(name, value)?,
            "GlobalAccScalar" => self.tuning.global_acc_scalar = number(name, value)?,
            "AirResistance" => self.tuning.air_resistance = number(name, value)? / LEGACY_FRAME_SECS,
            "AirThreshold" => self.tuning.air_threshold = number(name, value)?,
            "PinStrength" => self.tuning.pin_strength = number(name, value)?,
            "RestThreshold" => {
                self.rest_threshold_ms = i32::try_from(integer(name, value)?)
                    .map_err(|_| malformed(name, "a 32-bit integer"))?;
            }
            "LifeTime" => self.lifetime_ms = unsigned(name, value)?,
            "Sharpness" => self.tuning.sharpness = number(name, value)?,
            "HitsMOs" => self.collision.hits_mos = flag(name, value)?,
            "GetsHitByMOs" => self.collision.gets_hit_by_mos = flag(name, value)?,
            "IgnoresTeamHits" => self.collision.ignores_team_hits = flag(name, value)?,
            "IgnoresAtomGroupHits" => self.collision.ignores_atom_group_hits = flag(name, value)?,
            "IgnoresAGHitsWhenSlowerThan" => {
                self.collision.ignores_ag_hits_when_slower_than = number(name, value)?;
            }
            "RemoveOrphanTerrainRadius" => {
                let radius = integer(name, value)?.clamp(0, i64::from(MAX_ORPHAN_RADIUS));
                self.terrain.remove_orphan_radius = radius as i32;
            }
            "RemoveOrphanTerrainMaxArea" => {
                let max = i64::from(MAX_ORPHAN_RADIUS * MAX_ORPHAN_RADIUS);
                self.terrain.remove_orphan_max_area = integer(name, value)?.clamp(0, max) as i32;
            }
            "RemoveOrphanTerrainRate" => self.terrain.remove_orphan_rate = number(name, value)?,
            "MissionCritical" => self.flags.mission_critical = flag(name, value)?,
            "CanBeSquished" => self.flags.can_be_squished = flag(name, value)?,
            "HUDVisible" => self.flags.hud_visible = flag(name, value)?,
            "ProvidesPieMenuContext" => self.flags.provides_pie_menu_context = flag(name, value)?,
            "ScriptPath" => self.read_script_paths(value, rt)?,
            "ScreenEffect" => self.effect.file = Some(text(name, value)?),
            "EffectStartTime" => self.effect.start_time_ms = unsigned(name, value)?,
            "EffectStopTime" => self.effect.stop_time_ms = unsigned(name, value)?,
            "EffectRotAngle" => self.effect.rot_angle = number(name, value)?,
            "InheritEffectRotAngle" => self.effect.inherit_rot_angle = flag(name, value)?,
            "RandomizeEffectRotAngle" => self.effect.randomize_rot_angle = flag(name, value)?,
            "RandomizeEffectRotAngleEveryFrame" => {
                self.effect.randomize_rot_angle_every_frame = flag(name, value)?;
            }
            "EffectStartStrength" => {
                self.effect.start_strength = ScreenEffect::strength_from_fraction(number(name, value)?);
            }
            "EffectStopStrength" => {
                self.effect.stop_strength = ScreenEffect::strength_from_fraction(number(name, value)?);
            }
            "EffectAlwaysShows" => self.effect.always_shows = flag(name, value)?,
            "DamageOnCollision" => self.collision.damage_on_collision = number(name, value)?,
            "DamageOnPenetration" => self.collision.damage_on_penetration = number(name, value)?,
            "WoundDamageMultiplier" => self.collision.wound_damage_multiplier = number(name, value)?,
            "IgnoreTerrain" => self.terrain.ignore_terrain = flag(name, value)?,
            _ => self.read_scene_property(name, value)?,
        }
        Ok(())
    }

    fn read_script_paths(&mut self, value: &Value, rt: &mut ScriptRuntime) -> Result<(), PropertyError> {
        let paths = match value {
            Value::String(path) => vec![path.clone()],
            Value::Array(items) => items
                .iter()
                .map(|item| text("ScriptPath", item))
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(malformed("ScriptPath", "a path or a list of paths")),
        };

        for path in paths {
            match self.load_script(rt, &path, true) {
                Ok(()) => {}
                Err(ScriptError::DuplicatePath(path)) => return Err(PropertyError::DuplicateScript(path)),
                Err(err) => return Err(PropertyError::Script(err)),
            }
        }
        Ok(())
    }

    /// Properties every placeable scene object understands.
    fn read_scene_property(&mut self, name: &str, value: &Value) -> Result<(), PropertyError> {
        match name {
            "PresetName" => self.preset_name = text(name, value)?,
            "Description" => self.description = text(name, value)?,
            "Position" => self.pos = vector(name, value)?,
            "Team" => {
                let team = integer(name, value)?;
                self.team = if team < 0 {
                    None
                } else {
                    Some(i32::try_from(team).map_err(|_| malformed(name, "a team number"))?)
                };
            }
            "Kind" => {
                if value.as_str() != Some(self.class_name()) {
                    return Err(malformed(name, "the object's own class name"));
                }
            }
            _ => return Err(PropertyError::Unrecognized(name.to_string())),
        }
        Ok(())
    }
}
