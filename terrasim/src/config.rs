use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::Vec2;

const MIN_FIXED_DELTA_SECS: f64 = 1e-6;
const MAX_FIXED_DELTA_SECS: f64 = 1.0;

/// Simulation configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed simulation timestep in seconds, at most one second.
    pub fixed_delta_secs: f64,
    /// How far past the world edges an object may go before it is deleted.
    pub bounds_margin: f32,
    /// Largest velocity component allowed before the velocity is clamped.
    pub max_speed: f32,
    /// Conversion from meters (velocities) to world units (positions).
    pub pixels_per_meter: f32,
    pub gravity: Vec2,
    pub world_width: f32,
    pub world_height: f32,
    /// How many times per second of simulated time a lost script namespace may
    /// trigger a full reload.
    pub max_script_recoveries_per_sec: u32,
    /// Upper bound on fixed steps run by a single `advance` call.
    pub max_steps_per_advance: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_delta_secs: 1.0 / 60.0,
            bounds_margin: 100.0,
            max_speed: 500.0,
            pixels_per_meter: 20.0,
            gravity: Vec2::new(0.0, 9.81),
            world_width: 2000.0,
            world_height: 1000.0,
            max_script_recoveries_per_sec: 4,
            max_steps_per_advance: 8,
        }
    }
}

impl SimConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the simulation cannot step with.
    pub fn validate(&self) -> Result<()> {
        let secs = self.fixed_delta_secs;
        if !(secs > 0.0 && secs <= MAX_FIXED_DELTA_SECS) {
            return Err(anyhow!(
                "fixed_delta_secs must be in (0, {MAX_FIXED_DELTA_SECS}], got {secs}"
            ));
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;
        Self::from_json(&json).map_err(|e| anyhow!("Invalid config file {:?}: {}", path, e))
    }

    #[must_use]
    pub fn with_fixed_delta(mut self, secs: f64) -> Self {
        self.fixed_delta_secs = secs;
        self
    }

    #[must_use]
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    #[must_use]
    pub fn with_world_size(mut self, width: f32, height: f32) -> Self {
        self.world_width = width;
        self.world_height = height;
        self
    }

    #[must_use]
    pub fn with_bounds_margin(mut self, margin: f32) -> Self {
        self.bounds_margin = margin;
        self
    }

    #[must_use]
    pub fn with_max_speed(mut self, max_speed: f32) -> Self {
        self.max_speed = max_speed;
        self
    }

    #[must_use]
    pub fn with_script_recoveries(mut self, per_sec: u32) -> Self {
        self.max_script_recoveries_per_sec = per_sec;
        self
    }

    pub fn fixed_delta(&self) -> Duration {
        let secs = self
            .fixed_delta_secs
            .max(MIN_FIXED_DELTA_SECS)
            .min(MAX_FIXED_DELTA_SECS);
        Duration::from_secs_f64(secs)
    }
}

/// A property that could not be applied while loading presets.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{file}: preset {preset:?}, property {property}: {message}")]
pub struct ConfigError {
    pub file: String,
    pub preset: String,
    pub property: String,
    pub message: String,
}

/// Outcome of loading a preset file. Property errors do not stop the load.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub errors: Vec<ConfigError>,
}

impl LoadReport {
    pub(crate) fn push(&mut self, error: ConfigError) {
        log::warn!("{error}");
        self.errors.push(error);
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
