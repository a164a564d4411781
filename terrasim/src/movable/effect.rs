use std::f32::consts::TAU;

/// Full-screen glow drawn over an object. Carried and copied with the object,
/// never consulted by physics.
#[derive(Clone, Debug, PartialEq)]
pub struct ScreenEffect {
    /// Image the overlay is drawn from. `None` when the object has no effect.
    pub file: Option<String>,
    pub start_time_ms: u64,
    /// When the effect stops, in ms of the object's age. Zero means "use the lifetime".
    pub stop_time_ms: u64,
    pub start_strength: u8,
    pub stop_strength: u8,
    pub rot_angle: f32,
    pub inherit_rot_angle: bool,
    pub randomize_rot_angle: bool,
    pub randomize_rot_angle_every_frame: bool,
    pub always_shows: bool,
}

impl Default for ScreenEffect {
    fn default() -> Self {
        Self {
            file: None,
            start_time_ms: 0,
            stop_time_ms: 0,
            start_strength: 128,
            stop_strength: 128,
            rot_angle: 0.0,
            inherit_rot_angle: false,
            randomize_rot_angle: false,
            randomize_rot_angle_every_frame: false,
            always_shows: false,
        }
    }
}

impl ScreenEffect {
    /// Convert a 0..=1 fraction into a stored strength.
    pub fn strength_from_fraction(fraction: f32) -> u8 {
        (255.0 * fraction).floor().clamp(0.0, 255.0) as u8
    }

    pub fn randomize_rotation(&mut self) {
        self.rot_angle = TAU * fastrand::f32();
    }

    /// Stop time falls back to the owner's lifetime when unset.
    pub(crate) fn settle_stop_time(&mut self, lifetime_ms: u64) {
        if self.stop_time_ms == 0 {
            self.stop_time_ms = lifetime_ms;
        }
    }

    /// Per-frame update.
    pub(super) fn tick(&mut self) {
        if self.randomize_rot_angle_every_frame {
            self.randomize_rotation();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_is_floored() {
        assert_eq!(ScreenEffect::strength_from_fraction(0.5), 127);
        assert_eq!(ScreenEffect::strength_from_fraction(1.0), 255);
        assert_eq!(ScreenEffect::strength_from_fraction(2.0), 255);
    }

    #[test]
    fn random_rotation_stays_in_a_turn() {
        let mut effect = ScreenEffect::default();
        for _ in 0..32 {
            effect.randomize_rotation();
            assert!((0.0..=TAU).contains(&effect.rot_angle));
        }
    }

    #[test]
    fn stop_time_defaults_to_lifetime() {
        let mut effect = ScreenEffect::default();
        effect.settle_stop_time(750);
        assert_eq!(effect.stop_time_ms, 750);

        effect.stop_time_ms = 100;
        effect.settle_stop_time(750);
        assert_eq!(effect.stop_time_ms, 100);
    }
}
