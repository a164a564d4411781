//! Simulated time.
//!
//! Every timer in the simulation measures simulated time, never wall-clock time.
//! The clock only moves when the simulation steps it.

use std::time::Duration;

/// Simulation clock advanced once per tick by the fixed timestep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimClock {
    elapsed: Duration,
    delta: Duration,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance simulated time by `delta`, which becomes the current tick's delta.
    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.elapsed += delta;
    }

    /// Total simulated time since the clock was created.
    pub fn now(&self) -> Duration {
        self.elapsed
    }

    /// Length of the current tick.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }
}

/// Stopwatch over simulated time, with an optional limit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimTimer {
    start: Duration,
    limit: Option<Duration>,
}

impl SimTimer {
    /// A timer started at the clock's current time.
    pub fn started(clock: &SimClock) -> Self {
        Self {
            start: clock.now(),
            limit: None,
        }
    }

    pub fn reset(&mut self, clock: &SimClock) {
        self.start = clock.now();
    }

    pub fn elapsed(&self, clock: &SimClock) -> Duration {
        clock.now().saturating_sub(self.start)
    }

    pub fn elapsed_ms(&self, clock: &SimClock) -> f64 {
        self.elapsed(clock).as_secs_f64() * 1000.0
    }

    /// True once strictly more than `ms` milliseconds have elapsed.
    pub fn is_past_ms(&self, clock: &SimClock, ms: f64) -> bool {
        self.elapsed_ms(clock) > ms
    }

    pub fn set_limit(&mut self, limit: Option<Duration>) {
        self.limit = limit;
    }

    /// True when a limit is set and elapsed time has exceeded it.
    pub fn is_past_limit(&self, clock: &SimClock) -> bool {
        self.limit
            .map(|limit| self.elapsed(clock) > limit)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_measures_from_reset() {
        let mut clock = SimClock::new();
        clock.advance(Duration::from_millis(250));
        let mut timer = SimTimer::started(&clock);

        clock.advance(Duration::from_millis(100));
        assert_eq!(timer.elapsed(&clock), Duration::from_millis(100));

        timer.reset(&clock);
        assert_eq!(timer.elapsed(&clock), Duration::ZERO);
    }

    #[test]
    fn past_is_strict() {
        let mut clock = SimClock::new();
        let timer = SimTimer::started(&clock);
        clock.advance(Duration::from_millis(500));
        assert!(!timer.is_past_ms(&clock, 500.0));
        clock.advance(Duration::from_millis(1));
        assert!(timer.is_past_ms(&clock, 500.0));
    }

    #[test]
    fn limit_expires() {
        let mut clock = SimClock::new();
        let mut timer = SimTimer::started(&clock);
        assert!(!timer.is_past_limit(&clock));

        timer.set_limit(Some(Duration::from_millis(40)));
        clock.advance(Duration::from_millis(41));
        assert!(timer.is_past_limit(&clock));
    }
}
