use std::cell::Cell;
use std::time::Instant;

/// Source of the session's playback position.
pub trait ClockSource {
    /// Current position in milliseconds. Negative during pre-roll.
    fn now_ms(&self) -> f64;
}

impl<T: ClockSource + ?Sized> ClockSource for &T {
    fn now_ms(&self) -> f64 {
        (**self).now_ms()
    }
}

/// Wall clock driven playback position.
pub struct Conductor {
    timer: Option<Instant>,
    pre_roll_ms: f64,
}

impl Conductor {
    pub fn new(pre_roll_ms: f64) -> Self {
        Self {
            timer: None,
            pre_roll_ms: pre_roll_ms.max(0.0),
        }
    }

    pub fn start(&mut self) {
        log::debug!("Conductor started with {}ms pre-roll", self.pre_roll_ms);
        self.timer = Some(Instant::now());
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }
}

impl ClockSource for Conductor {
    fn now_ms(&self) -> f64 {
        let elapsed = self
            .timer
            .as_ref()
            .map_or(0.0, |timer| timer.elapsed().as_secs_f64() * 1000.0);

        elapsed - self.pre_roll_ms
    }
}

/// A clock that only moves when told to. Used for fixed-step simulation and
/// for scripting time in tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: f64) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.now.set(self.now.get() + delta_ms);
    }
}

impl ClockSource for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_on_request() {
        let clock = ManualClock::new(-1000.0);
        assert_eq!(clock.now_ms(), -1000.0);

        clock.advance(250.0);
        assert_eq!((&clock).now_ms(), -750.0);

        clock.set(42.0);
        assert_eq!(clock.now_ms(), 42.0);
    }

    #[test]
    fn conductor_starts_in_pre_roll() {
        let mut conductor = Conductor::new(60_000.0);
        assert!(!conductor.is_running());
        assert_eq!(conductor.now_ms(), -60_000.0);

        conductor.start();
        assert!(conductor.is_running());
        let now = conductor.now_ms();
        assert!(now >= -60_000.0 && now < 0.0);
    }
}
