//! Monotonic crafting clock.
//!
//! A single accumulating counter advanced by real elapsed time on every tick,
//! whether or not any station is being looked at. Stations store absolute
//! readings of it, so progress survives both unobserved stretches and a
//! save/reload as long as the accumulated value is saved alongside them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Shared game clock, in seconds. Cheap to share behind an `Arc`.
#[derive(Debug, Default)]
pub struct GameClock {
    // f64 seconds stored as raw bits
    elapsed_bits: AtomicU64,
}

impl GameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds accumulated so far
    pub fn now(&self) -> f64 {
        f64::from_bits(self.elapsed_bits.load(Ordering::Acquire))
    }

    /// Advance by the real time that passed since the previous tick
    pub fn advance(&self, elapsed: Duration) {
        self.advance_secs(elapsed.as_secs_f64());
    }

    pub fn advance_secs(&self, seconds: f64) {
        if !seconds.is_finite() || seconds <= 0.0 {
            return;
        }
        let _ = self
            .elapsed_bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f64::from_bits(bits) + seconds).to_bits())
            });
    }

    pub fn capture_state(&self) -> f64 {
        self.now()
    }

    /// Continue accumulating from a saved reading
    pub fn restore_state(&self, seconds: f64) {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        self.elapsed_bits.store(seconds.to_bits(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_accumulates() {
        let clock = GameClock::new();
        assert_eq!(clock.now(), 0.0);

        clock.advance(Duration::from_millis(500));
        clock.advance(Duration::from_millis(250));
        assert!((clock.now() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_advance_ignores_bad_deltas() {
        let clock = GameClock::new();
        clock.restore_state(3.0);
        clock.advance_secs(-1.0);
        clock.advance_secs(f64::NAN);
        assert_eq!(clock.now(), 3.0);
    }

    #[test]
    fn test_restore_continues_from_saved_value() {
        let clock = GameClock::new();
        clock.advance_secs(12.5);
        let saved = clock.capture_state();

        let reloaded = GameClock::new();
        reloaded.restore_state(saved);
        reloaded.advance_secs(1.5);
        assert!((reloaded.now() - 14.0).abs() < 1e-9);
    }
}
