use std::hint;
use std::thread;

/// Adaptive backoff strategy (Crossbeam-style).
///
/// Progressively increases wait time: spin with PAUSE → yield to OS → give up.
/// Used by the tracker's CAS retry loop so heavily contended `Allocate` calls
/// degrade to thread yields instead of burning a core.
#[derive(Debug)]
pub struct Backoff {
    step: u32,
    spin_limit: u32,
    yield_limit: u32,
}

impl Backoff {
    /// Creates a new backoff instance using the given limits.
    #[inline]
    pub fn with_limits(spin_limit: u32, yield_limit: u32) -> Self {
        Self {
            step: 0,
            spin_limit,
            yield_limit,
        }
    }

    /// Light spin with PAUSE hints.
    #[inline]
    pub fn spin(&mut self) {
        let spins = 1u32 << self.step.min(self.spin_limit);
        for _ in 0..spins {
            hint::spin_loop();
        }
        if self.step <= self.spin_limit {
            self.step += 1;
        }
    }

    /// Heavier backoff: spin then yield.
    #[inline]
    pub fn snooze(&mut self) {
        if self.step <= self.spin_limit {
            self.spin();
        } else {
            thread::yield_now();
            if self.step <= self.yield_limit {
                self.step += 1;
            }
        }
    }

    /// Check if we've exhausted patience.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.step > self.yield_limit
    }

    /// Reset for next wait cycle.
    #[inline]
    pub fn reset(&mut self) {
        self.step = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_progression() {
        let mut b = Backoff::with_limits(6, 10);

        assert_eq!(b.step, 0);

        b.spin();
        assert!(b.step > 0);

        while !b.is_completed() {
            b.snooze();
        }
        assert!(b.step > 10);

        b.reset();
        assert_eq!(b.step, 0);
    }
}
