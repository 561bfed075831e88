//! Tunable defaults for the proxy event core.
//!
//! None of this is part of the wire contract between proxy and binding; it
//! only governs local spin/yield behavior on the consumer side.

/// Configuration for the tracker's CAS retry loop.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Number of CAS-retry iterations to spend spinning before yielding.
    pub allocate_spin_limit: u32,
    /// Number of additional iterations to spend yielding before reporting
    /// whatever partial allocation was obtained.
    pub allocate_yield_limit: u32,
}

impl Config {
    /// Builds a `Config`, validating the limits at compile time where possible.
    ///
    /// # Panics
    ///
    /// Panics if `allocate_spin_limit` is zero or greater than 10.
    pub const fn new(allocate_spin_limit: u32, allocate_yield_limit: u32) -> Self {
        assert!(allocate_spin_limit >= 1 && allocate_spin_limit <= 10);
        Self {
            allocate_spin_limit,
            allocate_yield_limit,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(6, 10)
    }
}

/// Preset favoring latency over throughput: gives up spinning sooner.
pub const LOW_LATENCY_CONFIG: Config = Config::new(3, 4);

/// Preset favoring throughput under heavy contention: spins longer before yielding.
pub const HIGH_CONTENTION_CONFIG: Config = Config::new(8, 16);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_within_bounds() {
        let cfg = Config::default();
        assert!(cfg.allocate_spin_limit >= 1 && cfg.allocate_spin_limit <= 10);
    }

    #[test]
    #[should_panic]
    fn rejects_zero_spin_limit() {
        let _ = Config::new(0, 4);
    }
}
