//! Debug-only invariant assertions, compiled out in release builds.

/// INV-TRK-01: tracker's available count never exceeds its max.
macro_rules! debug_assert_available_bounded {
    ($available:expr, $max:expr) => {
        debug_assert!(
            $available <= $max,
            "tracker available ({}) exceeds max ({})",
            $available,
            $max
        );
    };
}

/// INV-TRK-02: a guard factory never holds more references than it requested.
macro_rules! debug_assert_factory_bounded {
    ($held:expr, $requested:expr) => {
        debug_assert!(
            $held <= $requested,
            "guard factory holds {} references but only {} were requested",
            $held,
            $requested
        );
    };
}

/// INV-SUB-01: subscribing with a conflicting max sample count must not reach the binding.
macro_rules! debug_assert_no_binding_call_on_conflict {
    ($called:expr) => {
        debug_assert!(
            !$called,
            "binding Subscribe was called despite a max_sample_count conflict"
        );
    };
}

pub(crate) use debug_assert_available_bounded;
pub(crate) use debug_assert_factory_bounded;
pub(crate) use debug_assert_no_binding_call_on_conflict;
