//! Atomic, bounded reservation budget for outstanding sample handles.
//!
//! [`SampleReferenceTracker`] holds `available <= max` references. `allocate`
//! reserves up to `requested` of them via a CAS retry loop and hands the
//! caller a [`TrackerGuardFactory`], which in turn doles out individual
//! [`Guard`]s. Dropping a guard or a factory with unissued guards returns the
//! corresponding count to the tracker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;

use crate::backoff::Backoff;
use crate::config::Config;
use crate::invariants::{debug_assert_available_bounded, debug_assert_factory_bounded};

/// Bounded, lock-free reservation budget shared by one event facade.
///
/// `available` and `max` sit on separate cache lines: `available` is written
/// on every `allocate`/`deallocate`, `max` only on `reset`, and a proxy event
/// typically has one producer-side binding and one consumer polling loop
/// hammering `available` from different cores.
#[derive(Debug)]
pub struct SampleReferenceTracker {
    available: CachePadded<AtomicUsize>,
    max: CachePadded<AtomicUsize>,
    config: Config,
}

impl SampleReferenceTracker {
    /// Creates a tracker with `available == max == 0`; call [`Self::reset`]
    /// before the first `allocate`.
    pub fn new(config: Config) -> Arc<Self> {
        Arc::new(Self {
            available: CachePadded::new(AtomicUsize::new(0)),
            max: CachePadded::new(AtomicUsize::new(0)),
            config,
        })
    }

    /// Sets both `available` and `max` to `max`.
    ///
    /// Caller must guarantee no guards or factories are outstanding; this is
    /// a contract precondition, not runtime-checked.
    pub fn reset(&self, max: usize) {
        self.max.store(max, Ordering::Relaxed);
        self.available.store(max, Ordering::Release);
    }

    /// Relaxed snapshot of the number of references currently available.
    pub fn get_num_available_samples(&self) -> usize {
        self.available.load(Ordering::Relaxed)
    }

    /// `true` iff fewer references are available than `max`.
    pub fn is_used(&self) -> bool {
        self.available.load(Ordering::Relaxed) < self.max.load(Ordering::Relaxed)
    }

    /// Reserves up to `requested` references, returning a factory that holds
    /// exactly the number actually obtained. Never spins indefinitely: if the
    /// budget is contended down to zero, returns an empty factory immediately.
    pub fn allocate(self: &Arc<Self>, requested: usize) -> TrackerGuardFactory {
        if requested == 0 {
            return TrackerGuardFactory {
                tracker: Arc::clone(self),
                held: 0,
            };
        }

        let mut backoff = Backoff::with_limits(
            self.config.allocate_spin_limit,
            self.config.allocate_yield_limit,
        );
        let mut current = self.available.load(Ordering::Acquire);
        loop {
            let take = current.min(requested);
            if take == 0 {
                return TrackerGuardFactory {
                    tracker: Arc::clone(self),
                    held: 0,
                };
            }
            let new_value = current - take;
            match self.available.compare_exchange_weak(
                current,
                new_value,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    debug_assert_factory_bounded!(take, requested);
                    return TrackerGuardFactory {
                        tracker: Arc::clone(self),
                        held: take,
                    }
                }
                Err(actual) => {
                    current = actual;
                    backoff.snooze();
                }
            }
        }
    }

    fn deallocate(&self, n: usize) {
        if n == 0 {
            return;
        }
        let previous = self.available.fetch_add(n, Ordering::AcqRel);
        let max = self.max.load(Ordering::Relaxed);
        debug_assert_available_bounded!(previous + n, max);
    }
}

/// A short-lived reservation of `held` references, issued one at a time as
/// [`Guard`]s. Dropping the factory returns any still-unissued count.
#[derive(Debug)]
pub struct TrackerGuardFactory {
    tracker: Arc<SampleReferenceTracker>,
    held: usize,
}

impl TrackerGuardFactory {
    /// Number of references held by this factory that have not yet been
    /// taken as individual guards.
    pub fn get_num_available_guards(&self) -> usize {
        self.held
    }

    /// Returns one guard and decrements the held count, or `None` if empty.
    pub fn take_guard(&mut self) -> Option<Guard> {
        if self.held == 0 {
            return None;
        }
        self.held -= 1;
        Some(Guard {
            tracker: Some(Arc::clone(&self.tracker)),
        })
    }
}

impl Drop for TrackerGuardFactory {
    fn drop(&mut self) {
        if self.held > 0 {
            self.tracker.deallocate(self.held);
            self.held = 0;
        }
    }
}

/// A single reserved unit of a subscription's sample budget.
///
/// Not copyable. A guard that has been moved out of is inert: Rust's move
/// semantics make the source binding permanently inaccessible, so there is
/// no separate "moved-from" state to model.
#[derive(Debug)]
pub struct Guard {
    tracker: Option<Arc<SampleReferenceTracker>>,
}

impl Drop for Guard {
    fn drop(&mut self) {
        if let Some(tracker) = self.tracker.take() {
            tracker.deallocate(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reset_then_allocate_respects_max() {
        let tracker = SampleReferenceTracker::new(Config::default());
        tracker.reset(4);
        assert_eq!(tracker.get_num_available_samples(), 4);
        assert!(!tracker.is_used());

        let factory = tracker.allocate(4);
        assert_eq!(factory.get_num_available_guards(), 4);
        assert_eq!(tracker.get_num_available_samples(), 0);
        assert!(tracker.is_used());
    }

    #[test]
    fn allocate_zero_returns_empty_factory() {
        let tracker = SampleReferenceTracker::new(Config::default());
        tracker.reset(4);
        let mut factory = tracker.allocate(0);
        assert_eq!(factory.get_num_available_guards(), 0);
        assert!(factory.take_guard().is_none());
    }

    #[test]
    fn allocate_more_than_max_caps_at_max() {
        let tracker = SampleReferenceTracker::new(Config::default());
        tracker.reset(2);
        let factory = tracker.allocate(10);
        assert_eq!(factory.get_num_available_guards(), 2);
    }

    #[test]
    fn dropping_factory_returns_unissued_guards() {
        let tracker = SampleReferenceTracker::new(Config::default());
        tracker.reset(3);
        {
            let mut factory = tracker.allocate(3);
            let _g = factory.take_guard().unwrap();
            // two references remain unissued in the factory
        }
        assert_eq!(tracker.get_num_available_samples(), 2);
    }

    #[test]
    fn dropping_guard_returns_exactly_one_reference() {
        let tracker = SampleReferenceTracker::new(Config::default());
        tracker.reset(1);
        let mut factory = tracker.allocate(1);
        let guard = factory.take_guard().unwrap();
        assert_eq!(tracker.get_num_available_samples(), 0);
        drop(guard);
        assert_eq!(tracker.get_num_available_samples(), 1);
        assert!(!tracker.is_used());
    }

    #[test]
    fn reset_after_full_round_trip_restores_available() {
        let tracker = SampleReferenceTracker::new(Config::default());
        tracker.reset(5);
        {
            let _factory = tracker.allocate(5);
        }
        assert_eq!(tracker.get_num_available_samples(), 5);
    }

    #[test]
    fn concurrent_allocate_conserves_total() {
        use std::thread;

        let tracker = SampleReferenceTracker::new(Config::default());
        tracker.reset(100);

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    let factory = tracker.allocate(7);
                    factory.get_num_available_guards()
                })
            })
            .collect();

        let total_allocated: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total_allocated + tracker.get_num_available_samples(), 100);
    }

    proptest::proptest! {
        #[test]
        fn available_never_exceeds_max(max in 0usize..64, requests in proptest::collection::vec(0usize..16, 0..32)) {
            let tracker = SampleReferenceTracker::new(Config::default());
            tracker.reset(max);
            let mut factories = Vec::new();
            for r in requests {
                let factory = tracker.allocate(r);
                let held = factory.get_num_available_guards();
                prop_assert!(held <= r);
                prop_assert!(held <= max);
                factories.push(factory);
            }
            prop_assert!(tracker.get_num_available_samples() <= max);
            drop(factories);
            prop_assert_eq!(tracker.get_num_available_samples(), max);
        }
    }
}
