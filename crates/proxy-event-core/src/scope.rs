//! A callable whose invocation is gated on a synchronously-expirable scope.
//!
//! This reworks the shape of the teacher's async shutdown-signalling types
//! (`ShutdownState`/`ShutdownHandle`/`ShutdownSignal`, built on
//! `tokio::sync::Notify`) into a purely synchronous equivalent: the core must
//! not require an executor, so `Scope::expire` blocks on a `Condvar` instead
//! of awaiting a notification.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// A synchronization object bounding the lifetime of a callable invocation.
///
/// Only one thread may expire a scope. Expiring is idempotent: calling it
/// again after expiry returns immediately, and every subsequent `enter`
/// becomes a no-op.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    expired: AtomicBool,
    in_flight: Mutex<u64>,
    cvar: Condvar,
}

impl Scope {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                expired: AtomicBool::new(false),
                in_flight: Mutex::new(0),
                cvar: Condvar::new(),
            }),
        }
    }

    /// Attempts to enter the scope for one invocation. Returns `None` if the
    /// scope has already been expired.
    fn enter(&self) -> Option<ScopeEntry<'_>> {
        if self.inner.expired.load(Ordering::Acquire) {
            return None;
        }
        let mut in_flight = self.inner.in_flight.lock().unwrap();
        if self.inner.expired.load(Ordering::Acquire) {
            return None;
        }
        *in_flight += 1;
        Some(ScopeEntry { inner: &self.inner })
    }

    /// Marks the scope expired and blocks until any in-flight invocation
    /// returns. Synchronizes-with the return of every invocation issued
    /// before this call.
    pub fn expire(&self) {
        self.inner.expired.store(true, Ordering::Release);
        let guard = self.inner.in_flight.lock().unwrap();
        let _guard = self
            .inner
            .cvar
            .wait_while(guard, |count| *count > 0)
            .unwrap();
    }

    /// `true` once `expire` has been called, even if an invocation is still
    /// draining.
    pub fn is_expired(&self) -> bool {
        self.inner.expired.load(Ordering::Acquire)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

struct ScopeEntry<'a> {
    inner: &'a ScopeInner,
}

impl Drop for ScopeEntry<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.inner.in_flight.lock().unwrap();
        debug_assert!(*in_flight > 0, "scope entry dropped with no in-flight invocation recorded");
        *in_flight -= 1;
        if *in_flight == 0 {
            self.inner.cvar.notify_all();
        }
    }
}

/// A user-provided receive-handler callback wrapped in a [`Scope`].
///
/// Invoking it is a no-op once the scope has been expired; an invocation
/// already in flight when `expire` is called is allowed to finish.
pub struct ScopedReceiveHandler {
    scope: Scope,
    callback: Mutex<Box<dyn FnMut() + Send>>,
}

impl ScopedReceiveHandler {
    pub fn new(scope: Scope, callback: Box<dyn FnMut() + Send>) -> Self {
        Self {
            scope,
            callback: Mutex::new(callback),
        }
    }

    /// Invokes the wrapped callback iff the scope is still live.
    pub fn invoke(&self) {
        if let Some(_entry) = self.scope.enter() {
            let mut callback = self.callback.lock().unwrap();
            (callback)();
        }
    }

    /// The scope gating this handler, for callers that need to expire it directly.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn invoke_runs_callback_while_scope_live() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = Arc::clone(&calls);
        let handler = Arc::new(ScopedReceiveHandler::new(
            Scope::new(),
            Box::new(move || {
                calls2.fetch_add(1, Ordering::SeqCst);
            }),
        ));
        handler.invoke();
        handler.invoke();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn invoke_is_noop_after_expire() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = Arc::clone(&calls);
        let handler = ScopedReceiveHandler::new(
            Scope::new(),
            Box::new(move || {
                calls2.fetch_add(1, Ordering::SeqCst);
            }),
        );
        handler.scope().expire();
        handler.invoke();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn expire_blocks_until_in_flight_invocation_returns() {
        let scope = Scope::new();
        let handler = Arc::new(ScopedReceiveHandler::new(
            scope.clone(),
            Box::new(|| thread::sleep(Duration::from_millis(50))),
        ));

        let handler2 = Arc::clone(&handler);
        let invoker = thread::spawn(move || handler2.invoke());

        // Give the invocation a chance to enter the scope before we expire it.
        thread::sleep(Duration::from_millis(10));
        let start = std::time::Instant::now();
        scope.expire();
        assert!(start.elapsed() >= Duration::from_millis(30));

        invoker.join().unwrap();
    }
}
