//! Binding-independent subscription state machine, tracker lifecycle, and
//! receive-handler scope management shared by every event facade.

use std::cell::Cell;
use std::sync::{Arc, Mutex};

use crate::binding::{BindingError, EventBindingBase, SubscriptionState};
use crate::config::Config;
use crate::error::{ProxyError, ProxyResult};
use crate::invariants::debug_assert_no_binding_call_on_conflict;
use crate::scope::{Scope, ScopedReceiveHandler};
use crate::tracker::SampleReferenceTracker;

thread_local! {
    /// Set for the duration of a user-provided receive handler invocation.
    /// Lets `Unsubscribe`/`UnsetReceiveHandler` called from inside the handler
    /// skip expiring their own scope, which would otherwise deadlock waiting
    /// for themselves to return.
    static IS_IN_RECEIVE_HANDLER: Cell<bool> = const { Cell::new(false) };
}

/// Binding-independent core shared by [`crate::proxy_event::ProxyEvent`],
/// `ProxyField`, and `GenericProxyEvent`.
pub struct ProxyEventBase {
    event_name: String,
    binding_base: Option<Arc<dyn EventBindingBase>>,
    tracker: Arc<SampleReferenceTracker>,
    max_sample_count: Mutex<Option<usize>>,
    receive_handler: Mutex<Option<Arc<ScopedReceiveHandler>>>,
}

impl ProxyEventBase {
    /// Constructs the base with a valid binding.
    pub fn new(
        binding_base: Arc<dyn EventBindingBase>,
        event_name: impl Into<String>,
        config: Config,
    ) -> Self {
        Self {
            event_name: event_name.into(),
            binding_base: Some(binding_base),
            tracker: SampleReferenceTracker::new(config),
            max_sample_count: Mutex::new(None),
            receive_handler: Mutex::new(None),
        }
    }

    /// Constructs a base whose binding could not be built; every operation
    /// other than `is_binding_valid`/`get_subscription_state` is a contract
    /// violation to call on it.
    pub fn new_invalid(event_name: impl Into<String>, config: Config) -> Self {
        Self {
            event_name: event_name.into(),
            binding_base: None,
            tracker: SampleReferenceTracker::new(config),
            max_sample_count: Mutex::new(None),
            receive_handler: Mutex::new(None),
        }
    }

    pub fn is_binding_valid(&self) -> bool {
        self.binding_base.is_some()
    }

    fn binding(&self) -> &Arc<dyn EventBindingBase> {
        self.binding_base
            .as_ref()
            .expect("operation called on a proxy event with an invalid binding")
    }

    pub(crate) fn tracker(&self) -> &Arc<SampleReferenceTracker> {
        &self.tracker
    }

    pub(crate) fn event_name(&self) -> &str {
        &self.event_name
    }

    /// `n >= 1` is required but not enforced here, mirroring the binding
    /// contract this core delegates to.
    pub fn subscribe(&self, max_sample_count: usize) -> ProxyResult<()> {
        let span = tracing::debug_span!(
            "proxy_event_subscribe",
            event = %self.event_name,
            max_sample_count
        );
        let _entered = span.enter();

        let mut current = self.max_sample_count.lock().unwrap();
        if let Some(existing) = *current {
            if existing == max_sample_count {
                return Ok(());
            }
            tracing::debug!(
                event = %self.event_name,
                existing,
                requested = max_sample_count,
                "conflicting max_sample_count on re-subscribe"
            );
            debug_assert_no_binding_call_on_conflict!(false);
            return Err(ProxyError::MaxSampleCountNotRealizable);
        }

        match self.binding().subscribe(max_sample_count) {
            Ok(()) => {
                self.tracker.reset(max_sample_count);
                *current = Some(max_sample_count);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(event = %self.event_name, ?err, "binding Subscribe failed");
                Err(ProxyError::BindingFailure)
            }
        }
    }

    /// Expires the receive-handler scope first (unless called from inside the
    /// handler), then asks the binding to unsubscribe. Aborts the process if
    /// any sample is still held.
    pub fn unsubscribe(&self) {
        let span = tracing::debug_span!("proxy_event_unsubscribe", event = %self.event_name);
        let _entered = span.enter();

        self.expire_receive_handler_scope_if_not_in_handler();

        if self.tracker.is_used() {
            tracing::error!(
                event = %self.event_name,
                "still holding sample, terminating."
            );
            panic!(
                "proxy event '{}' still holding sample, terminating.",
                self.event_name
            );
        }

        if self.binding_base.is_some() {
            self.binding().unsubscribe();
        }
        *self.max_sample_count.lock().unwrap() = None;
    }

    pub fn get_subscription_state(&self) -> SubscriptionState {
        match &self.binding_base {
            Some(binding) => binding.get_subscription_state(),
            None => SubscriptionState::NotSubscribed,
        }
    }

    pub fn get_free_sample_count(&self) -> usize {
        self.tracker.get_num_available_samples()
    }

    pub fn get_num_new_samples_available(&self) -> ProxyResult<usize> {
        match self.binding().get_num_new_samples_available() {
            Ok(n) => Ok(n),
            Err(BindingError::NotSubscribed) => Err(ProxyError::NotSubscribed),
            Err(err) => {
                tracing::warn!(event = %self.event_name, ?err, "binding GetNumNewSamplesAvailable failed");
                Err(ProxyError::BindingFailure)
            }
        }
    }

    /// Must not be called from inside the current handler invocation; this
    /// precondition is documented, not runtime-enforced, matching the
    /// binding contract this delegates to.
    pub fn set_receive_handler(
        &self,
        handler: impl FnMut() + Send + 'static,
    ) -> ProxyResult<()> {
        tracing::debug!(event = %self.event_name, "setting receive handler");

        let scope = Scope::new();
        let event_name = self.event_name.clone();
        let mut handler = handler;
        let wrapped: Box<dyn FnMut() + Send> = Box::new(move || {
            IS_IN_RECEIVE_HANDLER.with(|flag| flag.set(true));
            let span = tracing::debug_span!("proxy_event_receive_handler", event = %event_name);
            let _entered = span.enter();
            handler();
            IS_IN_RECEIVE_HANDLER.with(|flag| flag.set(false));
        });
        let scoped_handler = Arc::new(ScopedReceiveHandler::new(scope, wrapped));
        let weak = Arc::downgrade(&scoped_handler);

        match self.binding().set_receive_handler(weak) {
            Ok(()) => {
                let mut current = self.receive_handler.lock().unwrap();
                if let Some(previous) = current.take() {
                    previous.scope().expire();
                }
                *current = Some(scoped_handler);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(event = %self.event_name, ?err, "binding SetReceiveHandler failed");
                Err(ProxyError::SetHandlerNotSet)
            }
        }
    }

    /// No-ops if no handler is currently set.
    pub fn unset_receive_handler(&self) -> ProxyResult<()> {
        let in_handler = IS_IN_RECEIVE_HANDLER.with(|flag| flag.get());
        let previous = self.receive_handler.lock().unwrap().take();
        let Some(handler) = previous else {
            return Ok(());
        };
        if !in_handler {
            handler.scope().expire();
        }

        match self.binding().unset_receive_handler() {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(event = %self.event_name, ?err, "binding UnsetReceiveHandler failed");
                Err(ProxyError::UnsetFailure)
            }
        }
    }

    fn expire_receive_handler_scope_if_not_in_handler(&self) {
        if IS_IN_RECEIVE_HANDLER.with(|flag| flag.get()) {
            return;
        }
        if let Some(handler) = self.receive_handler.lock().unwrap().take() {
            handler.scope().expire();
        }
    }
}

impl Drop for ProxyEventBase {
    /// Destroying a facade while samples are held is a fatal liveness
    /// violation, never a recoverable error.
    fn drop(&mut self) {
        if self.tracker.is_used() && !std::thread::panicking() {
            tracing::error!(
                event = %self.event_name,
                "still holding sample, terminating."
            );
            panic!(
                "proxy event '{}' still holding sample, terminating.",
                self.event_name
            );
        }
    }
}
