//! Reference in-process [`EventBinding`]/[`GenericEventBinding`] implementation.
//!
//! Backs each event with a plain FIFO queue guarded by a mutex rather than a
//! shared-memory ring; delivered samples are retained for the lifetime of the
//! binding rather than reclaimed, since this crate exists for tests and demos,
//! not for production resource pressure.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use proxy_event_core::{
    BindingError, BindingType, EventBinding, EventBindingBase, GenericEventBinding,
    OpaqueSamplePtr, SamplePtr, ScopedReceiveHandler, SubscriptionState, TrackerGuardFactory,
};

/// State shared by the typed and generic mock bindings: subscription status,
/// the negotiated sample budget, and the registered receive handler.
struct SharedState {
    subscription: Mutex<SubscriptionState>,
    max_sample_count: Mutex<Option<u16>>,
    receive_handler: Mutex<Option<Weak<ScopedReceiveHandler>>>,
    trace_point_counter: AtomicU64,
}

impl SharedState {
    fn new() -> Self {
        Self {
            subscription: Mutex::new(SubscriptionState::NotSubscribed),
            max_sample_count: Mutex::new(None),
            receive_handler: Mutex::new(None),
            trace_point_counter: AtomicU64::new(0),
        }
    }

    fn subscribe(&self, max_sample_count: usize) -> Result<(), BindingError> {
        let capped = u16::try_from(max_sample_count).map_err(|_| {
            BindingError::Other(format!("max_sample_count {max_sample_count} exceeds u16"))
        })?;
        *self.max_sample_count.lock().unwrap() = Some(capped);
        *self.subscription.lock().unwrap() = SubscriptionState::Subscribed;
        Ok(())
    }

    fn unsubscribe(&self) {
        *self.subscription.lock().unwrap() = SubscriptionState::NotSubscribed;
        *self.max_sample_count.lock().unwrap() = None;
        *self.receive_handler.lock().unwrap() = None;
    }

    fn require_subscribed(&self) -> Result<(), BindingError> {
        match *self.subscription.lock().unwrap() {
            SubscriptionState::Subscribed => Ok(()),
            _ => Err(BindingError::NotSubscribed),
        }
    }

    fn notify_handler(&self) {
        if let Some(handler) = self
            .receive_handler
            .lock()
            .unwrap()
            .as_ref()
            .and_then(Weak::upgrade)
        {
            handler.invoke();
        }
    }

    fn next_trace_point(&self) -> u64 {
        self.trace_point_counter.fetch_add(1, Ordering::Relaxed)
    }
}

/// In-process binding for one statically-typed event.
pub struct MockEventBinding<T> {
    shared: SharedState,
    pending: Mutex<VecDeque<Box<T>>>,
    delivered: Mutex<Vec<Box<T>>>,
    _marker: PhantomData<T>,
}

impl<T: Send + Sync + 'static> MockEventBinding<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            shared: SharedState::new(),
            pending: Mutex::new(VecDeque::new()),
            delivered: Mutex::new(Vec::new()),
            _marker: PhantomData,
        })
    }

    /// Test/demo-only producer entry point: enqueues `value` and, if a
    /// receive handler is registered, invokes it synchronously.
    pub fn publish(&self, value: T) {
        self.pending.lock().unwrap().push_back(Box::new(value));
        self.shared.notify_handler();
    }

    /// Number of samples currently queued, irrespective of subscription state.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

impl<T: Send + Sync + 'static> EventBindingBase for MockEventBinding<T> {
    fn subscribe(&self, max_sample_count: usize) -> Result<(), BindingError> {
        self.shared.subscribe(max_sample_count)
    }

    fn unsubscribe(&self) {
        self.shared.unsubscribe();
        self.pending.lock().unwrap().clear();
        self.delivered.lock().unwrap().clear();
    }

    fn get_subscription_state(&self) -> SubscriptionState {
        *self.shared.subscription.lock().unwrap()
    }

    fn get_max_sample_count(&self) -> Option<u16> {
        *self.shared.max_sample_count.lock().unwrap()
    }

    fn get_num_new_samples_available(&self) -> Result<usize, BindingError> {
        self.shared.require_subscribed()?;
        Ok(self.pending.lock().unwrap().len())
    }

    fn set_receive_handler(
        &self,
        handler: Weak<ScopedReceiveHandler>,
    ) -> Result<(), BindingError> {
        *self.shared.receive_handler.lock().unwrap() = Some(handler);
        Ok(())
    }

    fn unset_receive_handler(&self) -> Result<(), BindingError> {
        *self.shared.receive_handler.lock().unwrap() = None;
        Ok(())
    }

    fn get_binding_type(&self) -> BindingType {
        BindingType::InProcess
    }

    fn notify_service_instance_changed_availability(&self, is_available: bool, new_source_pid: i32) {
        tracing::debug!(is_available, new_source_pid, "mock binding availability change");
    }
}

impl<T: Send + Sync + 'static> EventBinding<T> for MockEventBinding<T> {
    fn get_new_samples(
        &self,
        receiver: &mut dyn FnMut(SamplePtr<T>, u64),
        guard_factory: &mut TrackerGuardFactory,
    ) -> Result<usize, BindingError> {
        self.shared.require_subscribed()?;

        let mut pending = self.pending.lock().unwrap();
        let mut delivered = self.delivered.lock().unwrap();
        let mut count = 0;
        while guard_factory.get_num_available_guards() > 0 {
            let Some(boxed) = pending.pop_front() else {
                break;
            };
            let guard = guard_factory
                .take_guard()
                .expect("guard factory reported availability but take_guard returned None");
            let ptr = NonNull::from(boxed.as_ref());
            delivered.push(boxed);
            let trace_point_data_id = self.shared.next_trace_point();
            // Safety: `ptr` points into `delivered`, which this binding keeps
            // alive for its own lifetime; it outlives every guard it hands out.
            let sample = unsafe { SamplePtr::new(ptr, guard) };
            receiver(sample, trace_point_data_id);
            count += 1;
        }
        Ok(count)
    }
}

/// In-process binding for an event whose sample type is erased to bytes.
pub struct MockGenericEventBinding {
    shared: SharedState,
    sample_size: usize,
    has_serialized_format: bool,
    pending: Mutex<VecDeque<Vec<u8>>>,
    delivered: Mutex<Vec<Vec<u8>>>,
}

impl MockGenericEventBinding {
    pub fn new(sample_size: usize, has_serialized_format: bool) -> Arc<Self> {
        Arc::new(Self {
            shared: SharedState::new(),
            sample_size,
            has_serialized_format,
            pending: Mutex::new(VecDeque::new()),
            delivered: Mutex::new(Vec::new()),
        })
    }

    /// Test/demo-only producer entry point. `bytes.len()` must equal
    /// `sample_size`; this is a contract precondition, not runtime-checked
    /// beyond a debug assertion, mirroring the typed binding's lack of a
    /// shape check.
    pub fn publish_bytes(&self, bytes: Vec<u8>) {
        debug_assert_eq!(bytes.len(), self.sample_size);
        self.pending.lock().unwrap().push_back(bytes);
        self.shared.notify_handler();
    }
}

impl EventBindingBase for MockGenericEventBinding {
    fn subscribe(&self, max_sample_count: usize) -> Result<(), BindingError> {
        self.shared.subscribe(max_sample_count)
    }

    fn unsubscribe(&self) {
        self.shared.unsubscribe();
        self.pending.lock().unwrap().clear();
        self.delivered.lock().unwrap().clear();
    }

    fn get_subscription_state(&self) -> SubscriptionState {
        *self.shared.subscription.lock().unwrap()
    }

    fn get_max_sample_count(&self) -> Option<u16> {
        *self.shared.max_sample_count.lock().unwrap()
    }

    fn get_num_new_samples_available(&self) -> Result<usize, BindingError> {
        self.shared.require_subscribed()?;
        Ok(self.pending.lock().unwrap().len())
    }

    fn set_receive_handler(
        &self,
        handler: Weak<ScopedReceiveHandler>,
    ) -> Result<(), BindingError> {
        *self.shared.receive_handler.lock().unwrap() = Some(handler);
        Ok(())
    }

    fn unset_receive_handler(&self) -> Result<(), BindingError> {
        *self.shared.receive_handler.lock().unwrap() = None;
        Ok(())
    }

    fn get_binding_type(&self) -> BindingType {
        BindingType::InProcess
    }

    fn notify_service_instance_changed_availability(&self, is_available: bool, new_source_pid: i32) {
        tracing::debug!(is_available, new_source_pid, "mock binding availability change");
    }
}

impl GenericEventBinding for MockGenericEventBinding {
    fn get_sample_size(&self) -> usize {
        self.sample_size
    }

    fn has_serialized_format(&self) -> bool {
        self.has_serialized_format
    }

    fn get_new_samples_generic(
        &self,
        receiver: &mut dyn FnMut(OpaqueSamplePtr, u64),
        guard_factory: &mut TrackerGuardFactory,
    ) -> Result<usize, BindingError> {
        self.shared.require_subscribed()?;

        let mut pending = self.pending.lock().unwrap();
        let mut delivered = self.delivered.lock().unwrap();
        let mut count = 0;
        while guard_factory.get_num_available_guards() > 0 {
            let Some(bytes) = pending.pop_front() else {
                break;
            };
            let guard = guard_factory
                .take_guard()
                .expect("guard factory reported availability but take_guard returned None");
            let ptr = NonNull::new(bytes.as_ptr() as *mut u8)
                .expect("Vec<u8> backing storage is never null");
            let len = bytes.len();
            delivered.push(bytes);
            let trace_point_data_id = self.shared.next_trace_point();
            // Safety: `ptr` points into `delivered`, which this binding keeps
            // alive for its own lifetime; it outlives every guard it hands out.
            let sample = unsafe { OpaqueSamplePtr::new(ptr, len, guard) };
            receiver(sample, trace_point_data_id);
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxy_event_core::{Config, ProxyError, ProxyEvent, ProxyResult};

    #[test]
    fn publish_then_subscribe_then_receive_round_trips() {
        let binding = MockEventBinding::<u32>::new();
        let event = ProxyEvent::new(binding.clone(), "speed", Config::default());
        event.subscribe(4).unwrap();

        binding.publish(10);
        binding.publish(20);

        let mut received = Vec::new();
        let count = event
            .get_new_samples(|sample| received.push(*sample), 4)
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(received, vec![10, 20]);
    }

    #[test]
    fn get_new_samples_without_subscribe_is_not_subscribed() {
        let binding = MockEventBinding::<u32>::new();
        let event = ProxyEvent::new(binding, "speed", Config::default());
        let result: ProxyResult<usize> = event.get_new_samples(|_| {}, 4);
        assert_eq!(result, Err(ProxyError::NotSubscribed));
    }

    #[test]
    fn receive_handler_fires_on_publish() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let binding = MockEventBinding::<u32>::new();
        let event = ProxyEvent::new(binding.clone(), "speed", Config::default());
        event.subscribe(4).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = Arc::clone(&calls);
        event
            .set_receive_handler(move || {
                calls2.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        binding.publish(1);
        binding.publish(2);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn generic_binding_round_trips_bytes() {
        let binding = MockGenericEventBinding::new(4, false);
        let event = proxy_event_core::GenericProxyEvent::new(binding.clone(), "raw", Config::default());
        event.subscribe(2).unwrap();

        binding.publish_bytes(vec![1, 2, 3, 4]);

        let mut received = Vec::new();
        let count = event
            .get_new_samples(|sample| received.push(sample.as_bytes().to_vec()), 2)
            .unwrap();

        assert_eq!(count, 1);
        assert_eq!(received, vec![vec![1, 2, 3, 4]]);
        assert_eq!(event.get_sample_size(), 4);
    }
}
