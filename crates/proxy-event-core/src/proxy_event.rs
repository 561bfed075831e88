//! Typed and type-erased façades layered on [`ProxyEventBase`].

use std::sync::Arc;

use crate::binding::{BindingError, EventBinding, EventBindingBase, GenericEventBinding, SubscriptionState};
use crate::config::Config;
use crate::error::{ProxyError, ProxyResult};
use crate::proxy_event_base::ProxyEventBase;
use crate::sample_ptr::{OpaqueSamplePtr, SamplePtr};

/// The user-visible class of an event that is part of a proxy, for a
/// statically known sample type `T`.
///
/// Delegates subscription/handler management to [`ProxyEventBase`] and adds
/// the one operation that needs to know `T`: [`Self::get_new_samples`].
pub struct ProxyEvent<T: Send + Sync + 'static> {
    base: ProxyEventBase,
    typed_binding: Arc<dyn EventBinding<T>>,
}

impl<T: Send + Sync + 'static> ProxyEvent<T> {
    pub fn new<B>(binding: Arc<B>, event_name: impl Into<String>, config: Config) -> Self
    where
        B: EventBinding<T> + 'static,
    {
        let event_name = event_name.into();
        let base_binding: Arc<dyn EventBindingBase> = binding.clone();
        Self {
            base: ProxyEventBase::new(base_binding, event_name, config),
            typed_binding: binding,
        }
    }

    pub fn subscribe(&self, max_sample_count: usize) -> ProxyResult<()> {
        self.base.subscribe(max_sample_count)
    }

    pub fn unsubscribe(&self) {
        self.base.unsubscribe()
    }

    pub fn get_subscription_state(&self) -> SubscriptionState {
        self.base.get_subscription_state()
    }

    pub fn get_free_sample_count(&self) -> usize {
        self.base.get_free_sample_count()
    }

    pub fn get_num_new_samples_available(&self) -> ProxyResult<usize> {
        self.base.get_num_new_samples_available()
    }

    pub fn set_receive_handler(&self, handler: impl FnMut() + Send + 'static) -> ProxyResult<()> {
        self.base.set_receive_handler(handler)
    }

    pub fn unset_receive_handler(&self) -> ProxyResult<()> {
        self.base.unset_receive_handler()
    }

    pub fn is_binding_valid(&self) -> bool {
        self.base.is_binding_valid()
    }

    /// Receives pending data from the event.
    ///
    /// `receiver` is invoked once per delivered sample; the number of
    /// invocations never exceeds `min(get_free_sample_count(), max_num_samples)`.
    pub fn get_new_samples<F>(&self, mut receiver: F, max_num_samples: usize) -> ProxyResult<usize>
    where
        F: FnMut(SamplePtr<T>),
    {
        let span = tracing::debug_span!(
            "proxy_event_get_new_samples",
            event = %self.base.event_name(),
            max_num_samples
        );
        let _entered = span.enter();

        let mut guard_factory = self.base.tracker().allocate(max_num_samples);
        if guard_factory.get_num_available_guards() == 0 {
            tracing::debug!(
                event = %self.base.event_name(),
                "no free sample slots available for this subscription"
            );
            return Err(ProxyError::MaxSamplesReached);
        }

        let mut forward = |sample: SamplePtr<T>, _trace_point_data_id: u64| {
            receiver(sample);
        };

        match self
            .typed_binding
            .get_new_samples(&mut forward, &mut guard_factory)
        {
            Ok(count) => Ok(count),
            Err(BindingError::NotSubscribed) => Err(ProxyError::NotSubscribed),
            Err(err) => {
                tracing::warn!(event = %self.base.event_name(), ?err, "binding GetNewSamples failed");
                Err(ProxyError::BindingFailure)
            }
        }
    }
}

/// A field is composed of one [`ProxyEvent<T>`] and forwards every call. It
/// exists to distinguish the element category for tracing/discovery; there
/// is no behavioral difference from a plain event.
pub struct ProxyField<T: Send + Sync + 'static> {
    event: ProxyEvent<T>,
}

impl<T: Send + Sync + 'static> ProxyField<T> {
    pub fn new<B>(binding: Arc<B>, event_name: impl Into<String>, config: Config) -> Self
    where
        B: EventBinding<T> + 'static,
    {
        Self {
            event: ProxyEvent::new(binding, event_name, config),
        }
    }

    pub fn subscribe(&self, max_sample_count: usize) -> ProxyResult<()> {
        self.event.subscribe(max_sample_count)
    }

    pub fn unsubscribe(&self) {
        self.event.unsubscribe()
    }

    pub fn get_subscription_state(&self) -> SubscriptionState {
        self.event.get_subscription_state()
    }

    pub fn get_free_sample_count(&self) -> usize {
        self.event.get_free_sample_count()
    }

    pub fn get_num_new_samples_available(&self) -> ProxyResult<usize> {
        self.event.get_num_new_samples_available()
    }

    pub fn set_receive_handler(&self, handler: impl FnMut() + Send + 'static) -> ProxyResult<()> {
        self.event.set_receive_handler(handler)
    }

    pub fn unset_receive_handler(&self) -> ProxyResult<()> {
        self.event.unset_receive_handler()
    }

    pub fn is_binding_valid(&self) -> bool {
        self.event.is_binding_valid()
    }

    pub fn get_new_samples<F>(&self, receiver: F, max_num_samples: usize) -> ProxyResult<usize>
    where
        F: FnMut(SamplePtr<T>),
    {
        self.event.get_new_samples(receiver, max_num_samples)
    }
}

/// An event whose sample type is not statically known at the facade.
pub struct GenericProxyEvent {
    base: ProxyEventBase,
    binding: Arc<dyn GenericEventBinding>,
}

impl std::fmt::Debug for GenericProxyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericProxyEvent")
            .field("event_name", &self.base.event_name())
            .finish()
    }
}

impl GenericProxyEvent {
    pub fn new<B>(binding: Arc<B>, event_name: impl Into<String>, config: Config) -> Self
    where
        B: GenericEventBinding + 'static,
    {
        let event_name = event_name.into();
        let base_binding: Arc<dyn EventBindingBase> = binding.clone();
        Self {
            base: ProxyEventBase::new(base_binding, event_name, config),
            binding,
        }
    }

    pub fn subscribe(&self, max_sample_count: usize) -> ProxyResult<()> {
        self.base.subscribe(max_sample_count)
    }

    pub fn unsubscribe(&self) {
        self.base.unsubscribe()
    }

    pub fn get_subscription_state(&self) -> SubscriptionState {
        self.base.get_subscription_state()
    }

    pub fn get_free_sample_count(&self) -> usize {
        self.base.get_free_sample_count()
    }

    pub fn get_num_new_samples_available(&self) -> ProxyResult<usize> {
        self.base.get_num_new_samples_available()
    }

    pub fn set_receive_handler(&self, handler: impl FnMut() + Send + 'static) -> ProxyResult<()> {
        self.base.set_receive_handler(handler)
    }

    pub fn unset_receive_handler(&self) -> ProxyResult<()> {
        self.base.unset_receive_handler()
    }

    pub fn is_binding_valid(&self) -> bool {
        self.base.is_binding_valid()
    }

    /// Aligned byte size of one sample of this event.
    pub fn get_sample_size(&self) -> usize {
        self.binding.get_sample_size()
    }

    pub fn has_serialized_format(&self) -> bool {
        self.binding.has_serialized_format()
    }

    pub fn get_new_samples<F>(&self, mut receiver: F, max_num_samples: usize) -> ProxyResult<usize>
    where
        F: FnMut(OpaqueSamplePtr),
    {
        let span = tracing::debug_span!(
            "generic_proxy_event_get_new_samples",
            event = %self.base.event_name(),
            max_num_samples
        );
        let _entered = span.enter();

        let mut guard_factory = self.base.tracker().allocate(max_num_samples);
        if guard_factory.get_num_available_guards() == 0 {
            tracing::debug!(
                event = %self.base.event_name(),
                "no free sample slots available for this subscription"
            );
            return Err(ProxyError::MaxSamplesReached);
        }

        let mut forward = |sample: OpaqueSamplePtr, _trace_point_data_id: u64| {
            receiver(sample);
        };

        match self
            .binding
            .get_new_samples_generic(&mut forward, &mut guard_factory)
        {
            Ok(count) => Ok(count),
            Err(BindingError::NotSubscribed) => Err(ProxyError::NotSubscribed),
            Err(err) => {
                tracing::warn!(event = %self.base.event_name(), ?err, "binding GetNewSamples failed");
                Err(ProxyError::BindingFailure)
            }
        }
    }
}
