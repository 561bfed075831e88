//! The abstract transport contract the core consumes.
//!
//! A real binding (shared-memory slot allocation, IPC signalling) is out of
//! scope here; this module only specifies the interface and the error
//! currency a binding reports across it. [`proxy-mock-binding`] ships a
//! reference, in-process implementation used by tests and demos.

use std::sync::Weak;

use crate::sample_ptr::{OpaqueSamplePtr, SamplePtr};
use crate::scope::ScopedReceiveHandler;
use crate::tracker::TrackerGuardFactory;

/// Per-event-facade subscription state, mirrored between the facade and its binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    NotSubscribed,
    SubscriptionPending,
    Subscribed,
}

/// Distinguishes which transport a binding represents. The core never
/// branches on this; it exists purely for diagnostics/tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingType {
    InProcess,
    SharedMemory,
}

/// Identifies a trace point for one delivered sample. Opaque to the core;
/// bindings may use it to correlate a delivery with tracing infrastructure.
pub type TracePointDataId = u64;

/// The error currency a binding reports across the boundary.
///
/// The core collapses `Other` to [`crate::error::ProxyError::BindingFailure`]
/// at the facade boundary; `NotSubscribed` is passed through verbatim.
#[derive(Debug, Clone)]
pub enum BindingError {
    NotSubscribed,
    Other(String),
}

/// Operations common to both the typed and the type-erased binding contract.
pub trait EventBindingBase: Send + Sync {
    fn subscribe(&self, max_sample_count: usize) -> Result<(), BindingError>;

    fn unsubscribe(&self);

    fn get_subscription_state(&self) -> SubscriptionState;

    /// Present iff subscribed or pending.
    fn get_max_sample_count(&self) -> Option<u16>;

    fn get_num_new_samples_available(&self) -> Result<usize, BindingError>;

    /// Stores a weak reference to the scoped handler; must fail-safe if the
    /// handler has since expired and must never invoke an expired handler.
    fn set_receive_handler(
        &self,
        handler: Weak<ScopedReceiveHandler>,
    ) -> Result<(), BindingError>;

    fn unset_receive_handler(&self) -> Result<(), BindingError>;

    fn get_binding_type(&self) -> BindingType;

    fn notify_service_instance_changed_availability(
        &self,
        is_available: bool,
        new_source_pid: i32,
    );
}

/// Typed binding contract, parameterized by the event's sample type.
pub trait EventBinding<T>: EventBindingBase {
    /// For every sample delivered, takes exactly one guard from
    /// `guard_factory`, constructs a [`SamplePtr<T>`] tied to that guard, and
    /// invokes `receiver` with `(sample, trace_point_data_id)`. Deliveries
    /// per call never exceed `guard_factory.get_num_available_guards()`.
    fn get_new_samples(
        &self,
        receiver: &mut dyn FnMut(SamplePtr<T>, TracePointDataId),
        guard_factory: &mut TrackerGuardFactory,
    ) -> Result<usize, BindingError>;
}

/// Type-erased binding contract used by `GenericProxyEvent`.
pub trait GenericEventBinding: EventBindingBase {
    fn get_sample_size(&self) -> usize;

    fn has_serialized_format(&self) -> bool;

    fn get_new_samples_generic(
        &self,
        receiver: &mut dyn FnMut(OpaqueSamplePtr, TracePointDataId),
        guard_factory: &mut TrackerGuardFactory,
    ) -> Result<usize, BindingError>;
}
