//! Proxy-side event delivery core for a shared-memory pub/sub IPC middleware.
//!
//! This crate implements the proxy-side subscription state machine,
//! reference-counted sample delivery, and scoped receive-handler teardown
//! for an AUTOSAR-style service-oriented communication pattern. The concrete
//! shared-memory transport, service discovery, and process bootstrap are
//! out of scope — this crate only specifies and consumes the binding
//! contract ([`binding::EventBindingBase`] and friends).
//!
//! See `proxy-mock-binding` for a reference in-process binding used by tests
//! and demos, and `proxy-registry` for the cross-language FFI service-element
//! registry.

mod backoff;
pub mod binding;
pub mod config;
pub mod error;
mod invariants;
pub mod proxy_base;
pub mod proxy_event;
pub mod proxy_event_base;
pub mod sample_ptr;
pub mod scope;
pub mod tracker;

pub use binding::{BindingError, BindingType, EventBinding, EventBindingBase, GenericEventBinding, SubscriptionState};
pub use config::Config;
pub use error::{ProxyError, ProxyResult};
pub use proxy_base::{ProxyBase, ProxyBinding, RegistrationGuard};
pub use proxy_event::{GenericProxyEvent, ProxyEvent, ProxyField};
pub use proxy_event_base::ProxyEventBase;
pub use sample_ptr::{OpaqueSamplePtr, SamplePtr};
pub use scope::{Scope, ScopedReceiveHandler};
pub use tracker::{Guard, SampleReferenceTracker, TrackerGuardFactory};
