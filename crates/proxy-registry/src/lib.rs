//! Cross-language service-element registry: a process-wide, string-keyed
//! lookup from `(interface-id, event-name)` to live proxy event facades, used
//! to marshal typed operations across an FFI boundary without requiring the
//! boundary's caller to know any concrete Rust type at compile time.
//!
//! Two tables exist:
//! - [`descriptor`]: compile-time, populated by [`register_interface`] calls
//!   the application places in a registration module, the same way the
//!   original's generated C++ translation units call its `EXPORT_MW_COM_*`
//!   macros before `main`.
//! - [`instance`]: runtime, populated as the application constructs concrete
//!   proxies and event facades and registers them under the handles this
//!   crate hands back.
//!
//! [`ffi`] exposes the flat, handle-keyed operations a cross-language glue
//! layer would bind to extern "C" entry points.

pub use inventory;

pub mod descriptor;
pub mod ffi;
pub mod instance;

pub use descriptor::{event_descriptor, interface_descriptor, EventDescriptor, InterfaceDescriptor};
pub use instance::ProxyRegistry;
