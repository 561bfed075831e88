//! Flat, string/handle-keyed entry points mirroring the C-ABI surface the
//! original registry shim exposes. Proxy-side only: skeleton-side publication
//! machinery is out of scope for this core.
//!
//! These are plain Rust functions, not `extern "C"` — a real cross-language
//! glue layer built on top of this crate is responsible for the actual ABI
//! (string-view marshaling, panic-at-the-boundary catching); this module only
//! provides the safe Rust operations that glue layer would call into.

use std::sync::Arc;

use proxy_event_core::{GenericProxyEvent, OpaqueSamplePtr, ProxyBase, ProxyBinding, ProxyResult};

use crate::instance::ProxyRegistry;

/// Constructs a proxy for `interface_id` and registers it in the live-proxy
/// table, returning an opaque handle. Fails with `InvalidHandle` if
/// `interface_id` was never registered via [`crate::register_interface`].
pub fn create_proxy(
    interface_id: &'static str,
    binding: Option<Arc<dyn ProxyBinding>>,
) -> ProxyResult<u64> {
    let base = ProxyBase::new(binding);
    ProxyRegistry::global().create_proxy(interface_id, base)
}

/// Drops a proxy and every event facade registered under it.
pub fn destroy_proxy(proxy_id: u64) {
    ProxyRegistry::global().destroy_proxy(proxy_id);
}

/// Associates a live, already-constructed event facade with a proxy handle.
/// The application calls this once per event after building the facade from
/// its concrete binding; the registry has no way to construct one itself
/// since the sample type is only known to application code.
pub fn register_event_instance(
    proxy_id: u64,
    event_name: impl Into<String>,
    event: Arc<GenericProxyEvent>,
) -> ProxyResult<()> {
    ProxyRegistry::global().register_event(proxy_id, event_name, event)
}

/// `get_event_from_proxy(proxy*, interface_id, event_id) -> event_base*` from
/// the original FFI surface, with the pointer replaced by a safe `Arc`.
pub fn get_event_from_proxy(proxy_id: u64, event_name: &str) -> ProxyResult<Arc<GenericProxyEvent>> {
    ProxyRegistry::global().get_event(proxy_id, event_name)
}

/// `proxy_event_subscribe(event*, max) -> bool`.
pub fn proxy_event_subscribe(event: &GenericProxyEvent, max_sample_count: usize) -> bool {
    event.subscribe(max_sample_count).is_ok()
}

/// `type_registry_get_samples_from_event(event*, type_name, callback_fat_ptr*, max) -> u32`,
/// sentinel `u32::MAX` on error. `type_name` is accepted for parity with the
/// original signature but unused: `GenericProxyEvent` already erases the
/// sample type, so no per-type dispatch table is needed to drain it.
pub fn type_registry_get_samples_from_event(
    event: &GenericProxyEvent,
    _type_name: &str,
    max_num_samples: usize,
    mut callback: impl FnMut(OpaqueSamplePtr),
) -> u32 {
    match event.get_new_samples(&mut callback, max_num_samples) {
        Ok(count) => u32::try_from(count).unwrap_or(u32::MAX),
        Err(err) => {
            tracing::warn!(?err, "type_registry_get_samples_from_event failed");
            u32::MAX
        }
    }
}

/// `call_dyn_ref_fnmut_sample(fat_ptr*, sample_ptr*)`: invokes a callable
/// living on the other side of the boundary with one delivered sample.
pub fn call_dyn_ref_fnmut_sample(callback: &mut dyn FnMut(OpaqueSamplePtr), sample: OpaqueSamplePtr) {
    callback(sample);
}
