//! Process-wide table of live proxies and the event facades registered
//! against each, indexed by opaque integer handles.
//!
//! An integer handle stands in for the raw pointer the original FFI surface
//! passes across the language boundary: the glue layer above this crate is
//! free to hand the integer to a foreign caller as if it were a pointer,
//! without this crate ever exposing one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use proxy_event_core::{GenericProxyEvent, ProxyBase, ProxyError, ProxyResult};

use crate::descriptor::interface_descriptor;

struct ProxyEntry {
    base: Arc<ProxyBase>,
    interface_id: &'static str,
    events: HashMap<String, Arc<GenericProxyEvent>>,
}

/// The process-wide live-proxy table.
pub struct ProxyRegistry {
    proxies: Mutex<HashMap<u64, ProxyEntry>>,
    next_id: AtomicU64,
}

impl ProxyRegistry {
    fn new() -> Self {
        Self {
            proxies: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn global() -> &'static ProxyRegistry {
        static REGISTRY: OnceLock<ProxyRegistry> = OnceLock::new();
        REGISTRY.get_or_init(ProxyRegistry::new)
    }

    /// Registers a newly constructed proxy under `interface_id`, which must
    /// already exist in the descriptor table. Returns an opaque handle.
    pub fn create_proxy(&self, interface_id: &'static str, base: Arc<ProxyBase>) -> ProxyResult<u64> {
        if interface_descriptor(interface_id).is_none() {
            tracing::warn!(interface_id, "create_proxy: no such registered interface");
            return Err(ProxyError::InvalidHandle);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.proxies.lock().unwrap().insert(
            id,
            ProxyEntry {
                base,
                interface_id,
                events: HashMap::new(),
            },
        );
        Ok(id)
    }

    /// Drops a proxy and every event facade registered under it.
    pub fn destroy_proxy(&self, proxy_id: u64) {
        self.proxies.lock().unwrap().remove(&proxy_id);
    }

    /// Associates a live event facade with a proxy handle under `event_name`,
    /// which must be one of `interface_id`'s registered events.
    pub fn register_event(
        &self,
        proxy_id: u64,
        event_name: impl Into<String>,
        event: Arc<GenericProxyEvent>,
    ) -> ProxyResult<()> {
        let event_name = event_name.into();
        let mut proxies = self.proxies.lock().unwrap();
        let entry = proxies.get_mut(&proxy_id).ok_or(ProxyError::InvalidHandle)?;
        if interface_descriptor(entry.interface_id)
            .and_then(|descriptor| descriptor.events.iter().find(|e| e.event_name == event_name))
            .is_none()
        {
            tracing::warn!(
                interface_id = entry.interface_id,
                event_name,
                "register_event: event not declared on this interface"
            );
            return Err(ProxyError::InvalidHandle);
        }
        entry.events.insert(event_name, event);
        Ok(())
    }

    /// Looks up a previously registered event facade by name.
    pub fn get_event(&self, proxy_id: u64, event_name: &str) -> ProxyResult<Arc<GenericProxyEvent>> {
        self.proxies
            .lock()
            .unwrap()
            .get(&proxy_id)
            .and_then(|entry| entry.events.get(event_name))
            .cloned()
            .ok_or(ProxyError::InvalidHandle)
    }

    /// The proxy-level binding collaborator for a handle, for callers that
    /// need to drive subscription-independent proxy operations.
    pub fn get_proxy_base(&self, proxy_id: u64) -> ProxyResult<Arc<ProxyBase>> {
        self.proxies
            .lock()
            .unwrap()
            .get(&proxy_id)
            .map(|entry| Arc::clone(&entry.base))
            .ok_or(ProxyError::InvalidHandle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxy_event_core::Config;
    use proxy_mock_binding::MockGenericEventBinding;

    crate::register_interface!("registry::InstanceTestInterface", [
        "Raw" => "bytes",
    ]);

    #[test]
    fn create_register_get_destroy_round_trips() {
        let registry = ProxyRegistry::new();
        let base = ProxyBase::new(None);
        let proxy_id = registry
            .create_proxy("registry::InstanceTestInterface", base)
            .unwrap();

        let binding = MockGenericEventBinding::new(4, false);
        let event = Arc::new(GenericProxyEvent::new(binding, "Raw", Config::default()));
        registry.register_event(proxy_id, "Raw", event).unwrap();

        assert!(registry.get_event(proxy_id, "Raw").is_ok());
        assert_eq!(
            registry.get_event(proxy_id, "NoSuchEvent").unwrap_err(),
            ProxyError::InvalidHandle
        );

        registry.destroy_proxy(proxy_id);
        assert_eq!(
            registry.get_event(proxy_id, "Raw").unwrap_err(),
            ProxyError::InvalidHandle
        );
    }

    #[test]
    fn create_proxy_rejects_unregistered_interface() {
        let registry = ProxyRegistry::new();
        let base = ProxyBase::new(None);
        assert_eq!(
            registry.create_proxy("NoSuchInterface", base).unwrap_err(),
            ProxyError::InvalidHandle
        );
    }

    #[test]
    fn register_event_rejects_undeclared_event_name() {
        let registry = ProxyRegistry::new();
        let base = ProxyBase::new(None);
        let proxy_id = registry
            .create_proxy("registry::InstanceTestInterface", base)
            .unwrap();

        let binding = MockGenericEventBinding::new(4, false);
        let event = Arc::new(GenericProxyEvent::new(binding, "NotDeclared", Config::default()));
        assert_eq!(
            registry
                .register_event(proxy_id, "NotDeclared", event)
                .unwrap_err(),
            ProxyError::InvalidHandle
        );
    }
}
