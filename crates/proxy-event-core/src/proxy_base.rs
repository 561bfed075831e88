//! Root proxy object: owns the binding and the set of event facades
//! registered against it, and links each facade to the binding without
//! depending on the proxy's own address (move-safety).

use std::sync::{Arc, Mutex, Weak};

use crate::error::ProxyResult;

/// The proxy-level binding collaborator: knows which events a service
/// instance provides and tracks which event facades have registered against
/// it. A concrete shared-memory implementation is out of scope; this trait
/// is the seam the core consumes.
pub trait ProxyBinding: Send + Sync {
    fn is_event_provided(&self, event_name: &str) -> bool;
    fn register_event_binding(&self, event_name: &str);
    fn unregister_event_binding(&self, event_name: &str);
}

/// Root object for one service instance.
///
/// If constructed without a binding, the proxy is marked "bindings invalid"
/// and remains so; every [`RegistrationGuard`] built against it becomes a
/// no-op rather than panicking, so facades can still be constructed (and
/// destructed) for a proxy whose binding failed to build.
pub struct ProxyBase {
    binding: Option<Arc<dyn ProxyBinding>>,
    registered_events: Mutex<Vec<String>>,
}

impl ProxyBase {
    pub fn new(binding: Option<Arc<dyn ProxyBinding>>) -> Arc<Self> {
        Arc::new(Self {
            binding,
            registered_events: Mutex::new(Vec::new()),
        })
    }

    pub fn is_binding_valid(&self) -> bool {
        self.binding.is_some()
    }

    pub fn binding(&self) -> Option<&Arc<dyn ProxyBinding>> {
        self.binding.as_ref()
    }

    /// Names of events currently registered by live facades. For diagnostics
    /// and tests only; the core never iterates this on the hot path.
    pub fn registered_event_names(&self) -> Vec<String> {
        self.registered_events.lock().unwrap().clone()
    }
}

/// RAII link between an event facade and its parent proxy's binding.
///
/// Captures a weak reference to the binding and to the owning `ProxyBase`
/// (never a strong reference to the proxy itself), so moving the owning
/// proxy does not invalidate any live registration.
pub struct RegistrationGuard {
    binding: Option<Weak<dyn ProxyBinding>>,
    proxy: Weak<ProxyBase>,
    event_name: String,
}

impl RegistrationGuard {
    pub fn new(proxy: &Arc<ProxyBase>, event_name: impl Into<String>) -> Self {
        let event_name = event_name.into();
        match &proxy.binding {
            Some(binding) => {
                binding.register_event_binding(&event_name);
                proxy
                    .registered_events
                    .lock()
                    .unwrap()
                    .push(event_name.clone());
                Self {
                    binding: Some(Arc::downgrade(binding)),
                    proxy: Arc::downgrade(proxy),
                    event_name,
                }
            }
            None => Self {
                binding: None,
                proxy: Weak::new(),
                event_name,
            },
        }
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        if let Some(weak) = &self.binding {
            if let Some(binding) = weak.upgrade() {
                binding.unregister_event_binding(&self.event_name);
            }
        }
        if let Some(proxy) = self.proxy.upgrade() {
            let mut registered = proxy.registered_events.lock().unwrap();
            if let Some(index) = registered.iter().position(|name| name == &self.event_name) {
                registered.remove(index);
            }
        }
    }
}

/// Out-of-scope service-discovery collaborator. `ProxyBase`'s discovery
/// entry points are thin pass-throughs to whatever implementation the
/// application wires in; no discovery logic lives in this crate.
pub trait ServiceDiscovery: Send + Sync {
    fn find_service(&self, interface_id: &str) -> ProxyResult<Vec<String>>;
    fn start_find_service(&self, interface_id: &str, callback: Box<dyn FnMut(&str) + Send>) -> ProxyResult<()>;
    fn stop_find_service(&self, interface_id: &str) -> ProxyResult<()>;
}

pub fn find_service(discovery: &dyn ServiceDiscovery, interface_id: &str) -> ProxyResult<Vec<String>> {
    discovery.find_service(interface_id)
}

pub fn start_find_service(
    discovery: &dyn ServiceDiscovery,
    interface_id: &str,
    callback: Box<dyn FnMut(&str) + Send>,
) -> ProxyResult<()> {
    discovery.start_find_service(interface_id, callback)
}

pub fn stop_find_service(discovery: &dyn ServiceDiscovery, interface_id: &str) -> ProxyResult<()> {
    discovery.stop_find_service(interface_id)
}
