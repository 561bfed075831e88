//! Compile-time, process-wide interface/event descriptor table.
//!
//! Populated by [`crate::register_interface`] calls, which applications place
//! in a dedicated registration module the same way the original's generated
//! C++ registration units call `BEGIN_EXPORT_MW_COM_INTERFACE`. Lookups are
//! read-only and keyed by string identifiers, matching the FFI boundary's own
//! string-view currency.

use std::collections::HashMap;
use std::sync::OnceLock;

/// One event or field belonging to an interface, as known at registration time.
pub struct EventDescriptor {
    pub event_name: &'static str,
    /// Name of the sample type, carried as metadata for the foreign caller
    /// to interpret the opaque bytes [`proxy_event_core::GenericProxyEvent`]
    /// hands back; this registry never dispatches on it itself, since the
    /// core already erases the sample type for every `GenericProxyEvent`.
    pub type_name: &'static str,
}

/// One interface's worth of events, registered before main.
pub struct InterfaceDescriptor {
    pub interface_id: &'static str,
    pub events: &'static [EventDescriptor],
}

inventory::collect!(InterfaceDescriptor);

fn index() -> &'static HashMap<&'static str, &'static InterfaceDescriptor> {
    static INDEX: OnceLock<HashMap<&'static str, &'static InterfaceDescriptor>> = OnceLock::new();
    INDEX.get_or_init(|| {
        inventory::iter::<InterfaceDescriptor>()
            .map(|descriptor| (descriptor.interface_id, descriptor))
            .collect()
    })
}

/// Looks up an interface by id among everything registered via `inventory::submit!`.
pub fn interface_descriptor(interface_id: &str) -> Option<&'static InterfaceDescriptor> {
    index().get(interface_id).copied()
}

/// Looks up one event descriptor within a registered interface.
pub fn event_descriptor(interface_id: &str, event_name: &str) -> Option<&'static EventDescriptor> {
    interface_descriptor(interface_id)?
        .events
        .iter()
        .find(|event| event.event_name == event_name)
}

/// Registers an interface and its events in the process-wide descriptor table.
///
/// ```ignore
/// register_interface!("VehicleInterface", [
///     "TireEvent" => "TirePressure",
///     "SpeedEvent" => "u32",
/// ]);
/// ```
#[macro_export]
macro_rules! register_interface {
    ($interface_id:expr, [$($event_name:expr => $type_name:expr),* $(,)?]) => {
        $crate::inventory::submit! {
            $crate::InterfaceDescriptor {
                interface_id: $interface_id,
                events: &[
                    $($crate::EventDescriptor {
                        event_name: $event_name,
                        type_name: $type_name,
                    }),*
                ],
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::register_interface!("TestInterface", [
        "TestEvent" => "u32",
    ]);

    #[test]
    fn registered_interface_is_discoverable() {
        let descriptor = interface_descriptor("TestInterface").expect("registered above");
        assert_eq!(descriptor.events.len(), 1);
        assert_eq!(descriptor.events[0].event_name, "TestEvent");
    }

    #[test]
    fn event_descriptor_looks_up_by_name() {
        let event = event_descriptor("TestInterface", "TestEvent").unwrap();
        assert_eq!(event.type_name, "u32");
        assert!(event_descriptor("TestInterface", "NoSuchEvent").is_none());
    }

    #[test]
    fn unknown_interface_is_none() {
        assert!(interface_descriptor("NoSuchInterface").is_none());
    }
}
