// ── Record-to-domain conversions ──
//
// Bridges raw `tikfleet_api::Record` string maps into `model` types. Each
// `From` impl maps RouterOS column names, parses booleans and numbers,
// and fills defaults for missing columns. Unparseable numbers become `None`.

use tikfleet_api::Record;

use crate::model::{
    AddressBinding, Interface, InterfaceKind, Neighbor, PppCredential, PppSession, ScheduledTask,
    SystemResource, WirelessAttributes, WirelessMode,
};

// ── Helpers ────────────────────────────────────────────────────────

/// RouterOS renders booleans as `"true"`/`"false"` (older menus: `yes`/`no`).
fn flag(record: &Record, key: &str) -> bool {
    matches!(record.get(key).map(String::as_str), Some("true" | "yes"))
}

fn text(record: &Record, key: &str) -> String {
    record.get(key).cloned().unwrap_or_default()
}

/// Present and non-empty.
fn opt(record: &Record, key: &str) -> Option<String> {
    record.get(key).filter(|v| !v.is_empty()).cloned()
}

fn number<T: std::str::FromStr>(record: &Record, key: &str) -> Option<T> {
    record.get(key).and_then(|v| v.trim().parse().ok())
}

// ── Interfaces ─────────────────────────────────────────────────────

impl From<&Record> for Interface {
    fn from(r: &Record) -> Self {
        let type_name = text(r, "type");
        Self {
            name: text(r, "name"),
            kind: InterfaceKind::from_routeros(&type_name),
            type_name,
            disabled: flag(r, "disabled"),
            running: flag(r, "running"),
            dynamic: flag(r, "dynamic"),
            comment: opt(r, "comment"),
            mac_address: opt(r, "mac-address"),
            mtu: number(r, "actual-mtu").or_else(|| number(r, "mtu")),
            wireless: None,
        }
    }
}

impl From<&Record> for WirelessAttributes {
    fn from(r: &Record) -> Self {
        Self {
            mode: WirelessMode::from_routeros(r.get("mode").map_or("", String::as_str)),
            ssid: opt(r, "ssid"),
            frequency: opt(r, "frequency"),
        }
    }
}

/// Attach `/interface/wireless` rows to the matching interfaces by name.
pub fn merge_wireless(interfaces: &mut [Interface], wireless: &[Record]) {
    for row in wireless {
        let Some(name) = row.get("name") else {
            continue;
        };
        if let Some(iface) = interfaces.iter_mut().find(|i| &i.name == name) {
            iface.wireless = Some(WirelessAttributes::from(row));
        }
    }
}

// ── Addresses and neighbors ────────────────────────────────────────

impl From<&Record> for AddressBinding {
    fn from(r: &Record) -> Self {
        Self {
            address: text(r, "address"),
            network: opt(r, "network"),
            interface: text(r, "interface"),
            disabled: flag(r, "disabled"),
            comment: opt(r, "comment"),
        }
    }
}

impl From<&Record> for Neighbor {
    fn from(r: &Record) -> Self {
        Self {
            interface: text(r, "interface"),
            identity: text(r, "identity"),
            address: opt(r, "address").or_else(|| opt(r, "address4")),
            platform: opt(r, "platform"),
            version: opt(r, "version"),
            mac_address: opt(r, "mac-address"),
        }
    }
}

// ── PPP ────────────────────────────────────────────────────────────

impl From<&Record> for PppSession {
    fn from(r: &Record) -> Self {
        Self {
            username: text(r, "name"),
            service: opt(r, "service"),
            caller_id: opt(r, "caller-id"),
            address: opt(r, "address"),
            uptime: opt(r, "uptime"),
        }
    }
}

impl From<&Record> for PppCredential {
    fn from(r: &Record) -> Self {
        Self {
            username: text(r, "name"),
            service: opt(r, "service"),
            profile: opt(r, "profile"),
            local_address: opt(r, "local-address"),
            remote_address: opt(r, "remote-address"),
            disabled: flag(r, "disabled"),
            comment: opt(r, "comment"),
        }
    }
}

// ── System ─────────────────────────────────────────────────────────

impl From<&Record> for ScheduledTask {
    fn from(r: &Record) -> Self {
        Self {
            name: text(r, "name"),
            on_event: text(r, "on-event"),
            disabled: flag(r, "disabled"),
            start_time: opt(r, "start-time"),
            interval: opt(r, "interval"),
        }
    }
}

impl From<&Record> for SystemResource {
    fn from(r: &Record) -> Self {
        Self {
            version: opt(r, "version"),
            uptime: opt(r, "uptime"),
            board_name: opt(r, "board-name"),
            architecture: opt(r, "architecture-name"),
            cpu: opt(r, "cpu"),
            cpu_load: number(r, "cpu-load"),
            free_memory: number(r, "free-memory"),
            total_memory: number(r, "total-memory"),
        }
    }
}
