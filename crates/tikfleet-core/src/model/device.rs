// ── Device domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized interface kind, parsed from the RouterOS `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum InterfaceKind {
    Ethernet,
    Wireless,
    Bridge,
    Vlan,
    PppoeClient,
    PppoeServer,
    Other,
}

impl InterfaceKind {
    /// Map a RouterOS interface type (`ether`, `wlan`, `wifi`, `bridge`, ...).
    pub fn from_routeros(raw: &str) -> Self {
        match raw {
            "ether" => Self::Ethernet,
            "wlan" | "wifi" | "wifiwave2" => Self::Wireless,
            "bridge" => Self::Bridge,
            "vlan" => Self::Vlan,
            "pppoe-out" => Self::PppoeClient,
            "pppoe-in" => Self::PppoeServer,
            _ => Self::Other,
        }
    }
}

/// Wireless operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WirelessMode {
    Station,
    ApBridge,
    Other,
}

impl WirelessMode {
    pub fn from_routeros(raw: &str) -> Self {
        match raw {
            "station" => Self::Station,
            "ap-bridge" => Self::ApBridge,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirelessAttributes {
    pub mode: WirelessMode,
    pub ssid: Option<String>,
    pub frequency: Option<String>,
}

/// One row of `/interface`, optionally enriched from `/interface/wireless`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Interface {
    pub name: String,
    pub kind: InterfaceKind,
    /// Raw RouterOS type string, kept for display.
    pub type_name: String,
    pub disabled: bool,
    pub running: bool,
    /// Created by the router at runtime (PPP server sessions, tunnels).
    pub dynamic: bool,
    pub comment: Option<String>,
    pub mac_address: Option<String>,
    pub mtu: Option<u32>,
    pub wireless: Option<WirelessAttributes>,
}

impl Interface {
    /// Wireless by kind, by attached wireless attributes, or by a `wlan` name.
    pub fn is_wireless(&self) -> bool {
        self.kind == InterfaceKind::Wireless
            || self.wireless.is_some()
            || self.name.to_ascii_lowercase().contains("wlan")
    }

    pub fn wireless_mode(&self) -> Option<WirelessMode> {
        self.wireless.as_ref().map(|w| w.mode)
    }
}

/// An IP address configured on an interface (`/ip/address`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBinding {
    /// CIDR form, e.g. `10.0.0.1/24`.
    pub address: String,
    pub network: Option<String>,
    pub interface: String,
    pub disabled: bool,
    pub comment: Option<String>,
}

/// A discovery neighbor (`/ip/neighbor`).
///
/// `address` is best-effort: some discovery implementations report a
/// truncated or partial value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Local interface the neighbor was seen on. RouterOS may list several
    /// comma-separated names when the neighbor is reachable over a bridge.
    pub interface: String,
    pub identity: String,
    pub address: Option<String>,
    pub platform: Option<String>,
    pub version: Option<String>,
    pub mac_address: Option<String>,
}

/// An active PPP session (`/ppp/active`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PppSession {
    pub username: String,
    pub service: Option<String>,
    /// Remote hardware address for PPPoE.
    pub caller_id: Option<String>,
    pub address: Option<String>,
    pub uptime: Option<String>,
}

/// A configured PPP secret (`/ppp/secret`). The password is never collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PppCredential {
    pub username: String,
    pub service: Option<String>,
    pub profile: Option<String>,
    pub local_address: Option<String>,
    pub remote_address: Option<String>,
    pub disabled: bool,
    pub comment: Option<String>,
}

/// A `/system/scheduler` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub name: String,
    pub on_event: String,
    pub disabled: bool,
    pub start_time: Option<String>,
    pub interval: Option<String>,
}

/// `/system/resource` summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemResource {
    pub version: Option<String>,
    pub uptime: Option<String>,
    pub board_name: Option<String>,
    pub architecture: Option<String>,
    pub cpu: Option<String>,
    pub cpu_load: Option<u8>,
    pub free_memory: Option<u64>,
    pub total_memory: Option<u64>,
}

impl SystemResource {
    /// Leading numeric component of the version (`"7.12.1 (stable)"` -> 7).
    pub fn major_version(&self) -> Option<u32> {
        let version = self.version.as_deref()?;
        version.trim().split('.').next()?.trim().parse().ok()
    }
}

/// A read that failed during collection; the matching collection is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionError {
    pub resource: String,
    pub message: String,
}

/// One router as observed in a single collection run.
///
/// `identity` and `address` are the matching keys used by topology
/// inference; neither is guaranteed unique across a real network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub identity: String,
    /// Management address (host or IP used to reach the router).
    pub address: String,
    pub reachable: bool,
    pub connection_error: Option<String>,
    pub system: Option<SystemResource>,
    pub interfaces: Vec<Interface>,
    pub addresses: Vec<AddressBinding>,
    pub neighbors: Vec<Neighbor>,
    pub ppp_sessions: Vec<PppSession>,
    pub ppp_credentials: Vec<PppCredential>,
    pub scheduled_tasks: Vec<ScheduledTask>,
    pub collection_errors: Vec<CollectionError>,
    pub collected_at: DateTime<Utc>,
}

impl Device {
    /// An empty, reachable device. Collections are filled in by the caller.
    pub fn new(identity: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            address: address.into(),
            reachable: true,
            connection_error: None,
            system: None,
            interfaces: Vec::new(),
            addresses: Vec::new(),
            neighbors: Vec::new(),
            ppp_sessions: Vec::new(),
            ppp_credentials: Vec::new(),
            scheduled_tasks: Vec::new(),
            collection_errors: Vec::new(),
            collected_at: Utc::now(),
        }
    }

    /// A device that could not be contacted at all.
    pub fn unreachable(
        identity: impl Into<String>,
        address: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            reachable: false,
            connection_error: Some(error.into()),
            ..Self::new(identity, address)
        }
    }

    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    pub fn version(&self) -> Option<&str> {
        self.system.as_ref().and_then(|s| s.version.as_deref())
    }
}
