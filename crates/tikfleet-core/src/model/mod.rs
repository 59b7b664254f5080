// ── Domain model ──
//
// Typed representation of what was observed on each router, plus the
// derived views (links, anomalies) computed from a set of devices. Derived
// values are regenerated on every run and never written back to a router.

pub mod anomaly;
pub mod device;
pub mod inventory;
pub mod link;

// ── Re-exports ──────────────────────────────────────────────────────

pub use anomaly::{Anomaly, AnomalyCategory, Severity};
pub use device::{
    AddressBinding, CollectionError, Device, Interface, InterfaceKind, Neighbor, PppCredential,
    PppSession, ScheduledTask, SystemResource, WirelessAttributes, WirelessMode,
};
pub use inventory::{InventoryStats, NetworkInventory};
pub use link::{Link, LinkKind};
