// ── Network inventory ──
//
// The result of one analysis run: the devices as collected, plus the
// links and anomalies derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::anomaly::{Anomaly, Severity};
use super::device::Device;
use super::link::{Link, LinkKind};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryStats {
    pub total_devices: usize,
    pub reachable_devices: usize,
    pub total_interfaces: usize,
    pub total_neighbors: usize,
    pub total_links: usize,
    pub backbone_links: usize,
    pub ptp_links: usize,
    pub ptmp_links: usize,
    pub pppoe_links: usize,
    pub unknown_links: usize,
    pub ppp_sessions: usize,
    pub total_anomalies: usize,
    pub critical_anomalies: usize,
    pub warning_anomalies: usize,
    pub info_anomalies: usize,
}

impl InventoryStats {
    pub fn compute(devices: &[Device], links: &[Link], anomalies: &[Anomaly]) -> Self {
        let links_of = |kind: LinkKind| links.iter().filter(|l| l.kind == kind).count();
        let anomalies_of =
            |severity: Severity| anomalies.iter().filter(|a| a.severity == severity).count();

        Self {
            total_devices: devices.len(),
            reachable_devices: devices.iter().filter(|d| d.reachable).count(),
            total_interfaces: devices.iter().map(|d| d.interfaces.len()).sum(),
            total_neighbors: devices.iter().map(|d| d.neighbors.len()).sum(),
            total_links: links.len(),
            backbone_links: links_of(LinkKind::Backbone),
            ptp_links: links_of(LinkKind::Ptp),
            ptmp_links: links_of(LinkKind::Ptmp),
            pppoe_links: links_of(LinkKind::Pppoe),
            unknown_links: links_of(LinkKind::Unknown),
            ppp_sessions: devices.iter().map(|d| d.ppp_sessions.len()).sum(),
            total_anomalies: anomalies.len(),
            critical_anomalies: anomalies_of(Severity::Critical),
            warning_anomalies: anomalies_of(Severity::Warning),
            info_anomalies: anomalies_of(Severity::Info),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInventory {
    pub devices: Vec<Device>,
    pub links: Vec<Link>,
    pub anomalies: Vec<Anomaly>,
    pub stats: InventoryStats,
    pub generated_at: DateTime<Utc>,
}
