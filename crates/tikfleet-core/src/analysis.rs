// ── Analysis pipeline ──
//
// Topology inference followed by anomaly detection over one collected
// device set, reported through the sink and summarized in an inventory.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::anomaly::{AnomalyRules, detect_anomalies};
use crate::model::{Device, InventoryStats, NetworkInventory};
use crate::report::{FleetEvent, ReportSink};
use crate::topology::{TopologyOptions, TopologyReport, infer_topology};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    pub detect_links: bool,
    pub detect_anomalies: bool,
    pub topology: TopologyOptions,
    pub rules: AnomalyRules,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            detect_links: true,
            detect_anomalies: true,
            topology: TopologyOptions::default(),
            rules: AnomalyRules::default(),
        }
    }
}

/// Infer links and anomalies for `devices` and wrap everything up.
pub fn analyze(
    devices: Vec<Device>,
    options: &AnalysisOptions,
    sink: &dyn ReportSink,
) -> NetworkInventory {
    // Unknown-neighbor findings need resolution even when links are not wanted.
    let mut topology = if options.detect_links || options.detect_anomalies {
        infer_topology(&devices, options.topology)
    } else {
        TopologyReport::default()
    };
    if !options.detect_links {
        topology.links.clear();
    }

    for link in &topology.links {
        sink.emit(FleetEvent::LinkInferred {
            source: link.source_device.clone(),
            destination: link.destination_device.clone(),
            kind: link.kind,
        });
    }
    for neighbor in &topology.unresolved {
        sink.emit(FleetEvent::NeighborUnresolved {
            device: neighbor.device.clone(),
            identity: neighbor.identity.clone(),
            interface: neighbor.interface.clone(),
        });
    }

    let anomalies = if options.detect_anomalies {
        detect_anomalies(&devices, &topology.unresolved, &options.rules)
    } else {
        Vec::new()
    };

    sink.emit(FleetEvent::AnalysisFinished {
        links: topology.links.len(),
        anomalies: anomalies.len(),
    });

    let stats = InventoryStats::compute(&devices, &topology.links, &anomalies);
    NetworkInventory {
        devices,
        links: topology.links,
        anomalies,
        stats,
        generated_at: Utc::now(),
    }
}
