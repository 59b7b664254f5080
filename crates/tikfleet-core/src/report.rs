// ── Reporting sink ──
//
// Core code never prints. Collection, analysis and the mutation protocol
// describe what happened as `FleetEvent`s and hand them to a `ReportSink`
// supplied by the caller. `TracingSink` forwards to `tracing`; the CLI
// layers a progress bar on top of it.

use std::sync::Mutex;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::model::LinkKind;

/// Structured event emitted by core operations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FleetEvent {
    // ── Collection ───────────────────────────────────────────────────
    DeviceCollected {
        device: String,
        address: String,
    },
    DeviceUnreachable {
        address: String,
        error: String,
    },
    ResourceReadFailed {
        device: String,
        resource: String,
        error: String,
    },

    // ── Analysis ─────────────────────────────────────────────────────
    LinkInferred {
        source: String,
        destination: String,
        kind: LinkKind,
    },
    NeighborUnresolved {
        device: String,
        identity: String,
        interface: String,
    },
    AnalysisFinished {
        links: usize,
        anomalies: usize,
    },

    // ── Watchdog-protected mutation ──────────────────────────────────
    LeaseArmed {
        device: String,
        lease: String,
        timeout_secs: u64,
    },
    FieldApplied {
        device: String,
        path: String,
        key: String,
        field: String,
    },
    FieldFailed {
        device: String,
        path: String,
        key: String,
        field: String,
        error: String,
    },
    VerifyFailed {
        device: String,
        lease: Option<String>,
        error: String,
    },
    LeaseDisarmed {
        device: String,
        lease: String,
    },
    LeaseCleanupFailed {
        device: String,
        lease: String,
        error: String,
    },
    /// Last event for a device in a protected apply, whatever the result.
    MutationFinished {
        device: String,
        success: bool,
    },
}

/// Destination for [`FleetEvent`]s. Shared across device workers.
pub trait ReportSink: Send + Sync {
    fn emit(&self, event: FleetEvent);
}

/// Forwards every event to `tracing` with structured fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn emit(&self, event: FleetEvent) {
        match event {
            FleetEvent::DeviceCollected { device, address } => {
                info!(%device, %address, "device collected");
            }
            FleetEvent::DeviceUnreachable { address, error } => {
                warn!(%address, %error, "device unreachable");
            }
            FleetEvent::ResourceReadFailed {
                device,
                resource,
                error,
            } => warn!(%device, %resource, %error, "resource read failed"),
            FleetEvent::LinkInferred {
                source,
                destination,
                kind,
            } => debug!(%source, %destination, %kind, "link inferred"),
            FleetEvent::NeighborUnresolved {
                device,
                identity,
                interface,
            } => debug!(%device, %identity, %interface, "neighbor not in inventory"),
            FleetEvent::AnalysisFinished { links, anomalies } => {
                info!(links, anomalies, "analysis complete");
            }
            FleetEvent::LeaseArmed {
                device,
                lease,
                timeout_secs,
            } => info!(%device, %lease, timeout_secs, "watchdog armed"),
            FleetEvent::FieldApplied {
                device,
                path,
                key,
                field,
            } => info!(%device, %path, %key, %field, "field applied"),
            FleetEvent::FieldFailed {
                device,
                path,
                key,
                field,
                error,
            } => warn!(%device, %path, %key, %field, %error, "field write failed"),
            FleetEvent::VerifyFailed {
                device,
                lease,
                error,
            } => warn!(
                %device,
                lease = lease.as_deref().unwrap_or("-"),
                %error,
                "verification failed"
            ),
            FleetEvent::LeaseDisarmed { device, lease } => {
                info!(%device, %lease, "watchdog disarmed");
            }
            FleetEvent::LeaseCleanupFailed {
                device,
                lease,
                error,
            } => warn!(%device, %lease, %error, "watchdog cleanup failed; lease will self-remove"),
            FleetEvent::MutationFinished { device, success } => {
                info!(%device, success, "protected apply finished");
            }
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<FleetEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far.
    pub fn events(&self) -> Vec<FleetEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ReportSink for MemorySink {
    fn emit(&self, event: FleetEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
