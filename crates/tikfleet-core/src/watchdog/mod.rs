// ── Watchdog-protected mutation ──
//
// Applies a batch of field changes to one router through the same channel
// the changes may cut off. Before any write, a scheduler entry (the lease)
// is registered on the router that restores the captured values and removes
// itself when its interval elapses. Only an independent read after the
// writes proves the channel still works; then the lease is deleted.
//
// Capture -> Arm -> Apply -> Settle -> Verify -> Disarm, strictly in order.
// The protocol has no retries and no cancellation point: once started it
// runs to completion, and a crash midway leaves the lease to fire.

pub mod batch;
pub mod lease;
pub mod script;

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tikfleet_api::Record;
use tracing::debug;

use crate::config::RouterTarget;
use crate::error::CoreError;
use crate::facade::{DeviceMutator, DeviceReader};
use crate::fleet::run_bounded;
use crate::report::{FleetEvent, ReportSink};

pub use batch::{CapturedValue, FieldChange, IP_SERVICE_PATH, MutationBatch, ResourcePath};
pub use lease::{LEASE_PREFIX, LeaseState, WatchdogLease, lease_name, observe_lease};
pub use script::{ScriptEncoder, quote};

pub(crate) const SCHEDULER_PATH: &str = "/system/scheduler";

/// Caller controls for one protected apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogOptions {
    /// Register a rollback lease before writing.
    pub arm: bool,
    /// Lease interval: how long until the router reverts on its own.
    #[serde(with = "secs")]
    pub timeout: Duration,
    /// Wait between the last write and the verification read.
    #[serde(with = "secs")]
    pub settle_delay: Duration,
}

impl Default for WatchdogOptions {
    fn default() -> Self {
        Self {
            arm: true,
            timeout: Duration::from_secs(300),
            settle_delay: Duration::from_secs(3),
        }
    }
}

/// A field write that failed during apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedField {
    pub change: FieldChange,
    pub error: String,
}

/// Result of one protected apply on one router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationOutcome {
    pub device: String,
    pub success: bool,
    /// Set while a lease is still registered on the router. The router
    /// will restore the captured values when it fires; do not apply again
    /// to this router before then.
    pub still_armed_lease: Option<String>,
    pub error: Option<String>,
    pub applied: Vec<FieldChange>,
    pub failed: Vec<FailedField>,
    pub captured: Vec<CapturedValue>,
    pub lease: Option<WatchdogLease>,
}

impl MutationOutcome {
    fn failed_before_apply(device: &str, error: String, captured: Vec<CapturedValue>) -> Self {
        Self {
            device: device.to_owned(),
            success: false,
            still_armed_lease: None,
            error: Some(error),
            applied: Vec::new(),
            failed: Vec::new(),
            captured,
            lease: None,
        }
    }
}

/// Apply `batch` to one router under a watchdog lease.
///
/// Fails without touching the router when the batch is empty, when any
/// targeted record cannot be read, or (with `arm`) when the lease cannot
/// be encoded or registered. Field write failures do not stop the apply.
/// `success` requires a passed verification and every field applied.
pub async fn apply_guarded<D>(
    device: &D,
    label: &str,
    batch: &MutationBatch,
    options: &WatchdogOptions,
    sink: &dyn ReportSink,
) -> MutationOutcome
where
    D: DeviceReader + DeviceMutator,
{
    let outcome = run_protocol(device, label, batch, options, sink).await;
    sink.emit(FleetEvent::MutationFinished {
        device: label.to_owned(),
        success: outcome.success,
    });
    outcome
}

async fn run_protocol<D>(
    device: &D,
    label: &str,
    batch: &MutationBatch,
    options: &WatchdogOptions,
    sink: &dyn ReportSink,
) -> MutationOutcome
where
    D: DeviceReader + DeviceMutator,
{
    if batch.is_empty() {
        return MutationOutcome::failed_before_apply(label, "empty mutation batch".into(), Vec::new());
    }

    // ── Capture ──
    let captured = match capture(device, batch).await {
        Ok(captured) => captured,
        Err(e) => {
            return MutationOutcome::failed_before_apply(
                label,
                format!("capture failed, nothing changed: {e}"),
                Vec::new(),
            );
        }
    };
    debug!(device = label, fields = captured.len(), "captured rollback values");

    // ── Arm ──
    let mut lease = None;
    if options.arm {
        let prepared = match WatchdogLease::prepare(captured.clone(), options.timeout, Utc::now())
        {
            Ok(prepared) => prepared,
            Err(e) => {
                return MutationOutcome::failed_before_apply(
                    label,
                    format!("cannot build rollback script, nothing changed: {e}"),
                    captured,
                );
            }
        };
        if let Err(e) = device
            .create_scheduled_task(&prepared.name, options.timeout, &prepared.script)
            .await
        {
            return MutationOutcome::failed_before_apply(
                label,
                format!("cannot arm watchdog, nothing changed: {e}"),
                captured,
            );
        }
        sink.emit(FleetEvent::LeaseArmed {
            device: label.to_owned(),
            lease: prepared.name.clone(),
            timeout_secs: prepared.timeout_secs,
        });
        lease = Some(prepared);
    }

    // ── Apply ──
    let mut applied = Vec::new();
    let mut failed = Vec::new();
    for change in batch.changes() {
        match device
            .write_field(change.path.as_str(), &change.key, &change.field, &change.value)
            .await
        {
            Ok(()) => {
                sink.emit(FleetEvent::FieldApplied {
                    device: label.to_owned(),
                    path: change.path.to_string(),
                    key: change.key.to_string(),
                    field: change.field.clone(),
                });
                applied.push(change.clone());
            }
            Err(e) => {
                sink.emit(FleetEvent::FieldFailed {
                    device: label.to_owned(),
                    path: change.path.to_string(),
                    key: change.key.to_string(),
                    field: change.field.clone(),
                    error: e.to_string(),
                });
                failed.push(FailedField {
                    change: change.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    // ── Verify ──
    tokio::time::sleep(options.settle_delay).await;
    if let Err(e) = device.test_reachable().await {
        let lease_name = lease.as_ref().map(|l| l.name.clone());
        sink.emit(FleetEvent::VerifyFailed {
            device: label.to_owned(),
            lease: lease_name.clone(),
            error: e.to_string(),
        });
        let error = match &lease {
            Some(l) => format!(
                "verification failed after apply: {e}; lease {} restores the previous values in {}s",
                l.name, l.timeout_secs
            ),
            None => format!("verification failed after apply (no watchdog armed): {e}"),
        };
        return MutationOutcome {
            device: label.to_owned(),
            success: false,
            still_armed_lease: lease_name,
            error: Some(error),
            applied,
            failed,
            captured,
            lease,
        };
    }

    // ── Disarm ──
    let mut still_armed_lease = None;
    if let Some(l) = lease.as_mut() {
        match device.delete_scheduled_task(&l.name).await {
            Ok(()) => {
                l.state = LeaseState::Disarmed;
                sink.emit(FleetEvent::LeaseDisarmed {
                    device: label.to_owned(),
                    lease: l.name.clone(),
                });
            }
            Err(e) => {
                sink.emit(FleetEvent::LeaseCleanupFailed {
                    device: label.to_owned(),
                    lease: l.name.clone(),
                    error: e.to_string(),
                });
                still_armed_lease = Some(l.name.clone());
            }
        }
    }

    let error = (!failed.is_empty()).then(|| {
        let targets: Vec<String> = failed.iter().map(|f| f.change.target()).collect();
        format!("{} field(s) not applied: {}", failed.len(), targets.join(", "))
    });
    let success = failed.is_empty();
    debug!(device = label, applied = applied.len(), failed = failed.len(), "apply verified");

    MutationOutcome {
        device: label.to_owned(),
        success,
        still_armed_lease,
        error,
        applied,
        failed,
        captured,
        lease,
    }
}

/// Apply the same batch to every target, at most `max_workers` at a time.
pub async fn apply_to_fleet(
    targets: &[RouterTarget],
    batch: &MutationBatch,
    options: &WatchdogOptions,
    max_workers: usize,
    sink: &dyn ReportSink,
) -> Vec<MutationOutcome> {
    run_bounded(targets, max_workers, |target| async move {
        match target.connect() {
            Ok(client) => apply_guarded(&client, target.label(), batch, options, sink).await,
            Err(e) => {
                sink.emit(FleetEvent::MutationFinished {
                    device: target.label().to_owned(),
                    success: false,
                });
                MutationOutcome::failed_before_apply(
                    target.label(),
                    format!("cannot connect, nothing changed: {e}"),
                    Vec::new(),
                )
            }
        }
    })
    .await
}

/// Read every targeted field's current value, one read per menu.
async fn capture<R: DeviceReader>(
    reader: &R,
    batch: &MutationBatch,
) -> Result<Vec<CapturedValue>, CoreError> {
    let mut menus: BTreeMap<&str, Vec<Record>> = BTreeMap::new();
    for path in batch.paths() {
        let records = reader.read_resource(path.as_str()).await?;
        menus.insert(path.as_str(), records);
    }

    batch
        .distinct_targets()
        .into_iter()
        .map(|change| {
            let record = menus
                .get(change.path.as_str())
                .and_then(|records| change.key.select(records))
                .ok_or_else(|| CoreError::NotFound {
                    resource: change.path.to_string(),
                    identifier: change.key.to_string(),
                })?;
            Ok(CapturedValue {
                path: change.path.clone(),
                key: change.key.clone(),
                field: change.field.clone(),
                // RouterOS omits unset properties; restoring means clearing.
                original: record.get(&change.field).cloned().unwrap_or_default(),
            })
        })
        .collect()
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
