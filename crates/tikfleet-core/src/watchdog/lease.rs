// ── Watchdog leases ──
//
// A lease is a scheduler entry on the router that restores captured values
// and removes itself once its interval elapses. Only the router runs it;
// the orchestrator's sole job is to delete it in time.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::CoreError;
use crate::facade::DeviceReader;

use super::batch::CapturedValue;
use super::script::ScriptEncoder;

/// Name prefix shared by every lease.
pub const LEASE_PREFIX: &str = "rollback_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaseState {
    /// Registered on the router and not yet fired.
    Armed,
    /// Removed by the orchestrator after a verified change.
    Disarmed,
    /// Ran on the router and restored the captured values.
    Fired,
    /// Armed, with no orchestrator left to disarm it. Still self-fires.
    Abandoned,
}

/// A rollback lease as registered on one router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogLease {
    pub name: String,
    pub script: String,
    pub timeout_secs: u64,
    pub armed_at: DateTime<Utc>,
    pub state: LeaseState,
    /// Values the script restores.
    pub captured: Vec<CapturedValue>,
}

impl WatchdogLease {
    /// Build the lease for `captured`, named after `now`.
    pub fn prepare(
        captured: Vec<CapturedValue>,
        timeout: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        let name = lease_name(now);
        let mut script = ScriptEncoder::new();
        for value in &captured {
            script.set(&value.path, &value.key, &value.field, &value.original)?;
        }
        script.remove_scheduler(&name)?;

        Ok(Self {
            name,
            script: script.finish(),
            timeout_secs: timeout.as_secs(),
            armed_at: now,
            state: LeaseState::Armed,
            captured,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// When the router will run the script, if still armed.
    pub fn fires_at(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.timeout_secs).ok()?;
        self.armed_at
            .checked_add_signed(chrono::Duration::try_seconds(secs)?)
    }
}

/// `rollback_<unix-millis>`.
pub fn lease_name(now: DateTime<Utc>) -> String {
    format!("{LEASE_PREFIX}{}", now.timestamp_millis())
}

/// Classify a previously returned lease by looking at the router.
///
/// Scheduler entry present: `Armed`. Entry gone and every captured field
/// back at its captured value: `Fired`. Entry gone otherwise: `Disarmed`.
pub async fn observe_lease<R: DeviceReader>(
    reader: &R,
    lease: &WatchdogLease,
) -> Result<LeaseState, CoreError> {
    let tasks = reader.read_resource(super::SCHEDULER_PATH).await?;
    if tasks
        .iter()
        .any(|t| t.get("name").is_some_and(|n| *n == lease.name))
    {
        return Ok(LeaseState::Armed);
    }

    let mut menus = BTreeMap::new();
    for value in &lease.captured {
        if !menus.contains_key(value.path.as_str()) {
            let records = reader.read_resource(value.path.as_str()).await?;
            menus.insert(value.path.as_str(), records);
        }
    }

    let reverted = lease.captured.iter().all(|value| {
        menus
            .get(value.path.as_str())
            .and_then(|records| value.key.select(records))
            .is_some_and(|record| {
                record.get(&value.field).map_or("", String::as_str) == value.original
            })
    });

    Ok(if reverted {
        LeaseState::Fired
    } else {
        LeaseState::Disarmed
    })
}
