//! Fleet logic between `tikfleet-api` and the CLI.
//!
//! - **Collection** ([`collect`]): reads each router through a
//!   [`DeviceReader`] into a typed [`Device`], with a bounded worker pool
//!   across the fleet ([`fleet::run_bounded`]).
//!
//! - **Topology inference** ([`topology`]): resolves discovery neighbors and
//!   PPP sessions into deduplicated, classified [`Link`]s.
//!
//! - **Anomaly detection** ([`anomaly`]): independent per-device rules with
//!   configurable thresholds ([`AnomalyRules`]).
//!
//! - **Watchdog-protected mutation** ([`watchdog`]): applies a
//!   [`MutationBatch`] under a self-firing rollback lease registered on the
//!   router before the first write, disarmed only after an independent
//!   reachability check.
//!
//! - **Provisioning** ([`provision`]): declarative users and user groups.
//!
//! Core code never prints; progress and findings go to a [`ReportSink`].

pub mod analysis;
pub mod anomaly;
pub mod collect;
pub mod config;
pub mod convert;
pub mod error;
pub mod facade;
pub mod fleet;
pub mod model;
pub mod provision;
pub mod report;
pub mod topology;
pub mod watchdog;

// ── Primary re-exports ──────────────────────────────────────────────
pub use analysis::{AnalysisOptions, analyze};
pub use anomaly::{AnomalyRules, detect_anomalies, severity_counts};
pub use collect::{collect_device, collect_fleet};
pub use config::{RouterTarget, TlsVerification};
pub use error::CoreError;
pub use facade::{DeviceMutator, DeviceReader, MatchKey};
pub use fleet::{DEFAULT_WORKERS, run_bounded};
pub use provision::{Provisioned, UserGroupSpec, UserSpec, ensure_user, ensure_user_group};
pub use report::{FleetEvent, MemorySink, ReportSink, TracingSink};
pub use topology::{TopologyOptions, TopologyReport, UnresolvedNeighbor, infer_topology};
pub use watchdog::{
    FailedField, FieldChange, LeaseState, MutationBatch, MutationOutcome, ResourcePath,
    WatchdogLease, WatchdogOptions, apply_guarded, apply_to_fleet, observe_lease,
};

pub use model::{
    Anomaly, AnomalyCategory, Device, Interface, InterfaceKind, InventoryStats, Link, LinkKind,
    NetworkInventory, Severity,
};
