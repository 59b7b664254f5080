// ── Anomaly domain types ──

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Tri-level severity. Ordered so `Critical` sorts last.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Stable category tag of an anomaly rule.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnomalyCategory {
    MultipleIpsPerInterface,
    IpOnDisabledInterface,
    UnknownNeighbor,
    ManyInactivePppSecrets,
    UncommentedInterfaces,
    OutdatedVersion,
    ArmedWatchdogLease,
    UnreachableDevice,
}

/// A configuration finding on one router.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Anomaly {
    /// Identity of the router the finding is about.
    pub device: String,
    pub category: AnomalyCategory,
    pub severity: Severity,
    pub description: String,
    pub affected_object: Option<String>,
    pub suggestion: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_tags_are_snake_case() {
        assert_eq!(
            AnomalyCategory::IpOnDisabledInterface.to_string(),
            "ip_on_disabled_interface"
        );
        assert_eq!(
            AnomalyCategory::ArmedWatchdogLease.as_ref(),
            "armed_watchdog_lease"
        );
        assert_eq!(Severity::Warning.to_string(), "warning");
    }
}
