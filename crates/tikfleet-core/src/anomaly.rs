// ── Anomaly detection ──
//
// Independent per-device rules over an already collected device set.
// Read-only and stateless across runs: the same input always yields the
// same, deterministically ordered, anomaly list.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{Anomaly, AnomalyCategory, Device, InterfaceKind, Severity};
use crate::topology::UnresolvedNeighbor;

/// Rule thresholds and markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyRules {
    /// Report when more enabled PPP secrets than this have no session.
    pub inactive_secret_threshold: usize,
    /// Report when more undocumented interfaces than this exist.
    pub uncommented_threshold: usize,
    /// Interface names starting with one of these document themselves.
    pub conventional_prefixes: Vec<String>,
    pub self_describing_kinds: Vec<InterfaceKind>,
    /// Versions whose leading component is below this are outdated.
    pub min_major_version: u32,
    /// Scheduler names containing this are watchdog leases.
    pub lease_marker: String,
    /// Scheduler scripts touching these menus are treated as leases.
    pub guarded_script_paths: Vec<String>,
}

impl Default for AnomalyRules {
    fn default() -> Self {
        Self {
            inactive_secret_threshold: 10,
            uncommented_threshold: 3,
            conventional_prefixes: vec!["ether".into()],
            self_describing_kinds: vec![InterfaceKind::Bridge],
            min_major_version: 6,
            lease_marker: crate::watchdog::LEASE_PREFIX.into(),
            guarded_script_paths: vec!["/ip service".into()],
        }
    }
}

/// Run every rule against every device.
///
/// `unresolved` is the topology pass's list of neighbors that matched no
/// device; each becomes an `unknown_neighbor` finding on the observing device.
pub fn detect_anomalies(
    devices: &[Device],
    unresolved: &[UnresolvedNeighbor],
    rules: &AnomalyRules,
) -> Vec<Anomaly> {
    let mut out = Vec::new();
    for device in devices {
        if !device.reachable {
            out.push(unreachable(device));
        }
        multiple_ips_per_interface(device, &mut out);
        ip_on_disabled_interface(device, &mut out);
        unknown_neighbors(device, unresolved, &mut out);
        inactive_ppp_secrets(device, rules, &mut out);
        uncommented_interfaces(device, rules, &mut out);
        outdated_version(device, rules, &mut out);
        armed_leases(device, rules, &mut out);
    }

    out.sort_by(|a, b| {
        (&a.device, a.category, &a.affected_object, &a.description).cmp(&(
            &b.device,
            b.category,
            &b.affected_object,
            &b.description,
        ))
    });
    out
}

/// Count findings per severity, in `Severity` order.
pub fn severity_counts(anomalies: &[Anomaly]) -> BTreeMap<Severity, usize> {
    let mut counts = BTreeMap::new();
    for anomaly in anomalies {
        *counts.entry(anomaly.severity).or_insert(0) += 1;
    }
    counts
}

fn finding(
    device: &Device,
    category: AnomalyCategory,
    severity: Severity,
    description: String,
    affected: impl Into<String>,
    suggestion: &str,
) -> Anomaly {
    Anomaly {
        device: device.identity.clone(),
        category,
        severity,
        description,
        affected_object: Some(affected.into()),
        suggestion: Some(suggestion.to_owned()),
    }
}

// ── Rules ───────────────────────────────────────────────────────────

fn unreachable(device: &Device) -> Anomaly {
    let reason = device.connection_error.as_deref().unwrap_or("no response");
    finding(
        device,
        AnomalyCategory::UnreachableDevice,
        Severity::Critical,
        format!("Router at {} could not be reached: {reason}", device.address),
        device.address.clone(),
        "Check connectivity, credentials and that the REST API (www/www-ssl) is enabled",
    )
}

fn multiple_ips_per_interface(device: &Device, out: &mut Vec<Anomaly>) {
    let mut per_interface: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for binding in device.addresses.iter().filter(|b| !b.disabled) {
        per_interface
            .entry(binding.interface.as_str())
            .or_default()
            .push(binding.address.as_str());
    }

    for (interface, addresses) in per_interface {
        if addresses.len() > 1 {
            out.push(finding(
                device,
                AnomalyCategory::MultipleIpsPerInterface,
                Severity::Info,
                format!(
                    "Interface {interface} has {} IP addresses ({})",
                    addresses.len(),
                    addresses.join(", ")
                ),
                interface,
                "Verify that multiple addresses are intentional",
            ));
        }
    }
}

fn ip_on_disabled_interface(device: &Device, out: &mut Vec<Anomaly>) {
    let disabled: HashSet<&str> = device
        .interfaces
        .iter()
        .filter(|i| i.disabled)
        .map(|i| i.name.as_str())
        .collect();

    for binding in &device.addresses {
        if !binding.disabled && disabled.contains(binding.interface.as_str()) {
            out.push(finding(
                device,
                AnomalyCategory::IpOnDisabledInterface,
                Severity::Warning,
                format!(
                    "Interface {} is disabled but has IP {}",
                    binding.interface, binding.address
                ),
                binding.interface.clone(),
                "Disable the address or enable the interface",
            ));
        }
    }
}

fn unknown_neighbors(device: &Device, unresolved: &[UnresolvedNeighbor], out: &mut Vec<Anomaly>) {
    for neighbor in unresolved
        .iter()
        .filter(|n| n.device == device.identity && n.device_address == device.address)
    {
        let seen_as = match &neighbor.address {
            Some(address) => format!("'{}' ({address})", neighbor.identity),
            None => format!("'{}'", neighbor.identity),
        };
        out.push(finding(
            device,
            AnomalyCategory::UnknownNeighbor,
            Severity::Info,
            format!(
                "Neighbor {seen_as} on {} is not in the inventory",
                neighbor.interface
            ),
            neighbor.interface.clone(),
            "Add the neighbor to the router list or verify its identity",
        ));
    }
}

fn inactive_ppp_secrets(device: &Device, rules: &AnomalyRules, out: &mut Vec<Anomaly>) {
    let active: HashSet<&str> = device
        .ppp_sessions
        .iter()
        .map(|s| s.username.as_str())
        .collect();
    let inactive = device
        .ppp_credentials
        .iter()
        .filter(|c| !c.disabled && !active.contains(c.username.as_str()))
        .count();

    if inactive > rules.inactive_secret_threshold {
        out.push(finding(
            device,
            AnomalyCategory::ManyInactivePppSecrets,
            Severity::Info,
            format!("{inactive} enabled PPP secrets have no active session"),
            "ppp-secrets",
            "Review and remove unused PPP accounts",
        ));
    }
}

fn uncommented_interfaces(device: &Device, rules: &AnomalyRules, out: &mut Vec<Anomaly>) {
    let undocumented = device
        .interfaces
        .iter()
        .filter(|i| !i.dynamic)
        .filter(|i| i.comment.as_deref().is_none_or(|c| c.trim().is_empty()))
        .filter(|i| {
            !rules
                .conventional_prefixes
                .iter()
                .any(|p| i.name.starts_with(p.as_str()))
        })
        .filter(|i| !rules.self_describing_kinds.contains(&i.kind))
        .count();

    if undocumented > rules.uncommented_threshold {
        out.push(finding(
            device,
            AnomalyCategory::UncommentedInterfaces,
            Severity::Info,
            format!("{undocumented} interfaces lack a descriptive comment"),
            "interfaces",
            "Add comments to interfaces for better documentation",
        ));
    }
}

fn outdated_version(device: &Device, rules: &AnomalyRules, out: &mut Vec<Anomaly>) {
    let Some(system) = &device.system else {
        return;
    };
    let Some(major) = system.major_version() else {
        return;
    };
    if major < rules.min_major_version {
        out.push(finding(
            device,
            AnomalyCategory::OutdatedVersion,
            Severity::Warning,
            format!(
                "RouterOS version {} is older than {}.x",
                system.version.as_deref().unwrap_or_default(),
                rules.min_major_version
            ),
            "system",
            "Upgrade to a supported RouterOS release",
        ));
    }
}

fn armed_leases(device: &Device, rules: &AnomalyRules, out: &mut Vec<Anomaly>) {
    for task in device.scheduled_tasks.iter().filter(|t| !t.disabled) {
        let marked = !rules.lease_marker.is_empty() && task.name.contains(&rules.lease_marker);
        let guarded = rules
            .guarded_script_paths
            .iter()
            .any(|p| !p.is_empty() && task.on_event.contains(p.as_str()));
        if marked || guarded {
            out.push(finding(
                device,
                AnomalyCategory::ArmedWatchdogLease,
                Severity::Warning,
                format!(
                    "Scheduler entry {} looks like an armed rollback watchdog",
                    task.name
                ),
                task.name.clone(),
                "Confirm the last change was verified, then remove the entry or let it fire",
            ));
        }
    }
}
