//! Inventory, topology and anomaly handlers.
//!
//! All three collect the selected routers, run the analysis, and differ
//! only in what they print.

use std::fmt::Write as _;
use std::str::FromStr;

use tabled::Tabled;
use tikfleet_core::{
    AnalysisOptions, Anomaly, AnomalyCategory, Device, Link, NetworkInventory, Severity,
    TracingSink, analyze, collect_fleet,
};

use crate::cli::{AnomaliesArgs, GlobalOpts, InventoryArgs, SeverityFilter, TopologyArgs};
use crate::config::Runtime;
use crate::error::CliError;
use crate::output;
use crate::progress::ProgressSink;

use super::util::or_dash;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Identity")]
    identity: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Board")]
    board: String,
    #[tabled(rename = "Ifaces")]
    interfaces: usize,
    #[tabled(rename = "Neighbors")]
    neighbors: usize,
    #[tabled(rename = "PPP")]
    ppp: usize,
    #[tabled(rename = "Read Errors")]
    errors: usize,
}

impl DeviceRow {
    fn new(d: &Device, color: bool) -> Self {
        let status = if d.reachable { "ok" } else { "unreachable" };
        Self {
            identity: d.identity.clone(),
            address: d.address.clone(),
            status: output::paint_status(d.reachable, status, color),
            version: or_dash(d.version()),
            board: or_dash(d.system.as_ref().and_then(|s| s.board_name.as_deref())),
            interfaces: d.interfaces.len(),
            neighbors: d.neighbors.len(),
            ppp: d.ppp_sessions.len(),
            errors: d.collection_errors.len(),
        }
    }
}

#[derive(Tabled)]
struct LinkRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Interface")]
    source_interface: String,
    #[tabled(rename = "Destination")]
    destination: String,
    #[tabled(rename = "Peer Interface")]
    destination_interface: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Evidence")]
    evidence: String,
}

impl From<&Link> for LinkRow {
    fn from(l: &Link) -> Self {
        Self {
            source: l.source_device.clone(),
            source_interface: l.source_interface.clone(),
            destination: l.destination_device.clone(),
            destination_interface: or_dash(l.destination_interface.as_deref()),
            kind: l.kind.to_string(),
            confidence: format!("{:.0}%", l.confidence * 100.0),
            evidence: l.evidence.clone(),
        }
    }
}

#[derive(Tabled)]
struct AnomalyRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Object")]
    object: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Suggestion")]
    suggestion: String,
}

impl AnomalyRow {
    fn new(a: &Anomaly, color: bool) -> Self {
        Self {
            severity: output::paint_severity(a.severity, color),
            device: a.device.clone(),
            category: a.category.to_string(),
            object: or_dash(a.affected_object.as_deref()),
            description: a.description.clone(),
            suggestion: or_dash(a.suggestion.as_deref()),
        }
    }
}

// ── Shared pipeline ─────────────────────────────────────────────────

/// Collect the selected routers and analyze them.
async fn build_inventory(
    runtime: &Runtime,
    global: &GlobalOpts,
    options: &AnalysisOptions,
) -> Result<NetworkInventory, CliError> {
    let targets = runtime.targets(global)?;

    let progress = ProgressSink::new(targets.len(), "collecting", runtime.quiet);
    let devices = collect_fleet(&targets, runtime.workers, &progress).await;
    progress.finish();

    Ok(analyze(devices, options, &TracingSink))
}

fn summary(inventory: &NetworkInventory) -> String {
    let s = &inventory.stats;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} device(s), {} reachable, {} interface(s), {} PPP session(s)",
        s.total_devices, s.reachable_devices, s.total_interfaces, s.ppp_sessions
    );
    let _ = writeln!(
        out,
        "{} link(s): {} backbone, {} ptp, {} ptmp, {} pppoe, {} unknown",
        s.total_links, s.backbone_links, s.ptp_links, s.ptmp_links, s.pppoe_links, s.unknown_links
    );
    let _ = write!(
        out,
        "{} anomaly(ies): {} critical, {} warning, {} info",
        s.total_anomalies, s.critical_anomalies, s.warning_anomalies, s.info_anomalies
    );
    out
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn inventory(
    args: InventoryArgs,
    runtime: &Runtime,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut options = tikfleet_config::analysis_options(&runtime.config);
    options.detect_links &= !args.no_links;
    options.detect_anomalies &= !args.no_anomalies;

    let inventory = build_inventory(runtime, global, &options).await?;

    if let Some(path) = &args.save {
        std::fs::write(path, output::render_json(&inventory, false)?)?;
        tracing::info!(path = %path.display(), "inventory saved");
    }

    let color = runtime.color;
    let out = output::render_single(
        runtime.output,
        &inventory,
        |inv| {
            let rows: Vec<DeviceRow> = inv.devices.iter().map(|d| DeviceRow::new(d, color)).collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            format!("{table}\n{}", summary(inv))
        },
        |inv| {
            inv.devices
                .iter()
                .map(|d| d.identity.clone())
                .collect::<Vec<_>>()
                .join("\n")
        },
    )?;
    output::print_output(&out, runtime.quiet);
    Ok(())
}

pub async fn topology(
    args: TopologyArgs,
    runtime: &Runtime,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut options = tikfleet_config::analysis_options(&runtime.config);
    options.detect_links = true;
    options.detect_anomalies = false;
    options.topology.partial_address_match &= !args.exact;

    let inventory = build_inventory(runtime, global, &options).await?;

    let out = output::render_list(runtime.output, &inventory.links, |l| LinkRow::from(l), |l| {
        format!("{} {} {}", l.source_device, l.kind, l.destination_device)
    })?;
    output::print_output(&out, runtime.quiet);
    Ok(())
}

pub async fn anomalies(
    args: AnomaliesArgs,
    runtime: &Runtime,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let category = args
        .category
        .as_deref()
        .map(AnomalyCategory::from_str)
        .transpose()
        .map_err(|_| CliError::Validation {
            field: "category".into(),
            reason: format!(
                "unknown category '{}'",
                args.category.as_deref().unwrap_or_default()
            ),
        })?;

    let mut options = tikfleet_config::analysis_options(&runtime.config);
    options.detect_anomalies = true;

    let inventory = build_inventory(runtime, global, &options).await?;
    let min = min_severity(args.min_severity);
    let findings: Vec<Anomaly> = inventory
        .anomalies
        .into_iter()
        .filter(|a| a.severity >= min && category.is_none_or(|c| a.category == c))
        .collect();

    let color = runtime.color;
    let out = output::render_list(
        runtime.output,
        &findings,
        |a| AnomalyRow::new(a, color),
        |a| format!("{} {} {}", a.severity, a.device, a.category),
    )?;
    output::print_output(&out, runtime.quiet);
    Ok(())
}

fn min_severity(filter: SeverityFilter) -> Severity {
    match filter {
        SeverityFilter::Info => Severity::Info,
        SeverityFilter::Warning => Severity::Warning,
        SeverityFilter::Critical => Severity::Critical,
    }
}

#[cfg(test)]
mod tests {
    use tikfleet_core::{InventoryStats, LinkKind};

    use super::*;

    #[test]
    fn link_rows_show_percent_confidence() {
        let link = Link {
            source_device: "tower".into(),
            source_address: "10.0.0.1".into(),
            source_interface: "wlan1".into(),
            destination_device: "client".into(),
            destination_address: Some("10.0.0.2".into()),
            destination_interface: None,
            kind: LinkKind::Ptmp,
            confidence: 0.9,
            evidence: "neighbor discovery".into(),
        };
        let row = LinkRow::from(&link);
        assert_eq!(row.confidence, "90%");
        assert_eq!(row.destination_interface, "-");
        assert_eq!(row.kind, "ptmp");
    }

    #[test]
    fn summary_lists_every_counter() {
        let inventory = NetworkInventory {
            devices: Vec::new(),
            links: Vec::new(),
            anomalies: Vec::new(),
            stats: InventoryStats {
                total_devices: 3,
                reachable_devices: 2,
                critical_anomalies: 1,
                ..InventoryStats::default()
            },
            generated_at: chrono::Utc::now(),
        };
        let text = summary(&inventory);
        assert!(text.starts_with("3 device(s), 2 reachable"));
        assert!(text.contains("1 critical"));
    }

    #[test]
    fn severity_filter_maps_in_order() {
        assert!(min_severity(SeverityFilter::Warning) > Severity::Info);
        assert_eq!(min_severity(SeverityFilter::Critical), Severity::Critical);
    }
}
