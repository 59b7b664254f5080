//! Management-service handlers: `services show` and the watchdog-protected
//! `services set`.

use std::time::Duration;

use serde::Serialize;
use tabled::Tabled;
use tikfleet_core::watchdog::IP_SERVICE_PATH;
use tikfleet_core::{
    DeviceReader, MutationBatch, MutationOutcome, RouterTarget, WatchdogOptions, apply_to_fleet,
    run_bounded,
};

use crate::cli::{GlobalOpts, ServicesArgs, ServicesCommand, ServicesSetArgs};
use crate::config::Runtime;
use crate::error::CliError;
use crate::output;
use crate::progress::ProgressSink;

use super::util::{self, or_dash};

// ── Show ────────────────────────────────────────────────────────────

/// One `/ip/service` entry on one router.
#[derive(Debug, Clone, Serialize, Tabled)]
struct ServiceEntry {
    #[tabled(rename = "Router")]
    router: String,
    #[tabled(rename = "Service")]
    name: String,
    #[tabled(rename = "Port")]
    port: String,
    #[tabled(rename = "Allowed From")]
    address: String,
    #[tabled(rename = "Disabled")]
    disabled: bool,
}

async fn read_services(target: &RouterTarget) -> Result<Vec<ServiceEntry>, CliError> {
    let client = target.connect()?;
    let records = client.read_resource(IP_SERVICE_PATH).await?;
    Ok(records
        .iter()
        .map(|r| ServiceEntry {
            router: target.label().to_owned(),
            name: r.get("name").cloned().unwrap_or_default(),
            port: or_dash(r.get("port").map(String::as_str)),
            address: or_dash(r.get("address").map(String::as_str)),
            disabled: r.get("disabled").is_some_and(|v| v == "true"),
        })
        .collect())
}

async fn show(runtime: &Runtime, global: &GlobalOpts) -> Result<(), CliError> {
    let targets = runtime.targets(global)?;
    let total = targets.len();

    let results = run_bounded(&targets, runtime.workers, |target| async move {
        (target.label().to_owned(), read_services(target).await)
    })
    .await;

    let mut entries = Vec::new();
    let mut failed = 0;
    for (router, result) in results {
        match result {
            Ok(found) => entries.extend(found),
            Err(e) => {
                failed += 1;
                tracing::warn!(%router, error = %e, "cannot read services");
            }
        }
    }

    let out = output::render_list(runtime.output, &entries, ServiceEntry::clone, |e| {
        format!("{} {} {}", e.router, e.name, e.address)
    })?;
    output::print_output(&out, runtime.quiet);

    if failed > 0 {
        return Err(CliError::PartialFailure {
            action: "services show".into(),
            failed,
            total,
        });
    }
    Ok(())
}

// ── Set ─────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Router")]
    router: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Applied")]
    applied: usize,
    #[tabled(rename = "Failed")]
    failed: usize,
    #[tabled(rename = "Lease")]
    lease: String,
    #[tabled(rename = "Error")]
    error: String,
}

impl OutcomeRow {
    fn new(o: &MutationOutcome, color: bool) -> Self {
        let result = if o.success { "ok" } else { "FAILED" };
        Self {
            router: o.device.clone(),
            result: output::paint_status(o.success, result, color),
            applied: o.applied.len(),
            failed: o.failed.len(),
            lease: lease_cell(o),
            error: or_dash(o.error.as_deref()),
        }
    }
}

/// Lease state, with the local time it fires while still armed.
fn lease_cell(o: &MutationOutcome) -> String {
    let Some(lease) = &o.lease else {
        return "-".into();
    };
    if o.still_armed_lease.is_none() {
        return lease.state.to_string();
    }
    match lease.fires_at() {
        Some(at) => format!(
            "{} armed, reverts at {}",
            lease.name,
            at.with_timezone(&chrono::Local).format("%H:%M:%S")
        ),
        None => format!("{} armed", lease.name),
    }
}

/// The batch to push: `--service` flags if any, else `[ip_services]`.
fn batch_for(args: &ServicesSetArgs, runtime: &Runtime) -> Result<MutationBatch, CliError> {
    let batch = if args.services.is_empty() {
        if !runtime.config.ip_services.enabled {
            return Err(CliError::NothingToApply {
                section: "ip_services".into(),
                reason: "ip_services is disabled and no --service was given".into(),
            });
        }
        tikfleet_config::service_batch(&runtime.config)?
    } else {
        MutationBatch::ip_services(args.services.iter().cloned())?
    };

    if batch.is_empty() {
        return Err(CliError::NothingToApply {
            section: "ip_services.services".into(),
            reason: "no service has an addresses value".into(),
        });
    }
    Ok(batch)
}

fn options_for(args: &ServicesSetArgs, runtime: &Runtime) -> WatchdogOptions {
    let mut options = tikfleet_config::watchdog_options(&runtime.config);
    if args.no_watchdog {
        options.arm = false;
    }
    if let Some(secs) = args.rollback_timeout {
        options.timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = args.settle_delay {
        options.settle_delay = Duration::from_secs(secs);
    }
    options
}

fn prompt(batch: &MutationBatch, options: &WatchdogOptions, routers: usize) -> String {
    let changes = batch
        .changes()
        .iter()
        .map(|c| {
            let allowed = if c.value.is_empty() { "any" } else { c.value.as_str() };
            format!("{}={allowed}", c.key.value)
        })
        .collect::<Vec<_>>()
        .join(", ");
    let guard = if options.arm {
        format!(
            "reverts after {} unless verified",
            humantime::format_duration(options.timeout)
        )
    } else {
        "NO rollback watchdog".into()
    };
    format!("Restrict {changes} on {routers} router(s) ({guard})?")
}

async fn set(args: ServicesSetArgs, runtime: &Runtime, global: &GlobalOpts) -> Result<(), CliError> {
    let batch = batch_for(&args, runtime)?;
    let options = options_for(&args, runtime);
    let targets = runtime.targets(global)?;

    if !util::confirm(&prompt(&batch, &options, targets.len()), "services set", runtime.yes)? {
        eprintln!("Aborted.");
        return Ok(());
    }

    let progress = ProgressSink::new(targets.len(), "applying", runtime.quiet);
    let outcomes = apply_to_fleet(&targets, &batch, &options, runtime.workers, &progress).await;
    progress.finish();

    let color = runtime.color;
    let out = output::render_list(
        runtime.output,
        &outcomes,
        |o| OutcomeRow::new(o, color),
        |o| format!("{} {}", o.device, if o.success { "ok" } else { "failed" }),
    )?;
    output::print_output(&out, runtime.quiet);

    let failed = outcomes.iter().filter(|o| !o.success).count();
    if failed > 0 {
        return Err(CliError::PartialFailure {
            action: "services set".into(),
            failed,
            total: outcomes.len(),
        });
    }
    Ok(())
}

pub async fn handle(
    args: ServicesArgs,
    runtime: &Runtime,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ServicesCommand::Show => show(runtime, global).await,
        ServicesCommand::Set(set_args) => set(set_args, runtime, global).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_every_service_and_the_timeout() {
        let batch =
            MutationBatch::ip_services([("ssh", "10.0.0.0/8"), ("winbox", "")]).unwrap();
        let text = prompt(&batch, &WatchdogOptions::default(), 3);
        assert_eq!(
            text,
            "Restrict ssh=10.0.0.0/8, winbox=any on 3 router(s) (reverts after 5m unless verified)?"
        );
    }

    #[test]
    fn unarmed_prompt_says_so() {
        let batch = MutationBatch::ip_services([("ssh", "10.0.0.0/8")]).unwrap();
        let options = WatchdogOptions {
            arm: false,
            ..WatchdogOptions::default()
        };
        assert!(prompt(&batch, &options, 1).contains("NO rollback watchdog"));
    }

    #[test]
    fn lease_cell_without_lease_is_a_dash() {
        let outcome = MutationOutcome {
            device: "core".into(),
            success: false,
            still_armed_lease: None,
            error: Some("cannot connect".into()),
            applied: Vec::new(),
            failed: Vec::new(),
            captured: Vec::new(),
            lease: None,
        };
        assert_eq!(lease_cell(&outcome), "-");
    }
}
