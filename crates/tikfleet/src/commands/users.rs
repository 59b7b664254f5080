//! `users apply`: push `[user_management]` groups and users to every router.

use serde::Serialize;
use tabled::Tabled;
use tikfleet_core::{
    CoreError, Provisioned, RouterTarget, UserGroupSpec, UserSpec, ensure_user, ensure_user_group,
    run_bounded,
};

use crate::cli::{GlobalOpts, UsersArgs, UsersCommand};
use crate::config::Runtime;
use crate::error::CliError;
use crate::output;
use crate::progress::ProgressSink;

use super::util;

/// Result of one group or user on one router.
#[derive(Debug, Clone, Serialize)]
struct ProvisionResult {
    router: String,
    kind: &'static str,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Provisioned>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ProvisionResult {
    fn new(
        router: &str,
        kind: &'static str,
        name: &str,
        outcome: Result<Provisioned, CoreError>,
    ) -> Self {
        let (result, error) = match outcome {
            Ok(p) => (Some(p), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            router: router.to_owned(),
            kind,
            name: name.to_owned(),
            result,
            error,
        }
    }
}

#[derive(Tabled)]
struct ProvisionRow {
    #[tabled(rename = "Router")]
    router: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Result")]
    result: String,
}

impl ProvisionRow {
    fn new(r: &ProvisionResult, color: bool) -> Self {
        let result = match (&r.result, &r.error) {
            (Some(p), _) => output::paint_status(true, &p.to_string(), color),
            (None, Some(e)) => output::paint_status(false, e, color),
            (None, None) => "-".into(),
        };
        Self {
            router: r.router.clone(),
            kind: r.kind,
            name: r.name.clone(),
            result,
        }
    }
}

/// Groups first, so users can reference them.
async fn provision_router(
    target: &RouterTarget,
    groups: &[UserGroupSpec],
    users: &[UserSpec],
) -> Vec<ProvisionResult> {
    let router = target.label();
    let client = match target.connect() {
        Ok(client) => client,
        Err(e) => {
            return vec![ProvisionResult::new(router, "router", router, Err(e))];
        }
    };

    let mut results = Vec::with_capacity(groups.len() + users.len());
    for group in groups {
        let outcome = ensure_user_group(&client, group).await;
        results.push(ProvisionResult::new(router, "group", &group.name, outcome));
    }
    for user in users {
        let outcome = ensure_user(&client, user).await;
        results.push(ProvisionResult::new(router, "user", &user.name, outcome));
    }
    results
}

async fn apply(runtime: &Runtime, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = &runtime.config;
    if !cfg.user_management.enabled {
        return Err(CliError::NothingToApply {
            section: "user_management".into(),
            reason: "user_management is disabled".into(),
        });
    }
    let groups = tikfleet_config::user_group_specs(cfg);
    let users = tikfleet_config::user_specs(cfg)?;
    if groups.is_empty() && users.is_empty() {
        return Err(CliError::NothingToApply {
            section: "user_management".into(),
            reason: "no groups or users defined".into(),
        });
    }

    let targets = runtime.targets(global)?;
    let message = format!(
        "Provision {} group(s) and {} user(s) on {} router(s)?",
        groups.len(),
        users.len(),
        targets.len()
    );
    if !util::confirm(&message, "users apply", runtime.yes)? {
        eprintln!("Aborted.");
        return Ok(());
    }

    let progress = ProgressSink::new(targets.len(), "provisioning", runtime.quiet);
    let per_router = run_bounded(&targets, runtime.workers, |target| {
        let (groups, users, progress) = (&groups, &users, &progress);
        async move {
            let results = provision_router(target, groups, users).await;
            progress.tick();
            results
        }
    })
    .await;
    progress.finish();

    let total = per_router.len();
    let failed = per_router
        .iter()
        .filter(|results| results.iter().any(|r| r.error.is_some()))
        .count();
    let results: Vec<ProvisionResult> = per_router.into_iter().flatten().collect();

    let color = runtime.color;
    let out = output::render_list(
        runtime.output,
        &results,
        |r| ProvisionRow::new(r, color),
        |r| {
            let status = r
                .result
                .map_or_else(|| "failed".to_owned(), |p| p.to_string());
            format!("{} {} {} {status}", r.router, r.kind, r.name)
        },
    )?;
    output::print_output(&out, runtime.quiet);

    if failed > 0 {
        return Err(CliError::PartialFailure {
            action: "users apply".into(),
            failed,
            total,
        });
    }
    Ok(())
}

pub async fn handle(args: UsersArgs, runtime: &Runtime, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        UsersCommand::Apply => apply(runtime, global).await,
    }
}
