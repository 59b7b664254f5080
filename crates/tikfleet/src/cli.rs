//! Clap derive structures for the `tikfleet` CLI.
//!
//! Defines the command tree, global flags, and shared value types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tikfleet -- inventory and guarded changes for RouterOS fleets
#[derive(Debug, Parser)]
#[command(
    name = "tikfleet",
    version,
    about = "Map, audit and safely reconfigure a fleet of MikroTik routers",
    long_about = "Collects state from every configured RouterOS router over the REST API,\n\
        infers the physical topology, flags configuration anomalies, and pushes\n\
        management-service changes under a self-firing rollback watchdog.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Fleet config file (defaults to the platform config dir)
    #[arg(long, env = "TIKFLEET_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Only these routers, by host or name (repeatable, comma separated)
    #[arg(long, short = 'r', value_delimiter = ',', global = true)]
    pub router: Vec<String>,

    /// Output format (overrides config)
    #[arg(long, short = 'o', env = "TIKFLEET_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output (overrides config)
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates on every router
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Routers worked on concurrently (overrides config)
    #[arg(long, short = 'w', global = true)]
    pub workers: Option<usize>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum SeverityFilter {
    Info,
    Warning,
    Critical,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Collect every router and summarize the fleet
    #[command(alias = "inv")]
    Inventory(InventoryArgs),

    /// Show inferred links between routers
    #[command(alias = "topo")]
    Topology(TopologyArgs),

    /// Show configuration anomalies
    #[command(alias = "audit")]
    Anomalies(AnomaliesArgs),

    /// Inspect or restrict management services (ssh, winbox, api, ...)
    #[command(alias = "svc")]
    Services(ServicesArgs),

    /// Provision users and user groups
    Users(UsersArgs),

    /// Manage the fleet configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  INVENTORY / ANALYSIS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct InventoryArgs {
    /// Also write the full inventory (devices, links, anomalies) as JSON
    #[arg(long, value_name = "FILE")]
    pub save: Option<PathBuf>,

    /// Skip topology inference
    #[arg(long)]
    pub no_links: bool,

    /// Skip anomaly detection
    #[arg(long)]
    pub no_anomalies: bool,
}

#[derive(Debug, Args)]
pub struct TopologyArgs {
    /// Disable substring matching of truncated neighbor addresses
    #[arg(long)]
    pub exact: bool,
}

#[derive(Debug, Args)]
pub struct AnomaliesArgs {
    /// Only show findings at or above this severity
    #[arg(long, short = 's', default_value = "info")]
    pub min_severity: SeverityFilter,

    /// Only show this category (e.g. `armed_watchdog_lease`)
    #[arg(long, short = 'c')]
    pub category: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SERVICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ServicesArgs {
    #[command(subcommand)]
    pub command: ServicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ServicesCommand {
    /// List management services on every router
    #[command(alias = "ls")]
    Show,

    /// Restrict service source addresses under a rollback watchdog
    Set(ServicesSetArgs),
}

#[derive(Debug, Args)]
pub struct ServicesSetArgs {
    /// SERVICE=NETWORKS, e.g. `ssh=10.0.0.0/8` (repeatable; replaces the
    /// config's [ip_services.services] table)
    #[arg(long = "service", short = 's', value_parser = parse_service)]
    pub services: Vec<(String, String)>,

    /// Write without arming the rollback watchdog
    #[arg(long)]
    pub no_watchdog: bool,

    /// Seconds until an unverified change reverts on the router
    #[arg(long, value_name = "SECS")]
    pub rollback_timeout: Option<u64>,

    /// Seconds to wait before the verification read
    #[arg(long, value_name = "SECS")]
    pub settle_delay: Option<u64>,
}

fn parse_service(s: &str) -> Result<(String, String), String> {
    let (name, addresses) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SERVICE=NETWORKS, got '{s}'"))?;
    if name.is_empty() {
        return Err("service name cannot be empty".into());
    }
    Ok((name.to_owned(), addresses.to_owned()))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  USERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// Create or update the groups and users from [user_management]
    Apply,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create an initial config file with guided setup
    Init,

    /// Display the resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Store a router password in the system keyring
    SetPassword {
        /// Router host as written in the config
        host: String,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
