//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod config_cmd;
pub mod inventory;
pub mod services;
pub mod users;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::config::Runtime;
use crate::error::CliError;

/// Dispatch a router-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, runtime: &Runtime, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Inventory(args) => inventory::inventory(args, runtime, global).await,
        Command::Topology(args) => inventory::topology(args, runtime, global).await,
        Command::Anomalies(args) => inventory::anomalies(args, runtime, global).await,
        Command::Services(args) => services::handle(args, runtime, global).await,
        Command::Users(args) => users::handle(args, runtime, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
