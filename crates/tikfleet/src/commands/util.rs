//! Shared helpers for command handlers.

use std::io::{self, IsTerminal};

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal there is nobody to ask, so `--yes` is required.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)?;
    Ok(confirmed)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// `-` for empty optional cells.
pub fn or_dash(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or("-").to_owned()
}
