//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use tikfleet_core::Severity;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Severity label, colored when `color` is set.
pub fn paint_severity(severity: Severity, color: bool) -> String {
    let label = severity.to_string();
    if !color {
        return label;
    }
    match severity {
        Severity::Critical => label.red().bold().to_string(),
        Severity::Warning => label.yellow().to_string(),
        Severity::Info => label.cyan().to_string(),
    }
}

/// `ok` / `FAILED` style status cell.
pub fn paint_status(ok: bool, text: &str, color: bool) -> String {
    match (color, ok) {
        (false, _) => text.to_owned(),
        (true, true) => text.green().to_string(),
        (true, false) => text.red().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a custom `detail_fn` that returns a pre-formatted
/// string, since single-item views don't use the `Tabled` derive.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

pub(crate) fn render_json<T: serde::Serialize + ?Sized>(
    data: &T,
    compact: bool,
) -> Result<String, CliError> {
    let out = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(out)
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Internal {
        message: format!("YAML serialization failed: {e}"),
    })
}
