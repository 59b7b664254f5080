//! CLI-side configuration: picks the config file, loads it through
//! `tikfleet-config`, and layers the global flags on top.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use tikfleet_config::{Config, ConfigError};
use tikfleet_core::{RouterTarget, TlsVerification};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// Config file in effect: `--config` / `TIKFLEET_CONFIG`, else the
/// platform default.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(tikfleet_config::config_path)
}

/// Loaded configuration plus the presentation settings every command needs.
pub struct Runtime {
    pub config: Config,
    pub path: PathBuf,
    pub output: OutputFormat,
    pub color: bool,
    pub workers: usize,
    pub quiet: bool,
    pub yes: bool,
}

impl Runtime {
    pub fn load(global: &GlobalOpts) -> Result<Self, CliError> {
        let path = config_path(global);
        let config = tikfleet_config::load_config_from(&path).map_err(|e| config_err(e, &path))?;

        let output = match global.output {
            Some(format) => format,
            None => parse_setting(&config.defaults.output, "defaults.output")?,
        };
        let color_mode = match global.color {
            Some(mode) => mode,
            None => parse_setting::<ColorMode>(&config.defaults.color, "defaults.color")?,
        };
        let workers = global.workers.unwrap_or(config.defaults.workers);

        Ok(Self {
            output,
            color: output::should_color(color_mode),
            workers,
            quiet: global.quiet,
            yes: global.yes,
            config,
            path,
        })
    }

    /// Targets for the selected routers with `--insecure` / `--timeout`
    /// applied.
    pub fn targets(&self, global: &GlobalOpts) -> Result<Vec<RouterTarget>, CliError> {
        let mut targets = tikfleet_config::router_targets(&self.config, &global.router)
            .map_err(|e| config_err(e, &self.path))?;

        for target in &mut targets {
            if global.insecure {
                target.tls = TlsVerification::DangerAcceptInvalid;
            }
            if let Some(secs) = global.timeout {
                target.timeout = Duration::from_secs(secs);
            }
        }
        tracing::debug!(count = targets.len(), workers = self.workers, "targets resolved");
        Ok(targets)
    }
}

/// Like `From<ConfigError>`, but names the file that was actually read.
fn config_err(err: ConfigError, path: &std::path::Path) -> CliError {
    match err {
        ConfigError::NoRouters => CliError::NoRouters {
            path: path.display().to_string(),
        },
        ConfigError::Figment(e) => CliError::Config {
            message: e.to_string(),
            path: path.display().to_string(),
        },
        other => CliError::from(other),
    }
}

fn parse_setting<T: ValueEnum>(raw: &str, field: &str) -> Result<T, CliError> {
    T::from_str(raw, true).map_err(|reason| CliError::Validation {
        field: field.into(),
        reason,
    })
}
