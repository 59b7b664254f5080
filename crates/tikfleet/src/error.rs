//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use tikfleet_config::ConfigError;
use tikfleet_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    /// The command ran, but at least one router failed.
    pub const PARTIAL: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to router at {url}")]
    #[diagnostic(
        code(tikfleet::connection_failed),
        help(
            "Check that the router is reachable and the REST API is enabled\n\
             (`/ip service` www-ssl, or www for plain HTTP)."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Request timed out")]
    #[diagnostic(
        code(tikfleet::timeout),
        help("Increase the timeout with --timeout or check router responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(tikfleet::auth_failed),
        help(
            "Verify the username and password for this router.\n\
             Store a password with: tikfleet config set-password <host>"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for router '{host}'")]
    #[diagnostic(
        code(tikfleet::no_credentials),
        help(
            "Set [credentials] username/password in the config, use password_env,\n\
             or run: tikfleet config set-password {host}"
        )
    )]
    NoCredentials { host: String },

    // ── Selection ────────────────────────────────────────────────────
    #[error("No routers configured")]
    #[diagnostic(
        code(tikfleet::no_routers),
        help(
            "Add [[routers]] entries to {path}\n\
             Or create a config with: tikfleet config init"
        )
    )]
    NoRouters { path: String },

    #[error("Router '{name}' is not in the configuration")]
    #[diagnostic(
        code(tikfleet::unknown_router),
        help("Routers are selected by host or name. Run: tikfleet config show")
    )]
    UnknownRouter { name: String },

    #[error("{resource} '{identifier}' not found")]
    #[diagnostic(code(tikfleet::not_found))]
    NotFound {
        resource: String,
        identifier: String,
    },

    // ── Router responses ─────────────────────────────────────────────
    #[error("Router rejected the request: {message}")]
    #[diagnostic(code(tikfleet::rejected))]
    Rejected { message: String },

    // ── Mutation ─────────────────────────────────────────────────────
    #[error("Nothing to apply: {reason}")]
    #[diagnostic(
        code(tikfleet::nothing_to_apply),
        help("Enable and fill the [{section}] section of the config.")
    )]
    NothingToApply { section: String, reason: String },

    #[error("{action} failed on {failed} of {total} router(s)")]
    #[diagnostic(
        code(tikfleet::partial_failure),
        help("See the table above. Routers with an armed lease revert on their own.")
    )]
    PartialFailure {
        action: String,
        failed: usize,
        total: usize,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(tikfleet::validation))]
    Validation { field: String, reason: String },

    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(tikfleet::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    #[diagnostic(code(tikfleet::config), help("Config file: {path}"))]
    Config { message: String, path: String },

    #[error("Keyring error: {message}")]
    #[diagnostic(
        code(tikfleet::keyring),
        help("Use password_env or a plaintext password when no keyring is available.")
    )]
    Keyring { message: String },

    #[error("Internal error: {message}")]
    #[diagnostic(code(tikfleet::internal))]
    Internal { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize output: {0}")]
    #[diagnostic(code(tikfleet::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } | Self::Keyring { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } | Self::UnknownRouter { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::NoRouters { .. }
            | Self::NothingToApply { .. }
            | Self::Config { .. } => exit_code::USAGE,
            Self::PartialFailure { .. } => exit_code::PARTIAL,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::Timeout => CliError::Timeout,
            CoreError::NotFound {
                resource,
                identifier,
            } => CliError::NotFound {
                resource,
                identifier,
            },
            CoreError::Rejected { message, .. } => CliError::Rejected { message },
            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Script { message } => CliError::Validation {
                field: "rollback script".into(),
                reason: message,
            },
            CoreError::Config { message } => CliError::Config {
                message,
                path: tikfleet_config::config_path().display().to_string(),
            },
            CoreError::Internal(message) => CliError::Internal { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { host } => CliError::NoCredentials { host },
            ConfigError::NoRouters => CliError::NoRouters {
                path: tikfleet_config::config_path().display().to_string(),
            },
            ConfigError::UnknownRouter { name } => CliError::UnknownRouter { name },
            ConfigError::Keyring(message) => CliError::Keyring { message },
            ConfigError::Io(e) => CliError::Io(e),
            ConfigError::Core(e) => CliError::from(e),
            other @ (ConfigError::Serialization(_) | ConfigError::Figment(_)) => {
                CliError::Config {
                    message: other.to_string(),
                    path: tikfleet_config::config_path().display().to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_map_to_usage_codes() {
        assert_eq!(
            CliError::from(ConfigError::NoRouters).exit_code(),
            exit_code::USAGE
        );
        assert_eq!(
            CliError::from(ConfigError::UnknownRouter { name: "x".into() }).exit_code(),
            exit_code::NOT_FOUND
        );
        assert_eq!(
            CliError::from(ConfigError::NoCredentials { host: "h".into() }).exit_code(),
            exit_code::AUTH
        );
    }

    #[test]
    fn core_errors_keep_their_category() {
        assert_eq!(CliError::from(CoreError::Timeout).exit_code(), exit_code::TIMEOUT);
        let err = CliError::from(CoreError::ConnectionFailed {
            url: "https://10.0.0.1".into(),
            reason: "refused".into(),
        });
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn partial_failure_has_its_own_code() {
        let err = CliError::PartialFailure {
            action: "services set".into(),
            failed: 1,
            total: 3,
        };
        assert_eq!(err.exit_code(), exit_code::PARTIAL);
        assert_eq!(err.to_string(), "services set failed on 1 of 3 router(s)");
    }
}
