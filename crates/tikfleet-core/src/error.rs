// ── Core error types ──
//
// Domain errors from tikfleet-core. Consumers never see HTTP status codes
// or JSON parse failures directly; the `From<tikfleet_api::Error>` impl
// translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to router at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Router request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Not found: {resource} with {identifier}")]
    NotFound {
        resource: String,
        identifier: String,
    },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Router rejected the request: {message}")]
    Rejected {
        message: String,
        status: Option<u16>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    /// A value or name cannot be rendered safely into a RouterOS script.
    #[error("Cannot encode rollback script: {message}")]
    Script { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<tikfleet_api::Error> for CoreError {
    fn from(err: tikfleet_api::Error) -> Self {
        match err {
            tikfleet_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            tikfleet_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Rejected {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            tikfleet_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            tikfleet_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            tikfleet_api::Error::Api {
                status: 404,
                message,
                ..
            } => CoreError::NotFound {
                resource: "resource".into(),
                identifier: message,
            },
            tikfleet_api::Error::Api {
                status,
                message,
                detail,
            } => CoreError::Rejected {
                message: match detail {
                    Some(detail) => format!("{message}: {detail}"),
                    None => message,
                },
                status: Some(status),
            },
            tikfleet_api::Error::RecordNotFound { path, field, value } => CoreError::NotFound {
                resource: path,
                identifier: format!("{field}={value}"),
            },
            tikfleet_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
