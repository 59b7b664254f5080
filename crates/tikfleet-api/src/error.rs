use thiserror::Error;

/// Top-level error type for the `tikfleet-api` crate.
///
/// Covers every failure mode of the RouterOS REST surface: authentication,
/// transport, structured device-side rejections, and payload decoding.
/// `tikfleet-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Device rejected the basic-auth credentials (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Device-side errors ──────────────────────────────────────────
    /// Structured error from RouterOS (`{"error": N, "message": .., "detail": ..}`).
    #[error("RouterOS error (HTTP {status}): {message}{}", fmt_detail(.detail.as_deref()))]
    Api {
        status: u16,
        message: String,
        detail: Option<String>,
    },

    /// A menu lookup by key found nothing to operate on.
    #[error("No record in {path} with {field}={value}")]
    RecordNotFound {
        path: String,
        field: String,
        value: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

fn fmt_detail(detail: Option<&str>) -> String {
    detail.map(|d| format!(" ({d})")).unwrap_or_default()
}

impl Error {
    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RecordNotFound { .. } | Self::Api { status: 404, .. }
        )
    }
}
