// HTTP transport settings for one RouterOS REST endpoint.
//
// Unreachable routers are the common failure in a fleet run, so the TCP
// connect phase gets its own, shorter budget than the whole request.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;

/// Upper bound on the connect phase, whatever the request timeout.
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// How the router's certificate is checked.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// System trust store.
    System,
    /// Trust the PEM bundle at this path in addition to the system store.
    CustomCa(PathBuf),
    /// Accept anything. RouterOS generates self-signed certificates.
    #[default]
    DangerAcceptInvalid,
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Whole-request budget, including reading the body.
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::default(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        self.timeout.min(MAX_CONNECT_TIMEOUT)
    }

    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout())
            .user_agent(concat!("tikfleet/", env!("CARGO_PKG_VERSION")));

        let builder = match &self.tls {
            TlsMode::System => builder,
            TlsMode::CustomCa(path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    Error::Tls(format!("cannot read CA bundle {}: {e}", path.display()))
                })?;
                let cert = reqwest::Certificate::from_pem(&pem)
                    .map_err(|e| Error::Tls(format!("invalid CA bundle {}: {e}", path.display())))?;
                builder.add_root_certificate(cert)
            }
            TlsMode::DangerAcceptInvalid => builder.danger_accept_invalid_certs(true),
        };

        builder
            .build()
            .map_err(|e| Error::Tls(format!("cannot build HTTP client: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_budget_never_exceeds_request_budget() {
        let short = TransportConfig {
            timeout: Duration::from_secs(2),
            ..TransportConfig::default()
        };
        assert_eq!(short.connect_timeout(), Duration::from_secs(2));

        let long = TransportConfig {
            timeout: Duration::from_secs(60),
            ..TransportConfig::default()
        };
        assert_eq!(long.connect_timeout(), MAX_CONNECT_TIMEOUT);
    }

    #[test]
    fn missing_ca_bundle_is_a_tls_error() {
        let config = TransportConfig {
            tls: TlsMode::CustomCa(PathBuf::from("/nonexistent/ca.pem")),
            ..TransportConfig::default()
        };
        let err = config.build_client().err();
        assert!(matches!(err, Some(Error::Tls(msg)) if msg.contains("/nonexistent/ca.pem")));
    }
}
