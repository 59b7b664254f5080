// ── Runtime connection configuration ──
//
// These types describe how to reach one router. They carry credential
// data and connection tuning but never touch disk; the config crate builds
// them and hands them in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use tikfleet_api::{RestClient, TlsMode, TransportConfig};
use url::Url;

use crate::error::CoreError;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification. RouterOS ships self-signed certificates.
    #[default]
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Everything needed to talk to one router.
#[derive(Debug, Clone)]
pub struct RouterTarget {
    /// Host or IP as configured; also the device's management address.
    pub host: String,
    /// Optional operator-assigned name, used until the identity is known.
    pub name: Option<String>,
    /// REST base URL (`https://10.0.0.1`).
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    pub tls: TlsVerification,
    pub timeout: Duration,
}

impl RouterTarget {
    /// Name for logs and unreachable placeholders.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.host)
    }

    /// Build a REST client for this router.
    pub fn connect(&self) -> Result<RestClient, CoreError> {
        let transport = TransportConfig {
            tls: TlsMode::from(&self.tls),
            timeout: self.timeout,
        };
        Ok(RestClient::new(
            self.url.clone(),
            self.username.clone(),
            self.password.clone(),
            &transport,
        )?)
    }
}
