//! Fleet configuration for tikfleet.
//!
//! One TOML file lists the routers, shared credentials, analysis thresholds
//! and the declarative changes to push (management-service restrictions,
//! users and groups). This crate loads it, resolves credentials (env var,
//! then OS keyring, then plaintext) and translates it into the runtime types
//! `tikfleet-core` works with. Core never sees these structs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use tikfleet_core::{
    AnalysisOptions, AnomalyRules, CoreError, MutationBatch, RouterTarget, TlsVerification,
    TopologyOptions, UserGroupSpec, UserSpec, WatchdogOptions,
};

/// Keyring service name; entries are `<host>/password`.
pub const KEYRING_SERVICE: &str = "tikfleet";

/// Environment variable prefix; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "TIKFLEET_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for router '{host}'")]
    NoCredentials { host: String },

    #[error("no routers configured")]
    NoRouters,

    #[error("router '{name}' is not in the configuration")]
    UnknownRouter { name: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<keyring::Error> for ConfigError {
    fn from(err: keyring::Error) -> Self {
        Self::Keyring(err.to_string())
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    /// Credentials and transport settings shared by every router.
    #[serde(default)]
    pub credentials: Credentials,

    #[serde(default)]
    pub routers: Vec<RouterEntry>,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub ip_services: IpServicesConfig,

    #[serde(default)]
    pub user_management: UserManagementConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Routers worked on concurrently.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            workers: default_workers(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_workers() -> usize {
    tikfleet_core::DEFAULT_WORKERS
}
fn default_scheme() -> String {
    "https".into()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Credentials {
    pub username: Option<String>,

    /// Plaintext password (prefer keyring or `password_env`).
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    /// REST port; the scheme's default when unset.
    pub port: Option<u16>,

    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Accept the self-signed certificates RouterOS ships with.
    #[serde(default = "default_true")]
    pub insecure: bool,

    /// CA certificate used when `insecure` is off.
    pub ca_cert: Option<PathBuf>,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            password_env: None,
            port: None,
            scheme: default_scheme(),
            insecure: true,
            ca_cert: None,
        }
    }
}

/// One router. Unset fields fall back to `[credentials]` and `[defaults]`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RouterEntry {
    /// Management address or hostname.
    pub host: String,
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub password_env: Option<String>,
    pub port: Option<u16>,
    pub scheme: Option<String>,
    pub insecure: Option<bool>,
    pub ca_cert: Option<PathBuf>,
    pub timeout: Option<u64>,
}

impl RouterEntry {
    /// Whether `selector` names this router (by host or name).
    pub fn matches(&self, selector: &str) -> bool {
        self.host == selector || self.name.as_deref() == Some(selector)
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_true")]
    pub detect_links: bool,

    #[serde(default = "default_true")]
    pub detect_anomalies: bool,

    /// Allow substring matching of truncated neighbor addresses.
    #[serde(default = "default_true")]
    pub partial_address_match: bool,

    #[serde(default)]
    pub rules: AnomalyRules,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            detect_links: true,
            detect_anomalies: true,
            partial_address_match: true,
            rules: AnomalyRules::default(),
        }
    }
}

/// Management-service restrictions pushed under the watchdog.
#[derive(Debug, Deserialize, Serialize)]
pub struct IpServicesConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Arm a rollback lease before writing.
    #[serde(default = "default_true")]
    pub watchdog: bool,

    /// Seconds until an unconfirmed change reverts on the router.
    #[serde(default = "default_rollback_timeout")]
    pub rollback_timeout: u64,

    /// Seconds between the last write and the verification read.
    #[serde(default = "default_settle_delay")]
    pub settle_delay: u64,

    /// Service name (`ssh`, `winbox`, `api`, ...) to allowed networks.
    #[serde(default)]
    pub services: BTreeMap<String, ServiceRule>,
}

impl Default for IpServicesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            watchdog: true,
            rollback_timeout: default_rollback_timeout(),
            settle_delay: default_settle_delay(),
            services: BTreeMap::new(),
        }
    }
}

fn default_rollback_timeout() -> u64 {
    300
}
fn default_settle_delay() -> u64 {
    3
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceRule {
    /// Comma-separated networks. Unset leaves the service alone; an empty
    /// string lifts the restriction.
    pub addresses: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UserManagementConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub groups: Vec<UserGroupSpec>,

    #[serde(default)]
    pub users: Vec<UserEntry>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserEntry {
    pub name: String,
    pub group: String,
    pub password: Option<String>,
    pub password_env: Option<String>,
    pub address: Option<String>,
    pub comment: Option<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "tikfleet", "tikfleet").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("tikfleet");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load defaults, then `path`, then `TIKFLEET_*` environment variables.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load from the canonical config path.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

// ── Credential resolution ───────────────────────────────────────────

/// Username for `router`: its own, then the shared one.
pub fn resolve_username(router: &RouterEntry, creds: &Credentials) -> Result<String, ConfigError> {
    router
        .username
        .clone()
        .or_else(|| creds.username.clone())
        .ok_or_else(|| ConfigError::NoCredentials {
            host: router.host.clone(),
        })
}

/// Password for `router`.
///
/// Order: the router's `password_env`, the shared `password_env`, the
/// keyring entry `<host>/password`, the router's plaintext password, the
/// shared plaintext password.
pub fn resolve_password(
    router: &RouterEntry,
    creds: &Credentials,
) -> Result<SecretString, ConfigError> {
    // 1. Env vars named in config
    for env_name in [&router.password_env, &creds.password_env]
        .into_iter()
        .flatten()
    {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(&router.host)) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    if let Some(pw) = router.password.as_ref().or(creds.password.as_ref()) {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        host: router.host.clone(),
    })
}

/// Store a router password in the OS keyring.
pub fn store_password(host: &str, password: &SecretString) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(host))?;
    entry.set_password(password.expose_secret())?;
    Ok(())
}

fn keyring_user(host: &str) -> String {
    format!("{host}/password")
}

// ── Translation to core types ───────────────────────────────────────

/// REST base URL for `router`. A host given as a full URL is used as is.
pub fn router_url(router: &RouterEntry, creds: &Credentials) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::Validation {
        field: format!("routers.{}.host", router.host),
        reason,
    };

    if router.host.contains("://") {
        return Url::parse(&router.host).map_err(|e| invalid(e.to_string()));
    }

    let scheme = router.scheme.as_deref().unwrap_or(&creds.scheme);
    if scheme != "https" && scheme != "http" {
        return Err(invalid(format!("unsupported scheme '{scheme}'")));
    }
    let host = if router.host.contains(':') && !router.host.starts_with('[') {
        format!("[{}]", router.host)
    } else {
        router.host.clone()
    };
    let port = router
        .port
        .or(creds.port)
        .map(|p| format!(":{p}"))
        .unwrap_or_default();

    Url::parse(&format!("{scheme}://{host}{port}")).map_err(|e| invalid(e.to_string()))
}

/// Build the runtime target for one router entry.
pub fn router_target(router: &RouterEntry, config: &Config) -> Result<RouterTarget, ConfigError> {
    let creds = &config.credentials;
    let url = router_url(router, creds)?;

    let tls = if router.insecure.unwrap_or(creds.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ca_path) = router.ca_cert.as_ref().or(creds.ca_cert.as_ref()) {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let host = url
        .host_str()
        .map_or_else(|| router.host.clone(), |h| h.trim_matches(['[', ']']).to_owned());

    Ok(RouterTarget {
        host,
        name: router.name.clone(),
        url,
        username: resolve_username(router, creds)?,
        password: resolve_password(router, creds)?,
        tls,
        timeout: Duration::from_secs(router.timeout.unwrap_or(config.defaults.timeout)),
    })
}

/// Targets for every configured router, or only those named in `only`
/// (matched by host or name, in config order).
pub fn router_targets(config: &Config, only: &[String]) -> Result<Vec<RouterTarget>, ConfigError> {
    if config.routers.is_empty() {
        return Err(ConfigError::NoRouters);
    }
    if let Some(missing) = only
        .iter()
        .find(|sel| !config.routers.iter().any(|r| r.matches(sel)))
    {
        return Err(ConfigError::UnknownRouter {
            name: missing.clone(),
        });
    }

    config
        .routers
        .iter()
        .filter(|r| only.is_empty() || only.iter().any(|sel| r.matches(sel)))
        .map(|r| router_target(r, config))
        .collect()
}

pub fn analysis_options(config: &Config) -> AnalysisOptions {
    let analysis = &config.analysis;
    AnalysisOptions {
        detect_links: analysis.detect_links,
        detect_anomalies: analysis.detect_anomalies,
        topology: TopologyOptions {
            partial_address_match: analysis.partial_address_match,
        },
        rules: analysis.rules.clone(),
    }
}

pub fn watchdog_options(config: &Config) -> WatchdogOptions {
    let services = &config.ip_services;
    WatchdogOptions {
        arm: services.watchdog,
        timeout: Duration::from_secs(services.rollback_timeout),
        settle_delay: Duration::from_secs(services.settle_delay),
    }
}

/// The `[ip_services]` table as one mutation batch. Services without an
/// `addresses` key are skipped.
pub fn service_batch(config: &Config) -> Result<MutationBatch, ConfigError> {
    let rules = config
        .ip_services
        .services
        .iter()
        .filter_map(|(name, rule)| rule.addresses.clone().map(|a| (name.clone(), a)));
    Ok(MutationBatch::ip_services(rules)?)
}

pub fn user_group_specs(config: &Config) -> Vec<UserGroupSpec> {
    config.user_management.groups.clone()
}

/// Users with passwords resolved from `password_env` or plaintext.
pub fn user_specs(config: &Config) -> Result<Vec<UserSpec>, ConfigError> {
    config
        .user_management
        .users
        .iter()
        .map(|user| {
            if user.name.is_empty() || user.group.is_empty() {
                return Err(ConfigError::Validation {
                    field: "user_management.users".into(),
                    reason: "every user needs a name and a group".into(),
                });
            }
            let password = match &user.password_env {
                Some(env_name) => Some(std::env::var(env_name).map_err(|_| {
                    ConfigError::Validation {
                        field: format!("user_management.users.{}.password_env", user.name),
                        reason: format!("environment variable {env_name} is not set"),
                    }
                })?),
                None => user.password.clone(),
            };
            Ok(UserSpec {
                name: user.name.clone(),
                group: user.group.clone(),
                password: password.map(SecretString::from),
                address: user.address.clone(),
                comment: user.comment.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry(host: &str) -> RouterEntry {
        RouterEntry {
            host: host.into(),
            ..RouterEntry::default()
        }
    }

    #[test]
    fn url_uses_shared_scheme_and_port() {
        let creds = Credentials {
            port: Some(8443),
            ..Credentials::default()
        };
        let url = router_url(&entry("10.0.0.1"), &creds).unwrap();
        assert_eq!(url.as_str(), "https://10.0.0.1:8443/");
    }

    #[test]
    fn router_overrides_win() {
        let router = RouterEntry {
            scheme: Some("http".into()),
            port: Some(8080),
            ..entry("edge.lan")
        };
        let url = router_url(&router, &Credentials::default()).unwrap();
        assert_eq!(url.as_str(), "http://edge.lan:8080/");
    }

    #[test]
    fn ipv6_hosts_are_bracketed() {
        let url = router_url(&entry("fd00::1"), &Credentials::default()).unwrap();
        assert_eq!(url.host_str(), Some("[fd00::1]"));
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let router = RouterEntry {
            scheme: Some("ftp".into()),
            ..entry("10.0.0.1")
        };
        assert!(matches!(
            router_url(&router, &Credentials::default()),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn routers_match_by_host_or_name() {
        let router = RouterEntry {
            name: Some("core".into()),
            ..entry("10.0.0.1")
        };
        assert!(router.matches("10.0.0.1"));
        assert!(router.matches("core"));
        assert!(!router.matches("edge"));
    }
}
