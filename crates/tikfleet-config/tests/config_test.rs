#![allow(clippy::unwrap_used)]
// Loading, env overrides and translation to core types.

use std::path::Path;
use std::time::Duration;

use figment::Jail;
use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;

use tikfleet_config::{
    Config, ConfigError, RouterEntry, analysis_options, load_config_from, router_targets,
    save_config_to, service_batch, user_specs, watchdog_options,
};
use tikfleet_core::TlsVerification;

const FLEET: &str = r#"
[defaults]
timeout = 15
workers = 8

[credentials]
username = "admin"
password = "shared-secret"

[[routers]]
host = "10.0.0.1"
name = "core"

[[routers]]
host = "10.0.0.2"
username = "ops"
password = "edge-secret"
insecure = false
ca_cert = "/etc/tikfleet/ca.pem"
timeout = 30

[analysis]
partial_address_match = false

[analysis.rules]
uncommented_threshold = 5
min_major_version = 7

[ip_services]
enabled = true
rollback_timeout = 120

[ip_services.services.ssh]
addresses = "10.0.0.0/8"

[ip_services.services.winbox]
addresses = ""

[ip_services.services.api]

[user_management]
enabled = true

[[user_management.groups]]
name = "noc"
policy = ["read", "api", "!ftp"]

[[user_management.users]]
name = "monitor"
group = "noc"
password_env = "TIKFLEET_TEST_MONITOR_PW"
address = "10.0.0.0/8"
"#;

fn figment_err(e: ConfigError) -> figment::Error {
    e.to_string().into()
}

// ── Loading ─────────────────────────────────────────────────────────

#[test]
fn loads_every_section() {
    Jail::expect_with(|jail| {
        jail.create_file("fleet.toml", FLEET)?;
        let cfg = load_config_from(Path::new("fleet.toml")).map_err(figment_err)?;

        assert_eq!(cfg.defaults.timeout, 15);
        assert_eq!(cfg.defaults.workers, 8);
        assert_eq!(cfg.defaults.output, "table");
        assert_eq!(cfg.routers.len(), 2);
        assert!(cfg.ip_services.enabled);
        assert_eq!(cfg.ip_services.services.len(), 3);
        assert_eq!(cfg.user_management.groups[0].policy.len(), 3);

        let analysis = analysis_options(&cfg);
        assert!(!analysis.topology.partial_address_match);
        assert_eq!(analysis.rules.uncommented_threshold, 5);
        assert_eq!(analysis.rules.min_major_version, 7);
        assert_eq!(analysis.rules.inactive_secret_threshold, 10);
        Ok(())
    });
}

#[test]
fn missing_file_yields_defaults() {
    Jail::expect_with(|_| {
        let cfg = load_config_from(Path::new("absent.toml")).map_err(figment_err)?;
        assert!(cfg.routers.is_empty());
        assert_eq!(cfg.defaults.timeout, 10);
        assert!(cfg.credentials.insecure);
        assert!(matches!(
            router_targets(&cfg, &[]),
            Err(ConfigError::NoRouters)
        ));
        Ok(())
    });
}

#[test]
fn env_overrides_nested_keys() {
    Jail::expect_with(|jail| {
        jail.create_file("fleet.toml", FLEET)?;
        jail.set_env("TIKFLEET_DEFAULTS__TIMEOUT", "45");
        jail.set_env("TIKFLEET_IP_SERVICES__ROLLBACK_TIMEOUT", "60");

        let cfg = load_config_from(Path::new("fleet.toml")).map_err(figment_err)?;
        assert_eq!(cfg.defaults.timeout, 45);
        assert_eq!(watchdog_options(&cfg).timeout, Duration::from_secs(60));
        Ok(())
    });
}

// ── Translation ─────────────────────────────────────────────────────

#[test]
fn targets_inherit_shared_settings() {
    Jail::expect_with(|jail| {
        jail.create_file("fleet.toml", FLEET)?;
        let cfg = load_config_from(Path::new("fleet.toml")).map_err(figment_err)?;
        let targets = router_targets(&cfg, &[]).map_err(figment_err)?;

        let core = &targets[0];
        assert_eq!(core.host, "10.0.0.1");
        assert_eq!(core.label(), "core");
        assert_eq!(core.url.as_str(), "https://10.0.0.1/");
        assert_eq!(core.username, "admin");
        assert_eq!(core.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(core.timeout, Duration::from_secs(15));

        let edge = &targets[1];
        assert_eq!(edge.username, "ops");
        assert_eq!(edge.password.expose_secret(), "edge-secret");
        assert_eq!(
            edge.tls,
            TlsVerification::CustomCa("/etc/tikfleet/ca.pem".into())
        );
        assert_eq!(edge.timeout, Duration::from_secs(30));
        Ok(())
    });
}

#[test]
fn password_env_wins_over_plaintext() {
    Jail::expect_with(|jail| {
        jail.create_file("fleet.toml", FLEET)?;
        jail.set_env("TIKFLEET_TEST_CORE_PW", "from-env");
        let mut cfg = load_config_from(Path::new("fleet.toml")).map_err(figment_err)?;
        cfg.routers[0].password_env = Some("TIKFLEET_TEST_CORE_PW".into());

        let targets = router_targets(&cfg, &["core".into()]).map_err(figment_err)?;
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].password.expose_secret(), "from-env");
        Ok(())
    });
}

#[test]
fn selecting_an_unknown_router_fails() {
    let cfg = Config {
        routers: vec![RouterEntry {
            host: "10.0.0.1".into(),
            username: Some("admin".into()),
            password: Some("x".into()),
            ..RouterEntry::default()
        }],
        ..Config::default()
    };

    let err = router_targets(&cfg, &["nowhere".into()]).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownRouter { name } if name == "nowhere"));
}

#[test]
fn router_without_username_has_no_credentials() {
    let cfg = Config {
        routers: vec![RouterEntry {
            host: "10.0.0.1".into(),
            ..RouterEntry::default()
        }],
        ..Config::default()
    };

    assert!(matches!(
        router_targets(&cfg, &[]),
        Err(ConfigError::NoCredentials { .. })
    ));
}

#[test]
fn service_table_becomes_a_batch() {
    Jail::expect_with(|jail| {
        jail.create_file("fleet.toml", FLEET)?;
        let cfg = load_config_from(Path::new("fleet.toml")).map_err(figment_err)?;
        let batch = service_batch(&cfg).map_err(figment_err)?;

        // `api` has no addresses key and is left alone; order is by name.
        let targets: Vec<(String, String)> = batch
            .changes()
            .iter()
            .map(|c| (c.key.value.clone(), c.value.clone()))
            .collect();
        assert_eq!(
            targets,
            vec![
                ("ssh".to_owned(), "10.0.0.0/8".to_owned()),
                ("winbox".to_owned(), String::new()),
            ]
        );
        Ok(())
    });
}

#[test]
fn user_passwords_come_from_env() {
    Jail::expect_with(|jail| {
        jail.create_file("fleet.toml", FLEET)?;
        let cfg = load_config_from(Path::new("fleet.toml")).map_err(figment_err)?;
        assert!(user_specs(&cfg).is_err());

        jail.set_env("TIKFLEET_TEST_MONITOR_PW", "hunter2");
        let users = user_specs(&cfg).map_err(figment_err)?;
        assert_eq!(users[0].name, "monitor");
        assert_eq!(
            users[0].password.as_ref().unwrap().expose_secret(),
            "hunter2"
        );
        Ok(())
    });
}

// ── Saving ──────────────────────────────────────────────────────────

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let cfg = Config {
        routers: vec![RouterEntry {
            host: "10.0.0.7".into(),
            name: Some("lab".into()),
            ..RouterEntry::default()
        }],
        ..Config::default()
    };
    save_config_to(&cfg, &path).unwrap();

    let loaded = load_config_from(&path).unwrap();
    assert_eq!(loaded.routers.len(), 1);
    assert_eq!(loaded.routers[0].name.as_deref(), Some("lab"));
    assert_eq!(loaded.ip_services.rollback_timeout, 300);
}
