//! Config subcommand handlers.

use std::fmt::Write as _;
use std::path::Path;

use dialoguer::{Confirm, Input, Password, Select};
use secrecy::SecretString;
use serde_json::Value;

use tikfleet_config::{Config, Credentials, RouterEntry};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

// ── Helpers ─────────────────────────────────────────────────────────

/// Config as JSON with every password replaced by `****`.
fn redacted(cfg: &Config) -> Result<Value, CliError> {
    fn mask(value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, v) in map.iter_mut() {
                    if key == "password" && !v.is_null() {
                        *v = Value::String("****".into());
                    } else {
                        mask(v);
                    }
                }
            }
            Value::Array(items) => items.iter_mut().for_each(mask),
            _ => {}
        }
    }

    let mut value = serde_json::to_value(cfg)?;
    mask(&mut value);
    Ok(value)
}

/// Human summary for `config show`.
fn format_config(cfg: &Config, path: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", path.display());
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "workers = {}", cfg.defaults.workers);

    let creds = &cfg.credentials;
    let _ = writeln!(out, "\n[credentials]");
    if let Some(ref u) = creds.username {
        let _ = writeln!(out, "username = \"{u}\"");
    }
    if creds.password.is_some() {
        let _ = writeln!(out, "password = \"****\"");
    }
    if let Some(ref env) = creds.password_env {
        let _ = writeln!(out, "password_env = \"{env}\"");
    }
    let _ = writeln!(out, "scheme = \"{}\"", creds.scheme);
    let _ = writeln!(out, "insecure = {}", creds.insecure);

    for r in &cfg.routers {
        let _ = writeln!(out, "\n[[routers]]");
        let _ = writeln!(out, "host = \"{}\"", r.host);
        if let Some(ref name) = r.name {
            let _ = writeln!(out, "name = \"{name}\"");
        }
        if let Some(ref u) = r.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if r.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
    }

    let svc = &cfg.ip_services;
    let _ = writeln!(out, "\n[ip_services]");
    let _ = writeln!(out, "enabled = {}", svc.enabled);
    let _ = writeln!(out, "watchdog = {}", svc.watchdog);
    let _ = writeln!(out, "rollback_timeout = {}", svc.rollback_timeout);
    for (name, rule) in &svc.services {
        if let Some(ref addresses) = rule.addresses {
            let _ = writeln!(out, "services.{name}.addresses = \"{addresses}\"");
        }
    }

    let users = &cfg.user_management;
    let _ = writeln!(out, "\n[user_management]");
    let _ = writeln!(out, "enabled = {}", users.enabled);
    let _ = write!(
        out,
        "# {} group(s), {} user(s)",
        users.groups.len(),
        users.users.len()
    );
    out
}

fn prompt_secret(prompt: &str) -> Result<SecretString, CliError> {
    let secret = Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(prompt_err)?;
    if secret.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "value cannot be empty".into(),
        });
    }
    Ok(SecretString::from(secret))
}

// ── Init: interactive wizard ────────────────────────────────────────

fn init(path: &Path) -> Result<(), CliError> {
    eprintln!("tikfleet configuration wizard");
    eprintln!("   Config path: {}\n", path.display());

    if path.exists() {
        let overwrite = Confirm::new()
            .with_prompt("A config file already exists. Overwrite it?")
            .default(false)
            .interact()
            .map_err(prompt_err)?;
        if !overwrite {
            eprintln!("Aborted.");
            return Ok(());
        }
    }

    let host: String = Input::new()
        .with_prompt("First router (host or IP)")
        .default("192.168.88.1".into())
        .interact_text()
        .map_err(prompt_err)?;
    let name: String = Input::new()
        .with_prompt("Name (optional)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;
    let username: String = Input::new()
        .with_prompt("Username shared by all routers")
        .default("admin".into())
        .interact_text()
        .map_err(prompt_err)?;

    let choices = &[
        "Store in system keyring (recommended)",
        "Read from an environment variable",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where should the password come from?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let mut credentials = Credentials {
        username: Some(username),
        ..Credentials::default()
    };
    match selection {
        0 => {
            let secret = prompt_secret("Password")?;
            tikfleet_config::store_password(&host, &secret)?;
            eprintln!("   Password stored in system keyring for {host}");
        }
        1 => {
            let env: String = Input::new()
                .with_prompt("Variable name")
                .default("TIKFLEET_PASSWORD".into())
                .interact_text()
                .map_err(prompt_err)?;
            credentials.password_env = Some(env);
        }
        _ => {
            let secret = Password::new()
                .with_prompt("Password")
                .interact()
                .map_err(prompt_err)?;
            credentials.password = Some(secret);
        }
    }

    let cfg = Config {
        credentials,
        routers: vec![RouterEntry {
            host,
            name: Some(name).filter(|n| !n.is_empty()),
            ..RouterEntry::default()
        }],
        ..Config::default()
    };
    tikfleet_config::save_config_to(&cfg, path)?;

    eprintln!("\nConfiguration written to {}", path.display());
    eprintln!("  Test it: tikfleet inventory");
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::config_path(global);

    match args.command {
        ConfigCommand::Init => init(&path),

        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = tikfleet_config::load_config_from(&path)?;
            let format = global.output.unwrap_or(OutputFormat::Table);
            let value = redacted(&cfg)?;
            let out = output::render_single(
                format,
                &value,
                |_| format_config(&cfg, &path),
                |_| path.display().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetPassword { host } => {
            let known = tikfleet_config::load_config_from(&path)
                .map(|cfg| cfg.routers.iter().any(|r| r.host == host))
                .unwrap_or(true);
            if !known {
                tracing::warn!(%host, "host is not in the configuration; storing anyway");
            }
            let secret = prompt_secret(&format!("Password for {host}"))?;
            tikfleet_config::store_password(&host, &secret)?;
            eprintln!("Password stored in system keyring for {host}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passwords_are_masked_everywhere() {
        let cfg = Config {
            credentials: Credentials {
                username: Some("admin".into()),
                password: Some("shared".into()),
                ..Credentials::default()
            },
            routers: vec![RouterEntry {
                host: "10.0.0.1".into(),
                password: Some("secret".into()),
                ..RouterEntry::default()
            }],
            ..Config::default()
        };
        let text = redacted(&cfg).map(|v| v.to_string()).unwrap_or_default();
        assert!(!text.contains("secret"));
        assert!(!text.contains("shared"));
        assert!(text.contains("****"));
        assert!(text.contains("admin"));

        let summary = format_config(&cfg, Path::new("/tmp/fleet.toml"));
        assert!(!summary.contains("secret"));
        assert!(summary.contains("host = \"10.0.0.1\""));
    }
}
