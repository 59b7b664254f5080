// ── User and group provisioning ──
//
// Declarative create-or-update for `/user/group` and `/user`. These writes
// do not touch the management channel, so they run directly without a
// watchdog lease.

use std::collections::BTreeMap;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::info;

use crate::error::CoreError;
use crate::facade::{DeviceMutator, DeviceReader, MatchKey};

pub const USER_GROUP_PATH: &str = "/user/group";
pub const USER_PATH: &str = "/user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Provisioned {
    Changed,
    Unchanged,
}

/// Desired state of one user group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroupSpec {
    pub name: String,
    /// Policy flags such as `read`, `api`, `!ftp`.
    #[serde(default)]
    pub policy: Vec<String>,
    #[serde(default)]
    pub skin: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Desired state of one user.
#[derive(Debug, Clone)]
pub struct UserSpec {
    pub name: String,
    pub group: String,
    /// Set on every apply when present; RouterOS never reads it back.
    pub password: Option<SecretString>,
    /// Allowed source networks, comma separated.
    pub address: Option<String>,
    pub comment: Option<String>,
}

/// Create `spec`'s group or merge its policies into the existing one.
pub async fn ensure_user_group<D>(device: &D, spec: &UserGroupSpec) -> Result<Provisioned, CoreError>
where
    D: DeviceReader + DeviceMutator,
{
    let groups = device.read_resource(USER_GROUP_PATH).await?;
    let key = MatchKey::name(&spec.name);

    let Some(existing) = key.select(&groups) else {
        let mut fields = BTreeMap::from([
            ("name".to_owned(), spec.name.clone()),
            ("policy".to_owned(), spec.policy.join(",")),
        ]);
        insert_some(&mut fields, "skin", spec.skin.as_ref());
        insert_some(&mut fields, "comment", spec.comment.as_ref());
        device.create_record(USER_GROUP_PATH, &fields).await?;
        info!(group = %spec.name, "user group created");
        return Ok(Provisioned::Changed);
    };

    let current = split_policy(existing.get("policy").map_or("", String::as_str));
    let merged = merge_policy(&current, &spec.policy);

    let mut fields = BTreeMap::new();
    if !same_set(&current, &merged) {
        fields.insert("policy".to_owned(), merged.join(","));
    }
    insert_changed(&mut fields, existing, "skin", spec.skin.as_ref());
    insert_changed(&mut fields, existing, "comment", spec.comment.as_ref());

    if fields.is_empty() {
        return Ok(Provisioned::Unchanged);
    }
    device.update_record(USER_GROUP_PATH, &key, &fields).await?;
    info!(group = %spec.name, "user group updated");
    Ok(Provisioned::Changed)
}

/// Create `spec`'s user or bring the existing one in line.
pub async fn ensure_user<D>(device: &D, spec: &UserSpec) -> Result<Provisioned, CoreError>
where
    D: DeviceReader + DeviceMutator,
{
    let users = device.read_resource(USER_PATH).await?;
    let key = MatchKey::name(&spec.name);
    let password = spec
        .password
        .as_ref()
        .map(|p| p.expose_secret().to_owned());

    let Some(existing) = key.select(&users) else {
        let mut fields = BTreeMap::from([
            ("name".to_owned(), spec.name.clone()),
            ("group".to_owned(), spec.group.clone()),
        ]);
        insert_some(&mut fields, "password", password.as_ref());
        insert_some(&mut fields, "address", spec.address.as_ref());
        insert_some(&mut fields, "comment", spec.comment.as_ref());
        device.create_record(USER_PATH, &fields).await?;
        info!(user = %spec.name, "user created");
        return Ok(Provisioned::Changed);
    };

    let mut fields = BTreeMap::new();
    insert_changed(&mut fields, existing, "group", Some(&spec.group));
    insert_changed(&mut fields, existing, "address", spec.address.as_ref());
    insert_changed(&mut fields, existing, "comment", spec.comment.as_ref());
    insert_some(&mut fields, "password", password.as_ref());

    if fields.is_empty() {
        return Ok(Provisioned::Unchanged);
    }
    device.update_record(USER_PATH, &key, &fields).await?;
    info!(user = %spec.name, "user updated");
    Ok(Provisioned::Changed)
}

fn split_policy(policy: &str) -> Vec<String> {
    policy
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Requested flags win: asking for `p` drops `!p` and the reverse.
fn merge_policy(current: &[String], requested: &[String]) -> Vec<String> {
    let mut merged = current.to_vec();
    for flag in requested {
        let opposite = match flag.strip_prefix('!') {
            Some(base) => base.to_owned(),
            None => format!("!{flag}"),
        };
        merged.retain(|p| *p != opposite);
        if !merged.contains(flag) {
            merged.push(flag.clone());
        }
    }
    merged
}

fn same_set(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().all(|p| b.contains(p))
}

fn insert_some(fields: &mut BTreeMap<String, String>, name: &str, value: Option<&String>) {
    if let Some(value) = value {
        fields.insert(name.to_owned(), value.clone());
    }
}

fn insert_changed(
    fields: &mut BTreeMap<String, String>,
    existing: &BTreeMap<String, String>,
    name: &str,
    wanted: Option<&String>,
) {
    if let Some(wanted) = wanted.filter(|w| existing.get(name) != Some(*w)) {
        fields.insert(name.to_owned(), wanted.clone());
    }
}
