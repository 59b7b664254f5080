// ── Mutation batches ──

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::facade::MatchKey;

use super::script::{check_name, is_segment};

/// Menu holding the management services (`api`, `ssh`, `www`, `winbox`, ...).
pub const IP_SERVICE_PATH: &str = "/ip/service";

/// A validated RouterOS menu path in slash form (`/ip/service`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourcePath(String);

impl ResourcePath {
    /// Accepts `/ip/service`, `ip/service` or `/ip/service/`; every segment
    /// must be lowercase letters, digits or `-`.
    pub fn new(path: &str) -> Result<Self, CoreError> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        if segments.iter().all(|s| is_segment(s)) {
            Ok(Self(format!("/{}", segments.join("/"))))
        } else {
            Err(CoreError::ValidationFailed {
                message: format!("invalid menu path {path:?}"),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Script form: `/ip/service` becomes `/ip service`.
    pub fn script_menu(&self) -> String {
        let mut segments = self.0.trim_start_matches('/').split('/');
        let head = segments.next().unwrap_or_default();
        segments.fold(format!("/{head}"), |mut acc, s| {
            acc.push(' ');
            acc.push_str(s);
            acc
        })
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ResourcePath {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<ResourcePath> for String {
    fn from(path: ResourcePath) -> Self {
        path.0
    }
}

/// One desired field value on one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub path: ResourcePath,
    pub key: MatchKey,
    pub field: String,
    pub value: String,
}

impl FieldChange {
    pub fn new(
        path: ResourcePath,
        key: MatchKey,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let field = field.into();
        check_name(&key.field, "match field")?;
        check_name(&field, "field")?;
        Ok(Self {
            path,
            key,
            field,
            value: value.into(),
        })
    }

    /// `/ip/service name=ssh address`
    pub fn target(&self) -> String {
        format!("{} {} {}", self.path, self.key, self.field)
    }

    fn same_target(&self, other: &Self) -> bool {
        self.path == other.path && self.key == other.key && self.field == other.field
    }
}

/// Ordered field changes applied to one router under one lease.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationBatch {
    changes: Vec<FieldChange>,
}

impl MutationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: FieldChange) -> &mut Self {
        self.changes.push(change);
        self
    }

    /// Restrict management services to address lists, e.g.
    /// `[("ssh", "10.0.0.0/8"), ("winbox", "")]`.
    pub fn ip_services<I, S, A>(services: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (S, A)>,
        S: Into<String>,
        A: Into<String>,
    {
        let path = ResourcePath::new(IP_SERVICE_PATH)?;
        let mut batch = Self::new();
        for (service, addresses) in services {
            batch.push(FieldChange::new(
                path.clone(),
                MatchKey::name(service),
                "address",
                addresses,
            )?);
        }
        Ok(batch)
    }

    pub fn changes(&self) -> &[FieldChange] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Distinct menus touched, in first-use order.
    pub fn paths(&self) -> Vec<&ResourcePath> {
        let mut out: Vec<&ResourcePath> = Vec::new();
        for change in &self.changes {
            if !out.contains(&&change.path) {
                out.push(&change.path);
            }
        }
        out
    }

    /// Changes with repeated targets collapsed to their first occurrence.
    pub(crate) fn distinct_targets(&self) -> Vec<&FieldChange> {
        let mut out: Vec<&FieldChange> = Vec::new();
        for change in &self.changes {
            if !out.iter().any(|c| c.same_target(change)) {
                out.push(change);
            }
        }
        out
    }
}

/// A field's value before the batch touched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedValue {
    pub path: ResourcePath,
    pub key: MatchKey,
    pub field: String,
    pub original: String,
}
