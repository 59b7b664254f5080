// ── Device facade ──
//
// Two small capability traits over one router's management API. Read-only
// components (collection, reachability checks) take a `DeviceReader`; the
// mutation protocol and provisioning take `DeviceReader + DeviceMutator`.
// `RestClient` implements both; tests substitute in-memory doubles.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tikfleet_api::{Record, RestClient};

use crate::error::CoreError;

/// Selects one record in a menu by a user-visible field (`name=ssh`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchKey {
    pub field: String,
    pub value: String,
}

impl MatchKey {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Match on the `name` column, the common case.
    pub fn name(value: impl Into<String>) -> Self {
        Self::new("name", value)
    }

    /// Find the first record this key selects.
    pub fn select<'a>(&self, records: &'a [Record]) -> Option<&'a Record> {
        records
            .iter()
            .find(|r| r.get(&self.field).is_some_and(|v| *v == self.value))
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.field, self.value)
    }
}

/// Read access to one router.
pub trait DeviceReader: Send + Sync {
    /// Every record of a menu (`/interface`, `/ip/address`, ...).
    fn read_resource(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<Vec<Record>, CoreError>> + Send;

    /// Any lightweight authenticated read. `Ok` means the management
    /// channel currently works.
    fn test_reachable(&self) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Write access to one router.
pub trait DeviceMutator: Send + Sync {
    /// Set one field on the record `key` selects.
    fn write_field(
        &self,
        path: &str,
        key: &MatchKey,
        field: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Set several fields on the record `key` selects in one call.
    fn update_record(
        &self,
        path: &str,
        key: &MatchKey,
        fields: &BTreeMap<String, String>,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn create_record(
        &self,
        path: &str,
        fields: &BTreeMap<String, String>,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Register a scheduler entry that first runs `script` once `interval`
    /// has elapsed.
    fn create_scheduled_task(
        &self,
        name: &str,
        interval: Duration,
        script: &str,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn delete_scheduled_task(&self, name: &str)
    -> impl Future<Output = Result<(), CoreError>> + Send;
}

// ── RouterOS REST implementation ─────────────────────────────────────

impl DeviceReader for RestClient {
    async fn read_resource(&self, path: &str) -> Result<Vec<Record>, CoreError> {
        Ok(self.print(path).await?)
    }

    async fn test_reachable(&self) -> Result<(), CoreError> {
        self.identity().await?;
        Ok(())
    }
}

impl DeviceMutator for RestClient {
    async fn write_field(
        &self,
        path: &str,
        key: &MatchKey,
        field: &str,
        value: &str,
    ) -> Result<(), CoreError> {
        let fields = BTreeMap::from([(field.to_owned(), value.to_owned())]);
        Ok(self.set_by(path, &key.field, &key.value, &fields).await?)
    }

    async fn update_record(
        &self,
        path: &str,
        key: &MatchKey,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), CoreError> {
        Ok(self.set_by(path, &key.field, &key.value, fields).await?)
    }

    async fn create_record(
        &self,
        path: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), CoreError> {
        self.add(path, fields).await?;
        Ok(())
    }

    async fn create_scheduled_task(
        &self,
        name: &str,
        interval: Duration,
        script: &str,
    ) -> Result<(), CoreError> {
        self.add_scheduler(name, interval, script).await?;
        Ok(())
    }

    async fn delete_scheduled_task(&self, name: &str) -> Result<(), CoreError> {
        Ok(self.remove_scheduler(name).await?)
    }
}
