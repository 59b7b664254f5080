// Generic menu operations
//
// RouterOS exposes every configuration menu the same way, so reads, field
// writes, record creation and removal are path-generic. Lookups by a
// user-visible key (`name`, `address`) resolve to the internal `.id` first.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::Error;
use crate::record::{ID_KEY, Record};
use crate::rest::client::RestClient;

impl RestClient {
    /// List every record in a menu.
    ///
    /// `GET /rest/{path}`
    pub async fn print(&self, path: &str) -> Result<Vec<Record>, Error> {
        let url = self.rest_url(path)?;
        self.get(url).await
    }

    /// Find the `.id` of the first record where `field == value`.
    ///
    /// Returns `Error::RecordNotFound` when nothing matches.
    pub async fn find_id(&self, path: &str, field: &str, value: &str) -> Result<String, Error> {
        let records = self.print(path).await?;
        records
            .into_iter()
            .find(|r| r.get(field).is_some_and(|v| v == value))
            .and_then(|mut r| r.remove(ID_KEY))
            .ok_or_else(|| Error::RecordNotFound {
                path: path.to_owned(),
                field: field.to_owned(),
                value: value.to_owned(),
            })
    }

    /// Update fields on one record by `.id`.
    ///
    /// `PATCH /rest/{path}/{id}`
    pub async fn set(
        &self,
        path: &str,
        id: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        let url = self.record_url(path, id)?;
        debug!(path, id, fields = fields.len(), "updating record");
        self.patch(url, &to_object(fields)).await.map(|_| ())
    }

    /// Update fields on the record where `key_field == key_value`.
    pub async fn set_by(
        &self,
        path: &str,
        key_field: &str,
        key_value: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        let id = self.find_id(path, key_field, key_value).await?;
        self.set(path, &id, fields).await
    }

    /// Create a record and return it as the device echoed it back.
    ///
    /// `PUT /rest/{path}`
    pub async fn add(
        &self,
        path: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<Option<Record>, Error> {
        let url = self.rest_url(path)?;
        debug!(path, "creating record");
        let mut created = self.put(url, &to_object(fields)).await?;
        Ok(created.pop())
    }

    /// Remove one record by `.id`.
    ///
    /// `DELETE /rest/{path}/{id}`
    pub async fn remove(&self, path: &str, id: &str) -> Result<(), Error> {
        let url = self.record_url(path, id)?;
        debug!(path, id, "removing record");
        self.delete(url).await
    }
}

fn to_object(fields: &BTreeMap<String, String>) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect::<Map<String, Value>>(),
    )
}
