// System endpoints

use tracing::debug;

use crate::error::Error;
use crate::rest::client::RestClient;

/// Singleton menu holding the router's configured name.
pub const IDENTITY_PATH: &str = "/system/identity";

impl RestClient {
    /// Read the router identity.
    ///
    /// `GET /rest/system/identity`, a cheap authenticated read that also
    /// serves as the reachability probe.
    pub async fn identity(&self) -> Result<String, Error> {
        debug!(url = %self.base_url(), "reading identity");
        let mut records = self.print(IDENTITY_PATH).await?;
        let name = records
            .pop()
            .and_then(|mut r| r.remove("name"))
            .ok_or_else(|| Error::Deserialization {
                message: "identity response has no name".into(),
                body: String::new(),
            })?;
        Ok(name)
    }
}
