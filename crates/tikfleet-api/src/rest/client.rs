// REST HTTP client
//
// Wraps `reqwest::Client` with RouterOS-specific URL construction, basic
// auth on every request, and translation of the device's error body into
// `Error::Api`. Endpoint groups (menus, scheduler, system) live in sibling
// modules as inherent methods.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::record::{Record, records_from_value};
use crate::transport::TransportConfig;

/// RouterOS error body: `{"error": 400, "message": "Bad Request", "detail": ".."}`.
#[derive(Deserialize)]
struct RouterOsError {
    message: Option<String>,
    detail: Option<String>,
}

/// Raw HTTP client for one router's `/rest` API.
///
/// Paths are menu paths in slash form (`/ip/address`, `interface/wireless`);
/// a leading slash is optional. Every response value comes back as a string
/// map, see [`Record`].
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: SecretString,
}

impl RestClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the router root (`https://192.168.88.1` or
    /// `http://10.0.0.1:8080`); `/rest` is appended per request.
    pub fn new(
        base_url: Url,
        username: String,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, username, password))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        username: String,
        password: SecretString,
    ) -> Self {
        Self {
            http,
            base_url,
            username,
            password,
        }
    }

    /// The router base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The login name used for basic auth.
    pub fn username(&self) -> &str {
        &self.username
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/rest/{path}`.
    pub(crate) fn rest_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_matches('/');
        Ok(Url::parse(&format!("{base}/rest/{path}"))?)
    }

    /// Build `{base}/rest/{path}/{id}` for a single record.
    pub(crate) fn record_url(&self, path: &str, id: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_matches('/');
        Ok(Url::parse(&format!("{base}/rest/{path}/{id}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
    }

    /// Send a GET and normalize the body into records.
    pub(crate) async fn get(&self, url: Url) -> Result<Vec<Record>, Error> {
        debug!("GET {}", url);
        let resp = self.request(reqwest::Method::GET, url).send().await?;
        let body = Self::check(resp).await?;
        records_from_value(body)
    }

    /// Send a PATCH with a JSON object of fields.
    pub(crate) async fn patch(&self, url: Url, body: &Value) -> Result<Vec<Record>, Error> {
        debug!("PATCH {}", url);
        let resp = self
            .request(reqwest::Method::PATCH, url)
            .json(body)
            .send()
            .await?;
        let body = Self::check(resp).await?;
        records_from_value(body)
    }

    /// Send a PUT (record creation) with a JSON object of fields.
    pub(crate) async fn put(&self, url: Url, body: &Value) -> Result<Vec<Record>, Error> {
        debug!("PUT {}", url);
        let resp = self
            .request(reqwest::Method::PUT, url)
            .json(body)
            .send()
            .await?;
        let body = Self::check(resp).await?;
        records_from_value(body)
    }

    /// Send a DELETE. RouterOS answers with an empty body on success.
    pub(crate) async fn delete(&self, url: Url) -> Result<(), Error> {
        debug!("DELETE {}", url);
        let resp = self.request(reqwest::Method::DELETE, url).send().await?;
        Self::check(resp).await.map(|_| ())
    }

    /// Map the HTTP status and parse the body.
    ///
    /// 401 becomes `Authentication`; any other non-2xx becomes `Api`, with
    /// message and detail lifted from the RouterOS error body when present.
    /// An empty 2xx body is `Value::Null`.
    async fn check(resp: reqwest::Response) -> Result<Value, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "invalid username or password".into(),
            });
        }

        let body = resp.text().await?;
        trace!(status = status.as_u16(), len = body.len(), "response body");

        if !status.is_success() {
            let parsed = serde_json::from_str::<RouterOsError>(&body).ok();
            let (message, detail) = match parsed {
                Some(err) => (
                    err.message
                        .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").into()),
                    err.detail,
                ),
                None => (preview(&body), None),
            };
            return Err(Error::Api {
                status: status.as_u16(),
                message,
                detail,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| {
            Error::Deserialization {
                message: format!("{e} (body preview: {:?})", preview(&body)),
                body: body.clone(),
            }
        })
    }
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}
