#![allow(clippy::unwrap_used)]
// Integration tests for `RestClient` using wiremock.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{basic_auth, body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tikfleet_api::{Error, RestClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, RestClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = RestClient::with_client(
        reqwest::Client::new(),
        base_url,
        "admin".into(),
        "s3cret".to_string().into(),
    );
    (server, client)
}

fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_print_sends_basic_auth_and_parses_records() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/ip/address"))
        .and(basic_auth("admin", "s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { ".id": "*1", "address": "10.0.0.1/24", "interface": "ether1", "disabled": "false" },
            { ".id": "*2", "address": "10.0.1.1/24", "interface": "ether2", "disabled": "true" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let records = client.print("/ip/address").await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["address"], "10.0.0.1/24");
    assert_eq!(records[1]["disabled"], "true");
}

#[tokio::test]
async fn test_identity_reads_singleton_object() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/system/identity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "core-rtr" })))
        .mount(&server)
        .await;

    assert_eq!(client.identity().await.unwrap(), "core-rtr");
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/system/identity"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": 401,
            "message": "Unauthorized"
        })))
        .mount(&server)
        .await;

    let result = client.identity().await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_device_error_body_is_lifted_into_api_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/interface/wireless"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": 400,
            "message": "Bad Request",
            "detail": "no such command or directory (wireless)"
        })))
        .mount(&server)
        .await;

    let err = client.print("interface/wireless").await.unwrap_err();
    match &err {
        Error::Api {
            status,
            message,
            detail,
        } => {
            assert_eq!(*status, 400);
            assert_eq!(message, "Bad Request");
            assert_eq!(
                detail.as_deref(),
                Some("no such command or directory (wireless)")
            );
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
    assert!(err.to_string().contains("no such command"));
}

#[tokio::test]
async fn test_garbage_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/interface"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let result = client.print("/interface").await;
    assert!(matches!(result, Err(Error::Deserialization { .. })));
}

// ── Writes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_set_by_resolves_id_then_patches() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/ip/service"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { ".id": "*7", "name": "www", "address": "" },
            { ".id": "*9", "name": "ssh", "address": "" }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/ip/service/*9"))
        .and(body_json(json!({ "address": "10.0.0.0/8" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            ".id": "*9", "name": "ssh", "address": "10.0.0.0/8"
        })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .set_by("/ip/service", "name", "ssh", &fields(&[("address", "10.0.0.0/8")]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_set_by_missing_key_is_record_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/ip/service"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { ".id": "*7", "name": "www" }
        ])))
        .mount(&server)
        .await;

    let err = client
        .set_by("/ip/service", "name", "winbox", &fields(&[("address", "")]))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(matches!(err, Error::RecordNotFound { ref value, .. } if value == "winbox"));
}

#[tokio::test]
async fn test_add_scheduler_puts_startup_entry() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/rest/system/scheduler"))
        .and(body_json(json!({
            "name": "rollback_1700000000000",
            "start-time": "startup",
            "interval": "300s",
            "on-event": "/system scheduler remove [find name=\"rollback_1700000000000\"]"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            ".id": "*A", "name": "rollback_1700000000000"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client
        .add_scheduler(
            "rollback_1700000000000",
            Duration::from_secs(300),
            "/system scheduler remove [find name=\"rollback_1700000000000\"]",
        )
        .await
        .unwrap();

    assert_eq!(created.unwrap()[".id"], "*A");
}

#[tokio::test]
async fn test_remove_scheduler_deletes_by_id() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/system/scheduler"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { ".id": "*3", "name": "backup-nightly" },
            { ".id": "*A", "name": "rollback_1700000000000" }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/system/scheduler/*A"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.remove_scheduler("rollback_1700000000000").await.unwrap();
}
