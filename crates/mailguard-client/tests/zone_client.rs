use std::time::Duration;

use mailguard_client::{GuardError, RateLimit, RetryPolicy, ZoneApi, ZoneClient};
use mailguard_core::{ResourceRecord, Zone};
use serde_json::json;
use wiremock::matchers::{basic_auth, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, retries: u32) -> ZoneClient {
    ZoneClient::builder("robot", "secret")
        .base_url(server.uri())
        .context("4")
        .retry(
            RetryPolicy::new()
                .max_retries(retries)
                .initial_delay(Duration::from_millis(1))
                .max_delay(Duration::from_millis(5)),
        )
        .rate_limit(RateLimit {
            capacity: 100,
            refill_interval: Duration::from_millis(50),
        })
        .page_size(2)
        .build()
        .unwrap()
}

fn zone_body() -> serde_json::Value {
    json!({
        "status": {"type": "SUCCESS", "text": "Zone info successfully inquired."},
        "data": [{
            "origin": "example.com",
            "created": "2023-02-01T10:00:00.000+0100",
            "updated": "2024-05-01T10:00:00.000+0100",
            "owner": {"context": 4, "user": "robot"},
            "soa": {"refresh": 43200, "retry": 7200, "expire": 1209600, "ttl": 86400},
            "resourceRecords": [
                {"name": "", "type": "TXT", "value": "v=spf1 mx -all", "ttl": 3600},
                {"name": "www", "type": "A", "value": "192.0.2.10", "ttl": 3600}
            ]
        }]
    })
}

#[tokio::test]
async fn read_zone_sends_credentials_and_context() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zone/example.com"))
        .and(basic_auth("robot", "secret"))
        .and(header("X-Domainrobot-Context", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(zone_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 0);
    let zone = client.read_zone("example.com").await.unwrap();

    assert_eq!(zone.origin, "example.com");
    assert_eq!(zone.resource_records.len(), 2);
    assert!(zone.extra.contains_key("soa"));
    client.shutdown().await;
}

#[tokio::test]
async fn rate_limited_responses_are_retried_up_to_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zone/example.com"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server, 2);
    let err = client.read_zone("example.com").await.unwrap_err();

    assert!(matches!(err, GuardError::RateLimited));
    client.shutdown().await;
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zone/missing.example"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": {"type": "ERROR", "text": "Zone not found."}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let err = client.read_zone("missing.example").await.unwrap_err();

    match err {
        GuardError::NotFound { resource } => assert_eq!(resource, "Zone not found."),
        other => panic!("unexpected error: {other}"),
    }
    client.shutdown().await;
}

#[tokio::test]
async fn server_error_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zone/example.com"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/zone/example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(zone_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let zone = client.read_zone("example.com").await.unwrap();
    assert_eq!(zone.origin, "example.com");
    client.shutdown().await;
}

#[tokio::test]
async fn error_envelope_on_success_status_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zone/example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": {"type": "ERROR", "text": "Zone is locked."},
            "data": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let err = client.read_zone("example.com").await.unwrap_err();
    assert!(matches!(err, GuardError::Logical(ref text) if text == "Zone is locked."));
    client.shutdown().await;
}

#[tokio::test]
async fn write_strips_read_only_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/zone/example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": {"type": "SUCCESS"},
            "data": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 0);
    let mut zone: Zone = serde_json::from_value(zone_body()["data"][0].clone()).unwrap();
    zone.resource_records
        .push(ResourceRecord::txt("_dmarc", "v=DMARC1; p=reject", Some(3600)));
    client.write_zone("example.com", &zone).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(sent.get("created").is_none());
    assert!(sent.get("updated").is_none());
    assert!(sent.get("owner").is_none());
    assert!(sent.get("soa").is_some());
    assert_eq!(sent["resourceRecords"].as_array().unwrap().len(), 3);
    client.shutdown().await;
}

#[tokio::test]
async fn dry_run_write_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = ZoneClient::builder("robot", "secret")
        .base_url(server.uri())
        .dry_run(true)
        .build()
        .unwrap();

    assert!(client.is_dry_run());
    client
        .write_zone("example.com", &Zone::new("example.com"))
        .await
        .unwrap();
    client.shutdown().await;
}

#[tokio::test]
async fn search_follows_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/domain/_search"))
        .and(body_partial_json(json!({"view": {"offset": 0, "limit": 2}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": {"type": "SUCCESS"},
            "data": [{"name": "a.example"}, {"name": "b.example"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/domain/_search"))
        .and(body_partial_json(json!({"view": {"offset": 2, "limit": 2}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": {"type": "SUCCESS"},
            "data": [{"name": "c.example"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 0);
    let domains = client.search_domains().await.unwrap();
    assert_eq!(domains, vec!["a.example", "b.example", "c.example"]);
    client.shutdown().await;
}
