//! Integration tests for the Ringr API.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use channel_client::{HttpChannelClient, MemoryChannel, NotificationChannel, Protocol};
use endpoint_store::{EndpointRecord, MemoryRecordStore, RecordStore};
use ringr_service::{
    api::{create_router_with_rate_limit, AppState, RateLimitState},
    config::RingrConfig,
    sweeper::ExpirySweeper,
    worker::spawn_worker,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AUTH_KEY: &str = "test-auth-key";
const TABLE: &str = "ringr";
const TOPIC: &str = "ringr-topic";

struct TestApp {
    app: Router,
    state: AppState,
    channel: MemoryChannel,
    store: MemoryRecordStore,
}

fn test_config() -> RingrConfig {
    RingrConfig {
        auth_key: Some(SecretString::new(AUTH_KEY.into())),
        table_name: Some(TABLE.into()),
        topic: Some(TOPIC.into()),
        ttl: Some("3600".into()),
        default_message: Some("Ring ring".into()),
    }
}

/// Create a test app over in-process channel and store backends.
fn create_test_app_with(config: RingrConfig, rate_limit: RateLimitState) -> TestApp {
    let channel = MemoryChannel::new();
    let store = MemoryRecordStore::with_table(TABLE);
    let state = AppState::new(
        Arc::new(channel.clone()),
        Arc::new(store.clone()),
        Arc::new(config),
    );
    let app = create_router_with_rate_limit(state.clone(), rate_limit);

    TestApp {
        app,
        state,
        channel,
        store,
    }
}

fn create_test_app() -> TestApp {
    create_test_app_with(test_config(), RateLimitState::permissive())
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn register(app: &Router, endpoint: &str) -> (StatusCode, Value) {
    post_json(
        app,
        "/v1/endpoints",
        json!({ "auth_key": AUTH_KEY, "endpoint": endpoint }),
    )
    .await
}

#[tokio::test]
async fn test_health_endpoint() {
    let test = create_test_app();
    register(&test.app, "555-123-4567").await;

    let response = test
        .app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["status"], "ok");
    assert_eq!(json["record_count"], 1);
    assert_eq!(json["channel_healthy"], true);
    assert!(json["missing_config"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_register_endpoint() {
    let test = create_test_app();

    let (status, json) = register(&test.app, "(555) 123-4567").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["statusCode"], 200);
    assert_eq!(json["isBase64Encoded"], false);
    assert_eq!(json["headers"]["Content-Type"], "application/json");
    assert_eq!(json["body"], "Success");

    let subscriptions = test.channel.subscriptions(TOPIC).await;
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0].endpoint, "15551234567");
    assert_eq!(subscriptions[0].protocol, Protocol::Sms);

    let record = test
        .store
        .get_item(TABLE, "15551234567")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.subscription_id, subscriptions[0].subscription_id);
    assert_eq!(record.protocol, "sms");
}

#[tokio::test]
async fn test_register_wrong_key() {
    let test = create_test_app();

    let (status, json) = post_json(
        &test.app,
        "/v1/endpoints",
        json!({ "auth_key": "wrong", "endpoint": "5551234567" }),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["statusCode"], 403);
    assert_eq!(json["body"], "Authorization failed");
    assert!(test.channel.subscriptions(TOPIC).await.is_empty());
}

#[tokio::test]
async fn test_register_missing_field() {
    let test = create_test_app();

    let (status, json) = post_json(&test.app, "/v1/endpoints", json!({ "auth_key": AUTH_KEY })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["body"], "Missing required field: endpoint");
}

#[tokio::test]
async fn test_register_invalid_phone_number() {
    let test = create_test_app();

    let (status, json) = register(&test.app, "not-a-number").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["body"], "Endpoint not valid phone number");
    assert_eq!(test.store.item_count(TABLE).await.unwrap(), 0);
}

#[tokio::test]
async fn test_malformed_json() {
    let test = create_test_app();

    let response = test
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/endpoints")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["statusCode"], 400);
}

#[tokio::test]
async fn test_missing_configuration() {
    let test = create_test_app_with(RingrConfig::default(), RateLimitState::permissive());

    let (status, json) = register(&test.app, "5551234567").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json["body"],
        "ERROR: Environmental variable 'auth_key' not defined"
    );
}

#[tokio::test]
async fn test_remove_endpoint() {
    let test = create_test_app();
    register(&test.app, "5551234567").await;

    let (status, json) = post_json(
        &test.app,
        "/v1/endpoints/remove",
        json!({ "auth_key": AUTH_KEY, "endpoint": "1-555-123-4567" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["body"], "Success");
    assert!(test.channel.subscriptions(TOPIC).await.is_empty());
    assert!(test
        .store
        .get_item(TABLE, "15551234567")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_remove_unknown_endpoint() {
    let test = create_test_app();

    let (status, json) = post_json(
        &test.app,
        "/v1/endpoints/remove",
        json!({ "auth_key": AUTH_KEY, "endpoint": "5551234567" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["body"], "Endpoint not found");
}

#[tokio::test]
async fn test_publish_fans_out() {
    let test = create_test_app();
    register(&test.app, "5551234567").await;
    register(&test.app, "5559876543").await;

    let (status, json) = post_json(
        &test.app,
        "/v1/publish",
        json!({ "auth_key": AUTH_KEY, "message": "Dinner is ready" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["body"], "Success");

    let deliveries = test.channel.deliveries().await;
    assert_eq!(deliveries.len(), 2);
    assert!(deliveries
        .iter()
        .all(|d| d.subject == "Ringr" && d.message == "Dinner is ready"));
}

#[tokio::test]
async fn test_publish_default_message() {
    let test = create_test_app();
    register(&test.app, "5551234567").await;

    let (status, _) = post_json(&test.app, "/v1/publish", json!({ "auth_key": AUTH_KEY })).await;

    assert_eq!(status, StatusCode::OK);
    let deliveries = test.channel.deliveries().await;
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].message, "Ring ring");
}

#[tokio::test]
async fn test_stream_reconciles_records() {
    let test = create_test_app();
    let stale = test
        .channel
        .subscribe(TOPIC, Protocol::Sms, "15551234567")
        .await
        .unwrap();
    let removed = test
        .channel
        .subscribe(TOPIC, Protocol::Sms, "15559876543")
        .await
        .unwrap();

    let (status, json) = post_json(
        &test.app,
        "/v1/stream",
        json!({
            "auth_key": AUTH_KEY,
            "Records": [
                { "eventName": "INSERT", "dynamodb": { "NewImage": { "arn": {"S": "new"} } } },
                {
                    "eventName": "MODIFY",
                    "dynamodb": {
                        "NewImage": { "arn": {"S": "replacement"} },
                        "OldImage": { "arn": {"S": stale} }
                    }
                },
                { "eventName": "REMOVE", "dynamodb": { "OldImage": { "arn": {"S": removed} } } },
                { "eventName": "REMOVE", "dynamodb": {} }
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let outcomes = json["body"].as_array().unwrap();
    assert_eq!(outcomes.len(), 4);
    assert_eq!(outcomes[0]["result"], "ignored");
    assert_eq!(outcomes[1]["result"], "unsubscribed");
    assert_eq!(outcomes[1]["subscription_id"], stale.as_str());
    assert_eq!(outcomes[2]["result"], "unsubscribed");
    assert_eq!(outcomes[3]["result"], "error");

    assert!(test.channel.subscriptions(TOPIC).await.is_empty());
}

#[tokio::test]
async fn test_stream_requires_authorization() {
    let test = create_test_app();

    let (status, json) = post_json(&test.app, "/v1/stream", json!({ "Records": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["body"], "Missing required field: auth_key");

    let (status, _) = post_json(
        &test.app,
        "/v1/stream",
        json!({ "auth_key": "wrong", "Records": [] }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_rate_limiting() {
    // Very restrictive rate limit: 1 request per minute
    let test = create_test_app_with(test_config(), RateLimitState::new(1));

    let (status, _) = register(&test.app, "5551234567").await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = register(&test.app, "5551234567").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["body"], "Rate limit exceeded");

    // Health checks bypass the limiter
    let response = test
        .app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_expired_record_is_unsubscribed() {
    let test = create_test_app();
    let worker = spawn_worker(
        test.state.reconciler.clone(),
        TABLE,
        test.store.changes(),
    );

    let subscription_id = test
        .channel
        .subscribe(TOPIC, Protocol::Sms, "15551234567")
        .await
        .unwrap();
    test.store
        .put_item(
            TABLE,
            EndpointRecord::new(
                "15551234567",
                subscription_id.clone(),
                "sms",
                chrono::Duration::seconds(-1),
            ),
        )
        .await
        .unwrap();

    let sweeper = ExpirySweeper::new(test.store.clone(), Duration::from_secs(60));
    assert_eq!(sweeper.sweep_once().await, 1);

    let mut retired = false;
    for _ in 0..100 {
        if test.channel.get(&subscription_id).await.is_none() {
            retired = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(retired, "expired subscription was not retired");

    worker.abort();
}

/// Router over a gateway client pointed at `mock_server`.
fn create_gateway_app(mock_server: &MockServer, store: &MemoryRecordStore) -> Router {
    let client = HttpChannelClient::new(mock_server.uri(), Duration::from_secs(5)).unwrap();
    let state = AppState::new(
        Arc::new(client),
        Arc::new(store.clone()),
        Arc::new(test_config()),
    );
    create_router_with_rate_limit(state, RateLimitState::permissive())
}

#[tokio::test]
async fn test_register_through_gateway() {
    let mock_server = MockServer::start().await;
    let store = MemoryRecordStore::with_table(TABLE);

    Mock::given(method("POST"))
        .and(path("/v1/topics/ringr-topic/subscriptions"))
        .and(body_json(json!({ "protocol": "sms", "endpoint": "15551234567" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "subscription_id": "gw-sub-1" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_gateway_app(&mock_server, &store);
    let (status, json) = register(&app, "555.123.4567").await;

    // Dots are not stripped by the sanitizer
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["body"], "Endpoint not valid phone number");

    let (status, _) = register(&app, "555 123 4567").await;
    assert_eq!(status, StatusCode::OK);

    let record = store.get_item(TABLE, "15551234567").await.unwrap().unwrap();
    assert_eq!(record.subscription_id, "gw-sub-1");
}

#[tokio::test]
async fn test_gateway_failure_skips_record_write() {
    let mock_server = MockServer::start().await;
    let store = MemoryRecordStore::with_table(TABLE);

    Mock::given(method("POST"))
        .and(path("/v1/topics/ringr-topic/subscriptions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("gateway exploded"))
        .mount(&mock_server)
        .await;

    let app = create_gateway_app(&mock_server, &store);
    let (status, json) = register(&app, "5551234567").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["body"], "Error creating subscription");
    assert_eq!(store.item_count(TABLE).await.unwrap(), 0);
}

#[tokio::test]
async fn test_health_reports_unreachable_gateway() {
    let mock_server = MockServer::start().await;
    let store = MemoryRecordStore::with_table(TABLE);

    Mock::given(method("GET"))
        .and(path("/v1/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let response = create_gateway_app(&mock_server, &store)
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["channel_healthy"], false);
}
