//! Request client tests against a mock backend.
//!
//! These cover token attachment, silent refresh and error normalization
//! using wiremock in place of the sktrack backend.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use sktrack_core::{
    AccessToken, ApiUrl, AppOrigin, Collection, ErrorCode, ErrorKind, RefreshToken, TokenPair,
    TokenStore,
};
use sktrack_http::{ApiClient, ApiRequest, ClientConfig, MultipartForm, RetryPolicy};
use sktrack_store::CookieTokenStore;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn api_url(server: &MockServer) -> ApiUrl {
    ApiUrl::new(format!("http://127.0.0.1:{}", server.address().port())).unwrap()
}

fn store_with(access: &str, refresh: &str) -> Arc<CookieTokenStore> {
    let origin = AppOrigin::new("http://localhost:3000").unwrap();
    let store = CookieTokenStore::in_memory(&origin);
    store
        .set_tokens(&TokenPair::new(
            AccessToken::new(access),
            RefreshToken::new(refresh),
        ))
        .unwrap();
    Arc::new(store)
}

fn empty_store() -> Arc<CookieTokenStore> {
    let origin = AppOrigin::new("http://localhost:3000").unwrap();
    Arc::new(CookieTokenStore::in_memory(&origin))
}

fn client(server: &MockServer, store: Arc<CookieTokenStore>) -> ApiClient {
    let config = ClientConfig::new(api_url(server)).with_retry(RetryPolicy::none());
    ApiClient::new(config, store)
}

fn refresh_calls(requests: &[Request]) -> usize {
    requests
        .iter()
        .filter(|r| r.url.path() == "/api/token/refresh")
        .count()
}

// ============================================================================
// Token attachment
// ============================================================================

#[tokio::test]
async fn test_attaches_stored_access_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/orders/"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, store_with("a1", "r1"));
    let orders: Value = client.get_json("/api/orders/").await.unwrap();

    assert_eq!(orders[0]["id"], 1);
}

#[tokio::test]
async fn test_no_token_means_no_authorization_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/skeleton/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = client(&server, empty_store());
    client.list(Collection::Skeleton).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_issuance_endpoints_never_get_stored_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = client(&server, store_with("a1", "r1"));
    for endpoint in ["/api/token/pair", "/api/token/verify", "/api/token/refresh"] {
        client
            .send(ApiRequest::post(endpoint).json(json!({})))
            .await
            .unwrap();
    }

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    for request in &requests {
        assert!(
            !request.headers.contains_key("authorization"),
            "{} carried a token",
            request.url.path()
        );
    }
}

#[tokio::test]
async fn test_multipart_uploads_get_boundary_content_type() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/releases/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7})))
        .mount(&server)
        .await;

    let client = client(&server, store_with("a1", "r1"));
    let form = MultipartForm::new().text("title", "Q3").file(
        "document",
        "release.pdf",
        b"%PDF-1.4".to_vec(),
        Some("application/pdf".into()),
    );
    let created: Value = client.post_multipart("/api/releases/", form).await.unwrap();
    assert_eq!(created["id"], 7);

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0].headers["content-type"].to_str().unwrap();
    assert!(
        content_type.starts_with("multipart/form-data; boundary="),
        "{content_type}"
    );
    assert_eq!(requests[0].headers["authorization"], "Bearer a1");
}

// ============================================================================
// Silent refresh
// ============================================================================

#[tokio::test]
async fn test_refresh_then_retry_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/orders/"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Given token not valid for any token type"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh"))
        .and(body_json(json!({"refresh": "r1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "a2"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/orders/"))
        .and(header("authorization", "Bearer a2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_with("a1", "r1");
    let client = client(&server, store.clone());
    let orders: Value = client.get_json("/api/orders/").await.unwrap();

    assert_eq!(orders[0]["id"], 1);
    assert_eq!(store.access_token().unwrap().as_str(), "a2");
    assert_eq!(store.refresh_token().unwrap().as_str(), "r1");
}

#[tokio::test]
async fn test_failed_refresh_clears_store_and_expires_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/orders/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Token is invalid or expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_with("a1", "r1");
    let client = client(&server, store.clone());
    let err = client.get_json::<Value>("/api/orders/").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SessionExpired);
    assert!(err.message().contains("session expired"));
    assert!(store.access_token().is_none());
    assert!(store.refresh_token().is_none());
}

#[tokio::test]
async fn test_second_401_does_not_refresh_again() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/orders/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "a2"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, store_with("a1", "r1"));
    let err = client.get_json::<Value>("/api/orders/").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SessionExpired);
    assert_eq!(err.code(), ErrorCode::Status(401));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(refresh_calls(&requests), 1);
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_missing_refresh_token_expires_session_without_network() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/orders/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client(&server, empty_store());
    let err = client.get_json::<Value>("/api/orders/").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SessionExpired);
    let requests = server.received_requests().await.unwrap();
    assert_eq!(refresh_calls(&requests), 0);
}

#[tokio::test]
async fn test_malformed_refresh_response_expires_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/orders/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "a2"})))
        .mount(&server)
        .await;

    let store = store_with("a1", "r1");
    let client = client(&server, store.clone());
    let err = client.get_json::<Value>("/api/orders/").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SessionExpired);
    assert!(store.token_pair().is_none());
}

#[tokio::test]
async fn test_401_from_issuance_endpoints_is_surfaced_directly() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "No active account found with the given credentials"
        })))
        .mount(&server)
        .await;

    let store = store_with("a1", "r1");
    let client = client(&server, store.clone());

    for endpoint in ["/api/token/pair", "/api/token/verify", "/api/token/refresh"] {
        let err = client
            .send(ApiRequest::post(endpoint).json(json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Request, "{endpoint}");
        assert_eq!(err.code(), ErrorCode::Status(401), "{endpoint}");
    }

    // One request per endpoint, no refresh cycle in between.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    assert_eq!(store.access_token().unwrap().as_str(), "a1");
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "a2"}))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer a2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server, store_with("a1", "r1"));
    let (orders, releases) = tokio::join!(
        client.list(Collection::Orders),
        client.list(Collection::Releases),
    );

    assert!(orders.is_ok());
    assert!(releases.is_ok());
    let requests = server.received_requests().await.unwrap();
    assert_eq!(refresh_calls(&requests), 1);
}

// ============================================================================
// Error normalization and retries
// ============================================================================

#[tokio::test]
async fn test_backend_detail_becomes_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/orders/42/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found."})))
        .mount(&server)
        .await;

    let client = client(&server, store_with("a1", "r1"));
    let err = client.get(Collection::Orders, "42").await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::Status(404));
    assert_eq!(err.message(), "Not found.");
}

#[tokio::test]
async fn test_validation_errors_keep_field_details() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/waitlists/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "name": ["This field is required."],
            "quantity": "Ensure this value is greater than or equal to 1."
        })))
        .mount(&server)
        .await;

    let client = client(&server, store_with("a1", "r1"));
    let err = client
        .create(Collection::Waitlists, json!({"quantity": 0}))
        .await
        .unwrap_err();

    let fields = err.field_errors();
    assert_eq!(err.code(), ErrorCode::Status(400));
    assert_eq!(err.message(), "Bad Request");
    assert_eq!(
        fields.get("name"),
        Some(&["This field is required.".to_string()][..])
    );
    assert!(fields.get("quantity").is_some());
}

#[tokio::test]
async fn test_list_detail_becomes_readable_message() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/api/orders/5/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "detail": ["Order is already shipped", "Status can not go back"]
        })))
        .mount(&server)
        .await;

    let client = client(&server, store_with("a1", "r1"));
    let err = client
        .update(Collection::Orders, "5", json!({"status": "open"}))
        .await
        .unwrap_err();

    assert_eq!(
        err.message(),
        "Order is already shipped, Status can not go back"
    );
    assert!(!err.to_string().contains('{'));
    assert!(err.details().is_some());
}

#[tokio::test]
async fn test_4xx_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(api_url(&server)).with_retry(RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    });
    let client = ApiClient::new(config, store_with("a1", "r1"));

    let err = client.list(Collection::Orders).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Status(403));
}

#[tokio::test]
async fn test_timeouts_are_retried_then_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let config = ClientConfig::new(api_url(&server))
        .with_timeout(Duration::from_millis(50))
        .with_retry(RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        });
    let store = store_with("a1", "r1");
    let client = ApiClient::new(config, store.clone());

    let err = client.list(Collection::Orders).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::Timeout);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    // A timeout never looks like an expired session.
    assert!(store.access_token().is_some());
}

#[tokio::test]
async fn test_unreachable_backend_is_a_network_error() {
    // Bind then release a port so nothing is listening on it.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let url = ApiUrl::new(format!("http://127.0.0.1:{}", port)).unwrap();

    let client = ApiClient::new(
        ClientConfig::new(url).with_retry(RetryPolicy::none()),
        store_with("a1", "r1"),
    );
    let err = client.list(Collection::Orders).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::Network);
    assert_eq!(err.kind(), ErrorKind::Request);
}

#[tokio::test]
async fn test_preset_authorization_is_respected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header_exists("authorization"))
        .and(header("authorization", "Token service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, store_with("a1", "r1"));
    let request = ApiRequest::get("/api/orders/").header(
        reqwest::header::AUTHORIZATION,
        reqwest::header::HeaderValue::from_static("Token service-key"),
    );
    client.send(request).await.unwrap();
}
