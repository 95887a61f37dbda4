//! Mock endpoint tests for the ecs-session library.
//!
//! These tests use wiremock to simulate an ECS management endpoint and test
//! the session behavior without requiring network access or real credentials.

use std::collections::HashMap;
use std::time::Duration;

use ecs_session::{
    AuthError, Credentials, Endpoint, Error, RefreshFailurePolicy, Session, SessionConfig,
    SessionState,
};
use serde_json::json;
use wiremock::matchers::{basic_auth, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create an endpoint from a mock server.
fn mock_endpoint(server: &MockServer) -> Endpoint {
    Endpoint::new(server.uri()).unwrap()
}

fn login_ok(token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).insert_header("X-SDS-AUTH-TOKEN", token)
}

fn login_ok_with_max_age(token: &str, max_age: &str) -> ResponseTemplate {
    login_ok(token).insert_header("X-SDS-AUTH-MAX-AGE", max_age)
}

async fn mount_login(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_login_once(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(response)
        .up_to_n_times(1)
        .mount(server)
        .await;
}

async fn connect(server: &MockServer) -> Session {
    Session::connect(mock_endpoint(server), Credentials::new("root", "ChangeMe"))
        .await
        .unwrap()
}

async fn login_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/login")
        .count()
}

// ============================================================================
// Login Tests
// ============================================================================

#[tokio::test]
async fn test_login_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .and(basic_auth("root", "ChangeMe"))
        .respond_with(login_ok("abc"))
        .expect(1)
        .mount(&server)
        .await;

    let session = connect(&server).await;

    assert_eq!(session.token().await.as_str(), "abc");
    assert_eq!(session.state().await, SessionState::Authenticated);
    assert_eq!(session.username(), "root");
    assert!(!session.has_pending_refresh());
}

#[tokio::test]
async fn test_login_non_200_is_auth_error() {
    let server = MockServer::start().await;

    mount_login(
        &server,
        ResponseTemplate::new(401).set_body_json(json!({
            "code": 1004,
            "description": "Unauthorized"
        })),
    )
    .await;

    let result =
        Session::connect(mock_endpoint(&server), Credentials::new("root", "wrong")).await;

    let err = result.unwrap_err();
    assert!(matches!(err, Error::Auth(AuthError::LoginFailed)));
    assert!(err.to_string().contains("check endpoint or credentials"));
}

#[tokio::test]
async fn test_login_non_200_ignores_token_header() {
    let server = MockServer::start().await;

    mount_login(
        &server,
        ResponseTemplate::new(500).insert_header("X-SDS-AUTH-TOKEN", "abc"),
    )
    .await;

    let result =
        Session::connect(mock_endpoint(&server), Credentials::new("root", "ChangeMe")).await;

    assert!(matches!(result, Err(Error::Auth(AuthError::LoginFailed))));
}

#[tokio::test]
async fn test_login_without_token_is_auth_error() {
    let server = MockServer::start().await;

    mount_login(&server, ResponseTemplate::new(200)).await;

    let result =
        Session::connect(mock_endpoint(&server), Credentials::new("root", "ChangeMe")).await;

    assert!(matches!(result, Err(Error::Auth(AuthError::TokenUnavailable))));
}

#[tokio::test]
async fn test_login_with_empty_token_is_auth_error() {
    let server = MockServer::start().await;

    mount_login(&server, login_ok_with_max_age("", "3600")).await;

    let result =
        Session::connect(mock_endpoint(&server), Credentials::new("root", "ChangeMe")).await;

    assert!(matches!(result, Err(Error::Auth(AuthError::TokenUnavailable))));
}

#[tokio::test]
async fn test_login_transport_failure() {
    // Reserve a port, then free it so nothing is listening there
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let endpoint = Endpoint::new(format!("http://127.0.0.1:{}", port)).unwrap();

    let result = Session::connect(endpoint, Credentials::new("root", "ChangeMe")).await;

    assert!(matches!(result, Err(Error::Transport(_))));
}

#[tokio::test]
async fn test_max_age_schedules_refresh() {
    let server = MockServer::start().await;

    mount_login(&server, login_ok_with_max_age("abc", "3600")).await;

    let session = connect(&server).await;

    assert!(session.has_pending_refresh());
    session.shutdown();
    assert!(!session.has_pending_refresh());
}

#[tokio::test]
async fn test_invalid_max_age_skips_refresh() {
    let server = MockServer::start().await;

    mount_login(&server, login_ok_with_max_age("abc", "soon")).await;

    let session = connect(&server).await;

    assert_eq!(session.token().await.as_str(), "abc");
    assert!(!session.has_pending_refresh());
}

// ============================================================================
// Refresh Tests
// ============================================================================

/// Poll `check` until it holds, failing the test after a few seconds.
async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let polled = tokio::time::timeout(Duration::from_secs(5), async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "timed out waiting for {}", what);
}

async fn wait_for_token(session: &Session, token: &str) {
    eventually(token, move || async move { session.token().await.as_str() == token }).await;
}

async fn wait_for_state(session: &Session, state: SessionState) {
    eventually("session state", move || async move { session.state().await == state }).await;
}

async fn wait_for_logins(server: &MockServer, count: usize) {
    eventually("login requests", move || async move {
        login_count(server).await >= count
    })
    .await;
}

#[tokio::test]
async fn test_scheduled_refresh_swaps_token() {
    let server = MockServer::start().await;

    // max-age 301 minus the 300 second buffer: refresh after one second
    mount_login_once(&server, login_ok_with_max_age("abc", "301")).await;
    mount_login(&server, login_ok("xyz")).await;

    Mock::given(method("GET"))
        .and(path("/object/bucket.json"))
        .and(header("X-SDS-AUTH-TOKEN", "xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fresh"))
        .mount(&server)
        .await;

    let session = connect(&server).await;
    assert_eq!(session.token().await.as_str(), "abc");

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(session.token().await.as_str(), "abc");
    assert_eq!(login_count(&server).await, 1);

    wait_for_token(&session, "xyz").await;
    assert_eq!(login_count(&server).await, 2);
    assert!(!session.has_pending_refresh());

    let body = session.get("/object/bucket.json", None, None).await.unwrap();
    assert_eq!(body, b"fresh");
}

#[tokio::test]
async fn test_refresh_buffer_is_configurable() {
    let server = MockServer::start().await;

    mount_login_once(&server, login_ok_with_max_age("abc", "1")).await;
    mount_login(&server, login_ok("xyz")).await;

    let config = SessionConfig::default().with_refresh_buffer(Duration::ZERO);
    let session = Session::connect_with_config(
        mock_endpoint(&server),
        Credentials::new("root", "ChangeMe"),
        config,
    )
    .await
    .unwrap();

    wait_for_token(&session, "xyz").await;
    assert_eq!(login_count(&server).await, 2);
}

#[tokio::test]
async fn test_failed_refresh_terminates_session() {
    let server = MockServer::start().await;

    mount_login_once(&server, login_ok_with_max_age("abc", "301")).await;
    mount_login_once(&server, ResponseTemplate::new(401)).await;
    mount_login(&server, login_ok("def")).await;

    Mock::given(method("GET"))
        .and(path("/object/bucket.json"))
        .and(header("X-SDS-AUTH-TOKEN", "def"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let session = connect(&server).await;

    wait_for_state(&session, SessionState::Terminated).await;

    let result = session.get("/object/bucket.json", None, None).await;
    assert!(matches!(
        result,
        Err(Error::Auth(AuthError::SessionTerminated))
    ));

    // An explicit login recovers the session
    session.login().await.unwrap();
    assert_eq!(session.state().await, SessionState::Authenticated);

    let body = session.get("/object/bucket.json", None, None).await.unwrap();
    assert_eq!(body, b"[]");
}

#[tokio::test]
async fn test_failed_refresh_after_newer_login_keeps_session() {
    let server = MockServer::start().await;

    mount_login_once(&server, login_ok_with_max_age("abc", "301")).await;
    mount_login_once(
        &server,
        ResponseTemplate::new(401).set_delay(Duration::from_millis(800)),
    )
    .await;
    mount_login(&server, login_ok("new")).await;

    Mock::given(method("GET"))
        .and(path("/object/bucket.json"))
        .and(header("X-SDS-AUTH-TOKEN", "new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let session = connect(&server).await;

    // The scheduled refresh is waiting on its rejected login
    wait_for_logins(&server, 2).await;
    session.login().await.unwrap();
    assert_eq!(session.token().await.as_str(), "new");

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(session.state().await, SessionState::Authenticated);
    assert_eq!(session.token().await.as_str(), "new");

    let body = session.get("/object/bucket.json", None, None).await.unwrap();
    assert_eq!(body, b"[]");
}

#[tokio::test]
async fn test_failed_refresh_can_exit_process() {
    const CHILD_ENV: &str = "ECS_SESSION_REFRESH_EXIT_CHILD";

    if std::env::var_os(CHILD_ENV).is_some() {
        let server = MockServer::start().await;
        mount_login_once(&server, login_ok_with_max_age("abc", "301")).await;
        mount_login(&server, ResponseTemplate::new(401)).await;

        let config = SessionConfig::default()
            .with_refresh_failure_policy(RefreshFailurePolicy::ExitProcess);
        let _session = Session::connect_with_config(
            mock_endpoint(&server),
            Credentials::new("root", "ChangeMe"),
            config,
        )
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        panic!("process kept running after a failed refresh");
    }

    // Rerun this test alone in a child process that is expected to exit
    let output = tokio::process::Command::new(std::env::current_exe().unwrap())
        .args(["test_failed_refresh_can_exit_process", "--exact", "--nocapture"])
        .env(CHILD_ENV, "1")
        .output()
        .await
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
}

#[tokio::test]
async fn test_shutdown_during_refresh_stops_chain() {
    let server = MockServer::start().await;

    mount_login_once(&server, login_ok_with_max_age("abc", "301")).await;
    mount_login_once(
        &server,
        login_ok_with_max_age("xyz", "301").set_delay(Duration::from_millis(800)),
    )
    .await;
    mount_login(&server, login_ok_with_max_age("late", "301")).await;

    let session = connect(&server).await;

    // Shut down while the refresh login is waiting on the server
    wait_for_logins(&server, 2).await;
    session.shutdown();
    assert!(!session.has_pending_refresh());

    wait_for_token(&session, "xyz").await;
    assert!(!session.has_pending_refresh());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(login_count(&server).await, 2);
    assert_eq!(session.token().await.as_str(), "xyz");

    // An explicit login re-arms the refresh
    session.login().await.unwrap();
    assert_eq!(session.token().await.as_str(), "late");
    assert!(session.has_pending_refresh());
    session.shutdown();
}

#[tokio::test]
async fn test_dropped_session_stops_refreshing() {
    let server = MockServer::start().await;

    mount_login(&server, login_ok_with_max_age("abc", "301")).await;

    let session = connect(&server).await;
    drop(session);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(login_count(&server).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_see_whole_tokens() {
    let server = MockServer::start().await;

    mount_login_once(&server, login_ok("abc")).await;
    mount_login(&server, login_ok("xyz")).await;

    for token in ["abc", "xyz"] {
        Mock::given(method("GET"))
            .and(path("/object/bucket.json"))
            .and(header("X-SDS-AUTH-TOKEN", token))
            .respond_with(ResponseTemplate::new(200).set_body_string(token))
            .mount(&server)
            .await;
    }

    let session = connect(&server).await;

    let mut tasks = Vec::new();
    for _ in 0..32 {
        let session = session.clone();
        tasks.push(tokio::spawn(async move {
            session.get("/object/bucket.json", None, None).await
        }));
    }
    session.login().await.unwrap();
    for _ in 0..32 {
        let session = session.clone();
        tasks.push(tokio::spawn(async move {
            session.get("/object/bucket.json", None, None).await
        }));
    }

    for task in tasks {
        let body = task.await.unwrap().unwrap();
        assert!(body == b"abc" || body == b"xyz", "unexpected body {:?}", body);
    }
    assert_eq!(session.token().await.as_str(), "xyz");
}

// ============================================================================
// Request Tests
// ============================================================================

#[tokio::test]
async fn test_get_returns_body_verbatim() {
    let server = MockServer::start().await;
    mount_login(&server, login_ok("abc")).await;

    let payload = r#"{"object_bucket":[{"name":"b1"}]}"#;
    Mock::given(method("GET"))
        .and(path("/object/bucket.json"))
        .and(query_param("namespace", "ns1"))
        .and(header("X-SDS-AUTH-TOKEN", "abc"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(payload))
        .expect(1)
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let body = session
        .get("/object/bucket.json", Some(&[("namespace", "ns1")]), None)
        .await
        .unwrap();

    assert_eq!(body, payload.as_bytes());
}

#[tokio::test]
async fn test_get_with_empty_body() {
    let server = MockServer::start().await;
    mount_login(&server, login_ok("abc")).await;

    Mock::given(method("GET"))
        .and(path("/object/ping"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let body = session.get("/object/ping", None, None).await.unwrap();

    assert!(body.is_empty());
}

#[tokio::test]
async fn test_get_rejects_created() {
    let server = MockServer::start().await;
    mount_login(&server, login_ok("abc")).await;

    Mock::given(method("GET"))
        .and(path("/object/bucket.json"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let err = session
        .get("/object/bucket.json", None, None)
        .await
        .unwrap_err();

    let service = err.as_service().unwrap();
    assert_eq!(service.status, 201);
    assert_eq!(service.status_line.as_deref(), Some("201 Created"));
}

#[tokio::test]
async fn test_get_extra_headers() {
    let server = MockServer::start().await;
    mount_login(&server, login_ok("abc")).await;

    Mock::given(method("GET"))
        .and(path("/object/namespaces"))
        .and(header("x-emc-namespace", "ns1"))
        .and(header("X-SDS-AUTH-TOKEN", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let headers = HashMap::from([("x-emc-namespace".to_string(), "ns1".to_string())]);
    let body = session
        .get("/object/namespaces", None, Some(&headers))
        .await
        .unwrap();

    assert_eq!(body, b"{}");
}

#[tokio::test]
async fn test_post_accepts_created() {
    let server = MockServer::start().await;
    mount_login(&server, login_ok("abc")).await;

    let request = r#"{"name":"b1","namespace":"ns1"}"#;
    Mock::given(method("POST"))
        .and(path("/object/bucket.json"))
        .and(header("Content-Type", "application/json"))
        .and(header("Accept", "application/json"))
        .and(header("X-SDS-AUTH-TOKEN", "abc"))
        .and(body_string(request))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id":"ns1.b1"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let body = session
        .post("/object/bucket.json", Some(request.as_bytes()), None, None)
        .await
        .unwrap();

    assert_eq!(body, br#"{"id":"ns1.b1"}"#);
}

#[tokio::test]
async fn test_put_accepts_ok_and_sends_body() {
    let server = MockServer::start().await;
    mount_login(&server, login_ok("abc")).await;

    let request = r#"{"quota":100}"#;
    Mock::given(method("PUT"))
        .and(path("/object/bucket/b1/quota"))
        .and(query_param("namespace", "ns1"))
        .and(header("Content-Type", "application/json"))
        .and(header("X-SDS-AUTH-TOKEN", "abc"))
        .and(body_string(request))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let body = session
        .put(
            "/object/bucket/b1/quota",
            Some(request.as_bytes()),
            Some(&[("namespace", "ns1")]),
        )
        .await
        .unwrap();

    assert!(body.is_empty());
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[tokio::test]
async fn test_json_error_body_is_structured() {
    let server = MockServer::start().await;
    mount_login(&server, login_ok("abc")).await;

    Mock::given(method("POST"))
        .and(path("/object/bucket.json"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 1013,
            "retryable": false,
            "description": "Bucket already exists",
            "details": "Bucket b1 already exists in namespace ns1"
        })))
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let err = session
        .post("/object/bucket.json", Some(b"{}"), None, None)
        .await
        .unwrap_err();

    let service = err.as_service().unwrap();
    assert_eq!(service.status, 400);
    assert_eq!(service.code, Some(1013));
    assert_eq!(service.description.as_deref(), Some("Bucket already exists"));
    assert_eq!(
        service.details.as_deref(),
        Some("Bucket b1 already exists in namespace ns1")
    );
    assert_eq!(service.retryable, Some(false));
    assert!(service.status_line.is_none());
}

#[tokio::test]
async fn test_empty_error_body_wraps_status_line() {
    let server = MockServer::start().await;
    mount_login(&server, login_ok("abc")).await;

    Mock::given(method("GET"))
        .and(path("/object/bucket/missing/info"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let err = session
        .get("/object/bucket/missing/info", None, None)
        .await
        .unwrap_err();

    let service = err.as_service().unwrap();
    assert_eq!(service.status_line.as_deref(), Some("404 Not Found"));
    assert!(err.to_string().contains("404 Not Found"));
}

#[tokio::test]
async fn test_non_json_error_body_kept_as_details() {
    let server = MockServer::start().await;
    mount_login(&server, login_ok("abc")).await;

    Mock::given(method("PUT"))
        .and(path("/object/bucket/b1/quota"))
        .respond_with(
            ResponseTemplate::new(503)
                .set_body_string("Service Unavailable")
                .insert_header("content-type", "text/plain"),
        )
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let err = session
        .put("/object/bucket/b1/quota", Some(b"{}"), None)
        .await
        .unwrap_err();

    let service = err.as_service().unwrap();
    assert_eq!(service.status, 503);
    assert_eq!(service.details.as_deref(), Some("Service Unavailable"));
}
