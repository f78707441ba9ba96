//! Connection lifecycle against a mock Jira server.

mod common;

use std::time::Duration;

use futures_util::future::join_all;
use jira_simple::{CancellationToken, ConnectionState, JiraError};
use reqwest::StatusCode;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{connection_for, mount_session, PASSWORD};

#[tokio::test]
async fn test_connect_authenticates_once() {
    let server = MockServer::start().await;
    mount_session(&server, 1).await;

    let connection = connection_for(&server);
    assert_ok!(connection.connect().await);
    assert_ok!(connection.connect().await);

    assert_eq!(connection.state(), ConnectionState::Connected);
    assert!(connection.to_string().ends_with("(connected)"));
}

#[tokio::test]
async fn test_concurrent_connect_issues_single_login() {
    let server = MockServer::start().await;
    mount_session(&server, 1).await;

    let connection = connection_for(&server);
    let results = join_all((0..8).map(|_| {
        let connection = connection.clone();
        async move { connection.connect().await }
    }))
    .await;

    assert!(results.iter().all(Result::is_ok));
    assert!(connection.is_connected());
}

#[tokio::test]
async fn test_concurrent_connect_across_tasks() {
    let server = MockServer::start().await;
    mount_session(&server, 1).await;

    let connection = connection_for(&server);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let connection = connection.clone();
            tokio::spawn(async move { connection.connect().await })
        })
        .collect();

    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }
}

#[tokio::test]
async fn test_rejected_login_stays_disconnected_and_can_retry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/auth/1/session"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_session(&server, 1).await;

    let connection = connection_for(&server);

    let err = assert_err!(connection.connect().await);
    assert!(!err.to_string().contains(PASSWORD));
    assert!(!format!("{:?}", err).contains(PASSWORD));
    match err {
        JiraError::Authentication { status, reason } => {
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(reason, "Unauthorized");
        }
        other => panic!("expected authentication error, got {:?}", other),
    }
    assert_eq!(connection.state(), ConnectionState::Disconnected);

    assert_ok!(connection.connect().await);
    assert!(connection.is_connected());
}

#[tokio::test]
async fn test_session_cookies_exposed_while_connected() {
    let server = MockServer::start().await;
    mount_session(&server, 1).await;

    let connection = connection_for(&server);
    assert_eq!(connection.session_id(), None);

    connection.connect().await.unwrap();
    assert_eq!(connection.session_id().as_deref(), Some("ABC123"));
    assert_eq!(connection.xsrf_token().as_deref(), Some("XSRF-1"));

    connection.dispose().await;
    assert_eq!(connection.session_id(), None);
}

#[tokio::test]
async fn test_dispose_prevents_any_request() {
    let server = MockServer::start().await;
    mount_session(&server, 0).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let connection = connection_for(&server);
    let command = connection.command().unwrap();
    connection.dispose().await;

    assert!(matches!(
        command.query("myself").await,
        Err(JiraError::Disposed)
    ));
    assert!(matches!(connection.connect().await, Err(JiraError::Disposed)));
    assert_eq!(connection.state(), ConnectionState::Disposed);
}

#[tokio::test]
async fn test_dispose_after_connect() {
    let server = MockServer::start().await;
    mount_session(&server, 1).await;

    let connection = connection_for(&server);
    connection.connect().await.unwrap();
    connection.dispose().await;

    assert!(connection.is_disposed());
    assert!(!connection.is_connected());
    assert!(matches!(connection.command(), Err(JiraError::Disposed)));
}

#[tokio::test]
async fn test_dispose_waits_for_in_flight_login() {
    let server = MockServer::start().await;
    mount_session(&server, 1).await;

    let connection = connection_for(&server);
    let login = tokio::spawn({
        let connection = connection.clone();
        async move { connection.connect().await }
    });

    // The session mock answers after 50ms; dispose lands mid-login.
    while server.received_requests().await.unwrap().is_empty() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert!(!connection.is_connected());
    connection.dispose().await;

    assert_ok!(login.await.unwrap());
    assert_eq!(connection.state(), ConnectionState::Disposed);
    assert!(matches!(connection.command(), Err(JiraError::Disposed)));
    assert!(matches!(connection.connect().await, Err(JiraError::Disposed)));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_cancelled_connect_does_not_connect() {
    let server = MockServer::start().await;
    mount_session(&server, 0).await;

    let connection = connection_for(&server);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = assert_err!(connection.connect_cancellable(&cancel).await);
    assert!(err.is_cancelled());
    assert_eq!(connection.state(), ConnectionState::Disconnected);
}
