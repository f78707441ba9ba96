//! Single queries against a mock Jira server.

mod common;

use chrono::{TimeZone, Utc};
use jira_simple::{JiraError, JsonExt, Query};
use pretty_assertions::assert_eq;
use reqwest::{Method, StatusCode};
use serde_json::json;
use tokio_test::assert_ok;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{connection_for, mount_session};

#[tokio::test]
async fn test_query_logs_in_lazily_once() {
    let server = MockServer::start().await;
    mount_session(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/rest/api/latest/myself"))
        .and(header("Accept", "application/json"))
        .and(body_string("{}"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "alice"})))
        .expect(2)
        .mount(&server)
        .await;

    let connection = connection_for(&server);
    let command = connection.command().unwrap();
    assert!(!connection.is_connected());

    let first = assert_ok!(command.query("myself").await);
    let second = assert_ok!(command.query("/myself/").await);

    assert_eq!(first, second);
    assert_eq!(first.read(&["name"]).string_or_none().as_deref(), Some("alice"));
    assert!(connection.is_connected());
}

#[tokio::test]
async fn test_query_resolves_family_and_qualified_addresses() {
    let server = MockServer::start().await;
    mount_session(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/rest/greenhopper/latest/rapid/1.0/sprints"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sprints": []})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/agile/1.0/board"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"values": []})))
        .expect(1)
        .mount(&server)
        .await;

    let command = connection_for(&server).command().unwrap();
    assert_ok!(command.query("greenhopper:rapid/1.0/sprints").await);
    assert_ok!(command.query("rest/agile/1.0/board").await);
}

#[tokio::test]
async fn test_query_json_infers_post() {
    let server = MockServer::start().await;
    mount_session(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/rest/api/latest/search"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({"jql": "project = X", "maxResults": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let command = connection_for(&server).command().unwrap();
    let result = command
        .query_json("search", r#"{"jql": "project = X", "maxResults": 1}"#)
        .await
        .unwrap();

    assert_eq!(result.read(&["total"]).i64_or_none(), Some(7));
}

#[tokio::test]
async fn test_explicit_method_is_used() {
    let server = MockServer::start().await;
    mount_session(&server, 1).await;
    Mock::given(method("DELETE"))
        .and(path("/rest/api/latest/issue/X-1/watchers"))
        .and(query_param("username", "bob"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let command = connection_for(&server).command().unwrap();
    let query = Query::new("issue/X-1/watchers?username=bob").with_method(Method::DELETE);
    assert_ok!(command.execute(&query).await);
}

#[tokio::test]
async fn test_non_success_status_is_remote_error() {
    let server = MockServer::start().await;
    mount_session(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/rest/api/latest/issue/NOPE-1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"errorMessages": ["gone"]})))
        .mount(&server)
        .await;

    let command = connection_for(&server).command().unwrap();
    match command.query("issue/NOPE-1").await {
        Err(JiraError::Remote { status, reason, address }) => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(reason, "Not Found");
            assert!(address.ends_with("/rest/api/latest/issue/NOPE-1"));
        }
        other => panic!("expected remote error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_json_is_malformed() {
    let server = MockServer::start().await;
    mount_session(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/rest/api/latest/myself"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let command = connection_for(&server).command().unwrap();
    let err = command.query("myself").await.unwrap_err();
    assert!(err.is_malformed());
    assert!(err.status().is_none());
}

#[tokio::test]
async fn test_jql_single_page() {
    let server = MockServer::start().await;
    mount_session(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/rest/api/latest/search"))
        .and(query_param("jql", "assignee = currentUser()"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "startAt": 0,
            "issues": [{"key": "J-1"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let command = connection_for(&server).command().unwrap();
    let page = command.jql("assignee = currentUser()").await.unwrap();
    assert_eq!(page.read(&["issues", "0", "key"]), "J-1");
}

#[tokio::test]
async fn test_server_info() {
    let server = MockServer::start().await;
    mount_session(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/rest/api/latest/serverInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "baseUrl": "https://jira.example.com",
            "version": "9.4.0",
            "buildNumber": 940000,
            "buildDate": "2023-5-1T10:0:0.000+00:00",
            "serverTime": "2023-6-2T12:30:0.000+02:00",
            "scmInfo": "abc123",
            "serverTitle": "Example"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let command = connection_for(&server).command().unwrap();
    let info = command.server_info().await.unwrap();

    assert_eq!(info.build_date, Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap());
    assert_eq!(info.server_time, Utc.with_ymd_and_hms(2023, 6, 2, 10, 30, 0).unwrap());
    assert_eq!(info.version.to_string(), "9.4.0");
    assert_eq!(info.title, "Example");
}

#[tokio::test]
async fn test_server_info_missing_field() {
    let server = MockServer::start().await;
    mount_session(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/rest/api/latest/serverInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"serverTitle": "Example"})))
        .mount(&server)
        .await;

    let command = connection_for(&server).command().unwrap();
    let err = command.server_info().await.unwrap_err();
    assert!(matches!(err, JiraError::MalformedResponse(_)));
}
