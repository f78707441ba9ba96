//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::time::Duration;

use jira_simple::Connection;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LOGIN: &str = "alice";
pub const PASSWORD: &str = "s3cret\"pw";

/// Creates a disconnected connection pointing at the mock server.
pub fn connection_for(server: &MockServer) -> Connection {
    Connection::new(LOGIN, PASSWORD, &format!("{}/", server.uri())).unwrap()
}

/// Response of a successful session request, setting the session cookies.
pub fn session_ok() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("Set-Cookie", "JSESSIONID=ABC123; Path=/")
        .append_header("Set-Cookie", "atlassian.xsrf.token=XSRF-1; Path=/")
        .set_body_json(json!({
            "session": {"name": "JSESSIONID", "value": "ABC123"},
            "loginInfo": {"loginCount": 1}
        }))
}

/// Mounts a session endpoint that must be hit exactly `times` times.
pub async fn mount_session(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path("/rest/auth/1/session"))
        .and(header("Accept", "application/json"))
        .and(body_json(json!({"username": LOGIN, "password": PASSWORD})))
        .respond_with(session_ok().set_delay(Duration::from_millis(50)))
        .expect(times)
        .mount(server)
        .await;
}
