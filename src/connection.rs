//! Authenticated session with a Jira server.
//!
//! A [`Connection`] owns the HTTP client, the login credentials and the
//! session cookie store. It authenticates lazily: the first operation that
//! needs the network posts the credentials to the session endpoint, and
//! every later caller reuses the session.
//!
//! # State machine
//!
//! ```text
//! Disconnected --connect--> Connected
//!      |                        |
//!      +------dispose-----------+--> Disposed (terminal)
//! ```
//!
//! `connect` and `dispose` serialize on one async mutex. `connect` re-checks
//! the state after taking the lock, so any number of concurrent first
//! callers produce a single authentication request.
//!
//! # Security
//!
//! The password is only written into the session request body. It is never
//! logged and never printed by `Debug` or `Display`.

use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::command::Command;
use crate::config::{normalize_server, ConnectionString};
use crate::error::{JiraError, Result};

/// Path of the session endpoint, relative to the server.
pub const SESSION_ENDPOINT: &str = "rest/auth/1/session";

/// Media type sent in `Accept` and `Content-Type`.
pub(crate) const JSON_MEDIA_TYPE: &str = "application/json";

const SESSION_COOKIE: &str = "JSESSIONID";

const XSRF_COOKIE: &str = "atlassian.xsrf.token";

/// Characters escaped when writing credentials into the session body.
const JSON_ESCAPES: [(char, &str); 7] = [
    ('\\', "\\\\"),
    ('"', "\\\""),
    ('\n', "\\n"),
    ('\r', "\\r"),
    ('\t', "\\t"),
    ('\u{0C}', "\\f"),
    ('\u{08}', "\\b"),
];

const DISCONNECTED: u8 = 0;
const CONNECTED: u8 = 1;
const DISPOSED: u8 = 2;

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Not yet authenticated; the next operation will log in.
    Disconnected,
    /// A session has been established.
    Connected,
    /// Released; every further operation fails with [`JiraError::Disposed`].
    Disposed,
}

impl ConnectionState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            CONNECTED => ConnectionState::Connected,
            DISPOSED => ConnectionState::Disposed,
            _ => ConnectionState::Disconnected,
        }
    }
}

/// Handle to an authenticated Jira session.
///
/// Cloning is cheap and every clone shares the same session, lock and
/// state. Intended to be created once per application and shared.
///
/// # Example
///
/// ```ignore
/// let connection = Connection::new("alice", "secret", "https://jira.example.com")?;
/// let command = connection.command()?;
/// let myself = command.query("myself").await?;
/// connection.dispose().await;
/// ```
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

struct Inner {
    login: String,

    /// SECURITY: Never log this value!
    password: String,

    /// Base URL without a trailing slash.
    server: String,

    /// Parsed form of `server`, used for cookie lookup.
    server_url: Url,

    state: AtomicU8,

    /// Serializes `connect` against `dispose`.
    gate: Mutex<()>,

    /// `None` once disposed.
    http: RwLock<Option<Client>>,

    cookies: Arc<Jar>,
}

impl Connection {
    /// Creates a disconnected connection from explicit credentials.
    ///
    /// Trailing slashes and spaces are stripped from `server`.
    ///
    /// # Errors
    ///
    /// Returns `JiraError::Validation` if any argument is empty or the server
    /// is not an absolute URL, and `JiraError::HttpClient` if the HTTP client
    /// fails to initialize.
    pub fn new(login: &str, password: &str, server: &str) -> Result<Self> {
        if login.is_empty() {
            return Err(JiraError::validation("login must not be empty"));
        }
        if password.is_empty() {
            return Err(JiraError::validation("password must not be empty"));
        }

        let server = normalize_server(server);
        if server.is_empty() {
            return Err(JiraError::validation("server must not be empty"));
        }

        let server_url = Url::parse(&server)
            .map_err(|e| JiraError::validation(format!("invalid server URL: {}", e)))?;

        let cookies = Arc::new(Jar::default());

        // No timeout: callers bound waiting with a cancellation token.
        let http = Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .build()
            .map_err(JiraError::HttpClient)?;

        tracing::debug!(login = %login, server = %server, "Created Jira connection");

        Ok(Self {
            inner: Arc::new(Inner {
                login: login.to_string(),
                password: password.to_string(),
                server,
                server_url,
                state: AtomicU8::new(DISCONNECTED),
                gate: Mutex::new(()),
                http: RwLock::new(Some(http)),
                cookies,
            }),
        })
    }

    /// Creates a connection from a `Key=Value;...` connection string.
    ///
    /// # Errors
    ///
    /// Returns `JiraError::Validation` naming the missing key.
    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        Self::with_credentials(&ConnectionString::parse(connection_string)?)
    }

    /// Creates a connection from already parsed credentials.
    pub fn with_credentials(credentials: &ConnectionString) -> Result<Self> {
        Self::new(
            &credentials.login,
            &credentials.password,
            &credentials.server,
        )
    }

    /// Login name.
    pub fn login(&self) -> &str {
        &self.inner.login
    }

    /// Server base URL, never ending with `/`.
    pub fn server(&self) -> &str {
        &self.inner.server
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_raw(self.inner.state.load(Ordering::Acquire))
    }

    /// Returns true once a session has been established.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Returns true once the connection has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.state() == ConnectionState::Disposed
    }

    /// Creates a command bound to this connection.
    ///
    /// # Errors
    ///
    /// Returns `JiraError::Disposed` if the connection was disposed.
    pub fn command(&self) -> Result<Command> {
        Command::new(self.clone())
    }

    /// Authenticates if not yet connected.
    ///
    /// See [`Connection::connect_cancellable`].
    pub async fn connect(&self) -> Result<()> {
        self.connect_cancellable(&CancellationToken::new()).await
    }

    /// Authenticates if not yet connected, observing `cancel`.
    ///
    /// Returns immediately when already connected. Concurrent callers wait
    /// for the one in-flight login instead of issuing their own.
    ///
    /// # Errors
    ///
    /// - `JiraError::Disposed` if the connection was disposed
    /// - `JiraError::Authentication` if the server rejects the credentials;
    ///   the connection stays disconnected and a later call may retry
    /// - `JiraError::Cancelled` if `cancel` fires first
    pub async fn connect_cancellable(&self, cancel: &CancellationToken) -> Result<()> {
        match self.state() {
            ConnectionState::Disposed => return Err(JiraError::Disposed),
            ConnectionState::Connected => return Ok(()),
            ConnectionState::Disconnected => {}
        }

        let _guard = cancellable(cancel, self.inner.gate.lock()).await?;

        match self.state() {
            ConnectionState::Disposed => return Err(JiraError::Disposed),
            ConnectionState::Connected => return Ok(()),
            ConnectionState::Disconnected => {}
        }

        self.authenticate(cancel).await?;
        self.inner.state.store(CONNECTED, Ordering::Release);

        Ok(())
    }

    /// Releases the HTTP client and marks the connection disposed.
    ///
    /// Idempotent. Waits for an in-flight `connect` to finish first.
    pub async fn dispose(&self) {
        let _guard = self.inner.gate.lock().await;

        if self.inner.state.swap(DISPOSED, Ordering::AcqRel) != DISPOSED {
            tracing::debug!(server = %self.inner.server, "Disposing Jira connection");
        }

        self.inner
            .http
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Value of the `JSESSIONID` session cookie, while connected.
    pub fn session_id(&self) -> Option<String> {
        self.cookie(SESSION_COOKIE)
    }

    /// Value of the `atlassian.xsrf.token` cookie, while connected.
    pub fn xsrf_token(&self) -> Option<String> {
        self.cookie(XSRF_COOKIE)
    }

    fn cookie(&self, name: &str) -> Option<String> {
        if !self.is_connected() {
            return None;
        }

        let header = self.inner.cookies.cookies(&self.inner.server_url)?;
        let header = header.to_str().ok()?;

        header.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            key.eq_ignore_ascii_case(name).then(|| value.to_string())
        })
    }

    /// Returns a handle to the HTTP client, or `Disposed` once released.
    fn client(&self) -> Result<Client> {
        self.inner
            .http
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(JiraError::Disposed)
    }

    /// Posts the credentials to the session endpoint.
    async fn authenticate(&self, cancel: &CancellationToken) -> Result<()> {
        let client = self.client()?;
        let url = format!("{}/{}", self.inner.server, SESSION_ENDPOINT);

        tracing::debug!(login = %self.inner.login, url = %url, "Authenticating with Jira");

        let request = client
            .post(&url)
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .header(CONTENT_TYPE, JSON_MEDIA_TYPE)
            .body(session_body(&self.inner.login, &self.inner.password));

        let response = cancellable(cancel, request.send())
            .await?
            .map_err(JiraError::Http)?;
        let status = response.status();

        if !status.is_success() {
            tracing::warn!(
                login = %self.inner.login,
                status = %status,
                "Jira rejected the session request"
            );
            return Err(JiraError::authentication(status));
        }

        tracing::info!(login = %self.inner.login, server = %self.inner.server, "Connected to Jira");
        Ok(())
    }

    /// Sends one JSON request and parses the JSON answer.
    ///
    /// Does not authenticate; callers connect first.
    pub(crate) async fn send(
        &self,
        method: Method,
        url: &str,
        body: &str,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let client = self.client()?;

        tracing::debug!(method = %method, url = %url, "Making Jira API request");

        let request = client
            .request(method, url)
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .header(CONTENT_TYPE, JSON_MEDIA_TYPE)
            .body(body.to_string());

        let response = cancellable(cancel, request.send())
            .await?
            .map_err(JiraError::Http)?;
        let status = response.status();

        if !status.is_success() {
            return Err(JiraError::remote(status, url));
        }

        let bytes = cancellable(cancel, response.bytes())
            .await?
            .map_err(JiraError::Http)?;

        tracing::trace!(bytes = bytes.len(), "Jira API response");

        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("login", &self.inner.login)
            .field("server", &self.inner.server)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.inner.login, self.inner.server)?;
        if self.is_connected() {
            write!(f, " (connected)")?;
        }
        Ok(())
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }

        self.state() == other.state()
            && self.inner.server.eq_ignore_ascii_case(&other.inner.server)
            && self.inner.login.eq_ignore_ascii_case(&other.inner.login)
    }
}

impl Eq for Connection {}

impl Hash for Connection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.server.to_ascii_lowercase().hash(state);
        self.inner.login.to_ascii_lowercase().hash(state);
    }
}

/// Runs `future` unless `cancel` fires first.
pub(crate) async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    future: F,
) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(JiraError::Cancelled),
        output = future => Ok(output),
    }
}

/// Escapes a string for embedding inside a JSON string literal.
fn escape_json(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() * 2);

    for c in value.chars() {
        match JSON_ESCAPES.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => escaped.push_str(to),
            None if (c as u32) < 0x20 => escaped.push_str(&format!("\\u{:04x}", c as u32)),
            None => escaped.push(c),
        }
    }

    escaped
}

/// Builds the session request body.
fn session_body(login: &str, password: &str) -> String {
    format!(
        "{{\"username\": \"{}\", \"password\": \"{}\"}}",
        escape_json(login),
        escape_json(password)
    )
}
