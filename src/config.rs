//! Configuration management for the Jira client.
//!
//! Credentials come either from a structured connection string
//! (`Data Source=https://jira.example.com;User ID=me;password=secret`)
//! or from individual environment variables.

use std::env;
use std::fmt;

use crate::error::{JiraError, Result};

/// Connection-string key holding the login.
pub const KEY_LOGIN: &str = "User ID";

/// Connection-string key holding the password.
pub const KEY_PASSWORD: &str = "password";

/// Connection-string key holding the server address.
pub const KEY_SERVER: &str = "Data Source";

/// Credentials and server address for one Jira connection.
///
/// The password is never printed by `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    /// Login name.
    pub login: String,

    /// Password for the session endpoint.
    /// This value must never be logged or included in error messages.
    pub password: String,

    /// Server base URL, e.g. `https://jira.example.com`.
    pub server: String,
}

impl ConnectionString {
    /// Parses a semicolon-separated `Key=Value` connection string.
    ///
    /// Keys are matched case-insensitively. Values may be wrapped in single
    /// or double quotes. The keys `User ID`, `password` and `Data Source`
    /// are required.
    ///
    /// # Errors
    ///
    /// Returns `JiraError::Validation` naming the first missing key, or if a
    /// segment has no `=`.
    pub fn parse(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(JiraError::validation("connection string is empty"));
        }

        let mut login = None;
        let mut password = None;
        let mut server = None;

        for segment in input.split(';') {
            if segment.trim().is_empty() {
                continue;
            }

            let (key, value) = segment.split_once('=').ok_or_else(|| {
                JiraError::validation(format!(
                    "connection string segment has no '=': {:?}",
                    segment.trim().chars().take(50).collect::<String>()
                ))
            })?;

            let key = key.trim();
            let value = unquote(value.trim()).to_string();

            if key.eq_ignore_ascii_case(KEY_LOGIN) {
                login = Some(value);
            } else if key.eq_ignore_ascii_case(KEY_PASSWORD) {
                password = Some(value);
            } else if key.eq_ignore_ascii_case(KEY_SERVER) {
                server = Some(value);
            } else {
                tracing::debug!(key = %key, "Ignoring unknown connection string key");
            }
        }

        let login = required(login, KEY_LOGIN)?;
        let password = required(password, KEY_PASSWORD)?;
        let server = required(server, KEY_SERVER)?;

        Ok(Self {
            login,
            password,
            server: normalize_server(&server),
        })
    }
}

impl std::str::FromStr for ConnectionString {
    type Err = JiraError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("login", &self.login)
            .field("password", &"[REDACTED]")
            .field("server", &self.server)
            .finish()
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={};{}={};{}=********",
            KEY_SERVER, self.server, KEY_LOGIN, self.login, KEY_PASSWORD
        )
    }
}

/// Strips trailing slashes and surrounding spaces from a server address.
pub(crate) fn normalize_server(server: &str) -> String {
    server.trim().trim_end_matches(['/', ' ']).to_string()
}

fn required(value: Option<String>, key: &str) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(JiraError::missing_key(key)),
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Configuration for connecting to Jira, loaded from the environment.
#[derive(Clone)]
pub struct Config {
    /// Parsed credentials and server.
    pub connection: ConnectionString,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `JIRA_CONNECTION_STRING`: full connection string; takes precedence
    /// - otherwise `JIRA_SERVER`, `JIRA_USER` and `JIRA_PASSWORD`
    ///
    /// # Errors
    ///
    /// Returns `JiraError::Config` if a required variable is missing or the
    /// server is not an http(s) URL, and `JiraError::Validation` if the
    /// connection string lacks a key.
    ///
    /// # Example
    ///
    /// ```ignore
    /// dotenvy::dotenv().ok();
    /// let config = Config::from_env()?;
    /// ```
    pub fn from_env() -> Result<Self> {
        let connection = match env::var("JIRA_CONNECTION_STRING") {
            Ok(value) if !value.trim().is_empty() => ConnectionString::parse(&value)?,
            _ => ConnectionString {
                server: normalize_server(&Self::get_required_env("JIRA_SERVER")?),
                login: Self::get_required_env("JIRA_USER")?,
                password: Self::get_required_env("JIRA_PASSWORD")?,
            },
        };

        Self::new(connection)
    }

    /// Builds a configuration from already parsed credentials.
    ///
    /// # Errors
    ///
    /// Returns `JiraError::Config` if the server is not an http(s) URL.
    pub fn new(connection: ConnectionString) -> Result<Self> {
        Self::validate_server(&connection.server)?;
        Ok(Config { connection })
    }

    /// Gets a required environment variable, returning an error if missing or empty.
    fn get_required_env(name: &str) -> Result<String> {
        env::var(name)
            .map_err(|_| JiraError::missing_env(name))
            .and_then(|value| {
                if value.trim().is_empty() {
                    Err(JiraError::missing_env(name))
                } else {
                    Ok(value)
                }
            })
    }

    /// Checks the server carries an http(s) scheme.
    fn validate_server(server: &str) -> Result<()> {
        if !server.starts_with("http://") && !server.starts_with("https://") {
            return Err(JiraError::invalid_config(
                "Jira server must start with http:// or https://",
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("connection", &self.connection)
            .finish()
    }
}
