//! Server description returned by the `serverInfo` endpoint.

use std::fmt;

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use url::Url;

use crate::error::JiraError;
use crate::json::parse_datetime;

/// Description of a Jira server.
///
/// Every field is required; a response missing any of them is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerInfo {
    /// Base URL the server advertises.
    #[serde(rename = "baseUrl")]
    pub url: Url,

    /// Release version.
    #[serde(deserialize_with = "lenient_version")]
    pub version: Version,

    /// Build number.
    #[serde(rename = "buildNumber")]
    pub build_number: u64,

    /// Build timestamp, normalized to UTC.
    #[serde(rename = "buildDate", deserialize_with = "jira_timestamp")]
    pub build_date: DateTime<Utc>,

    /// Server clock at the time of the call, normalized to UTC.
    #[serde(rename = "serverTime", deserialize_with = "jira_timestamp")]
    pub server_time: DateTime<Utc>,

    /// Server title.
    #[serde(rename = "serverTitle")]
    pub title: String,

    /// Source-control revision of the build.
    #[serde(rename = "scmInfo")]
    pub scm_info: String,
}

impl ServerInfo {
    /// Builds the description from a `serverInfo` response.
    ///
    /// # Errors
    ///
    /// Returns `JiraError::MalformedResponse` naming the missing or invalid
    /// field.
    pub fn from_json(document: &Value) -> Result<Self, JiraError> {
        Self::deserialize(document)
            .map_err(|e| JiraError::malformed(format!("server info: {}", e)))
    }
}

impl fmt::Display for ServerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Parses a Jira timestamp into UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    parse_datetime(value).map(|dt| dt.with_timezone(&Utc))
}

fn jira_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {:?}", raw)))
}

/// Accepts `major.minor` as well as full semantic versions.
fn lenient_version<'de, D>(deserializer: D) -> Result<Version, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Version::parse(&raw)
        .or_else(|_| Version::parse(&format!("{}.0", raw)))
        .map_err(|_| serde::de::Error::custom(format!("invalid version: {:?}", raw)))
}
