//! # jira-simple
//!
//! A small client for the Jira REST API built around a cookie session.
//!
//! ## Features
//!
//! - **Lazy login**: the first request posts the credentials to the session
//!   endpoint; concurrent first requests share a single login
//! - **Short addresses**: `search?jql=...`, `agile:board` or fully
//!   qualified `rest/...` paths
//! - **Paged queries**: collection endpoints are exposed as a lazy stream of
//!   JSON pages, one request per page
//! - **Cancellation**: every query accepts a [`CancellationToken`]
//! - **Security**: the password is never logged or printed
//!
//! ## Architecture
//!
//! - [`config`] - Connection strings and environment configuration
//! - [`error`] - The [`JiraError`] taxonomy
//! - [`connection`] - Session lifecycle and HTTP transport
//! - [`address`] - Expansion of short endpoint names
//! - [`command`] - Single and paged queries
//! - [`paging`] - Page-boundary detection
//! - [`json`] - Forgiving navigation over JSON responses
//! - [`models`] - Typed fixed-shape responses
//!
//! ## Example
//!
//! ```ignore
//! use futures_util::StreamExt;
//! use jira_simple::{Connection, JsonExt};
//!
//! async fn example() -> jira_simple::Result<()> {
//!     let connection = Connection::from_connection_string(
//!         "Data Source=https://jira.example.com;User ID=alice;password=secret",
//!     )?;
//!     let command = connection.command()?;
//!
//!     let info = command.server_info().await?;
//!     println!("{} {}", info.title, info.version);
//!
//!     let mut pages = command.jql_paged("project = PROJ", 100)?;
//!     while let Some(page) = pages.next().await {
//!         for issue in page?.read(&["issues"]).items() {
//!             println!("{}", issue.read(&["key"]));
//!         }
//!     }
//!
//!     connection.dispose().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod address;
pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod json;
pub mod models;
pub mod paging;

pub use command::{Command, PageStream, Query};
pub use config::{Config, ConnectionString};
pub use connection::{Connection, ConnectionState};
pub use error::{JiraError, Result};
pub use json::JsonExt;
pub use models::ServerInfo;
pub use paging::Pagination;
pub use tokio_util::sync::CancellationToken;
