//! jira-simple - connectivity probe for a Jira server
//!
//! Logs in, prints the server description and, when a JQL expression is
//! given as the first argument, counts the matching issues page by page.
//!
//! # Configuration
//!
//! Set the following environment variables (or use a `.env` file):
//!
//! - `JIRA_CONNECTION_STRING`: `Data Source=...;User ID=...;password=...`
//! - or `JIRA_SERVER`, `JIRA_USER` and `JIRA_PASSWORD`
//!
//! # Usage
//!
//! ```bash
//! ./jira-simple
//! ./jira-simple "project = PROJ AND status = Open"
//! ```

use anyhow::{Context, Result};
use futures_util::StreamExt;
use tracing_subscriber::{fmt, EnvFilter};

use jira_simple::{config, CancellationToken, Command, Connection, JsonExt, Query};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore errors if not found)
    dotenvy::dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("jira_simple=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = config::Config::from_env().context("Failed to load configuration")?;

    tracing::debug!("Configuration loaded, server: {}", config.connection.server);

    let connection =
        Connection::with_credentials(&config.connection).context("Failed to create connection")?;
    let command = connection.command().context("Failed to create command")?;

    // Ctrl-C cancels whatever request is in flight.
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    connection
        .connect_cancellable(&cancel)
        .await
        .context("Failed to log in")?;

    let info = command
        .server_info()
        .await
        .context("Failed to read server info")?;

    println!("{} ({})", info.title, info.url);
    println!("version {} build {}", info.version, info.build_number);
    println!("built {} / server time {}", info.build_date, info.server_time);

    if let Some(jql) = std::env::args().nth(1) {
        count_issues(&command, &jql, cancel).await?;
    }

    connection.dispose().await;

    Ok(())
}

async fn count_issues(command: &Command, jql: &str, cancel: CancellationToken) -> Result<()> {
    let mut pages = command
        .execute_paged(Query::jql(jql).with_cancellation(cancel))
        .context("Failed to start search")?;

    let mut pages_read = 0usize;
    let mut issues = 0usize;

    while let Some(page) = pages.next().await {
        let page = page.context("Search failed")?;
        pages_read += 1;
        issues += page.read(&["issues"]).items().count();
        tracing::debug!(pages = pages_read, issues = issues, "Read page");
    }

    println!("{} issues in {} pages", issues, pages_read);
    Ok(())
}
