//! Queries against a Jira connection.
//!
//! A [`Command`] is a cheap handle bound to one [`Connection`]. It resolves
//! short endpoint names (see [`crate::address`]), authenticates on first
//! use, and either returns one JSON document or streams the pages of a
//! collection endpoint.
//!
//! # Paging
//!
//! [`Command::execute_paged`] returns a lazy stream. Each poll issues at
//! most one request, so nothing is fetched ahead of the consumer. The
//! stream ends after the last page, or after yielding a single error:
//! pages already delivered stay delivered.

use futures_util::stream::{BoxStream, StreamExt};
use reqwest::Method;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::address;
use crate::connection::Connection;
use crate::error::{JiraError, Result};
use crate::models::ServerInfo;
use crate::paging::{self, PageStep, Pagination};

/// Endpoint returning the server description.
pub const SERVER_INFO_ENDPOINT: &str = "serverInfo";

/// Body sent when the caller supplies none.
const EMPTY_BODY: &str = "{}";

/// Stream of pages produced by [`Command::execute_paged`].
pub type PageStream = BoxStream<'static, Result<Value>>;

/// One request to a Jira endpoint.
///
/// Use the builder methods to add a body, method, page size or
/// cancellation token.
///
/// # Example
///
/// ```ignore
/// let query = Query::new("agile:board")
///     .with_page_size(50)
///     .with_pagination(Pagination::LastFlag);
/// let mut pages = command.execute_paged(query)?;
/// ```
#[derive(Debug, Clone)]
pub struct Query {
    address: String,
    body: Option<String>,
    method: Option<Method>,
    page_size: u32,
    pagination: Pagination,
    cancel: CancellationToken,
}

impl Query {
    /// Creates a query for a short or fully qualified endpoint address.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            body: None,
            method: None,
            page_size: 0,
            pagination: Pagination::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Creates a `search` query for a JQL expression.
    pub fn jql(jql: &str) -> Self {
        Self::new(format!("search?jql={}", urlencoding::encode(jql)))
    }

    /// Sets the JSON request body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the JSON request body from a value.
    pub fn with_json(mut self, body: &Value) -> Self {
        self.body = Some(body.to_string());
        self
    }

    /// Sets the HTTP method; otherwise it is inferred from the body.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the page size for paged queries; zero selects the default.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets how the end of a paged collection is detected.
    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// Sets the token that cancels the query.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The address as given.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The body to send: the caller's, or `{}` when blank.
    pub fn body(&self) -> &str {
        match self.body.as_deref() {
            Some(body) if !body.trim().is_empty() => body,
            _ => EMPTY_BODY,
        }
    }

    /// The method to use: the explicit one, else GET for a blank body and
    /// POST otherwise.
    pub fn method(&self) -> Method {
        match (&self.method, self.has_body()) {
            (Some(method), _) => method.clone(),
            (None, false) => Method::GET,
            (None, true) => Method::POST,
        }
    }

    fn has_body(&self) -> bool {
        self.body.as_deref().is_some_and(|b| !b.trim().is_empty())
    }
}

/// Executes queries on behalf of one [`Connection`].
///
/// Stateless apart from the connection handle; create one per call if
/// convenient.
#[derive(Debug, Clone)]
pub struct Command {
    connection: Connection,
}

impl Command {
    /// Binds a command to a connection.
    ///
    /// # Errors
    ///
    /// Returns `JiraError::Disposed` if the connection was disposed.
    pub fn new(connection: Connection) -> Result<Self> {
        if connection.is_disposed() {
            return Err(JiraError::Disposed);
        }
        Ok(Self { connection })
    }

    /// The connection this command runs on.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Runs a GET with an empty body.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let issue = command.query("issue/PROJ-1").await?;
    /// ```
    pub async fn query(&self, address: &str) -> Result<Value> {
        self.execute(&Query::new(address)).await
    }

    /// Runs a query with a JSON body; GET if the body is blank, else POST.
    pub async fn query_json(&self, address: &str, body: &str) -> Result<Value> {
        self.execute(&Query::new(address).with_body(body)).await
    }

    /// Runs a single query and returns the parsed root document.
    ///
    /// # Errors
    ///
    /// - `JiraError::Validation` if the address is blank
    /// - `JiraError::Disposed` if the connection was disposed
    /// - `JiraError::Authentication` if the implicit login fails
    /// - `JiraError::Remote` on a non-success status
    /// - `JiraError::Json` if the body is not JSON
    /// - `JiraError::Cancelled` if the query's token fires
    pub async fn execute(&self, query: &Query) -> Result<Value> {
        self.check(query)?;

        self.connection.connect_cancellable(&query.cancel).await?;

        let url = address::resolve(self.connection.server(), query.address());
        self.connection
            .send(query.method(), &url, query.body(), &query.cancel)
            .await
    }

    /// Streams every page of a collection endpoint, in fetch order.
    ///
    /// The first request carries `maxResults` and `startAt=0`; later
    /// requests move `startAt` forward as decided by the query's
    /// [`Pagination`]. Every call starts a fresh fetch loop from offset 0.
    ///
    /// # Errors
    ///
    /// Validation and disposal are checked before the stream is returned.
    /// Failures after that arrive as the stream's final item.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use futures_util::StreamExt;
    ///
    /// let mut pages = command.execute_paged(Query::jql("project = PROJ"))?;
    /// while let Some(page) = pages.next().await {
    ///     let page = page?;
    ///     println!("{} issues", page["issues"].as_array().map_or(0, Vec::len));
    /// }
    /// ```
    pub fn execute_paged(&self, query: Query) -> Result<PageStream> {
        self.check(&query)?;

        let connection = self.connection.clone();
        let page_size = paging::effective_page_size(query.page_size);

        let pages = async_stream::stream! {
            if let Err(e) = connection.connect_cancellable(&query.cancel).await {
                yield Err(e);
                return;
            }

            let base = address::with_page_size(
                &address::resolve(connection.server(), query.address()),
                page_size,
            );
            let method = query.method();
            let mut offset: u64 = 0;

            loop {
                if query.cancel.is_cancelled() {
                    yield Err(JiraError::Cancelled);
                    return;
                }

                tracing::debug!(offset = offset, page_size = page_size, "Fetching page");

                let url = address::with_start_at(&base, offset);
                let page = match connection
                    .send(method.clone(), &url, query.body(), &query.cancel)
                    .await
                {
                    Ok(page) => page,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                let step = match query.pagination.next_step(&page, page_size) {
                    Ok(step) => step,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                yield Ok(page);

                match step {
                    PageStep::Last => return,
                    PageStep::Advance(count) => offset += count,
                }
            }
        };

        Ok(pages.boxed())
    }

    /// Runs a JQL search and returns the first result page.
    pub async fn jql(&self, jql: &str) -> Result<Value> {
        self.execute(&Query::jql(jql)).await
    }

    /// Streams every page of a JQL search.
    pub fn jql_paged(&self, jql: &str, page_size: u32) -> Result<PageStream> {
        self.execute_paged(Query::jql(jql).with_page_size(page_size))
    }

    /// Reads the server description.
    ///
    /// # Errors
    ///
    /// Returns `JiraError::MalformedResponse` if a field is missing or
    /// malformed, in addition to the errors of [`Command::execute`].
    pub async fn server_info(&self) -> Result<ServerInfo> {
        let document = self.query(SERVER_INFO_ENDPOINT).await?;
        ServerInfo::from_json(&document)
    }

    /// Checks the preconditions shared by every query.
    fn check(&self, query: &Query) -> Result<()> {
        if query.address().trim().is_empty() {
            return Err(JiraError::validation("address must not be empty"));
        }
        if self.connection.is_disposed() {
            return Err(JiraError::Disposed);
        }
        Ok(())
    }
}
