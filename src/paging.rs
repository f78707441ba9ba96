//! Page-boundary detection for collection endpoints.
//!
//! Jira collection endpoints come in two shapes:
//!
//! - **cursor**: the page carries `startAt`; the collection is exhausted
//!   when a top-level array in the page comes back empty
//! - **last flag**: the page carries an `isLast` boolean and its own
//!   `maxResults`
//!
//! The shapes are not interchangeable, so the caller picks one with
//! [`Pagination`], or lets [`Pagination::Auto`] detect it per page.

use serde_json::Value;

use crate::error::{JiraError, Result};

/// Page size used when the caller asks for zero.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// How the end of a paged collection is detected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Pagination {
    /// Use the flag shape when `isLast` is present, the cursor shape when
    /// `startAt` is present, otherwise treat the response as the only page.
    #[default]
    Auto,

    /// Stop after a page with an empty top-level array; advance by the
    /// requested page size.
    Cursor,

    /// Stop after a page with `isLast: true`; advance by the page's own
    /// `maxResults`.
    LastFlag,
}

/// What to do after yielding a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PageStep {
    /// No further request.
    Last,
    /// Fetch again with the offset moved forward by this many items.
    Advance(u64),
}

impl Pagination {
    /// Decides the step following `page`, fetched with `page_size`.
    ///
    /// # Errors
    ///
    /// Returns `JiraError::MalformedResponse` if an explicit mode's marker
    /// field is missing from the page.
    pub(crate) fn next_step(self, page: &Value, page_size: u32) -> Result<PageStep> {
        let is_last = page.get("isLast").and_then(Value::as_bool);

        match self {
            Pagination::Auto => Ok(match is_last {
                Some(is_last) => last_flag_step(is_last, page, page_size),
                None if page.get("startAt").is_some() => cursor_step(page, page_size),
                None => PageStep::Last,
            }),
            Pagination::Cursor => {
                if page.get("startAt").is_none() {
                    return Err(JiraError::malformed(
                        "paged response has no startAt field",
                    ));
                }
                Ok(cursor_step(page, page_size))
            }
            Pagination::LastFlag => match is_last {
                Some(is_last) => Ok(last_flag_step(is_last, page, page_size)),
                None => Err(JiraError::malformed(
                    "paged response has no isLast boolean",
                )),
            },
        }
    }
}

/// Normalizes a requested page size; zero selects the default.
pub fn effective_page_size(requested: u32) -> u32 {
    if requested == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        requested
    }
}

fn cursor_step(page: &Value, page_size: u32) -> PageStep {
    let mut arrays = page
        .as_object()
        .into_iter()
        .flat_map(|map| map.values())
        .filter_map(Value::as_array)
        .peekable();

    // A page without any collection cannot be advanced through.
    if arrays.peek().is_none() {
        return PageStep::Last;
    }

    if arrays.any(|items| items.is_empty()) {
        PageStep::Last
    } else {
        PageStep::Advance(u64::from(page_size))
    }
}

fn last_flag_step(is_last: bool, page: &Value, page_size: u32) -> PageStep {
    if is_last {
        return PageStep::Last;
    }

    let reported = page
        .get("maxResults")
        .and_then(Value::as_u64)
        .filter(|n| *n > 0);

    PageStep::Advance(reported.unwrap_or(u64::from(page_size)))
}
