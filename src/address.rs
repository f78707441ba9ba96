//! Endpoint address resolution.
//!
//! Short endpoint names are expanded into fully qualified REST addresses:
//!
//! | Input                            | Resolved                                        |
//! |----------------------------------|-------------------------------------------------|
//! | `search?jql=x`                   | `{server}/rest/api/latest/search?jql=x`         |
//! | `greenhopper:rapid/1.0/sprints`  | `{server}/rest/greenhopper/latest/rapid/1.0/sprints` |
//! | `:issue/ABC-1`                   | `{server}/rest/api/latest/issue/ABC-1`          |
//! | `rest/agile/1.0/board`           | `{server}/rest/agile/1.0/board`                 |

/// API family used when the address names none.
pub const DEFAULT_API_FAMILY: &str = "api";

const PATH_TRIM: [char; 2] = ['/', ' '];

const FAMILY_SEPARATORS: [char; 3] = [';', ':', ','];

/// Resolves a short endpoint name against a server base URL.
///
/// `server` is expected without a trailing slash. The result is a pure
/// function of the two inputs.
pub fn resolve(server: &str, endpoint: &str) -> String {
    let endpoint = endpoint.trim_matches(PATH_TRIM);

    if is_qualified(endpoint) {
        return format!("{}/{}", server, endpoint);
    }

    match split_family(endpoint) {
        Some((family, path)) => {
            let family = if family.is_empty() {
                DEFAULT_API_FAMILY
            } else {
                family
            };
            format!(
                "{}/rest/{}/latest/{}",
                server,
                family,
                path.trim_matches(PATH_TRIM)
            )
        }
        None => format!("{}/rest/{}/latest/{}", server, DEFAULT_API_FAMILY, endpoint),
    }
}

/// Appends the `maxResults` parameter, starting a query string if needed.
pub fn with_page_size(address: &str, page_size: u32) -> String {
    let separator = if address.contains('?') { '&' } else { '?' };
    format!("{}{}maxResults={}", address, separator, page_size)
}

/// Appends the `startAt` parameter to an address that already has a query string.
pub fn with_start_at(address: &str, offset: u64) -> String {
    format!("{}&startAt={}", address, offset)
}

fn is_qualified(endpoint: &str) -> bool {
    endpoint
        .get(..5)
        .is_some_and(|head| head.eq_ignore_ascii_case("rest/"))
}

/// Splits a leading `family;`, `family:` or `family,` token off the endpoint.
///
/// The token is a (possibly empty) run of letters and ASCII digits, may be
/// surrounded by whitespace, and is followed by one or more separators.
fn split_family(endpoint: &str) -> Option<(&str, &str)> {
    let rest = endpoint.trim_start();
    let token_len = rest
        .char_indices()
        .find(|&(_, c)| !(c.is_alphabetic() || c.is_ascii_digit()))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    let (family, after) = rest.split_at(token_len);

    let after = after.trim_start();
    let remainder = after.trim_start_matches(FAMILY_SEPARATORS);
    if remainder.len() == after.len() {
        return None;
    }

    Some((family, remainder.trim_start()))
}
