//! Request-line, query-string and cookie parsing helpers.

/// Query string portion after `?`, or `None` if there is none.
#[must_use]
pub fn parse_query_string(uri: &str) -> Option<&str> {
    uri.split_once('?').map(|(_, query)| query)
}

/// Path portion before `?`, or the whole URI if there is no query string.
#[must_use]
pub fn parse_path_only(uri: &str) -> &str {
    uri.split_once('?').map_or(uri, |(p, _)| p)
}

/// Every `key=value` pair of a query string, in order.
///
/// A key without `=` yields an empty value; empty segments are skipped.
pub fn query_pairs(query: &str) -> impl Iterator<Item = (&str, &str)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
}

/// First value of `name` in a query string.
#[must_use]
pub fn get_query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query_pairs(query).find_map(|(key, value)| (key == name).then_some(value))
}

/// Every `name=value` pair of a `Cookie` header, in order.
pub fn cookie_pairs(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header
        .split(';')
        .map(str::trim)
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.trim(), value.trim().trim_matches('"')))
}

/// `scheme://authority`, the way a `domain` condition sees the request.
#[must_use]
pub fn domain_of(scheme: &str, host: &str) -> String {
    format!("{scheme}://{host}")
}
