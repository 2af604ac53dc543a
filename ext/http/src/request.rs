//! `HttpRequest` - an owned HTTP request view implementing `RequestContext`.

use crate::parse::{cookie_pairs, domain_of, parse_path_only, parse_query_string, query_pairs};
use std::borrow::Cow;
use std::collections::HashMap;
use std::net::IpAddr;
use waypoint::{ParamType, RequestContext};

/// HTTP request data as the gateway saw it.
///
/// Header names are case-insensitive. Query parameters and cookies keep their
/// first value. The `Cookie` header is split into cookies as it is added.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    method: String,
    path: String,
    scheme: String,
    host: Option<String>,
    remote_ip: Option<IpAddr>,
    headers: HashMap<String, String>,
    query_params: HashMap<String, String>,
    cookies: HashMap<String, String>,
    form: HashMap<String, String>,
}

impl HttpRequest {
    /// Create a builder for `HttpRequest`.
    #[must_use]
    pub fn builder() -> HttpRequestBuilder {
        HttpRequestBuilder::default()
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The request path, without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The scheme, `http` unless set.
    #[must_use]
    pub fn scheme(&self) -> &str {
        if self.scheme.is_empty() {
            "http"
        } else {
            &self.scheme
        }
    }

    /// The host: explicit, else the `Host` header.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref().or_else(|| self.header("host"))
    }

    /// The client address.
    #[must_use]
    pub fn remote_ip(&self) -> Option<IpAddr> {
        self.remote_ip
    }

    /// A header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// A query parameter by name.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// A cookie by name.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// A form field by name.
    #[must_use]
    pub fn form_field(&self, name: &str) -> Option<&str> {
        self.form.get(name).map(String::as_str)
    }
}

impl RequestContext for HttpRequest {
    fn real_data(&self, param_type: ParamType, name: &str) -> Option<Cow<'_, str>> {
        match param_type {
            ParamType::Header => self.header(name).map(Cow::Borrowed),
            ParamType::Query => self.query_param(name).map(Cow::Borrowed),
            ParamType::Cookie => self.cookie(name).map(Cow::Borrowed),
            ParamType::Uri => Some(Cow::Borrowed(self.path())),
            ParamType::Host => self.host().map(Cow::Borrowed),
            ParamType::Ip => self.remote_ip.map(|ip| Cow::Owned(ip.to_string())),
            ParamType::Method => (!self.method.is_empty()).then(|| Cow::Borrowed(self.method())),
            ParamType::Domain => self
                .host()
                .map(|host| Cow::Owned(domain_of(self.scheme(), host))),
            ParamType::Post => self.form_field(name).map(Cow::Borrowed),
        }
    }
}

/// Builder for `HttpRequest`.
#[derive(Debug, Default)]
pub struct HttpRequestBuilder {
    request: HttpRequest,
}

impl HttpRequestBuilder {
    /// Set the HTTP method (uppercased).
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.request.method = method.into().to_uppercase();
        self
    }

    /// Set the path. Does not parse a query string.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.request.path = path.into();
        self
    }

    /// Set path and query parameters from a request URI (`/a/b?x=1`).
    #[must_use]
    pub fn uri(mut self, uri: &str) -> Self {
        self.request.path = parse_path_only(uri).to_string();
        if let Some(query) = parse_query_string(uri) {
            for (name, value) in query_pairs(query) {
                self = self.query_param(name, value);
            }
        }
        self
    }

    /// Set the scheme.
    #[must_use]
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.request.scheme = scheme.into();
        self
    }

    /// Set the host, overriding the `Host` header.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.request.host = Some(host.into());
        self
    }

    /// Set the client address.
    #[must_use]
    pub fn remote_ip(mut self, ip: IpAddr) -> Self {
        self.request.remote_ip = Some(ip);
        self
    }

    /// Add a header (name is lowercased). A `Cookie` header also adds its cookies.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into().to_lowercase();
        let value = value.into();
        if name == "cookie" {
            for (cookie, v) in cookie_pairs(&value) {
                self.request
                    .cookies
                    .entry(cookie.to_string())
                    .or_insert_with(|| v.to_string());
            }
        }
        self.request.headers.insert(name, value);
        self
    }

    /// Add a query parameter. The first value for a name wins.
    #[must_use]
    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request
            .query_params
            .entry(name.into())
            .or_insert_with(|| value.into());
        self
    }

    /// Add a cookie. The first value for a name wins.
    #[must_use]
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request
            .cookies
            .entry(name.into())
            .or_insert_with(|| value.into());
        self
    }

    /// Add a form field.
    #[must_use]
    pub fn form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.form.insert(name.into(), value.into());
        self
    }

    /// Build the `HttpRequest`.
    #[must_use]
    pub fn build(self) -> HttpRequest {
        self.request
    }
}
