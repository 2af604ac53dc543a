//! waypoint-http: HTTP request context for waypoint
//!
//! [`HttpRequest`] carries what a gateway knows about an incoming request and
//! answers the engine's [`RequestContext`](waypoint::RequestContext) lookups:
//!
//! | `ParamType` | real value |
//! |-------------|------------|
//! | `header`    | header by name, case-insensitive |
//! | `query`     | first query parameter by name |
//! | `cookie`    | cookie by name (from `Cookie` headers or set directly) |
//! | `uri`       | path without query string |
//! | `host`      | explicit host, else the `Host` header |
//! | `ip`        | client address |
//! | `req_method`| method, uppercased |
//! | `domain`    | `scheme://host` |
//! | `post`      | form field by name |
//!
//! # Example
//!
//! ```
//! use waypoint_http::prelude::*;
//!
//! let plane = DataPlane::default();
//! plane.apply(ConfigEvent::UpsertPlugin(PluginData::new("canary")));
//! plane.apply(ConfigEvent::UpsertSelector(
//!     SelectorData::new("beta", "canary", 0).with_condition(ConditionData::new(
//!         "c1", ParamType::Cookie, Operator::Equals, "cohort", "beta",
//!     )),
//! ));
//!
//! let req = HttpRequest::builder()
//!     .uri("/checkout")
//!     .header("Cookie", "cohort=beta; theme=dark")
//!     .build();
//! assert_eq!(plane.match_selector("canary", &req).unwrap().id, "beta");
//! ```

mod parse;
mod request;

pub use parse::{
    cookie_pairs, domain_of, get_query_param, parse_path_only, parse_query_string, query_pairs,
};
pub use request::{HttpRequest, HttpRequestBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{HttpRequest, HttpRequestBuilder};
    pub use waypoint::prelude::*;
}
