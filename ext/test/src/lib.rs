//! waypoint-test: Test domain for conformance testing
//!
//! Provides a key-value [`RequestContext`](waypoint::RequestContext) and a
//! call-counting judge for exercising the engine without a real transport.
//!
//! # Example
//!
//! ```
//! use waypoint_test::prelude::*;
//!
//! // Keys are `param_type` or `param_type.param_name`
//! let ctx = TestContext::new()
//!     .with("header.x-env", "prod")
//!     .with("uri", "/api/users");
//!
//! assert_eq!(ctx.real_data(ParamType::Header, "x-env").as_deref(), Some("prod"));
//! assert_eq!(ctx.real_data(ParamType::Uri, "").as_deref(), Some("/api/users"));
//! assert_eq!(ctx.real_data(ParamType::Cookie, "uid"), None);
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use waypoint::{ConditionData, ParamType, PredicateJudge, RequestContext};

#[cfg(feature = "fixtures")]
pub mod fixture;

/// Test context: `param_type[.param_name]` → value.
///
/// Used for conformance testing where we need predictable,
/// controllable input data.
#[derive(Debug, Clone, Default)]
pub struct TestContext {
    values: HashMap<String, String>,
}

/// The context key a condition source is stored under.
#[must_use]
pub fn context_key(param_type: ParamType, param_name: &str) -> String {
    if param_name.is_empty() {
        param_type.as_str().to_string()
    } else {
        format!("{}.{param_name}", param_type.as_str())
    }
}

impl TestContext {
    /// Create an empty test context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value under a raw key (builder pattern).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Add a value for a typed source (builder pattern).
    #[must_use]
    pub fn with_param(
        self,
        param_type: ParamType,
        param_name: &str,
        value: impl Into<String>,
    ) -> Self {
        self.with(context_key(param_type, param_name), value)
    }

    /// Get a value by raw key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl RequestContext for TestContext {
    fn real_data(&self, param_type: ParamType, param_name: &str) -> Option<Cow<'_, str>> {
        self.get(&context_key(param_type, param_name))
            .map(Cow::Borrowed)
    }
}

/// Wraps a judge and counts how often it is consulted.
///
/// Clones share the counter, so keep one clone and register the other.
#[derive(Debug, Clone)]
pub struct CountingJudge<J> {
    inner: J,
    calls: Arc<AtomicUsize>,
}

impl<J: PredicateJudge> CountingJudge<J> {
    /// Count calls to `inner`.
    pub fn new(inner: J) -> Self {
        Self {
            inner,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Calls so far, across all clones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<J: PredicateJudge> PredicateJudge for CountingJudge<J> {
    fn judge(&self, condition: &ConditionData, real_data: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.judge(condition, real_data)
    }

    fn judge_absent(&self, condition: &ConditionData) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.judge_absent(condition)
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{context_key, CountingJudge, TestContext};
    pub use waypoint::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint::{EqualsJudge, Operator};

    #[test]
    fn test_context_builder() {
        let ctx = TestContext::new()
            .with("query.page", "2")
            .with_param(ParamType::Method, "", "GET");

        assert_eq!(ctx.get("query.page"), Some("2"));
        assert_eq!(ctx.get("req_method"), Some("GET"));
        assert_eq!(ctx.get("missing"), None);
    }

    #[test]
    fn test_real_data_uses_context_key() {
        let ctx = TestContext::new().with_param(ParamType::Cookie, "uid", "42");
        assert_eq!(ctx.real_data(ParamType::Cookie, "uid").as_deref(), Some("42"));
        assert_eq!(ctx.real_data(ParamType::Cookie, "other"), None);
        assert_eq!(ctx.real_data(ParamType::Query, "uid"), None);
    }

    #[test]
    fn test_counting_judge_shares_counter() {
        let judge = CountingJudge::new(EqualsJudge);
        let registered = judge.clone();
        let cond = ConditionData::new("c", ParamType::Header, Operator::Equals, "a", "1");

        assert!(registered.judge(&cond, "1"));
        assert!(!registered.judge_absent(&cond));
        assert_eq!(judge.calls(), 2);
    }
}
