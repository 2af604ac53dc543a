//! `RequestContext` - extraction of real values from a live request
//!
//! A condition names *where* its value lives ([`ParamType`] + `param_name`);
//! the request context answers with the realized string. The engine never
//! looks inside the request itself, so any transport can plug in.

use crate::{ConditionData, ParamType};
use std::borrow::Cow;

/// Extracts the real value a condition is judged against.
///
/// # Contract
///
/// For a fixed request, repeated calls with the same arguments must return the
/// same value. Cache keys are derived from these values, so an unstable
/// extraction would scatter one request across many keys.
///
/// Returning `None` means the value is absent. Absent values fail every judge
/// except [`Operator::IsBlank`](crate::Operator::IsBlank).
///
/// # Example
///
/// ```
/// use std::borrow::Cow;
/// use waypoint::{ParamType, RequestContext};
///
/// struct PathOnly(String);
///
/// impl RequestContext for PathOnly {
///     fn real_data(&self, param_type: ParamType, _name: &str) -> Option<Cow<'_, str>> {
///         match param_type {
///             ParamType::Uri => Some(Cow::Borrowed(&self.0)),
///             _ => None,
///         }
///     }
/// }
///
/// let req = PathOnly("/orders".into());
/// assert_eq!(req.real_data(ParamType::Uri, "").as_deref(), Some("/orders"));
/// assert_eq!(req.real_data(ParamType::Header, "x-env"), None);
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `RequestContext`",
    label = "this type cannot supply request values to conditions",
    note = "implement `real_data(&self, ParamType, &str) -> Option<Cow<str>>` for your request type"
)]
pub trait RequestContext {
    /// The realized value for `param_type` / `param_name`, or `None` if absent.
    fn real_data(&self, param_type: ParamType, param_name: &str) -> Option<Cow<'_, str>>;

    /// Convenience wrapper reading the source named by `condition`.
    fn real_data_for(&self, condition: &ConditionData) -> Option<Cow<'_, str>> {
        self.real_data(condition.param_type, &condition.param_name)
    }
}

impl<T: RequestContext + ?Sized> RequestContext for &T {
    fn real_data(&self, param_type: ParamType, param_name: &str) -> Option<Cow<'_, str>> {
        (**self).real_data(param_type, param_name)
    }
}
