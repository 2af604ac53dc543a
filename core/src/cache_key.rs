//! Deterministic cache-key derivation.
//!
//! One condition contributes `"{condition_id}_{real_value}"`, or just
//! `"{condition_id}"` when the request carries no value; a condition list joins
//! its parts with `|` in list order.
//!
//! `|` and `\` inside a real value are escaped with `\`, so for a fixed
//! condition list two different sets of real values never share a key, and an
//! absent value never shares a key with an empty one.

use crate::{ConditionData, RequestContext};

/// Separator between a condition id and its real value.
pub const KEY_SEPARATOR: char = '_';

/// Separator between per-condition parts of a list key.
pub const PART_SEPARATOR: char = '|';

const ESCAPE: char = '\\';

/// Key for one condition and its realized value.
///
/// ```
/// use waypoint::{condition_key, ConditionData, Operator, ParamType};
///
/// let cond = ConditionData::new("c1", ParamType::Header, Operator::Equals, "x-env", "prod");
/// assert_eq!(condition_key(&cond, Some("prod")), "c1_prod");
/// assert_eq!(condition_key(&cond, None), "c1");
/// assert_eq!(condition_key(&cond, Some("")), "c1_");
/// assert_eq!(condition_key(&cond, Some("a|b")), r"c1_a\|b");
/// ```
#[must_use]
pub fn condition_key(condition: &ConditionData, real_data: Option<&str>) -> String {
    let real = real_data.unwrap_or("");
    let mut key = String::with_capacity(condition.id.len() + 1 + real.len());
    key.push_str(&condition.id);
    if real_data.is_some() {
        key.push(KEY_SEPARATOR);
        for ch in real.chars() {
            if ch == PART_SEPARATOR || ch == ESCAPE {
                key.push(ESCAPE);
            }
            key.push(ch);
        }
    }
    key
}

/// Key for a whole condition list evaluated against `ctx`.
///
/// Returns `None` for an empty list: there is nothing to memoize.
#[must_use]
pub fn conditions_key(conditions: &[ConditionData], ctx: &dyn RequestContext) -> Option<String> {
    if conditions.is_empty() {
        return None;
    }
    let mut key = String::new();
    for (i, condition) in conditions.iter().enumerate() {
        if i > 0 {
            key.push(PART_SEPARATOR);
        }
        let real = ctx.real_data_for(condition);
        key.push_str(&condition_key(condition, real.as_deref()));
    }
    Some(key)
}
