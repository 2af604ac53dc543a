//! `PredicateJudge` - one condition against one real value
//!
//! Judges are selected by the condition's [`Operator`](crate::Operator) through
//! the [`JudgeRegistry`](crate::JudgeRegistry). They must be pure: the same
//! condition and value always produce the same verdict, which is what makes
//! memoizing match results sound.
//!
//! # Available Judges
//!
//! - [`EqualsJudge`] / [`ExcludeJudge`] - exact (in)equality
//! - [`ContainsJudge`], [`StartsWithJudge`], [`EndsWithJudge`] - substring matches
//! - [`RegexJudge`] - regular expression search, compiled patterns memoized
//! - [`PathPatternJudge`] - ant-style path patterns (`*`, `**`, `?`)
//! - [`IsBlankJudge`] - absent or whitespace-only values
//! - [`ComparisonJudge`] - numeric `>`, `<`, `>=`, `<=`

use crate::ConditionData;
use lru::LruCache;
use parking_lot::Mutex;
use regex::Regex;
use std::fmt::Debug;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::warn;

/// Evaluates one condition against one extracted real value.
///
/// # Thread Safety
///
/// Judges are shared by every request worker, so implementations must be
/// `Send + Sync`.
///
/// # Example
///
/// ```
/// use waypoint::{ConditionData, EqualsJudge, Operator, ParamType, PredicateJudge};
///
/// let cond = ConditionData::new("c1", ParamType::Header, Operator::Equals, "x-env", "prod");
/// assert!(EqualsJudge.judge(&cond, "prod"));
/// assert!(!EqualsJudge.judge(&cond, "Prod"));
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `PredicateJudge`",
    label = "this type cannot judge a condition",
    note = "implement `judge(&self, &ConditionData, &str) -> bool`"
)]
pub trait PredicateJudge: Send + Sync + Debug {
    /// Verdict for a present real value.
    fn judge(&self, condition: &ConditionData, real_data: &str) -> bool;

    /// Verdict when the request carries no value for the condition.
    ///
    /// Default is `false`: a missing value never satisfies a comparison.
    fn judge_absent(&self, _condition: &ConditionData) -> bool {
        false
    }
}

impl PredicateJudge for Box<dyn PredicateJudge> {
    fn judge(&self, condition: &ConditionData, real_data: &str) -> bool {
        (**self).judge(condition, real_data)
    }

    fn judge_absent(&self, condition: &ConditionData) -> bool {
        (**self).judge_absent(condition)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// String Judges
// ═══════════════════════════════════════════════════════════════════════════════

/// Exact string equality with `param_value`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualsJudge;

impl PredicateJudge for EqualsJudge {
    fn judge(&self, condition: &ConditionData, real_data: &str) -> bool {
        real_data == condition.param_value
    }
}

/// Negated equality: matches any present value other than `param_value`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcludeJudge;

impl PredicateJudge for ExcludeJudge {
    fn judge(&self, condition: &ConditionData, real_data: &str) -> bool {
        real_data != condition.param_value
    }
}

/// Substring match.
///
/// ```
/// use waypoint::{ConditionData, ContainsJudge, Operator, ParamType, PredicateJudge};
///
/// let cond = ConditionData::new("c", ParamType::Uri, Operator::Contains, "", "order");
/// assert!(ContainsJudge.judge(&cond, "/api/orders/1"));
/// assert!(!ContainsJudge.judge(&cond, "/api/users"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainsJudge;

impl PredicateJudge for ContainsJudge {
    fn judge(&self, condition: &ConditionData, real_data: &str) -> bool {
        real_data.contains(condition.param_value.as_str())
    }
}

/// Prefix match.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartsWithJudge;

impl PredicateJudge for StartsWithJudge {
    fn judge(&self, condition: &ConditionData, real_data: &str) -> bool {
        real_data.starts_with(condition.param_value.as_str())
    }
}

/// Suffix match.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndsWithJudge;

impl PredicateJudge for EndsWithJudge {
    fn judge(&self, condition: &ConditionData, real_data: &str) -> bool {
        real_data.ends_with(condition.param_value.as_str())
    }
}

/// True when the value is absent, empty, or whitespace only.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsBlankJudge;

impl PredicateJudge for IsBlankJudge {
    fn judge(&self, _condition: &ConditionData, real_data: &str) -> bool {
        real_data.trim().is_empty()
    }

    fn judge_absent(&self, _condition: &ConditionData) -> bool {
        true
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Pattern Judges
// ═══════════════════════════════════════════════════════════════════════════════

/// Default number of compiled patterns a pattern judge keeps.
pub const DEFAULT_PATTERN_MEMO_CAPACITY: usize = 1024;

/// Bounded LRU memo of compiled patterns keyed by source text.
///
/// A pattern that fails to compile is remembered as `None` and logged once per
/// stay in the memo. Patterns dropped from the configuration age out.
#[derive(Debug)]
struct PatternMemo {
    compiled: Mutex<LruCache<String, Option<Arc<Regex>>>>,
}

impl Default for PatternMemo {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN_MEMO_CAPACITY)
    }
}

impl PatternMemo {
    fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            compiled: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn is_match(
        &self,
        pattern: &str,
        real_data: &str,
        compile: impl FnOnce(&str) -> Result<Regex, regex::Error>,
    ) -> bool {
        let cached = self.compiled.lock().get(pattern).cloned();
        let compiled = match cached {
            Some(compiled) => compiled,
            None => {
                let compiled = match compile(pattern) {
                    Ok(re) => Some(Arc::new(re)),
                    Err(e) => {
                        warn!(pattern, error = %e, "malformed condition pattern, condition never matches");
                        None
                    }
                };
                self.compiled.lock().put(pattern.to_string(), compiled.clone());
                compiled
            }
        };
        compiled.is_some_and(|re| re.is_match(real_data))
    }

    fn len(&self) -> usize {
        self.compiled.lock().len()
    }
}

/// Regular expression search over the real value.
///
/// Uses the linear-time `regex` crate. Unanchored patterns match anywhere;
/// anchor with `^...$` for a full match. A malformed pattern never matches.
///
/// ```
/// use waypoint::{ConditionData, Operator, ParamType, PredicateJudge, RegexJudge};
///
/// let judge = RegexJudge::default();
/// let cond = ConditionData::new("c", ParamType::Uri, Operator::Regex, "", r"^/v\d+/");
/// assert!(judge.judge(&cond, "/v2/orders"));
/// assert!(!judge.judge(&cond, "/orders"));
/// ```
#[derive(Debug, Default)]
pub struct RegexJudge {
    memo: PatternMemo,
}

impl RegexJudge {
    /// A judge keeping at most `capacity` compiled patterns (at least one).
    #[must_use]
    pub fn with_memo_capacity(capacity: usize) -> Self {
        Self {
            memo: PatternMemo::new(capacity),
        }
    }

    /// Number of patterns currently memoized (compiled or rejected).
    #[must_use]
    pub fn memoized(&self) -> usize {
        self.memo.len()
    }
}

impl PredicateJudge for RegexJudge {
    fn judge(&self, condition: &ConditionData, real_data: &str) -> bool {
        self.memo
            .is_match(&condition.param_value, real_data, Regex::new)
    }
}

/// Ant-style path pattern match.
///
/// - `?` matches one character except `/`
/// - `*` matches zero or more characters within a segment
/// - `**` matches across segments; a trailing `/**` also matches the bare prefix
///
/// ```
/// use waypoint::{ConditionData, Operator, ParamType, PathPatternJudge, PredicateJudge};
///
/// let judge = PathPatternJudge::default();
/// let cond = ConditionData::new("c", ParamType::Uri, Operator::PathPattern, "", "/api/**");
/// assert!(judge.judge(&cond, "/api"));
/// assert!(judge.judge(&cond, "/api/orders/7"));
/// assert!(!judge.judge(&cond, "/apix"));
/// ```
#[derive(Debug, Default)]
pub struct PathPatternJudge {
    memo: PatternMemo,
}

impl PathPatternJudge {
    /// A judge keeping at most `capacity` compiled patterns (at least one).
    #[must_use]
    pub fn with_memo_capacity(capacity: usize) -> Self {
        Self {
            memo: PatternMemo::new(capacity),
        }
    }

    /// Number of patterns currently memoized.
    #[must_use]
    pub fn memoized(&self) -> usize {
        self.memo.len()
    }
}

impl PredicateJudge for PathPatternJudge {
    fn judge(&self, condition: &ConditionData, real_data: &str) -> bool {
        self.memo.is_match(&condition.param_value, real_data, |pattern| {
            Regex::new(&path_pattern_to_regex(pattern))
        })
    }
}

/// Translate an ant-style path pattern into an anchored regex.
fn path_pattern_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '/' if chars.get(i + 1) == Some(&'*')
                && chars.get(i + 2) == Some(&'*')
                && matches!(chars.get(i + 3), None | Some('/')) =>
            {
                out.push_str("(?:/.*)?");
                i += 3;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                out.push_str(".*");
                i += 2;
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            c => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
                i += 1;
            }
        }
    }
    out.push('$');
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// Numeric Judges
// ═══════════════════════════════════════════════════════════════════════════════

/// Numeric comparison direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// real > expected
    Gt,
    /// real < expected
    Lt,
    /// real >= expected
    Ge,
    /// real <= expected
    Le,
}

/// Compares the real value with `param_value` as numbers.
///
/// Either side failing to parse as a number yields `false`.
///
/// ```
/// use waypoint::{Comparison, ComparisonJudge, ConditionData, Operator, ParamType, PredicateJudge};
///
/// let judge = ComparisonJudge::new(Comparison::Ge);
/// let cond = ConditionData::new("c", ParamType::Header, Operator::Ge, "x-version", "2");
/// assert!(judge.judge(&cond, "2.5"));
/// assert!(!judge.judge(&cond, "1"));
/// assert!(!judge.judge(&cond, "two"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ComparisonJudge {
    comparison: Comparison,
}

impl ComparisonJudge {
    /// Create a judge for the given direction.
    #[must_use]
    pub fn new(comparison: Comparison) -> Self {
        Self { comparison }
    }

    /// The comparison direction.
    #[must_use]
    pub fn comparison(&self) -> Comparison {
        self.comparison
    }
}

impl PredicateJudge for ComparisonJudge {
    fn judge(&self, condition: &ConditionData, real_data: &str) -> bool {
        let (Ok(real), Ok(expected)) = (
            real_data.trim().parse::<f64>(),
            condition.param_value.trim().parse::<f64>(),
        ) else {
            return false;
        };
        match self.comparison {
            Comparison::Gt => real > expected,
            Comparison::Lt => real < expected,
            Comparison::Ge => real >= expected,
            Comparison::Le => real <= expected,
        }
    }
}
