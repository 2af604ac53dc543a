//! Evaluation trace types for debugging match decisions.
//!
//! Trace types mirror a condition list but capture evaluation results instead
//! of inputs. Use [`MatchStrategy::evaluate_with_trace`](crate::MatchStrategy::evaluate_with_trace)
//! to see which condition decided a selector or rule, and what value the
//! request actually supplied.
//!
//! Traces never touch the match cache.

use crate::{MatchMode, Operator, ParamType};
use std::fmt;

/// Trace of one condition's verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionTrace {
    /// The condition's id.
    pub condition_id: String,
    /// Where the real value was read from.
    pub param_type: ParamType,
    /// Header/query/cookie name, if any.
    pub param_name: String,
    /// The operator judged.
    pub operator: Operator,
    /// The value the request supplied, `None` if absent.
    pub real_data: Option<String>,
    /// The judge's verdict.
    pub matched: bool,
}

/// Trace of a whole condition list.
///
/// # INV: `matched` == `evaluate()` result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchTrace {
    /// The policy the verdicts were folded under.
    pub mode: MatchMode,
    /// The folded result.
    pub matched: bool,
    /// Every condition, in list order (no short-circuit).
    pub conditions: Vec<ConditionTrace>,
}

impl fmt::Display for ConditionTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.matched { "✓" } else { "✗" };
        write!(f, "{mark} [{}] {}", self.condition_id, self.param_type)?;
        if !self.param_name.is_empty() {
            write!(f, "({})", self.param_name)?;
        }
        match &self.real_data {
            Some(value) => write!(f, " {} \"{value}\"", self.operator),
            None => write!(f, " {} <absent>", self.operator),
        }
    }
}

impl fmt::Display for MatchTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} → {}", self.mode, self.matched)?;
        for condition in &self.conditions {
            writeln!(f, "  {condition}")?;
        }
        Ok(())
    }
}
