//! `MatchStrategy` - combining per-condition verdicts
//!
//! A selector or rule names its policy through [`MatchMode`]; the strategy
//! extracts each condition's real value, asks the [`JudgeRegistry`] for a
//! verdict, and folds the verdicts:
//!
//! - [`AndStrategy`] - every condition must hold (short-circuit on first `false`)
//! - [`OrStrategy`] - at least one must hold (short-circuit on first `true`)
//!
//! # INV: absent → `judge_absent`
//!
//! When the request carries no value for a condition, the verdict comes from
//! [`PredicateJudge::judge_absent`](crate::PredicateJudge::judge_absent), which is
//! `false` for every built-in judge except `IsBlank`.

use crate::{
    ConditionData, ConditionTrace, JudgeRegistry, MatchMode, MatchTrace, RequestContext,
};
use std::fmt::Debug;

/// A boolean policy over a condition list.
///
/// # Example
///
/// ```
/// use waypoint::{MatchMode, MatchStrategy};
///
/// assert!(!MatchMode::And.strategy().merge(&[true, true, false]));
/// assert!(MatchMode::Or.strategy().merge(&[true, true, false]));
/// ```
pub trait MatchStrategy: Send + Sync + Debug {
    /// The mode this strategy implements.
    fn mode(&self) -> MatchMode;

    /// Combine a sequence of boolean results under this policy.
    fn merge(&self, results: &[bool]) -> bool;

    /// Evaluate `conditions` against `ctx`.
    fn evaluate(
        &self,
        conditions: &[ConditionData],
        ctx: &dyn RequestContext,
        judges: &JudgeRegistry,
    ) -> bool;

    /// Evaluate with full trace for debugging.
    ///
    /// Unlike [`evaluate()`](Self::evaluate), this does NOT short-circuit:
    /// every condition is judged. The `matched` result is still the same.
    fn evaluate_with_trace(
        &self,
        conditions: &[ConditionData],
        ctx: &dyn RequestContext,
        judges: &JudgeRegistry,
    ) -> MatchTrace {
        let traces: Vec<ConditionTrace> = conditions
            .iter()
            .map(|condition| {
                let real_data = ctx.real_data_for(condition).map(|v| v.into_owned());
                let matched = judges.judge(condition, real_data.as_deref());
                ConditionTrace {
                    condition_id: condition.id.clone(),
                    param_type: condition.param_type,
                    param_name: condition.param_name.clone(),
                    operator: condition.operator,
                    real_data,
                    matched,
                }
            })
            .collect();
        let verdicts: Vec<bool> = traces.iter().map(|t| t.matched).collect();
        MatchTrace {
            mode: self.mode(),
            matched: self.merge(&verdicts),
            conditions: traces,
        }
    }
}

/// Verdict for one condition against `ctx`.
fn verdict(condition: &ConditionData, ctx: &dyn RequestContext, judges: &JudgeRegistry) -> bool {
    let real = ctx.real_data_for(condition);
    judges.judge(condition, real.as_deref())
}

/// Every condition must hold. An empty list holds (vacuous truth).
#[derive(Debug, Clone, Copy, Default)]
pub struct AndStrategy;

impl MatchStrategy for AndStrategy {
    fn mode(&self) -> MatchMode {
        MatchMode::And
    }

    fn merge(&self, results: &[bool]) -> bool {
        results.iter().all(|r| *r)
    }

    fn evaluate(
        &self,
        conditions: &[ConditionData],
        ctx: &dyn RequestContext,
        judges: &JudgeRegistry,
    ) -> bool {
        conditions.iter().all(|c| verdict(c, ctx, judges))
    }
}

/// At least one condition must hold. An empty list does not.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrStrategy;

impl MatchStrategy for OrStrategy {
    fn mode(&self) -> MatchMode {
        MatchMode::Or
    }

    fn merge(&self, results: &[bool]) -> bool {
        results.iter().any(|r| *r)
    }

    fn evaluate(
        &self,
        conditions: &[ConditionData],
        ctx: &dyn RequestContext,
        judges: &JudgeRegistry,
    ) -> bool {
        conditions.iter().any(|c| verdict(c, ctx, judges))
    }
}

static AND: AndStrategy = AndStrategy;
static OR: OrStrategy = OrStrategy;

impl MatchMode {
    /// The strategy implementing this mode.
    #[must_use]
    pub fn strategy(self) -> &'static dyn MatchStrategy {
        match self {
            MatchMode::And => &AND,
            MatchMode::Or => &OR,
        }
    }
}
