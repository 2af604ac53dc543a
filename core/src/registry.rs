//! Judge registry: [`Operator`] → [`PredicateJudge`].
//!
//! The registry is the single dispatch point between a condition's operator and
//! the code that judges it. [`JudgeRegistry::with_defaults`] installs the built-in
//! catalog; [`JudgeRegistry::register`] replaces or adds a judge, so a gateway
//! can swap in its own equality or pattern semantics without touching the engine.
//!
//! # Example
//!
//! ```
//! use waypoint::{ConditionData, EqualsJudge, JudgeRegistry, Operator, ParamType};
//!
//! let registry = JudgeRegistry::with_defaults();
//! let cond = ConditionData::new("c1", ParamType::Header, Operator::Equals, "x-env", "prod");
//! assert!(registry.judge(&cond, Some("prod")));
//! assert!(!registry.judge(&cond, None));
//! ```

use std::collections::HashMap;

use tracing::warn;

use crate::{
    Comparison, ComparisonJudge, ConditionData, ContainsJudge, EndsWithJudge, EqualsJudge,
    ExcludeJudge, IsBlankJudge, Operator, PathPatternJudge, PredicateJudge, RegexJudge,
    StartsWithJudge,
};

/// Maps each [`Operator`] to the judge that evaluates it.
#[derive(Debug, Default)]
pub struct JudgeRegistry {
    judges: HashMap<Operator, Box<dyn PredicateJudge>>,
}

impl JudgeRegistry {
    /// An empty registry. Every condition judges `false` until judges are registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in judge for every [`Operator`].
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new()
            .with(Operator::Equals, EqualsJudge)
            .with(Operator::Exclude, ExcludeJudge)
            .with(Operator::Contains, ContainsJudge)
            .with(Operator::StartsWith, StartsWithJudge)
            .with(Operator::EndsWith, EndsWithJudge)
            .with(Operator::Regex, RegexJudge::default())
            .with(Operator::PathPattern, PathPatternJudge::default())
            .with(Operator::IsBlank, IsBlankJudge)
            .with(Operator::Gt, ComparisonJudge::new(Comparison::Gt))
            .with(Operator::Lt, ComparisonJudge::new(Comparison::Lt))
            .with(Operator::Ge, ComparisonJudge::new(Comparison::Ge))
            .with(Operator::Le, ComparisonJudge::new(Comparison::Le))
    }

    /// Register a judge (builder pattern). Replaces any previous judge for `operator`.
    #[must_use]
    pub fn with(mut self, operator: Operator, judge: impl PredicateJudge + 'static) -> Self {
        self.register(operator, judge);
        self
    }

    /// Register a judge, returning the one it replaced.
    pub fn register(
        &mut self,
        operator: Operator,
        judge: impl PredicateJudge + 'static,
    ) -> Option<Box<dyn PredicateJudge>> {
        self.judges.insert(operator, Box::new(judge))
    }

    /// The judge registered for `operator`.
    #[must_use]
    pub fn get(&self, operator: Operator) -> Option<&dyn PredicateJudge> {
        self.judges.get(&operator).map(|j| &**j)
    }

    /// Returns `true` if a judge is registered for `operator`.
    #[must_use]
    pub fn contains(&self, operator: Operator) -> bool {
        self.judges.contains_key(&operator)
    }

    /// Registered operators, in [`Operator::ALL`] order.
    #[must_use]
    pub fn operators(&self) -> Vec<Operator> {
        Operator::ALL
            .into_iter()
            .filter(|op| self.judges.contains_key(op))
            .collect()
    }

    /// Judge `condition` against its extracted real value.
    ///
    /// `None` means the request carried no value. An operator without a
    /// registered judge never matches.
    pub fn judge(&self, condition: &ConditionData, real_data: Option<&str>) -> bool {
        let Some(judge) = self.judges.get(&condition.operator) else {
            warn!(
                condition = %condition.id,
                operator = %condition.operator,
                "no judge registered for operator, condition never matches"
            );
            return false;
        };
        match real_data {
            Some(value) => judge.judge(condition, value),
            None => judge.judge_absent(condition),
        }
    }
}
