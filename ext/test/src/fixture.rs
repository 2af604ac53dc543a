//! Conformance test fixture runner
//!
//! Loads YAML fixtures and runs them against a [`DataPlane`].
//!
//! ```yaml
//! name: header routing
//! snapshot:
//!   plugins: [{ name: rate-limiter }]
//!   selectors:
//!     - id: s1
//!       plugin_name: rate-limiter
//!       conditions:
//!         - { id: c1, param_type: header, operator: "=", param_name: x-env, param_value: prod }
//! cases:
//!   - name: prod matches
//!     plugin: rate-limiter
//!     context: { header.x-env: prod }
//!     expect: { selector: s1 }
//!   - name: update applies
//!     before:
//!       - type: remove_selector
//!         data: { id: s1, plugin_name: rate-limiter }
//!     plugin: rate-limiter
//!     context: { header.x-env: prod }
//!     expect: {}
//! ```
//!
//! Every case is resolved twice: once against whatever the cache holds, once
//! right after. Both must equal `expect`.

use crate::TestContext;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use waypoint::{ConfigEvent, ConfigSnapshot, DataPlane, RouteDecision};

/// A complete test fixture
#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub snapshot: ConfigSnapshot,
    pub cases: Vec<TestCase>,
}

/// Test case
#[derive(Debug, Deserialize)]
pub struct TestCase {
    pub name: String,
    /// Events applied before this case resolves.
    #[serde(default)]
    pub before: Vec<ConfigEvent>,
    pub plugin: String,
    #[serde(default)]
    pub context: HashMap<String, String>,
    #[serde(default)]
    pub expect: Expect,
}

/// Expected selector and rule ids; both absent means no match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Expect {
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub rule: Option<String>,
}

impl From<Option<RouteDecision>> for Expect {
    fn from(decision: Option<RouteDecision>) -> Self {
        match decision {
            Some(d) => Self {
                selector: Some(d.selector.id.clone()),
                rule: d.rule.map(|r| r.id.clone()),
            },
            None => Self::default(),
        }
    }
}

impl fmt::Display for Expect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.selector, &self.rule) {
            (None, _) => f.write_str("no match"),
            (Some(s), None) => write!(f, "selector {s}"),
            (Some(s), Some(r)) => write!(f, "selector {s} / rule {r}"),
        }
    }
}

impl TestCase {
    /// Build a TestContext from this case's context map
    pub fn build_context(&self) -> TestContext {
        let mut ctx = TestContext::new();
        for (k, v) in &self.context {
            ctx = ctx.with(k.clone(), v.clone());
        }
        ctx
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Runner
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of running a single test case
#[derive(Debug)]
pub struct CaseResult {
    pub case_name: String,
    pub passed: bool,
    pub expected: Expect,
    /// First resolution.
    pub actual: Expect,
    /// Second resolution, served from the cache where possible.
    pub repeated: Expect,
}

impl Fixture {
    /// Parse a fixture from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Parse multiple fixtures from a YAML file with `---` separators
    pub fn from_yaml_multi(yaml: &str) -> Result<Vec<Self>, serde_yaml::Error> {
        let mut fixtures = Vec::new();
        for doc in serde_yaml::Deserializer::from_str(yaml) {
            fixtures.push(Self::deserialize(doc)?);
        }
        Ok(fixtures)
    }

    /// Run all test cases in order against one data plane and return results
    pub fn run(&self) -> Vec<CaseResult> {
        let plane = DataPlane::from_snapshot(&self.snapshot);
        self.cases
            .iter()
            .map(|case| {
                for event in &case.before {
                    plane.apply(event.clone());
                }
                let ctx = case.build_context();
                let actual = Expect::from(plane.route(&case.plugin, &ctx));
                let repeated = Expect::from(plane.route(&case.plugin, &ctx));
                CaseResult {
                    case_name: case.name.clone(),
                    passed: actual == case.expect && repeated == case.expect,
                    expected: case.expect.clone(),
                    actual,
                    repeated,
                }
            })
            .collect()
    }

    /// Run all test cases and panic on first failure
    pub fn run_and_assert(&self) {
        let results = self.run();
        for result in results {
            assert!(
                result.passed,
                "Fixture '{}' case '{}' failed: expected {}, got {} then {}",
                self.name, result.case_name, result.expected, result.actual, result.repeated
            );
        }
    }
}
