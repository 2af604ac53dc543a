//! Routing configuration data pushed from the control plane.
//!
//! A plugin owns many selectors, a selector owns many rules, and selectors and
//! rules each own an ordered list of [`ConditionData`]. Everything here is plain
//! data: the indices that tie them together live in
//! [`ConfigurationIndex`](crate::ConfigurationIndex).

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// Enumerations
// ═══════════════════════════════════════════════════════════════════════════════

/// Where a condition reads its real value from in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ParamType {
    /// A request header, by name (case-insensitive).
    Header,
    /// A query-string parameter, by name.
    Query,
    /// A cookie, by name.
    Cookie,
    /// The request path without the query string.
    Uri,
    /// The `Host` of the request.
    Host,
    /// The client address.
    Ip,
    /// The HTTP method.
    #[cfg_attr(feature = "serde", serde(rename = "req_method"))]
    Method,
    /// The domain (scheme + authority) the request was sent to.
    Domain,
    /// A form or body field, by name.
    Post,
}

impl ParamType {
    /// All parameter types, in declaration order.
    pub const ALL: [ParamType; 9] = [
        Self::Header,
        Self::Query,
        Self::Cookie,
        Self::Uri,
        Self::Host,
        Self::Ip,
        Self::Method,
        Self::Domain,
        Self::Post,
    ];

    /// Wire name used by the control plane.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Query => "query",
            Self::Cookie => "cookie",
            Self::Uri => "uri",
            Self::Host => "host",
            Self::Ip => "ip",
            Self::Method => "req_method",
            Self::Domain => "domain",
            Self::Post => "post",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The predicate a condition applies to its real value.
///
/// Each operator is served by one [`PredicateJudge`](crate::PredicateJudge)
/// in the [`JudgeRegistry`](crate::JudgeRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Operator {
    /// Exact string equality.
    #[cfg_attr(feature = "serde", serde(rename = "="))]
    Equals,
    /// Negated string equality.
    #[cfg_attr(feature = "serde", serde(rename = "exclude"))]
    Exclude,
    /// Substring match.
    #[cfg_attr(feature = "serde", serde(rename = "contains"))]
    Contains,
    /// Prefix match.
    #[cfg_attr(feature = "serde", serde(rename = "startsWith"))]
    StartsWith,
    /// Suffix match.
    #[cfg_attr(feature = "serde", serde(rename = "endsWith"))]
    EndsWith,
    /// Regular expression (searches anywhere unless anchored).
    #[cfg_attr(feature = "serde", serde(rename = "regex"))]
    Regex,
    /// Ant-style path pattern (`*`, `**`, `?`).
    #[cfg_attr(feature = "serde", serde(rename = "match"))]
    PathPattern,
    /// True when the real value is absent or blank.
    #[cfg_attr(feature = "serde", serde(rename = "isBlank"))]
    IsBlank,
    /// Numeric greater-than.
    #[cfg_attr(feature = "serde", serde(rename = ">"))]
    Gt,
    /// Numeric less-than.
    #[cfg_attr(feature = "serde", serde(rename = "<"))]
    Lt,
    /// Numeric greater-or-equal.
    #[cfg_attr(feature = "serde", serde(rename = ">="))]
    Ge,
    /// Numeric less-or-equal.
    #[cfg_attr(feature = "serde", serde(rename = "<="))]
    Le,
}

impl Operator {
    /// All operators, in declaration order.
    pub const ALL: [Operator; 12] = [
        Self::Equals,
        Self::Exclude,
        Self::Contains,
        Self::StartsWith,
        Self::EndsWith,
        Self::Regex,
        Self::PathPattern,
        Self::IsBlank,
        Self::Gt,
        Self::Lt,
        Self::Ge,
        Self::Le,
    ];

    /// Wire name used by the control plane.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::Exclude => "exclude",
            Self::Contains => "contains",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::Regex => "regex",
            Self::PathPattern => "match",
            Self::IsBlank => "isBlank",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean policy combining a condition list.
///
/// Deserializes from `"and"`/`"or"` or from the control plane's numeric
/// encoding (`0` = and, `1` = or).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MatchMode {
    /// Every condition must hold.
    #[default]
    And,
    /// At least one condition must hold.
    Or,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "and",
            Self::Or => "or",
        })
    }
}

#[cfg(feature = "serde")]
impl Serialize for MatchMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for MatchMode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(u8),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Code(0) => Ok(Self::And),
            Repr::Code(1) => Ok(Self::Or),
            Repr::Name(name) if name.eq_ignore_ascii_case("and") => Ok(Self::And),
            Repr::Name(name) if name.eq_ignore_ascii_case("or") => Ok(Self::Or),
            Repr::Code(code) => Err(serde::de::Error::custom(format!(
                "unknown match mode {code}, expected 0 (and) or 1 (or)"
            ))),
            Repr::Name(name) => Err(serde::de::Error::custom(format!(
                "unknown match mode \"{name}\", expected \"and\" or \"or\""
            ))),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Configuration records
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "serde")]
fn enabled_by_default() -> bool {
    true
}

/// A plugin and its opaque configuration. Unique by `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PluginData {
    /// Unique plugin name.
    pub name: String,
    /// Disabled plugins never match at request time.
    #[cfg_attr(feature = "serde", serde(default = "enabled_by_default"))]
    pub enabled: bool,
    /// Opaque plugin configuration, passed through untouched.
    #[cfg_attr(feature = "serde", serde(default))]
    pub config: Option<String>,
}

impl PluginData {
    /// An enabled plugin without configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            config: None,
        }
    }
}

/// One atomic predicate: parameter source, operator and expected value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConditionData {
    /// Unique condition id.
    pub id: String,
    /// Where the real value comes from.
    pub param_type: ParamType,
    /// The judge applied to the real value.
    pub operator: Operator,
    /// Header/query/cookie/post name; ignored by parameterless types.
    #[cfg_attr(feature = "serde", serde(default))]
    pub param_name: String,
    /// The expected value (or pattern) the judge compares against.
    #[cfg_attr(feature = "serde", serde(default))]
    pub param_value: String,
}

impl ConditionData {
    /// Create a condition.
    pub fn new(
        id: impl Into<String>,
        param_type: ParamType,
        operator: Operator,
        param_name: impl Into<String>,
        param_value: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            param_type,
            operator,
            param_name: param_name.into(),
            param_value: param_value.into(),
        }
    }
}

/// A selector: a group of conditions narrowing which requests a plugin handles.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SelectorData {
    /// Unique selector id.
    pub id: String,
    /// Display name.
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
    /// Owning plugin.
    pub plugin_name: String,
    /// Position among the plugin's selectors (ascending).
    #[cfg_attr(feature = "serde", serde(default))]
    pub sort: i32,
    /// Disabled selectors stay indexed but are skipped at request time.
    #[cfg_attr(feature = "serde", serde(default = "enabled_by_default"))]
    pub enabled: bool,
    /// How the conditions combine.
    #[cfg_attr(feature = "serde", serde(default))]
    pub match_mode: MatchMode,
    /// Ordered conditions.
    #[cfg_attr(feature = "serde", serde(default))]
    pub conditions: Vec<ConditionData>,
}

impl SelectorData {
    /// An enabled AND-selector without conditions.
    pub fn new(id: impl Into<String>, plugin_name: impl Into<String>, sort: i32) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            plugin_name: plugin_name.into(),
            sort,
            enabled: true,
            match_mode: MatchMode::And,
            conditions: Vec::new(),
        }
    }

    /// Set the match mode (builder pattern).
    #[must_use]
    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    /// Append a condition (builder pattern).
    #[must_use]
    pub fn with_condition(mut self, condition: ConditionData) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Set the enabled flag (builder pattern).
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// A rule: a finer-grained condition group nested under a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RuleData {
    /// Unique rule id.
    pub id: String,
    /// Display name.
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
    /// Owning selector.
    pub selector_id: String,
    /// Position among the selector's rules (ascending).
    #[cfg_attr(feature = "serde", serde(default))]
    pub sort: i32,
    /// Disabled rules stay indexed but are skipped at request time.
    #[cfg_attr(feature = "serde", serde(default = "enabled_by_default"))]
    pub enabled: bool,
    /// How the conditions combine.
    #[cfg_attr(feature = "serde", serde(default))]
    pub match_mode: MatchMode,
    /// Ordered conditions.
    #[cfg_attr(feature = "serde", serde(default))]
    pub conditions: Vec<ConditionData>,
    /// Opaque plugin-specific handle, passed through untouched.
    #[cfg_attr(feature = "serde", serde(default))]
    pub handle: Option<String>,
}

impl RuleData {
    /// An enabled AND-rule without conditions.
    pub fn new(id: impl Into<String>, selector_id: impl Into<String>, sort: i32) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            selector_id: selector_id.into(),
            sort,
            enabled: true,
            match_mode: MatchMode::And,
            conditions: Vec::new(),
            handle: None,
        }
    }

    /// Set the match mode (builder pattern).
    #[must_use]
    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    /// Append a condition (builder pattern).
    #[must_use]
    pub fn with_condition(mut self, condition: ConditionData) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Set the enabled flag (builder pattern).
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Match targets
// ═══════════════════════════════════════════════════════════════════════════════

/// Stable identity of a selector or rule.
///
/// The reverse index in the match cache is keyed by this, never by the full
/// value: an update arrives as a new value with the same id and must still
/// find the keys that resolved to the previous version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetKey {
    /// A selector id.
    Selector(String),
    /// A rule id.
    Rule(String),
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selector(id) => write!(f, "selector:{id}"),
            Self::Rule(id) => write!(f, "rule:{id}"),
        }
    }
}

/// A selector or a rule: what a cache key resolves to, and what owns a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchTarget {
    /// A matched selector.
    Selector(Arc<SelectorData>),
    /// A matched rule.
    Rule(Arc<RuleData>),
}

impl MatchTarget {
    /// The stable identity of this target.
    #[must_use]
    pub fn key(&self) -> TargetKey {
        match self {
            Self::Selector(s) => TargetKey::Selector(s.id.clone()),
            Self::Rule(r) => TargetKey::Rule(r.id.clone()),
        }
    }

    /// The selector or rule id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Selector(s) => &s.id,
            Self::Rule(r) => &r.id,
        }
    }

    /// The owned conditions.
    #[must_use]
    pub fn conditions(&self) -> &[ConditionData] {
        match self {
            Self::Selector(s) => &s.conditions,
            Self::Rule(r) => &r.conditions,
        }
    }

    /// Returns the selector if this is the `Selector` variant.
    #[must_use]
    pub fn as_selector(&self) -> Option<&Arc<SelectorData>> {
        match self {
            Self::Selector(s) => Some(s),
            Self::Rule(_) => None,
        }
    }

    /// Returns the rule if this is the `Rule` variant.
    #[must_use]
    pub fn as_rule(&self) -> Option<&Arc<RuleData>> {
        match self {
            Self::Rule(r) => Some(r),
            Self::Selector(_) => None,
        }
    }

    /// Returns `true` if this is the `Selector` variant.
    #[must_use]
    pub fn is_selector(&self) -> bool {
        matches!(self, Self::Selector(_))
    }

    /// Returns `true` if this is the `Rule` variant.
    #[must_use]
    pub fn is_rule(&self) -> bool {
        matches!(self, Self::Rule(_))
    }
}

impl From<Arc<SelectorData>> for MatchTarget {
    fn from(selector: Arc<SelectorData>) -> Self {
        Self::Selector(selector)
    }
}

impl From<Arc<RuleData>> for MatchTarget {
    fn from(rule: Arc<RuleData>) -> Self {
        Self::Rule(rule)
    }
}

/// What the index and the engine need from a selector or a rule.
pub(crate) trait Routable: Sized {
    fn id(&self) -> &str;
    fn sort(&self) -> i32;
    fn enabled(&self) -> bool;
    fn match_mode(&self) -> MatchMode;
    fn conditions(&self) -> &[ConditionData];
    fn target(this: &Arc<Self>) -> MatchTarget;
    fn from_target(target: &MatchTarget) -> Option<&Arc<Self>>;
}

impl Routable for SelectorData {
    fn id(&self) -> &str {
        &self.id
    }
    fn sort(&self) -> i32 {
        self.sort
    }
    fn enabled(&self) -> bool {
        self.enabled
    }
    fn match_mode(&self) -> MatchMode {
        self.match_mode
    }
    fn conditions(&self) -> &[ConditionData] {
        &self.conditions
    }
    fn target(this: &Arc<Self>) -> MatchTarget {
        MatchTarget::Selector(Arc::clone(this))
    }
    fn from_target(target: &MatchTarget) -> Option<&Arc<Self>> {
        target.as_selector()
    }
}

impl Routable for RuleData {
    fn id(&self) -> &str {
        &self.id
    }
    fn sort(&self) -> i32 {
        self.sort
    }
    fn enabled(&self) -> bool {
        self.enabled
    }
    fn match_mode(&self) -> MatchMode {
        self.match_mode
    }
    fn conditions(&self) -> &[ConditionData] {
        &self.conditions
    }
    fn target(this: &Arc<Self>) -> MatchTarget {
        MatchTarget::Rule(Arc::clone(this))
    }
    fn from_target(target: &MatchTarget) -> Option<&Arc<Self>> {
        target.as_rule()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_key_is_id_based() {
        let v1 = Arc::new(SelectorData::new("s1", "p", 0));
        let v2 = Arc::new(SelectorData::new("s1", "p", 5).with_match_mode(MatchMode::Or));
        assert_ne!(*v1, *v2);
        assert_eq!(
            MatchTarget::from(v1).key(),
            MatchTarget::from(v2).key()
        );
    }

    #[test]
    fn selector_and_rule_keys_never_collide() {
        let s = MatchTarget::from(Arc::new(SelectorData::new("x", "p", 0)));
        let r = MatchTarget::from(Arc::new(RuleData::new("x", "s", 0)));
        assert_ne!(s.key(), r.key());
        assert_eq!(s.id(), r.id());
    }

    #[test]
    fn display_wire_names() {
        assert_eq!(Operator::Equals.to_string(), "=");
        assert_eq!(Operator::PathPattern.to_string(), "match");
        assert_eq!(ParamType::Method.to_string(), "req_method");
        assert_eq!(MatchMode::Or.to_string(), "or");
        assert_eq!(TargetKey::Rule("r1".into()).to_string(), "rule:r1");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn match_mode_accepts_names_and_codes() {
        let m: MatchMode = serde_json::from_str("\"OR\"").unwrap();
        assert_eq!(m, MatchMode::Or);
        let m: MatchMode = serde_json::from_str("0").unwrap();
        assert_eq!(m, MatchMode::And);
        assert!(serde_json::from_str::<MatchMode>("7").is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn selector_defaults_from_yaml() {
        let yaml = r#"
id: s1
plugin_name: rate-limiter
conditions:
  - id: c1
    param_type: header
    operator: "="
    param_name: X-Env
    param_value: prod
"#;
        let s: SelectorData = serde_yaml::from_str(yaml).unwrap();
        assert!(s.enabled);
        assert_eq!(s.sort, 0);
        assert_eq!(s.match_mode, MatchMode::And);
        assert_eq!(s.conditions[0].operator, Operator::Equals);
        assert_eq!(s.conditions[0].param_type, ParamType::Header);
    }
}
