//! Rule tree types
//!
//! Groups own their children outright; there is no sharing between
//! nodes and no way to build a cycle.

use serde::{Deserialize, Serialize};

/// Boolean join applied to the direct children of a group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl<'de> Deserialize<'de> for Combinator {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!("unknown combinator '{}', expected 'and' or 'or'", raw))
        })
    }
}

impl Combinator {
    /// SQL keyword for this combinator
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    /// Parse from string, case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "and" | "&&" => Some(Self::And),
            "or" | "||" => Some(Self::Or),
            _ => None,
        }
    }
}

impl std::fmt::Display for Combinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Comparison operators a rule can apply
///
/// The set is closed: anything else is rejected when the tree is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=", alias = "==")]
    Eq,
    #[serde(rename = "!=", alias = "<>")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "beginsWith")]
    BeginsWith,
    #[serde(rename = "endsWith")]
    EndsWith,
    #[serde(rename = "doesNotContain")]
    DoesNotContain,
    #[serde(rename = "doesNotBeginWith")]
    DoesNotBeginWith,
    #[serde(rename = "doesNotEndWith")]
    DoesNotEndWith,
    #[serde(rename = "null")]
    Null,
    #[serde(rename = "notNull")]
    NotNull,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "notIn")]
    NotIn,
    #[serde(rename = "between")]
    Between,
}

/// How many operand values an operator consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandShape {
    /// `null`, `notNull`
    None,
    /// Plain comparisons and pattern matches
    Single,
    /// `in`, `notIn`: a literal list or a subquery
    List,
    /// `between`: exactly two values
    Pair,
}

impl Operator {
    /// Every operator, in display order
    pub const ALL: [Operator; 17] = [
        Self::Eq,
        Self::Ne,
        Self::Lt,
        Self::Lte,
        Self::Gt,
        Self::Gte,
        Self::Contains,
        Self::BeginsWith,
        Self::EndsWith,
        Self::DoesNotContain,
        Self::DoesNotBeginWith,
        Self::DoesNotEndWith,
        Self::Null,
        Self::NotNull,
        Self::In,
        Self::NotIn,
        Self::Between,
    ];

    /// Wire name of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Contains => "contains",
            Self::BeginsWith => "beginsWith",
            Self::EndsWith => "endsWith",
            Self::DoesNotContain => "doesNotContain",
            Self::DoesNotBeginWith => "doesNotBeginWith",
            Self::DoesNotEndWith => "doesNotEndWith",
            Self::Null => "null",
            Self::NotNull => "notNull",
            Self::In => "in",
            Self::NotIn => "notIn",
            Self::Between => "between",
        }
    }

    /// Parse from the wire name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "==" => Some(Self::Eq),
            "<>" => Some(Self::Ne),
            _ => Self::ALL.iter().copied().find(|op| op.as_str() == s),
        }
    }

    /// Operand shape this operator expects
    pub fn shape(&self) -> OperandShape {
        match self {
            Self::Null | Self::NotNull => OperandShape::None,
            Self::In | Self::NotIn => OperandShape::List,
            Self::Between => OperandShape::Pair,
            _ => OperandShape::Single,
        }
    }

    /// Whether the operator takes a value at all
    pub fn takes_value(&self) -> bool {
        self.shape() != OperandShape::None
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single literal value supplied by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// A nested `SELECT` used as the operand of `in` / `notIn`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubqueryRef {
    /// Table the subquery reads from
    pub table: String,
    /// Columns to select; empty picks the column matching the outer field
    #[serde(rename = "selectFields", alias = "select_fields", default)]
    pub select_fields: Vec<String>,
    /// Filter applied inside the subquery
    #[serde(rename = "where", alias = "query", default)]
    pub filter: RuleGroup,
}

impl SubqueryRef {
    /// Create a subquery selecting one column
    pub fn new(table: impl Into<String>, select: impl Into<String>, filter: RuleGroup) -> Self {
        Self {
            table: table.into(),
            select_fields: vec![select.into()],
            filter,
        }
    }
}

/// Operand of a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Subquery(SubqueryRef),
    List(Vec<Scalar>),
    Scalar(Scalar),
}

impl From<Scalar> for RuleValue {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<Vec<Scalar>> for RuleValue {
    fn from(items: Vec<Scalar>) -> Self {
        Self::List(items)
    }
}

impl From<SubqueryRef> for RuleValue {
    fn from(sub: SubqueryRef) -> Self {
        Self::Subquery(sub)
    }
}

impl From<&str> for RuleValue {
    fn from(s: &str) -> Self {
        Self::Scalar(s.into())
    }
}

impl From<String> for RuleValue {
    fn from(s: String) -> Self {
        Self::Scalar(s.into())
    }
}

impl From<i64> for RuleValue {
    fn from(i: i64) -> Self {
        Self::Scalar(i.into())
    }
}

impl From<i32> for RuleValue {
    fn from(i: i32) -> Self {
        Self::Scalar(i.into())
    }
}

impl From<f64> for RuleValue {
    fn from(x: f64) -> Self {
        Self::Scalar(x.into())
    }
}

impl From<bool> for RuleValue {
    fn from(b: bool) -> Self {
        Self::Scalar(b.into())
    }
}

/// A single `field operator value` condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub field: String,
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<RuleValue>,
}

impl Rule {
    /// Create a rule with a value
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<RuleValue>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: Some(value.into()),
        }
    }

    /// Create a rule without a value (`null` / `notNull`)
    pub fn without_value(field: impl Into<String>, operator: Operator) -> Self {
        Self {
            field: field.into(),
            operator,
            value: None,
        }
    }
}

/// A child of a group: either a rule or a nested group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleNode {
    Group(RuleGroup),
    Rule(Rule),
}

impl RuleNode {
    pub fn as_group(&self) -> Option<&RuleGroup> {
        match self {
            Self::Group(g) => Some(g),
            Self::Rule(_) => None,
        }
    }

    pub fn as_rule(&self) -> Option<&Rule> {
        match self {
            Self::Rule(r) => Some(r),
            Self::Group(_) => None,
        }
    }
}

impl From<Rule> for RuleNode {
    fn from(rule: Rule) -> Self {
        Self::Rule(rule)
    }
}

impl From<RuleGroup> for RuleNode {
    fn from(group: RuleGroup) -> Self {
        Self::Group(group)
    }
}

/// A combinator applied to an ordered list of children
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleGroup {
    #[serde(default)]
    pub combinator: Combinator,
    /// Negate the whole group
    #[serde(default, alias = "negate")]
    pub not: bool,
    #[serde(alias = "children")]
    pub rules: Vec<RuleNode>,
}

impl RuleGroup {
    /// Create a group with the given combinator and children
    pub fn new(combinator: Combinator, rules: Vec<RuleNode>) -> Self {
        Self {
            combinator,
            not: false,
            rules,
        }
    }

    /// Create an AND group
    pub fn and(rules: Vec<RuleNode>) -> Self {
        Self::new(Combinator::And, rules)
    }

    /// Create an OR group
    pub fn or(rules: Vec<RuleNode>) -> Self {
        Self::new(Combinator::Or, rules)
    }

    /// Negate this group
    pub fn negated(mut self) -> Self {
        self.not = true;
        self
    }

    /// Append a child
    pub fn with(mut self, node: impl Into<RuleNode>) -> Self {
        self.rules.push(node.into());
        self
    }

    /// Parse a tree from its JSON form
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Canonical JSON form of the tree
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Indented JSON form of the tree
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// True when no rule exists anywhere below this group
    pub fn is_vacuous(&self) -> bool {
        self.rules.iter().all(|node| match node {
            RuleNode::Rule(_) => false,
            RuleNode::Group(g) => g.is_vacuous(),
        })
    }

    /// Number of rules in this group and nested groups (subqueries excluded)
    pub fn rule_count(&self) -> usize {
        self.rules
            .iter()
            .map(|node| match node {
                RuleNode::Rule(_) => 1,
                RuleNode::Group(g) => g.rule_count(),
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_format() {
        let json = r#"{
            "combinator": "AND",
            "not": false,
            "rules": [
                {"id": "r-1", "field": "price", "operator": "<", "value": 500},
                {"combinator": "or", "rules": [
                    {"field": "category", "operator": "=", "value": "Electronics"},
                    {"field": "category", "operator": "=", "value": "Furniture"}
                ]}
            ]
        }"#;

        let tree = RuleGroup::from_json(json).unwrap();

        assert_eq!(tree.combinator, Combinator::And);
        assert_eq!(tree.rules.len(), 2);
        let rule = tree.rules[0].as_rule().unwrap();
        assert_eq!(rule.operator, Operator::Lt);
        assert_eq!(rule.value, Some(RuleValue::Scalar(Scalar::Integer(500))));
        let nested = tree.rules[1].as_group().unwrap();
        assert_eq!(nested.combinator, Combinator::Or);
        assert_eq!(tree.rule_count(), 3);
    }

    #[test]
    fn test_parse_aliases() {
        let json = r#"{"combinator": "or", "negate": true, "children": [
            {"field": "age", "operator": "between", "value": [18, 30.5]}
        ]}"#;

        let tree = RuleGroup::from_json(json).unwrap();

        assert!(tree.not);
        let rule = tree.rules[0].as_rule().unwrap();
        assert_eq!(
            rule.value,
            Some(RuleValue::List(vec![Scalar::Integer(18), Scalar::Float(30.5)]))
        );
    }

    #[test]
    fn test_parse_subquery_value() {
        let json = r#"{"rules": [{
            "field": "user_id", "operator": "in",
            "value": {"table": "orders", "selectFields": ["user_id"],
                      "where": {"combinator": "and", "rules": [
                          {"field": "status", "operator": "=", "value": "pending"}]}}
        }]}"#;

        let tree = RuleGroup::from_json(json).unwrap();
        let rule = tree.rules[0].as_rule().unwrap();

        match &rule.value {
            Some(RuleValue::Subquery(sub)) => {
                assert_eq!(sub.table, "orders");
                assert_eq!(sub.select_fields, vec!["user_id"]);
                assert_eq!(sub.filter.rules.len(), 1);
            }
            other => panic!("expected subquery, got {:?}", other),
        }
    }

    #[test]
    fn test_null_value_is_absent() {
        let json = r#"{"rules": [{"field": "city", "operator": "null", "value": null}]}"#;
        let tree = RuleGroup::from_json(json).unwrap();
        assert_eq!(tree.rules[0].as_rule().unwrap().value, None);
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let json = r#"{"rules": [{"field": "age", "operator": "LIKE", "value": "x"}]}"#;
        assert!(RuleGroup::from_json(json).is_err());
    }

    #[test]
    fn test_combinator_case_insensitive() {
        let tree = RuleGroup::from_json(r#"{"combinator":"aNd","rules":[]}"#).unwrap();
        assert_eq!(tree.combinator, Combinator::And);

        let nested = RuleGroup::from_json(
            r#"{"combinator":"and","rules":[{"combinator":"oR","rules":[{"field":"age","operator":">","value":1}]}]}"#,
        )
        .unwrap();
        assert_eq!(nested.rules[0].as_group().unwrap().combinator, Combinator::Or);
        assert!(nested.to_json().unwrap().contains(r#""combinator":"or""#));

        assert!(RuleGroup::from_json(r#"{"combinator":"xor","rules":[]}"#).is_err());
    }

    #[test]
    fn test_json_round_trip_preserves_order() {
        let tree = RuleGroup::and(vec![
            Rule::new("status", Operator::In, vec![Scalar::from("pending"), Scalar::from("shipped")]).into(),
            RuleGroup::or(vec![
                Rule::without_value("city", Operator::NotNull).into(),
                Rule::new("age", Operator::Gte, 21).into(),
            ])
            .negated()
            .into(),
            Rule::new(
                "id",
                Operator::NotIn,
                SubqueryRef::new(
                    "orders",
                    "user_id",
                    RuleGroup::and(vec![Rule::new("total_amount", Operator::Gt, 99.5).into()]),
                ),
            )
            .into(),
        ]);

        let json = tree.to_json().unwrap();
        let parsed = RuleGroup::from_json(&json).unwrap();

        assert_eq!(parsed, tree);
    }

    #[test]
    fn test_operator_parse() {
        for op in Operator::ALL {
            assert_eq!(Operator::parse(op.as_str()), Some(op));
        }
        assert_eq!(Operator::parse("<>"), Some(Operator::Ne));
        assert_eq!(Operator::parse("like"), None);
    }

    #[test]
    fn test_vacuous_groups() {
        assert!(RuleGroup::default().is_vacuous());
        assert!(RuleGroup::or(vec![RuleGroup::default().into()]).is_vacuous());
        assert!(!RuleGroup::and(vec![Rule::without_value("city", Operator::Null).into()]).is_vacuous());
    }
}
