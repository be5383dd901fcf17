//! Path-addressed structural edits
//!
//! A path is the sequence of child indexes from the root group down to a
//! node. The empty path addresses the root group itself.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use super::error::{TreeError, TreeResult};
use super::tree::{Combinator, Operator, Rule, RuleGroup, RuleNode, RuleValue};

/// Owned node path, parsed from text such as `0.2.1` (`root` or empty for the root)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// Path of the root group
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(indexes: Vec<usize>) -> Self {
        Self(indexes)
    }

    /// Parse a dot-separated path
    pub fn parse(s: &str) -> TreeResult<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("root") {
            return Ok(Self::root());
        }

        trimmed
            .split('.')
            .map(|part| part.trim().parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
            .map_err(|_| TreeError::MalformedPath(s.to_string()))
    }

    /// Path of the `index`-th child of this path
    pub fn child(&self, index: usize) -> Self {
        let mut indexes = self.0.clone();
        indexes.push(index);
        Self(indexes)
    }

    pub fn into_inner(self) -> Vec<usize> {
        self.0
    }
}

impl Deref for NodePath {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.0
    }
}

impl FromStr for NodePath {
    type Err = TreeError;

    fn from_str(s: &str) -> TreeResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("root");
        }
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        f.write_str(&parts.join("."))
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indexes: Vec<usize>) -> Self {
        Self(indexes)
    }
}

impl RuleGroup {
    /// Node at a non-empty path
    pub fn node_at(&self, path: &[usize]) -> TreeResult<&RuleNode> {
        let (last, parent) = path.split_last().ok_or(TreeError::NotARule(Vec::new()))?;
        self.group_at(parent)?
            .rules
            .get(*last)
            .ok_or_else(|| TreeError::InvalidPath(path.to_vec()))
    }

    /// Group at a path (the root for an empty path)
    pub fn group_at(&self, path: &[usize]) -> TreeResult<&RuleGroup> {
        let mut group = self;
        for (depth, index) in path.iter().enumerate() {
            group = match group.rules.get(*index) {
                Some(RuleNode::Group(g)) => g,
                Some(RuleNode::Rule(_)) => return Err(TreeError::NotAGroup(path[..=depth].to_vec())),
                None => return Err(TreeError::InvalidPath(path.to_vec())),
            };
        }
        Ok(group)
    }

    /// Mutable group at a path (the root for an empty path)
    pub fn group_at_mut(&mut self, path: &[usize]) -> TreeResult<&mut RuleGroup> {
        let mut group = self;
        for (depth, index) in path.iter().enumerate() {
            group = match group.rules.get_mut(*index) {
                Some(RuleNode::Group(g)) => g,
                Some(RuleNode::Rule(_)) => return Err(TreeError::NotAGroup(path[..=depth].to_vec())),
                None => return Err(TreeError::InvalidPath(path.to_vec())),
            };
        }
        Ok(group)
    }

    /// Rule at a path
    pub fn rule_at(&self, path: &[usize]) -> TreeResult<&Rule> {
        match self.node_at(path)? {
            RuleNode::Rule(rule) => Ok(rule),
            RuleNode::Group(_) => Err(TreeError::NotARule(path.to_vec())),
        }
    }

    /// Mutable rule at a path
    pub fn rule_at_mut(&mut self, path: &[usize]) -> TreeResult<&mut Rule> {
        let (last, parent) = path.split_last().ok_or(TreeError::NotARule(Vec::new()))?;
        match self.group_at_mut(parent)?.rules.get_mut(*last) {
            Some(RuleNode::Rule(rule)) => Ok(rule),
            Some(RuleNode::Group(_)) => Err(TreeError::NotARule(path.to_vec())),
            None => Err(TreeError::InvalidPath(path.to_vec())),
        }
    }

    /// Append a rule to the group at `parent`, returning the new rule's path
    pub fn add_rule(&mut self, parent: &[usize], rule: Rule) -> TreeResult<NodePath> {
        self.append(parent, RuleNode::Rule(rule))
    }

    /// Append a group to the group at `parent`, returning the new group's path
    pub fn add_group(&mut self, parent: &[usize], group: RuleGroup) -> TreeResult<NodePath> {
        self.append(parent, RuleNode::Group(group))
    }

    /// Insert a node at `index` within the group at `parent`
    pub fn insert(&mut self, parent: &[usize], index: usize, node: RuleNode) -> TreeResult<NodePath> {
        let group = self.group_at_mut(parent)?;
        let len = group.rules.len();
        if index > len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }
        group.rules.insert(index, node);

        let mut path = parent.to_vec();
        path.push(index);
        Ok(NodePath(path))
    }

    fn append(&mut self, parent: &[usize], node: RuleNode) -> TreeResult<NodePath> {
        let index = self.group_at(parent)?.rules.len();
        self.insert(parent, index, node)
    }

    /// Detach and return the node at `path`
    pub fn remove(&mut self, path: &[usize]) -> TreeResult<RuleNode> {
        let (last, parent) = path.split_last().ok_or(TreeError::RootNotMovable)?;
        let group = self.group_at_mut(parent)?;
        if *last >= group.rules.len() {
            return Err(TreeError::InvalidPath(path.to_vec()));
        }
        Ok(group.rules.remove(*last))
    }

    /// Move the node at `from` into the group at `to_parent` at position `index`
    ///
    /// `to_parent` and `index` are read against the tree as it is before the
    /// move; `index` counts positions after the node has been detached. On
    /// error the tree is left unchanged. Returns the node's new path.
    pub fn move_node(&mut self, from: &[usize], to_parent: &[usize], index: usize) -> TreeResult<NodePath> {
        let (from_last, from_parent) = from.split_last().ok_or(TreeError::RootNotMovable)?;
        self.node_at(from)?;
        let target_len = self.group_at(to_parent)?.rules.len();

        if to_parent.starts_with(from) {
            return Err(TreeError::MoveIntoSelf {
                from: from.to_vec(),
                to: to_parent.to_vec(),
            });
        }

        // Detaching shifts later siblings (and their subtrees) up by one
        let mut target = to_parent.to_vec();
        let depth = from_parent.len();
        let shifts = target.len() > depth && target.starts_with(from_parent) && target[depth] > *from_last;
        if shifts {
            target[depth] -= 1;
        }

        let len_after = if to_parent == from_parent { target_len - 1 } else { target_len };
        if index > len_after {
            return Err(TreeError::IndexOutOfRange { index, len: len_after });
        }

        let node = self.remove(from)?;
        self.insert(&target, index, node)
    }

    /// Set the combinator of the group at `path`
    pub fn set_combinator(&mut self, path: &[usize], combinator: Combinator) -> TreeResult<()> {
        self.group_at_mut(path)?.combinator = combinator;
        Ok(())
    }

    /// Set or clear negation on the group at `path`
    pub fn set_not(&mut self, path: &[usize], not: bool) -> TreeResult<()> {
        self.group_at_mut(path)?.not = not;
        Ok(())
    }

    /// Change any of a rule's field, operator and value
    ///
    /// Switching to an operator that takes no value drops the current value.
    pub fn update_rule(
        &mut self,
        path: &[usize],
        field: Option<String>,
        operator: Option<Operator>,
        value: Option<RuleValue>,
    ) -> TreeResult<()> {
        let rule = self.rule_at_mut(path)?;

        if let Some(field) = field {
            rule.field = field;
        }
        if let Some(operator) = operator {
            rule.operator = operator;
            if !operator.takes_value() {
                rule.value = None;
            }
        }
        if let Some(value) = value {
            if rule.operator.takes_value() {
                rule.value = Some(value);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Scalar;

    fn sample() -> RuleGroup {
        // root: [age > 30, (city = Paris OR city = Rome), email notNull]
        RuleGroup::and(vec![
            Rule::new("age", Operator::Gt, 30).into(),
            RuleGroup::or(vec![
                Rule::new("city", Operator::Eq, "Paris").into(),
                Rule::new("city", Operator::Eq, "Rome").into(),
            ])
            .into(),
            Rule::without_value("email", Operator::NotNull).into(),
        ])
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(NodePath::parse("").unwrap(), NodePath::root());
        assert_eq!(NodePath::parse("root").unwrap(), NodePath::root());
        assert_eq!(&*NodePath::parse("0.2.1").unwrap(), &[0, 2, 1]);
        assert_eq!(NodePath::parse("1.2").unwrap().to_string(), "1.2");
        assert!(matches!(NodePath::parse("1.x"), Err(TreeError::MalformedPath(_))));
    }

    #[test]
    fn test_add_rule_and_group() {
        let mut tree = sample();

        let path = tree.add_rule(&[1], Rule::new("city", Operator::Eq, "Oslo")).unwrap();
        assert_eq!(&*path, &[1, 2]);

        let group_path = tree.add_group(&[], RuleGroup::default()).unwrap();
        assert_eq!(&*group_path, &[3]);
        assert!(tree.group_at(&group_path).unwrap().rules.is_empty());

        assert_eq!(tree.add_rule(&[0], Rule::without_value("x", Operator::Null)), Err(TreeError::NotAGroup(vec![0])));
        assert_eq!(tree.add_rule(&[9], Rule::without_value("x", Operator::Null)), Err(TreeError::InvalidPath(vec![9])));
    }

    #[test]
    fn test_remove() {
        let mut tree = sample();

        let removed = tree.remove(&[1, 0]).unwrap();
        assert_eq!(removed.as_rule().unwrap().value, Some(RuleValue::from("Paris")));
        assert_eq!(tree.group_at(&[1]).unwrap().rules.len(), 1);

        assert_eq!(tree.remove(&[]), Err(TreeError::RootNotMovable));
        assert_eq!(tree.remove(&[7]), Err(TreeError::InvalidPath(vec![7])));
    }

    #[test]
    fn test_move_within_same_group() {
        let mut tree = sample();

        let new_path = tree.move_node(&[0], &[], 2).unwrap();

        assert_eq!(&*new_path, &[2]);
        assert_eq!(tree.rule_at(&[2]).unwrap().field, "age");
        assert_eq!(tree.rule_at(&[1]).unwrap().field, "email");
    }

    #[test]
    fn test_move_into_later_sibling_group() {
        let mut tree = sample();

        // The OR group sits at [1] before the move and at [0] after
        let new_path = tree.move_node(&[0], &[1], 0).unwrap();

        assert_eq!(&*new_path, &[0, 0]);
        assert_eq!(tree.rules.len(), 2);
        assert_eq!(tree.rule_at(&[0, 0]).unwrap().field, "age");
        assert_eq!(tree.group_at(&[0]).unwrap().rules.len(), 3);
    }

    #[test]
    fn test_move_out_of_nested_group() {
        let mut tree = sample();

        let new_path = tree.move_node(&[1, 1], &[], 0).unwrap();

        assert_eq!(&*new_path, &[0]);
        assert_eq!(tree.rule_at(&[0]).unwrap().value, Some(RuleValue::from("Rome")));
        assert_eq!(tree.group_at(&[2]).unwrap().rules.len(), 1);
    }

    #[test]
    fn test_move_rejects_bad_targets() {
        let mut tree = sample();
        let before = tree.clone();

        assert!(matches!(tree.move_node(&[1], &[1], 0), Err(TreeError::MoveIntoSelf { .. })));
        assert_eq!(tree.move_node(&[], &[1], 0), Err(TreeError::RootNotMovable));
        assert_eq!(
            tree.move_node(&[0], &[], 3),
            Err(TreeError::IndexOutOfRange { index: 3, len: 2 })
        );
        assert_eq!(tree.move_node(&[0], &[2], 0), Err(TreeError::NotAGroup(vec![2])));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_set_combinator_and_not() {
        let mut tree = sample();

        tree.set_combinator(&[], Combinator::Or).unwrap();
        tree.set_not(&[1], true).unwrap();

        assert_eq!(tree.combinator, Combinator::Or);
        assert!(tree.group_at(&[1]).unwrap().not);
        assert_eq!(tree.set_not(&[0], true), Err(TreeError::NotAGroup(vec![0])));
    }

    #[test]
    fn test_update_rule() {
        let mut tree = sample();

        tree.update_rule(&[0], Some("stock_quantity".into()), None, Some(RuleValue::from(5)))
            .unwrap();
        let rule = tree.rule_at(&[0]).unwrap();
        assert_eq!(rule.field, "stock_quantity");
        assert_eq!(rule.value, Some(RuleValue::Scalar(Scalar::Integer(5))));

        tree.update_rule(&[0], None, Some(Operator::Null), None).unwrap();
        assert_eq!(tree.rule_at(&[0]).unwrap().value, None);

        assert_eq!(
            tree.update_rule(&[1], None, Some(Operator::Eq), None),
            Err(TreeError::NotARule(vec![1]))
        );
    }
}
