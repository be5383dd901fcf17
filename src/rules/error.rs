//! Rule-tree edit errors

use thiserror::Error;

/// Errors raised by structural edits on a rule tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// No node exists at the given path
    #[error("No node at path {0:?}")]
    InvalidPath(Vec<usize>),

    /// The node at the path is a rule where a group was expected
    #[error("Node at path {0:?} is not a group")]
    NotAGroup(Vec<usize>),

    /// The node at the path is a group where a rule was expected
    #[error("Node at path {0:?} is not a rule")]
    NotARule(Vec<usize>),

    /// The root group cannot be removed or moved
    #[error("The root group cannot be removed or moved")]
    RootNotMovable,

    /// Moving a group into its own subtree would create a cycle
    #[error("Cannot move {from:?} into its own subtree at {to:?}")]
    MoveIntoSelf { from: Vec<usize>, to: Vec<usize> },

    /// Insertion index past the end of the target group
    #[error("Index {index} is out of range for a group with {len} children")]
    IndexOutOfRange { index: usize, len: usize },

    /// A textual path could not be parsed
    #[error("Invalid path '{0}': expected dot-separated indexes like 0.2.1")]
    MalformedPath(String),
}

/// Result type for tree edits
pub type TreeResult<T> = Result<T, TreeError>;
