use core::fmt::Debug;
use std::fmt::Display;

use crate::{CrosswalkError, CrosswalkResult};

/// A dotted hierarchical address of a term inside the MeSH tree, e.g. `C04.588.894`
///
/// The depth of a tree number is its number of segments. A single MeSH
/// term can have several tree numbers (polyhierarchy).
///
/// Tree numbers are ordered lexicographically by their string representation.
#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TreeNumber {
    inner: Box<str>,
}

impl TreeNumber {
    /// Returns the number of dotted segments
    ///
    /// # Examples
    ///
    /// ```
    /// use otmesh::TreeNumber;
    ///
    /// assert_eq!(TreeNumber::try_from("C04").unwrap().depth(), 1);
    /// assert_eq!(TreeNumber::try_from("C04.588.894.797.520").unwrap().depth(), 5);
    /// ```
    pub fn depth(&self) -> usize {
        self.inner.split('.').count()
    }

    /// The tree number as string slice
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Returns `true` if `self` is identical to `prefix` or located below it
    ///
    /// Only whole segments are compared, `C04.5881` is not below `C04.588`.
    ///
    /// # Examples
    ///
    /// ```
    /// use otmesh::TreeNumber;
    ///
    /// let prefix = TreeNumber::try_from("C04.588").unwrap();
    /// assert!(TreeNumber::try_from("C04.588").unwrap().is_under(&prefix));
    /// assert!(TreeNumber::try_from("C04.588.274").unwrap().is_under(&prefix));
    /// assert!(!TreeNumber::try_from("C04.5881").unwrap().is_under(&prefix));
    /// assert!(!TreeNumber::try_from("C04").unwrap().is_under(&prefix));
    /// ```
    pub fn is_under(&self, prefix: &TreeNumber) -> bool {
        match self.inner.strip_prefix(&*prefix.inner) {
            Some(rest) => rest.is_empty() || rest.starts_with('.'),
            None => false,
        }
    }
}

impl TryFrom<&str> for TreeNumber {
    type Error = CrosswalkError;
    fn try_from(s: &str) -> CrosswalkResult<Self> {
        let valid = !s.is_empty()
            && s
                .split('.')
                .all(|segment| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_alphanumeric()));
        if !valid {
            return Err(CrosswalkError::InvalidId(format!("{s} is not a tree number")));
        }
        Ok(TreeNumber { inner: s.into() })
    }
}

impl Debug for TreeNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TreeNumber({})", self.inner)
    }
}

impl Display for TreeNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

/// One position of a term inside the tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreePosition {
    tree_number: TreeNumber,
    depth: usize,
}

impl TreePosition {
    /// Creates a new position, the depth is derived from the tree number
    pub fn new(tree_number: TreeNumber) -> Self {
        let depth = tree_number.depth();
        Self { tree_number, depth }
    }

    /// The tree number of this position
    pub fn tree_number(&self) -> &TreeNumber {
        &self.tree_number
    }

    /// The depth of this position, `1` for top-level categories
    pub fn depth(&self) -> usize {
        self.depth
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_tree_numbers() {
        assert!(TreeNumber::try_from("C04").is_ok());
        assert!(TreeNumber::try_from("C04.588.894.797.520").is_ok());
        assert!(TreeNumber::try_from("").is_err());
        assert!(TreeNumber::try_from("C04..588").is_err());
        assert!(TreeNumber::try_from("C04.588.").is_err());
        assert!(TreeNumber::try_from("C04 588").is_err());
    }

    #[test]
    fn lexicographic_order() {
        let a = TreeNumber::try_from("C04.588.180").unwrap();
        let b = TreeNumber::try_from("C04.588.274").unwrap();
        let c = TreeNumber::try_from("C04.588.274.476").unwrap();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn position_depth() {
        let pos = TreePosition::new(TreeNumber::try_from("C04.588.894.797.520").unwrap());
        assert_eq!(pos.depth(), 5);
        assert_eq!(pos.tree_number().as_str(), "C04.588.894.797.520");
    }
}
