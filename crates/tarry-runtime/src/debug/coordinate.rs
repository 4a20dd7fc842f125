//! Structural breakpoint coordinates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Path from the root form to a breakpoint site.
///
/// Child `i` of the form at `P` sits at `P ++ [i]`. `A` is an ancestor of
/// `B` iff `A` is a strict prefix of `B`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coordinate(Vec<u32>);

impl Coordinate {
    /// The empty coordinate of a top-level form.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        let mut path = Vec::with_capacity(self.0.len() + 1);
        path.extend_from_slice(&self.0);
        path.push(u32::try_from(index).unwrap_or(u32::MAX));
        Self(path)
    }

    /// Drops the last element. The parent of the root is the root.
    #[must_use]
    pub fn parent(&self) -> Self {
        let mut path = self.0.clone();
        path.pop();
        Self(path)
    }

    /// True iff `self` is a proper prefix of `other`.
    #[must_use]
    pub fn is_strict_prefix_of(&self, other: &Coordinate) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }
}

impl From<Vec<u32>> for Coordinate {
    fn from(path: Vec<u32>) -> Self {
        Self(path)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (idx, step) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{step}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(path: &[u32]) -> Coordinate {
        Coordinate::from(path.to_vec())
    }

    #[test]
    fn strict_prefix_excludes_self() {
        assert!(coord(&[0]).is_strict_prefix_of(&coord(&[0, 1])));
        assert!(Coordinate::root().is_strict_prefix_of(&coord(&[3])));
        assert!(!coord(&[0, 1]).is_strict_prefix_of(&coord(&[0, 1])));
        assert!(!coord(&[0, 1]).is_strict_prefix_of(&coord(&[0])));
        assert!(!coord(&[1]).is_strict_prefix_of(&coord(&[0, 1])));
        assert!(!Coordinate::root().is_strict_prefix_of(&Coordinate::root()));
    }

    #[test]
    fn parent_and_child() {
        assert_eq!(coord(&[0, 1]).parent(), coord(&[0]));
        assert_eq!(Coordinate::root().parent(), Coordinate::root());
        assert_eq!(coord(&[2]).child(4), coord(&[2, 4]));
    }

    #[test]
    fn displays_and_serializes_as_path() {
        assert_eq!(coord(&[0, 12]).to_string(), "[0 12]");
        assert_eq!(serde_json::to_string(&coord(&[0, 12])).unwrap(), "[0,12]");
        assert_eq!(Coordinate::root().to_string(), "[]");
    }
}
