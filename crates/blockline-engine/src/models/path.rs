use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::BlockId;

/// Ordered list of block ids from the document root down to a target block.
///
/// Equality is element-wise. A path only stays valid until the next structural
/// edit touching one of its ancestors, so callers re-resolve rather than cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Path(Vec<BlockId>);

impl Path {
    pub fn new(ids: Vec<BlockId>) -> Self {
        Self(ids)
    }

    pub fn ids(&self) -> &[BlockId] {
        &self.0
    }

    /// The block this path addresses
    pub fn leaf(&self) -> Option<BlockId> {
        self.0.last().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn parent(&self) -> Option<Path> {
        match self.0.split_last() {
            Some((_, rest)) if !rest.is_empty() => Some(Path(rest.to_vec())),
            _ => None,
        }
    }

    pub fn child(&self, id: BlockId) -> Path {
        let mut ids = self.0.clone();
        ids.push(id);
        Path(ids)
    }

    /// Number of leading ids shared with `other`
    pub fn common_prefix_len(&self, other: &Path) -> usize {
        self.0
            .iter()
            .zip(other.0.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Strict ancestor check: a path is not its own ancestor
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.0.len() < other.0.len() && self.common_prefix_len(other) == self.0.len()
    }
}

impl From<Vec<BlockId>> for Path {
    fn from(ids: Vec<BlockId>) -> Self {
        Self(ids)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}
