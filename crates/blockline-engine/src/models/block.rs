use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier for a block node
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u128);

impl BlockId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().as_u128())
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough to tell blocks apart in logs
        write!(f, "{:08x}", (self.0 >> 96) as u32)
    }
}

/// What a block is for within the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockRole {
    /// Document root, exactly one per tree
    Root,
    /// Grouping block (a note or frame) holding content blocks
    Hub,
    /// Content block; the only kind that may carry a text run
    Content,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = BlockId::generate();
        let b = BlockId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_is_short_hex() {
        let id = BlockId(0xdead_beef_0000_0000_0000_0000_0000_0001);
        assert_eq!(id.to_string(), "deadbeef");
    }
}
