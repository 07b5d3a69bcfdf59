use std::cmp::Ordering;

use crate::models::{BlockId, BlockRole, Path, TextBuffer};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),
    #[error("Block {0} has no text run")]
    NotTextBearing(BlockId),
    #[error("Range {index}+{length} is out of bounds for text of length {len}")]
    OutOfBounds {
        index: usize,
        length: usize,
        len: usize,
    },
    #[error("The root block cannot be removed")]
    RootRemoval,
    #[error("Cannot move children of {block} into {target}")]
    InvalidReparent { block: BlockId, target: BlockId },
}

/// How `selected_blocks` collects the blocks between two endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMode {
    /// Every block in document order between the endpoints, inclusive
    Flat,
    /// Content blocks in the span whose ancestors are not also in the span
    Highest,
}

/// Block tree plus per-block text buffers.
///
/// This is the seam to the document layer: the synchronization engine only
/// ever invokes a store, it never owns one. Implementations provide the
/// primitive queries and mutations; path addressing, document order and
/// transactions are built on top of them.
pub trait BlockStore {
    /// Saved state used to roll back a failed transaction
    type Checkpoint;

    fn root(&self) -> BlockId;
    fn contains(&self, id: BlockId) -> bool;
    fn parent(&self, id: BlockId) -> Option<BlockId>;
    /// Children in document order; empty for unknown blocks
    fn children(&self, id: BlockId) -> &[BlockId];
    fn role(&self, id: BlockId) -> Option<BlockRole>;
    /// Text run of a text-bearing block
    fn text(&self, id: BlockId) -> Option<&TextBuffer>;

    fn insert_text(&mut self, id: BlockId, index: usize, text: &str) -> Result<(), StoreError>;
    fn delete_text(
        &mut self,
        id: BlockId,
        index: usize,
        length: usize,
    ) -> Result<(), StoreError>;
    /// Append the text of `source` onto `target`
    fn join_text(&mut self, target: BlockId, source: BlockId) -> Result<(), StoreError>;
    /// Remove `id`, moving its children into `reparent_to`
    fn remove_block(&mut self, id: BlockId, reparent_to: BlockId) -> Result<(), StoreError>;

    fn checkpoint(&self) -> Self::Checkpoint;
    fn restore(&mut self, checkpoint: Self::Checkpoint);
    /// Called once after a transaction closure succeeds
    fn commit(&mut self) {}

    /// Run `f` as one atomic unit: either everything it did stays, or the
    /// store is rolled back to the state it had before the call.
    fn transact<T, E>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E>
    where
        Self: Sized,
    {
        let checkpoint = self.checkpoint();
        match f(self) {
            Ok(value) => {
                self.commit();
                Ok(value)
            }
            Err(err) => {
                self.restore(checkpoint);
                Err(err)
            }
        }
    }

    /// Path from the root to `id`, if `id` is attached to this tree
    fn path_of(&self, id: BlockId) -> Option<Path> {
        if !self.contains(id) {
            return None;
        }
        let mut ids = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            ids.push(parent);
            current = parent;
        }
        if current != self.root() {
            return None;
        }
        ids.reverse();
        Some(Path::new(ids))
    }

    /// Walk `path` from the root, checking each parent/child link
    fn resolve(&self, path: &Path) -> Option<BlockId> {
        let (first, rest) = path.ids().split_first()?;
        if *first != self.root() {
            return None;
        }
        let mut current = *first;
        for id in rest {
            if !self.children(current).contains(id) {
                return None;
            }
            current = *id;
        }
        Some(current)
    }

    /// Compare two paths by position in the tree (pre-order).
    ///
    /// Ancestors come before their descendants; siblings compare by their
    /// index under the shared parent. `None` if the paths do not share the
    /// root or a diverging id is no longer a child of its parent.
    fn compare_document_order(&self, a: &Path, b: &Path) -> Option<Ordering> {
        if a == b {
            return Some(Ordering::Equal);
        }
        let shared = a.common_prefix_len(b);
        if shared == 0 {
            return None;
        }
        if shared == a.len() {
            return Some(Ordering::Less);
        }
        if shared == b.len() {
            return Some(Ordering::Greater);
        }
        let siblings = self.children(a.ids()[shared - 1]);
        let left = siblings.iter().position(|id| *id == a.ids()[shared])?;
        let right = siblings.iter().position(|id| *id == b.ids()[shared])?;
        Some(left.cmp(&right))
    }

    /// `id` and all of its descendants in pre-order
    fn descendants(&self, id: BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    /// Blocks covered by a span from `from` to `to` (in either order)
    fn selected_blocks(&self, from: BlockId, to: BlockId, mode: SelectMode) -> Vec<BlockId> {
        let order = self.descendants(self.root());
        let (Some(a), Some(b)) = (
            order.iter().position(|id| *id == from),
            order.iter().position(|id| *id == to),
        ) else {
            return Vec::new();
        };
        let flat = &order[a.min(b)..=a.max(b)];

        match mode {
            SelectMode::Flat => flat.to_vec(),
            SelectMode::Highest => {
                let content: Vec<BlockId> = flat
                    .iter()
                    .copied()
                    .filter(|id| self.role(*id) == Some(BlockRole::Content))
                    .collect();
                content
                    .iter()
                    .copied()
                    .filter(|id| {
                        let mut ancestor = self.parent(*id);
                        while let Some(current) = ancestor {
                            if content.contains(&current) {
                                return false;
                            }
                            ancestor = self.parent(current);
                        }
                        true
                    })
                    .collect()
            }
        }
    }
}
