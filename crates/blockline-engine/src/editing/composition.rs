use crate::editing::{MergeError, MergeOutcome, SyncError, merge_blocks};
use crate::models::{BlockId, BlockStore, SelectMode};
use crate::selection::TreeSelection;

/// State captured when composed input starts.
///
/// Holds the selection as it was at the start plus the blocks under it, so
/// the commit at the end can run against the pre-composition view even
/// though the host's rendering has moved on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionSession {
    selection: TreeSelection,
    /// Every block in the span, document order
    blocks: Vec<BlockId>,
    /// Ancestor-distinct content blocks in the span
    highest: Vec<BlockId>,
}

impl CompositionSession {
    /// Capture a session for `selection`
    pub fn begin<S: BlockStore>(store: &S, selection: TreeSelection) -> Result<Self, SyncError> {
        let start = store
            .resolve(&selection.from.path)
            .ok_or_else(|| SyncError::UnresolvedPath(selection.from.path.clone()))?;
        let end = store
            .resolve(selection.last_path())
            .ok_or_else(|| SyncError::UnresolvedPath(selection.last_path().clone()))?;

        let blocks = store.selected_blocks(start, end, SelectMode::Flat);
        let highest = store.selected_blocks(start, end, SelectMode::Highest);
        Ok(Self {
            selection,
            blocks,
            highest,
        })
    }

    pub fn selection(&self) -> &TreeSelection {
        &self.selection
    }

    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    pub fn highest_blocks(&self) -> &[BlockId] {
        &self.highest
    }

    pub fn is_multi_block(&self) -> bool {
        self.selection.is_multi_block()
    }

    /// First captured block that is no longer attached to the tree
    pub fn missing_block<S: BlockStore>(&self, store: &S) -> Option<BlockId> {
        self.blocks
            .iter()
            .copied()
            .find(|block| store.path_of(*block).is_none())
    }

    /// Distinct parents of the highest blocks, in first-seen order. These
    /// are the subtrees whose rendering the composition may have disturbed.
    pub fn refresh_targets<S: BlockStore>(&self, store: &S) -> Vec<BlockId> {
        let mut parents = Vec::new();
        for block in &self.highest {
            if let Some(parent) = store.parent(*block)
                && !parents.contains(&parent)
            {
                parents.push(parent);
            }
        }
        parents
    }

    /// Apply the composed `text` over the captured selection
    pub fn commit<S: BlockStore>(self, store: &mut S, text: &str) -> Result<MergeOutcome, MergeError> {
        merge_blocks(store, &self.selection, text)
    }
}

/// Composed-input state: `Idle -> Composing -> Idle`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Composition {
    #[default]
    Idle,
    Composing(CompositionSession),
}

impl Composition {
    pub fn is_composing(&self) -> bool {
        matches!(self, Composition::Composing(_))
    }

    pub fn session(&self) -> Option<&CompositionSession> {
        match self {
            Composition::Composing(session) => Some(session),
            Composition::Idle => None,
        }
    }

    /// Enter `Composing`, handing back any session that was still open
    pub fn start(&mut self, session: CompositionSession) -> Option<CompositionSession> {
        match std::mem::replace(self, Composition::Composing(session)) {
            Composition::Composing(stale) => Some(stale),
            Composition::Idle => None,
        }
    }

    /// Return to `Idle`, yielding the session if there was one
    pub fn finish(&mut self) -> Option<CompositionSession> {
        match std::mem::take(self) {
            Composition::Composing(session) => Some(session),
            Composition::Idle => None,
        }
    }
}
