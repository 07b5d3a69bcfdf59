use std::cmp::Ordering;

use crate::models::{BlockId, BlockStore, Path, SelectMode, StoreError};
use crate::selection::{TextPoint, TreeSelection};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("Selection does not span several blocks")]
    NotMultiBlock,
    #[error("Path no longer resolves to a block: {0}")]
    Unresolved(Path),
    #[error("Block {0} has no text run")]
    NotTextBearing(BlockId),
    #[error("Selection endpoints could not be put in document order")]
    OutOfOrder,
    #[error("Range {index}+{length} is out of bounds in block {block} (length {len})")]
    RangeOutOfBounds {
        block: BlockId,
        index: usize,
        length: usize,
        len: usize,
    },
    /// A store operation failed after the transaction started; the store has
    /// been rolled back
    #[error("Merge transaction rolled back: {0}")]
    Transaction(#[from] StoreError),
}

impl MergeError {
    /// Whether the failure happened while checking the selection, before
    /// anything was written
    pub fn is_staging(&self) -> bool {
        !matches!(self, MergeError::Transaction(_))
    }
}

/// Result of a committed merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The first block, which now holds the merged text
    pub block: BlockId,
    /// Caret right after the inserted text
    pub selection: TreeSelection,
    /// Removed blocks, in the order they were removed
    pub removed: Vec<BlockId>,
}

/// Collapse a selection spanning several blocks into its first block.
///
/// The selected text is replaced by `text`, the unselected tail of the last
/// block is appended to the first block, and every other block in the span is
/// removed (children move up to the removed block's parent). Removal runs from
/// the last block backwards so paths of blocks still waiting to be removed
/// stay valid.
///
/// Endpoints may come in either order; they are ordered by tree position
/// first. The earlier endpoint's run is replaced, the later block loses
/// everything up to the end of its run.
///
/// Everything is validated before the store is touched; the writes run in a
/// single `transact` so a failure part way leaves the store as it was.
pub fn merge_blocks<S: BlockStore>(
    store: &mut S,
    selection: &TreeSelection,
    text: &str,
) -> Result<MergeOutcome, MergeError> {
    let to = selection
        .to
        .as_ref()
        .filter(|_| selection.is_multi_block())
        .ok_or(MergeError::NotMultiBlock)?;

    let mut first = &selection.from;
    let mut last = to;
    let mut start = resolve(store, first)?;
    let mut end = resolve(store, last)?;
    match store.compare_document_order(&first.path, &last.path) {
        Some(Ordering::Less) => {}
        Some(Ordering::Greater) => {
            std::mem::swap(&mut first, &mut last);
            std::mem::swap(&mut start, &mut end);
        }
        Some(Ordering::Equal) | None => return Err(MergeError::OutOfOrder),
    }

    let blocks = store.selected_blocks(start, end, SelectMode::Flat);
    if blocks.first() != Some(&start) || blocks.last() != Some(&end) {
        return Err(MergeError::OutOfOrder);
    }
    check_range(store, start, first.index, first.length)?;
    check_range(store, end, last.index, last.length)?;
    let prefix = last.end();

    // Lowest block first
    let removed: Vec<BlockId> = blocks[1..].iter().rev().copied().collect();

    store.transact(|store| {
        store.delete_text(start, first.index, first.length)?;
        store.insert_text(start, first.index, text)?;
        store.delete_text(end, 0, prefix)?;
        store.join_text(start, end)?;
        for &block in &removed {
            let parent = store
                .parent(block)
                .ok_or(StoreError::BlockNotFound(block))?;
            store.remove_block(block, parent)?;
        }
        Ok::<_, MergeError>(())
    })?;

    let caret = first.index + text.chars().count();
    log::debug!(
        "merged {} blocks into {start}, caret at {caret}",
        removed.len() + 1
    );

    Ok(MergeOutcome {
        block: start,
        selection: TreeSelection::collapsed(first.path.clone(), caret),
        removed,
    })
}

fn resolve<S: BlockStore>(store: &S, point: &TextPoint) -> Result<BlockId, MergeError> {
    store
        .resolve(&point.path)
        .ok_or_else(|| MergeError::Unresolved(point.path.clone()))
}

fn check_range<S: BlockStore>(
    store: &S,
    block: BlockId,
    index: usize,
    length: usize,
) -> Result<(), MergeError> {
    let len = store
        .text(block)
        .ok_or(MergeError::NotTextBearing(block))?
        .len();
    if index.checked_add(length).is_none_or(|end| end > len) {
        return Err(MergeError::RangeOutOfBounds {
            block,
            index,
            length,
            len,
        });
    }
    Ok(())
}
