//! Shared helpers for unit tests.

use crate::models::{
    BlockId, BlockRole, BlockStore, Document, DocumentCheckpoint, StoreError, TextBuffer,
};

/// Document with one hub holding a flat list of text blocks
pub fn flat_document(texts: &[&str]) -> (Document, BlockId, Vec<BlockId>) {
    let mut doc = Document::new();
    let hub = doc.append_hub();
    let blocks = texts
        .iter()
        .map(|text| doc.append_text_block(hub, text).unwrap())
        .collect();
    (doc, hub, blocks)
}

/// Store wrapper that can fail the removal of one block and records, for each
/// removal, whether the block still resolved by path at that moment
pub struct ProbeStore<'a> {
    inner: &'a mut Document,
    fail_on: Option<BlockId>,
    removals: Vec<(BlockId, bool)>,
}

impl<'a> ProbeStore<'a> {
    pub fn new(inner: &'a mut Document) -> Self {
        Self {
            inner,
            fail_on: None,
            removals: Vec::new(),
        }
    }

    pub fn fail_removal_of(mut self, block: BlockId) -> Self {
        self.fail_on = Some(block);
        self
    }

    pub fn removals(&self) -> &[(BlockId, bool)] {
        &self.removals
    }
}

impl BlockStore for ProbeStore<'_> {
    type Checkpoint = DocumentCheckpoint;

    fn root(&self) -> BlockId {
        self.inner.root()
    }

    fn contains(&self, id: BlockId) -> bool {
        self.inner.contains(id)
    }

    fn parent(&self, id: BlockId) -> Option<BlockId> {
        self.inner.parent(id)
    }

    fn children(&self, id: BlockId) -> &[BlockId] {
        self.inner.children(id)
    }

    fn role(&self, id: BlockId) -> Option<BlockRole> {
        self.inner.role(id)
    }

    fn text(&self, id: BlockId) -> Option<&TextBuffer> {
        self.inner.text(id)
    }

    fn insert_text(&mut self, id: BlockId, index: usize, text: &str) -> Result<(), StoreError> {
        self.inner.insert_text(id, index, text)
    }

    fn delete_text(
        &mut self,
        id: BlockId,
        index: usize,
        length: usize,
    ) -> Result<(), StoreError> {
        self.inner.delete_text(id, index, length)
    }

    fn join_text(&mut self, target: BlockId, source: BlockId) -> Result<(), StoreError> {
        self.inner.join_text(target, source)
    }

    fn remove_block(&mut self, id: BlockId, reparent_to: BlockId) -> Result<(), StoreError> {
        let resolves = self
            .inner
            .path_of(id)
            .and_then(|path| self.inner.resolve(&path))
            == Some(id);
        self.removals.push((id, resolves));
        if self.fail_on == Some(id) {
            return Err(StoreError::BlockNotFound(id));
        }
        self.inner.remove_block(id, reparent_to)
    }

    fn checkpoint(&self) -> DocumentCheckpoint {
        self.inner.checkpoint()
    }

    fn restore(&mut self, checkpoint: DocumentCheckpoint) {
        self.inner.restore(checkpoint);
    }

    fn commit(&mut self) {
        self.inner.commit();
    }
}
