use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::host::{ContainerMap, ContainerSpan, HostSurface, Notice};
use crate::models::{BlockId, BlockRole, BlockStore};
use crate::selection::{ContainerId, FlatPoint, FlatRange};

/// A call the engine made into the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    SetNativeRange(FlatRange),
    ClearNativeSelection,
    RequestRefresh(BlockId),
    Notify(Notice),
}

impl fmt::Display for HostCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostCall::SetNativeRange(range) => write!(
                f,
                "set_native_range c{}:{} .. c{}:{}{}",
                range.start.container.0,
                range.start.offset,
                range.end.container.0,
                range.end.offset,
                if range.reversed { " (reversed)" } else { "" }
            ),
            HostCall::ClearNativeSelection => f.write_str("clear_native_selection"),
            HostCall::RequestRefresh(block) => write!(f, "request_refresh {block}"),
            HostCall::Notify(Notice::EditFailed(message)) => write!(f, "notify: {message}"),
        }
    }
}

/// Host surface kept entirely in memory.
///
/// Every content block is rendered as a single container whose offsets
/// equal the block's char offsets; content blocks without text (dividers,
/// embeds) get a container too. Calls from the engine are recorded in
/// order; user actions (`select`, `set_composing`) are not.
#[derive(Debug, Default)]
pub struct MemoryHost {
    containers: HashMap<ContainerId, BlockId>,
    by_block: HashMap<BlockId, ContainerId>,
    next_container: u64,
    native: Option<FlatRange>,
    composing: HashSet<ContainerId>,
    calls: Vec<HostCall>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mounted<S: BlockStore>(store: &S) -> Self {
        let mut host = Self::new();
        host.mount(store);
        host
    }

    /// Sync containers with the store: new content blocks get a container,
    /// containers of removed blocks are dropped. Existing ids are kept.
    pub fn mount<S: BlockStore>(&mut self, store: &S) {
        let alive = |block: &BlockId| store.role(*block) == Some(BlockRole::Content);
        self.containers.retain(|_, block| alive(block));
        self.by_block.retain(|block, _| alive(block));
        self.composing
            .retain(|container| self.containers.contains_key(container));

        for block in store.descendants(store.root()) {
            if !alive(&block) || self.by_block.contains_key(&block) {
                continue;
            }
            self.next_container += 1;
            let container = ContainerId(self.next_container);
            self.containers.insert(container, block);
            self.by_block.insert(block, container);
        }
    }

    pub fn container_of(&self, block: BlockId) -> Option<ContainerId> {
        self.by_block.get(&block).copied()
    }

    /// Simulate the user dragging a native selection from `anchor` to `focus`
    pub fn select(&mut self, anchor: FlatPoint, focus: FlatPoint) {
        self.native = Some(FlatRange::from_anchor_focus(anchor, focus));
    }

    /// Simulate the user dropping the native selection
    pub fn deselect(&mut self) {
        self.native = None;
    }

    /// Mark the editing context of `container` as composing (or not)
    pub fn set_composing(&mut self, container: ContainerId, composing: bool) {
        if composing {
            self.composing.insert(container);
        } else {
            self.composing.remove(&container);
        }
    }

    pub fn calls(&self) -> &[HostCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<HostCall> {
        std::mem::take(&mut self.calls)
    }

    /// How many times the engine wrote the native range
    pub fn native_range_writes(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, HostCall::SetNativeRange(_)))
            .count()
    }
}

impl ContainerMap for MemoryHost {
    fn resolve_container(&self, container: ContainerId) -> Option<ContainerSpan> {
        self.containers
            .get(&container)
            .map(|block| ContainerSpan {
                block: *block,
                base: 0,
            })
    }

    fn locate(&self, block: BlockId, index: usize) -> Option<FlatPoint> {
        self.container_of(block)
            .map(|container| FlatPoint::new(container, index))
    }
}

impl HostSurface for MemoryHost {
    fn native_range(&self) -> Option<FlatRange> {
        self.native
    }

    fn set_native_range(&mut self, range: &FlatRange) {
        self.native = Some(*range);
        self.calls.push(HostCall::SetNativeRange(*range));
    }

    fn clear_native_selection(&mut self) {
        self.native = None;
        self.calls.push(HostCall::ClearNativeSelection);
    }

    fn is_composing_at(&self, container: ContainerId) -> bool {
        self.composing.contains(&container)
    }

    fn request_refresh(&mut self, block: BlockId) {
        self.calls.push(HostCall::RequestRefresh(block));
    }

    fn notify(&mut self, notice: Notice) {
        self.calls.push(HostCall::Notify(notice));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;

    #[test]
    fn test_mount_assigns_one_container_per_text_block() {
        let mut doc = Document::new();
        let hub = doc.append_hub();
        let a = doc.append_text_block(hub, "a").unwrap();
        let b = doc.append_text_block(hub, "b").unwrap();

        let host = MemoryHost::mounted(&doc);

        assert_eq!(host.container_of(hub), None);
        let ca = host.container_of(a).unwrap();
        let cb = host.container_of(b).unwrap();
        assert_ne!(ca, cb);
        assert_eq!(host.resolve_container(cb).map(|span| span.block), Some(b));
    }

    #[test]
    fn test_remount_keeps_ids_and_drops_removed_blocks() {
        let mut doc = Document::new();
        let hub = doc.append_hub();
        let a = doc.append_text_block(hub, "a").unwrap();
        let b = doc.append_text_block(hub, "b").unwrap();
        let mut host = MemoryHost::mounted(&doc);
        let ca = host.container_of(a).unwrap();
        let cb = host.container_of(b).unwrap();

        doc.remove_block(b, hub).unwrap();
        let c = doc.append_text_block(hub, "c").unwrap();
        host.mount(&doc);

        assert_eq!(host.container_of(a), Some(ca));
        assert_eq!(host.resolve_container(cb), None);
        assert!(host.container_of(c).is_some());
    }

    #[test]
    fn test_text_less_content_blocks_are_mounted() {
        let mut doc = Document::new();
        let hub = doc.append_hub();
        let divider = doc.append_block(hub, BlockRole::Content, None).unwrap();

        let host = MemoryHost::mounted(&doc);

        let container = host.container_of(divider).unwrap();
        assert_eq!(host.resolve_container(container).map(|span| span.block), Some(divider));
    }

    #[test]
    fn test_user_actions_are_not_recorded() {
        let mut host = MemoryHost::new();
        let point = FlatPoint::new(ContainerId(1), 0);

        host.select(point, point);
        assert!(host.native_range().is_some());
        assert!(host.calls().is_empty());

        host.clear_native_selection();
        assert_eq!(host.calls(), &[HostCall::ClearNativeSelection]);
        assert_eq!(host.native_range(), None);
    }
}
