use std::cmp::Ordering;

use crate::host::ContainerMap;
use crate::models::{BlockId, BlockStore, Path};
use crate::selection::{FlatPoint, FlatRange, TextPoint, TreeSelection};

/// A host endpoint resolved onto a text-bearing block
#[derive(Debug, Clone)]
struct ResolvedPoint {
    block: BlockId,
    path: Path,
    index: usize,
    /// Length of the block's text run
    len: usize,
}

/// Bidirectional mapping between host ranges and tree selections.
///
/// Borrowed per call: paths are only trusted for the current synchronous
/// task, so nothing here is cached.
pub struct Translator<'a, S: ?Sized, M: ?Sized> {
    store: &'a S,
    map: &'a M,
}

impl<'a, S, M> Translator<'a, S, M>
where
    S: BlockStore + ?Sized,
    M: ContainerMap + ?Sized,
{
    pub fn new(store: &'a S, map: &'a M) -> Self {
        Self { store, map }
    }

    /// Translate a host range into a tree selection.
    ///
    /// Fails when either endpoint lies outside a text-bearing block. Endpoints
    /// reported out of document order are swapped and the direction flipped.
    pub fn to_tree_selection(&self, range: &FlatRange) -> Option<TreeSelection> {
        let mut start = self.resolve_point(&range.start)?;
        let mut end = self.resolve_point(&range.end)?;
        let mut reversed = range.reversed;

        if self.precedes(&end, &start)? {
            std::mem::swap(&mut start, &mut end);
            reversed = !reversed;
        }

        if start.block == end.block {
            let point = TextPoint::new(start.path, start.index, end.index - start.index);
            return Some(TreeSelection::single(point, reversed));
        }

        let from = TextPoint::new(start.path, start.index, start.len - start.index);
        let to = TextPoint::new(end.path, 0, end.index);
        Some(TreeSelection::spanning(from, to, reversed))
    }

    /// Translate a tree selection back into host coordinates
    pub fn to_flat_range(&self, selection: &TreeSelection) -> Option<FlatRange> {
        let start = self.locate_point(&selection.from.path, selection.from.index)?;
        let end = match &selection.to {
            Some(to) => self.locate_point(&to.path, to.end())?,
            None => self.locate_point(&selection.from.path, selection.from.end())?,
        };
        Some(FlatRange::new(start, end, selection.reversed))
    }

    /// Build a host range from where the user started (`anchor`) and ended
    /// (`focus`), deciding direction by tree order
    pub fn range_from_anchor_focus(&self, anchor: FlatPoint, focus: FlatPoint) -> Option<FlatRange> {
        let a = self.resolve_point(&anchor)?;
        let f = self.resolve_point(&focus)?;
        if self.precedes(&f, &a)? {
            Some(FlatRange::new(focus, anchor, true))
        } else {
            Some(FlatRange::new(anchor, focus, false))
        }
    }

    /// Block under a host endpoint, text-bearing or not
    pub fn block_at(&self, point: &FlatPoint) -> Option<BlockId> {
        let span = self.map.resolve_container(point.container)?;
        self.store.contains(span.block).then_some(span.block)
    }

    fn resolve_point(&self, point: &FlatPoint) -> Option<ResolvedPoint> {
        let span = self.map.resolve_container(point.container)?;
        let len = self.store.text(span.block)?.len();
        let path = self.store.path_of(span.block)?;
        Some(ResolvedPoint {
            block: span.block,
            path,
            // Hosts may lag behind a shrinking text run
            index: span.base.saturating_add(point.offset).min(len),
            len,
        })
    }

    fn locate_point(&self, path: &Path, index: usize) -> Option<FlatPoint> {
        let block = self.store.resolve(path)?;
        self.map.locate(block, index)
    }

    /// Whether `a` sits strictly before `b`
    fn precedes(&self, a: &ResolvedPoint, b: &ResolvedPoint) -> Option<bool> {
        if a.block == b.block {
            return Some(a.index < b.index);
        }
        let order = self.store.compare_document_order(&a.path, &b.path)?;
        Some(order == Ordering::Less)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ContainerSpan, MemoryHost};
    use crate::models::Document;
    use crate::selection::ContainerId;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    struct Fixture {
        doc: Document,
        host: MemoryHost,
        blocks: Vec<BlockId>,
    }

    impl Fixture {
        fn new(texts: &[&str]) -> Self {
            let mut doc = Document::new();
            let hub = doc.append_hub();
            let blocks = texts
                .iter()
                .map(|text| doc.append_text_block(hub, text).unwrap())
                .collect();
            let host = MemoryHost::mounted(&doc);
            Self { doc, host, blocks }
        }

        fn translator(&self) -> Translator<'_, Document, MemoryHost> {
            Translator::new(&self.doc, &self.host)
        }

        fn point(&self, block: usize, offset: usize) -> FlatPoint {
            FlatPoint::new(self.host.container_of(self.blocks[block]).unwrap(), offset)
        }

        fn path(&self, block: usize) -> Path {
            self.doc.path_of(self.blocks[block]).unwrap()
        }
    }

    #[rstest]
    #[case(0, 0, false)]
    #[case(2, 0, false)]
    #[case(1, 3, false)]
    #[case(1, 3, true)]
    #[case(0, 5, false)]
    fn test_single_block_roundtrip(
        #[case] index: usize,
        #[case] length: usize,
        #[case] reversed: bool,
    ) {
        let fx = Fixture::new(&["hello", "world"]);
        let selection = TreeSelection::single(TextPoint::new(fx.path(0), index, length), reversed);

        let range = fx.translator().to_flat_range(&selection).unwrap();
        let back = fx.translator().to_tree_selection(&range).unwrap();

        assert_eq!(back, selection);
    }

    #[test]
    fn test_multi_block_translation() {
        let fx = Fixture::new(&["hello", "middle", "world"]);
        let range = FlatRange::new(fx.point(0, 2), fx.point(2, 3), false);

        let selection = fx.translator().to_tree_selection(&range).unwrap();

        assert_eq!(
            selection,
            TreeSelection::spanning(
                TextPoint::new(fx.path(0), 2, 3),
                TextPoint::new(fx.path(2), 0, 3),
                false
            )
        );
        assert_eq!(fx.translator().to_flat_range(&selection), Some(range));
    }

    #[test]
    fn test_backwards_selection_across_blocks_is_reversed() {
        let fx = Fixture::new(&["first", "second block"]);

        // Drag from block 2 offset 5 back to block 1 offset 0
        let range = FlatRange::from_anchor_focus(fx.point(1, 5), fx.point(0, 0));
        let selection = fx.translator().to_tree_selection(&range).unwrap();

        assert!(selection.reversed);
        assert_eq!(selection.from, TextPoint::new(fx.path(0), 0, 5));
        assert_eq!(selection.to, Some(TextPoint::new(fx.path(1), 0, 5)));

        let ordered = fx
            .translator()
            .range_from_anchor_focus(fx.point(1, 5), fx.point(0, 0))
            .unwrap();
        assert!(ordered.reversed);
        assert_eq!(ordered.start, fx.point(0, 0));
    }

    #[test]
    fn test_backwards_selection_in_one_block_compares_offsets() {
        let fx = Fixture::new(&["hello"]);
        let range = FlatRange::from_anchor_focus(fx.point(0, 4), fx.point(0, 1));

        let selection = fx.translator().to_tree_selection(&range).unwrap();

        assert_eq!(selection, TreeSelection::single(TextPoint::new(fx.path(0), 1, 3), true));
    }

    #[test]
    fn test_nested_blocks_use_tree_order() {
        let mut doc = Document::new();
        let hub = doc.append_hub();
        let parent = doc.append_text_block(hub, "parent").unwrap();
        let child = doc.append_text_block(parent, "child").unwrap();
        let host = MemoryHost::mounted(&doc);
        let translator = Translator::new(&doc, &host);

        let range = FlatRange::from_anchor_focus(
            FlatPoint::new(host.container_of(child).unwrap(), 2),
            FlatPoint::new(host.container_of(parent).unwrap(), 4),
        );
        let selection = translator.to_tree_selection(&range).unwrap();

        assert!(selection.reversed);
        assert_eq!(selection.from.path, doc.path_of(parent).unwrap());
        assert_eq!(selection.from.index, 4);
    }

    #[test]
    fn test_unresolvable_container_fails() {
        let fx = Fixture::new(&["hello"]);
        let stray = FlatPoint::new(ContainerId(999), 0);

        let range = FlatRange::new(stray, fx.point(0, 1), false);
        assert_eq!(fx.translator().to_tree_selection(&range), None);
    }

    #[test]
    fn test_stale_path_fails_to_flat() {
        let mut fx = Fixture::new(&["hello", "world"]);
        let selection = TreeSelection::collapsed(fx.path(1), 1);
        let hub = fx.doc.parent(fx.blocks[1]).unwrap();

        fx.doc.remove_block(fx.blocks[1], hub).unwrap();

        assert_eq!(fx.translator().to_flat_range(&selection), None);
    }

    #[test]
    fn test_offsets_past_text_are_clamped() {
        let fx = Fixture::new(&["abc"]);
        let range = FlatRange::collapsed(fx.point(0, 10));

        let selection = fx.translator().to_tree_selection(&range).unwrap();
        assert_eq!(selection, TreeSelection::collapsed(fx.path(0), 3));
    }

    /// Host that renders a block as two containers split at char 3
    struct SplitHost {
        block: BlockId,
    }

    impl ContainerMap for SplitHost {
        fn resolve_container(&self, container: ContainerId) -> Option<ContainerSpan> {
            match container.0 {
                1 => Some(ContainerSpan { block: self.block, base: 0 }),
                2 => Some(ContainerSpan { block: self.block, base: 3 }),
                _ => None,
            }
        }

        fn locate(&self, block: BlockId, index: usize) -> Option<FlatPoint> {
            (block == self.block).then(|| {
                if index < 3 {
                    FlatPoint::new(ContainerId(1), index)
                } else {
                    FlatPoint::new(ContainerId(2), index - 3)
                }
            })
        }
    }

    #[test]
    fn test_container_base_offsets() {
        let mut doc = Document::new();
        let hub = doc.append_hub();
        let block = doc.append_text_block(hub, "abcdef").unwrap();
        let host = SplitHost { block };
        let translator = Translator::new(&doc, &host);

        let range = FlatRange::new(
            FlatPoint::new(ContainerId(1), 1),
            FlatPoint::new(ContainerId(2), 2),
            false,
        );
        let selection = translator.to_tree_selection(&range).unwrap();
        let path = doc.path_of(block).unwrap();

        assert_eq!(selection, TreeSelection::single(TextPoint::new(path, 1, 4), false));
        assert_eq!(translator.to_flat_range(&selection), Some(range));
    }
}
