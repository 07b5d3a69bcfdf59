use serde::{Deserialize, Serialize};

use crate::models::Path;

/// A position (and optional run) inside one block's text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextPoint {
    pub path: Path,
    /// Offset into the block's text run, in chars
    pub index: usize,
    /// Selected chars from `index`; 0 for a caret
    pub length: usize,
}

impl TextPoint {
    pub fn new(path: Path, index: usize, length: usize) -> Self {
        Self {
            path,
            index,
            length,
        }
    }

    pub fn caret(path: Path, index: usize) -> Self {
        Self::new(path, index, 0)
    }

    pub fn end(&self) -> usize {
        self.index.saturating_add(self.length)
    }
}

/// Internal, path-addressed text selection.
///
/// With `to == None` the selection lives in `from`'s block alone. Otherwise it
/// runs between `from` and `to`. The translator emits them in document order,
/// but callers may hand them over either way round; consumers order them by
/// tree position. `reversed` records that the user's anchor sits at the end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeSelection {
    pub from: TextPoint,
    pub to: Option<TextPoint>,
    pub reversed: bool,
}

impl TreeSelection {
    pub fn collapsed(path: Path, index: usize) -> Self {
        Self::single(TextPoint::caret(path, index), false)
    }

    /// Selection within one block. A caret has no direction.
    pub fn single(point: TextPoint, reversed: bool) -> Self {
        let reversed = reversed && point.length > 0;
        Self {
            from: point,
            to: None,
            reversed,
        }
    }

    pub fn spanning(from: TextPoint, to: TextPoint, reversed: bool) -> Self {
        Self {
            from,
            to: Some(to),
            reversed,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.to.is_none() && self.from.length == 0
    }

    /// True when the endpoints sit in different blocks
    pub fn is_multi_block(&self) -> bool {
        self.to.as_ref().is_some_and(|to| to.path != self.from.path)
    }

    /// The block holding the end of the selection
    pub fn last_path(&self) -> &Path {
        self.to.as_ref().map_or(&self.from.path, |to| &to.path)
    }
}
