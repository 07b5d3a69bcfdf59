use serde::{Deserialize, Serialize};

/// Opaque reference to a host-side text container
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(pub u64);

/// One end of a host range
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlatPoint {
    pub container: ContainerId,
    pub offset: usize,
}

impl FlatPoint {
    pub fn new(container: ContainerId, offset: usize) -> Self {
        Self { container, offset }
    }
}

/// Host-native selection: a start/end pair plus the direction flag.
///
/// Hosts usually report `start` before `end`; the translator re-orders the
/// endpoints when they do not and flips `reversed` to match.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlatRange {
    pub start: FlatPoint,
    pub end: FlatPoint,
    pub reversed: bool,
}

impl FlatRange {
    pub fn new(start: FlatPoint, end: FlatPoint, reversed: bool) -> Self {
        Self {
            start,
            end,
            reversed,
        }
    }

    pub fn collapsed(point: FlatPoint) -> Self {
        Self::new(point, point, false)
    }

    /// Range as the user drew it: `anchor` where they started, `focus` where
    /// they ended. Ordering is left to the translator.
    pub fn from_anchor_focus(anchor: FlatPoint, focus: FlatPoint) -> Self {
        Self::new(anchor, focus, false)
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn anchor(&self) -> FlatPoint {
        if self.reversed { self.end } else { self.start }
    }

    pub fn focus(&self) -> FlatPoint {
        if self.reversed { self.start } else { self.end }
    }
}
