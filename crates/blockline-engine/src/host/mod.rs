//! Seams to the host presentation layer.
//!
//! The host owns rendering and the native selection. The engine reads and
//! writes that selection only through these traits, so any surface (a
//! webview, a native text view, the in-memory host used by tests and the
//! replay CLI) can drive it.

pub mod memory;

pub use memory::{HostCall, MemoryHost};

use crate::models::BlockId;
use crate::selection::{ContainerId, FlatPoint, FlatRange};

/// Where a host container's text sits inside a block's text run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerSpan {
    pub block: BlockId,
    /// Char offset of the container's first char within the block
    pub base: usize,
}

/// Mapping between host containers and block text positions
pub trait ContainerMap {
    fn resolve_container(&self, container: ContainerId) -> Option<ContainerSpan>;
    /// Host position of char `index` in `block`'s text run
    fn locate(&self, block: BlockId, index: usize) -> Option<FlatPoint>;
}

/// User-facing messages the engine may ask the host to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    EditFailed(String),
}

pub trait HostSurface: ContainerMap {
    /// Current native selection, if any
    fn native_range(&self) -> Option<FlatRange>;
    fn set_native_range(&mut self, range: &FlatRange);
    fn clear_native_selection(&mut self);
    /// Whether the closest text-editing context around `container` is in the
    /// middle of a composition of its own
    fn is_composing_at(&self, container: ContainerId) -> bool;
    /// Ask for one re-render of `block`'s subtree
    fn request_refresh(&mut self, block: BlockId);
    fn notify(&mut self, notice: Notice);
}
