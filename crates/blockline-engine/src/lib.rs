pub mod editing;
pub mod host;
pub mod io;
pub mod models;
pub mod selection;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use editing::{
    CompositionOutcome, PreEdit, PreEditOutcome, SubscriptionId, SyncController, SyncError,
    SyncOptions,
};
pub use host::{ContainerMap, ContainerSpan, HostCall, HostSurface, MemoryHost, Notice};
pub use io::{OutlineError, parse_outline};
pub use models::{BlockId, BlockRole, BlockStore, Document, Path, SelectMode, StoreError};
pub use selection::{ContainerId, FlatPoint, FlatRange, TextPoint, Translator, TreeSelection};
