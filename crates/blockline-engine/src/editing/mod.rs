//! Edit interception and selection synchronization.
//!
//! - **`controller`**: the sync controller wiring host events to the tree model
//! - **`merge`**: transactional collapse of a multi-block selection
//! - **`composition`**: capture and commit of composed (IME) input
//! - **`error`**: sync failures, logged rather than raised

pub mod composition;
pub mod controller;
pub mod error;
pub mod merge;

pub use composition::{Composition, CompositionSession};
pub use controller::{
    CompositionOutcome, PreEdit, PreEditOutcome, SubscriptionId, SyncController, SyncOptions,
};
pub use error::SyncError;
pub use merge::{MergeError, MergeOutcome, merge_blocks};
