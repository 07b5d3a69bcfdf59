use crate::editing::MergeError;
use crate::models::Path;

/// Everything that can go wrong while keeping the two selection models in sync.
///
/// None of these escape the controller: they are logged and the affected
/// operation is skipped.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Path no longer resolves to a block: {0}")]
    UnresolvedPath(Path),
    #[error("Edit spans several blocks but its range could not be translated")]
    CrossBlockWithoutSelection,
    #[error("Composition started while another session was still active")]
    CompositionProtocolViolation,
    #[error("Edit could not be completed: {0}")]
    TransactionFailure(#[source] MergeError),
}
