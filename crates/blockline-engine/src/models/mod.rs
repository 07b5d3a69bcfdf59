pub mod block;
pub mod buffer;
pub mod document;
pub mod path;
pub mod store;

pub use block::{BlockId, BlockRole};
pub use buffer::TextBuffer;
pub use document::{Document, DocumentCheckpoint};
pub use path::Path;
pub use store::{BlockStore, SelectMode, StoreError};
