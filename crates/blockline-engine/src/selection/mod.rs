//! The two selection models and the translation between them.
//!
//! - **`flat`**: host-native ranges as (container, offset) pairs
//! - **`tree`**: the internal model, path-addressed points with per-block offsets
//! - **`translate`**: conversion in both directions, with direction resolved by tree order

pub mod flat;
pub mod translate;
pub mod tree;

pub use flat::{ContainerId, FlatPoint, FlatRange};
pub use translate::Translator;
pub use tree::{TextPoint, TreeSelection};
