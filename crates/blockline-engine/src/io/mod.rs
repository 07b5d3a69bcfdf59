pub mod outline;

pub use outline::{OutlineError, parse_outline};
