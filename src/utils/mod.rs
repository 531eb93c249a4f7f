//! Console helpers shared by the binary and the pipeline runner

pub mod progress;
pub mod styling;

pub use progress::*;
pub use styling::*;
