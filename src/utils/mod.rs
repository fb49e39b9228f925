pub mod error;
pub mod types;

pub use error::{DockwatchError, Result};
pub use types::*;
