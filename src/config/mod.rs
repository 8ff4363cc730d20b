//! Configuration and workspace layout.
//!
//! - `types` - `Settings` and its sections, all fields defaulted
//! - `parser` - locating and parsing `turbine.yaml`
//! - `workspace` - where the farm, the registry and projects live on disk

mod parser;
mod types;
mod workspace;

pub use parser::*;
pub use types::*;
pub use workspace::*;
