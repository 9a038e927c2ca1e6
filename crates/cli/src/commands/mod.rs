//! CLI command implementations.

mod build;
mod rename;

pub use build::build;
pub use rename::rename;
