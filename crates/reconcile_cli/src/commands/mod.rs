//! CLI command implementations.

pub mod input;
pub mod resolve;
pub mod sync;
