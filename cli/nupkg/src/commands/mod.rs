//! CLI command implementations.

pub mod cache;
pub mod hash;
pub mod paths;
