//! Subcommand implementations

pub mod evaluate;
pub mod predict;
pub mod schema;
pub mod train;
