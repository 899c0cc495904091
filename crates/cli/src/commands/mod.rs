//! Subcommand implementations

pub mod info;
pub mod predict;
