//! Subcommand implementations

pub mod features;
pub mod history;
pub mod predict;
