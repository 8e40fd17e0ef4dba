//! CLI commands

pub mod clean;
pub mod list;
pub mod preview;
pub mod render;
pub mod show;
pub mod snapshot;
