//! CLI commands

pub mod deploy;
pub mod list;
pub mod region;
pub mod regions;
pub mod show_config;
pub mod terminate;
