//! Command implementations

pub mod completions;
pub mod delete;
pub mod export;
pub mod import;
pub mod init;
pub mod list;
pub mod new;
pub mod preview;
pub mod render;
pub mod search;
pub mod show;
pub mod stats;
pub mod validate;
pub mod variables;
pub mod version;
