pub mod assets;
pub mod auth_cmd;
pub mod common;
pub mod completions;
pub mod config;
pub mod conflicts;
pub mod pending;
pub mod resolve;
pub mod scan;
pub mod sync;
