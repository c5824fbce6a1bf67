//! CLI command modules.

pub mod http;
pub mod nodes;
pub mod status;
