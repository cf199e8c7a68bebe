//! CLI command modules

pub mod authorize;
pub mod config;
pub mod dispatch;
pub mod policy;
