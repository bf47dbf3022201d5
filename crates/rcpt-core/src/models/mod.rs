//! Data models for rcpt.

pub mod config;
pub mod receipt;

pub use config::*;
pub use receipt::*;
