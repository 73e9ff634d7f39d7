// CLI command handlers
pub mod chat;
pub mod clear;
pub mod status;
pub mod sync;
