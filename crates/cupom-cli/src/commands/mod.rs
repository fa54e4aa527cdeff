//! CLI command implementations
//!
//! Commands are organized by screen:
//! - `core` - Shared utilities (config loading, tracker setup, month and money formatting)
//! - `capture` - Extract a receipt from a photo and optionally save it
//! - `receipts` - Month listing with category filter
//! - `insights` - Category bars, insight generation and history
//! - `prompts` - Prompt library management commands
//! - `status` - Backend configuration and AI health

pub mod capture;
pub mod core;
pub mod insights;
pub mod prompts;
pub mod receipts;
pub mod status;

// Re-export command functions for main.rs
pub use capture::*;
pub use core::*;
pub use insights::*;
pub use prompts::*;
pub use receipts::*;
pub use status::*;

pub use cupom_core::ai::parsing::truncate;
