//! Cupom Core Library
//!
//! Shared functionality for the Cupom receipt tracker:
//! - Receipt extraction from photos with a generative model (Gemini)
//! - Category normalization and month keys
//! - Document persistence (Firestore REST or local SQLite)
//! - Monthly aggregation and AI-written spending insights
//! - Prompt library and layered configuration

pub mod ai;
pub mod category;
pub mod config;
pub mod error;
pub mod models;
pub mod month;
pub mod prompts;
pub mod store;
pub mod summary;
pub mod tracker;

/// Test utilities including mock Gemini and Firestore servers
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{AIBackend, AIClient, GeminiBackend, MockBackend, MockReply, ReceiptAI};
pub use category::{normalize_category, Category};
pub use config::{AiBackendKind, Config, StoreKind};
pub use error::{Error, Result};
pub use models::{Insight, Receipt, ReceiptInput};
pub use month::{month_key, MonthKey};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
pub use store::{DocumentStore, FirestoreStore, LocalStore, ReceiptFilter, StoreClient};
pub use summary::{CategorySpending, MonthlySummary};
pub use tracker::{MonthReport, Tracker};
