//! Pluggable generative-model backend abstraction
//!
//! # Architecture
//!
//! - `AIBackend` trait: one generate-content call plus health/identity
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `GeminiBackend`, `MockBackend`
//! - `ReceiptAI`: receipt extraction and insight generation on top of a client
//!
//! # Usage
//!
//! ```rust,ignore
//! let config = Config::load(None)?;
//! if let Some(client) = AIClient::from_config(&config.ai)? {
//!     let ai = ReceiptAI::new(client, PromptLibrary::new()?);
//!     let receipt = ai.analyze_receipt_bytes(&photo).await?;
//! }
//! ```

mod gemini;
mod mock;
pub mod parsing;
mod receipt;
pub mod types;

pub use gemini::GeminiBackend;
pub use mock::{MockBackend, MockReply, MOCK_INSIGHTS_TEXT, MOCK_RECEIPT_JSON};
pub use receipt::ReceiptAI;
pub use types::*;

use async_trait::async_trait;

use crate::config::{AiBackendKind, AiConfig};
use crate::error::Result;

/// Trait defining the interface for all AI backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Run one generation request, returning the response text if there is any
    async fn generate_content(&self, request: &GenerateRequest) -> Result<Option<String>>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
#[derive(Clone)]
pub enum AIClient {
    /// Google Gemini (generateContent REST API)
    Gemini(GeminiBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create a client from resolved configuration
    ///
    /// Returns `Ok(None)` when the selected backend is missing its API key.
    pub fn from_config(config: &AiConfig) -> Result<Option<Self>> {
        match config.backend {
            AiBackendKind::Gemini => {
                Ok(GeminiBackend::from_config(&config.gemini)?.map(AIClient::Gemini))
            }
            AiBackendKind::Mock => Ok(Some(AIClient::Mock(MockBackend::new()))),
        }
    }

    /// Create a Gemini backend directly
    pub fn gemini(base_url: &str, model: &str, api_key: &str) -> Self {
        AIClient::Gemini(GeminiBackend::new(base_url, model, api_key))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        match self {
            AIClient::Gemini(b) => AIClient::Gemini(b.with_model(model)),
            AIClient::Mock(b) => AIClient::Mock(b.with_model(model)),
        }
    }

    /// Short backend name for status output
    pub fn backend_name(&self) -> &'static str {
        match self {
            AIClient::Gemini(_) => "gemini",
            AIClient::Mock(_) => "mock",
        }
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn generate_content(&self, request: &GenerateRequest) -> Result<Option<String>> {
        match self {
            AIClient::Gemini(b) => b.generate_content(request).await,
            AIClient::Mock(b) => b.generate_content(request).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Gemini(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Gemini(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Gemini(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}
