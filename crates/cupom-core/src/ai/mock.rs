//! Mock backend for testing
//!
//! Returns predictable responses without calling a model. Replies can be
//! queued per test, and every request is recorded for inspection.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::types::GenerateRequest;
use super::AIBackend;

/// Canned extraction returned for JSON requests when nothing is queued
pub const MOCK_RECEIPT_JSON: &str = r#"{"total": 42.5, "dateTime": "2024-01-15T12:00:00Z", "merchant": "Mercado Mock", "category": "mercado"}"#;

/// Canned narrative returned for text requests when nothing is queued
pub const MOCK_INSIGHTS_TEXT: &str =
    "1. Mercado concentra a maior parte dos gastos do mês.\n2. Gastos com lazer estão estáveis.";

/// A scripted reply
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    Text(String),
    /// The model answered without any text
    Empty,
    /// The call itself fails
    Fail(String),
}

/// Mock AI backend for testing
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    model: String,
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<GenerateRequest>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            model: "mock".to_string(),
            replies: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Queue one text reply
    pub fn with_response(self, text: &str) -> Self {
        self.push(MockReply::Text(text.to_string()));
        self
    }

    /// Queue an arbitrary reply
    pub fn with_reply(self, reply: MockReply) -> Self {
        self.push(reply);
        self
    }

    /// Create a new instance with a different model name
    ///
    /// Clones share the reply queue and request log.
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    /// Queue a reply on a shared handle
    pub fn push(&self, reply: MockReply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn generate_content(&self, request: &GenerateRequest) -> Result<Option<String>> {
        self.requests
            .lock()
            .map_err(|_| Error::Model("Mock request log poisoned".into()))?
            .push(request.clone());

        let queued = self
            .replies
            .lock()
            .map_err(|_| Error::Model("Mock reply queue poisoned".into()))?
            .pop_front();

        match queued {
            Some(MockReply::Text(text)) => Ok(Some(text)),
            Some(MockReply::Empty) => Ok(None),
            Some(MockReply::Fail(message)) => Err(Error::Model(message)),
            None if request.json_output => Ok(Some(MOCK_RECEIPT_JSON.to_string())),
            None => Ok(Some(MOCK_INSIGHTS_TEXT.to_string())),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
