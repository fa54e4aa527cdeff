//! Receipt extraction and insight generation
//!
//! Both operations are a single model call with no retry. Malformed
//! extraction output degrades to defaults; failures of the call itself
//! (network, HTTP status, quota, auth) propagate.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use chrono::Utc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::ReceiptInput;
use crate::prompts::{PromptId, PromptLibrary};

use super::parsing::parse_receipt_response;
use super::types::{GenerateRequest, Part};
use super::{AIBackend, AIClient};

/// Model-backed receipt operations
#[derive(Clone)]
pub struct ReceiptAI {
    client: AIClient,
    prompts: Arc<PromptLibrary>,
}

impl ReceiptAI {
    pub fn new(client: AIClient, prompts: PromptLibrary) -> Self {
        Self {
            client,
            prompts: Arc::new(prompts),
        }
    }

    pub fn client(&self) -> &AIClient {
        &self.client
    }

    pub fn prompts(&self) -> &PromptLibrary {
        &self.prompts
    }

    /// Extract purchase data from a base64-encoded JPEG
    pub async fn analyze_receipt_base64(&self, image_base64: &str) -> Result<ReceiptInput> {
        let prompt = self.prompts.get(PromptId::ExtractReceipt)?;
        let vars = HashMap::new();

        let request = GenerateRequest::new(vec![
            Part::text(prompt.render_system(&vars)),
            Part::jpeg(image_base64),
            Part::text(prompt.render_user(&vars)),
        ])
        .json(true);

        let text = self
            .client
            .generate_content(&request)
            .await?
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "{}".to_string());

        debug!(model = %self.client.model(), response = %text, "Receipt extraction response");

        let input = parse_receipt_response(&text, Utc::now());
        info!(
            merchant = %input.merchant,
            total = input.total,
            category = %input.category,
            "Extracted receipt"
        );
        Ok(input)
    }

    /// Extract purchase data from raw image bytes
    pub async fn analyze_receipt_bytes(&self, image: &[u8]) -> Result<ReceiptInput> {
        if image.is_empty() {
            return Err(Error::InvalidData("Receipt image is empty".into()));
        }
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        self.analyze_receipt_base64(&encoded).await
    }

    /// Ask the model for a short narrative about a monthly summary
    ///
    /// Returns the raw text, or an empty string when the model returns none.
    pub async fn generate_insights_from_summary(&self, summary: &str) -> Result<String> {
        let prompt = self.prompts.get(PromptId::GenerateInsights)?;
        let mut vars = HashMap::new();
        vars.insert("summary", summary);

        let request = GenerateRequest::new(vec![
            Part::text(prompt.render_system(&vars)),
            Part::text(prompt.render_user(&vars)),
        ])
        .json(prompt.wants_json());

        let text = self
            .client
            .generate_content(&request)
            .await?
            .unwrap_or_default();

        debug!(model = %self.client.model(), chars = text.len(), "Insights response");
        Ok(text)
    }
}
