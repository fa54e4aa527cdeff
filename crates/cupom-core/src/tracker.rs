//! User-facing flows: capture a receipt, review a month, generate insights
//!
//! The tracker owns one store and, when configured, one model client. Each
//! method is one user action; remote calls inside it run sequentially.

use std::io::ErrorKind;
use std::path::Path;

use tracing::{info, warn};

use crate::ai::ReceiptAI;
use crate::category::Category;
use crate::error::{Error, Result};
use crate::models::{Insight, Receipt, ReceiptInput};
use crate::month::MonthKey;
use crate::store::{DocumentStore, ReceiptFilter, StoreClient};
use crate::summary::{CategorySpending, MonthlySummary};

/// One month of receipts with its aggregation
#[derive(Debug, Clone)]
pub struct MonthReport {
    pub summary: MonthlySummary,
    pub receipts: Vec<Receipt>,
}

impl MonthReport {
    /// Per-category breakdown, largest first
    pub fn categories(&self) -> Vec<CategorySpending> {
        self.summary.categories(&self.receipts)
    }
}

#[derive(Clone)]
pub struct Tracker {
    store: StoreClient,
    ai: Option<ReceiptAI>,
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker").finish_non_exhaustive()
    }
}

impl Tracker {
    pub fn new(store: StoreClient, ai: Option<ReceiptAI>) -> Self {
        Self { store, ai }
    }

    pub fn store(&self) -> &StoreClient {
        &self.store
    }

    /// The model client, or a configuration error when none is set up
    pub fn ai(&self) -> Result<&ReceiptAI> {
        self.ai.as_ref().ok_or_else(|| {
            Error::Config(
                "AI backend not configured. Set GEMINI_API_KEY (or AI_BACKEND=mock)".into(),
            )
        })
    }

    /// Extract purchase data from image bytes (not saved)
    pub async fn capture(&self, image: &[u8]) -> Result<ReceiptInput> {
        self.ai()?.analyze_receipt_bytes(image).await
    }

    /// Read an image file and extract purchase data (not saved)
    pub async fn capture_file(&self, path: &Path) -> Result<ReceiptInput> {
        let image = read_image(path)?;
        info!(path = %path.display(), bytes = image.len(), "Analyzing receipt image");
        self.capture(&image).await
    }

    /// Persist extracted data
    pub async fn save(&self, input: &ReceiptInput) -> Result<Receipt> {
        self.store.add_receipt(input).await
    }

    /// Receipts of a month, newest first
    pub async fn month_receipts(
        &self,
        month: MonthKey,
        category: Option<Category>,
    ) -> Result<Vec<Receipt>> {
        let filter = ReceiptFilter::for_month(month).category(category);
        self.store.list_receipts(&filter).await
    }

    /// Receipts and per-category totals of a month
    pub async fn month_report(&self, month: MonthKey) -> Result<MonthReport> {
        let receipts = self.month_receipts(month, None).await?;
        let summary = MonthlySummary::from_receipts(month, &receipts);
        Ok(MonthReport { summary, receipts })
    }

    /// Summarize a month, ask the model for insights and save them
    pub async fn generate_insights(&self, month: MonthKey) -> Result<Insight> {
        let ai = self.ai()?;
        let report = self.month_report(month).await?;
        if report.summary.is_empty() {
            warn!(month = %month, "Generating insights for a month without receipts");
        }

        let text = ai
            .generate_insights_from_summary(&report.summary.to_prompt_json())
            .await?;
        if text.trim().is_empty() {
            return Err(Error::Model("Model returned no insights".into()));
        }

        self.store.add_insight(text.trim(), month).await
    }

    /// Stored insights, newest first
    pub async fn insight_history(&self, month: Option<MonthKey>) -> Result<Vec<Insight>> {
        self.store.list_insights(month).await
    }
}

/// Read an image, reporting unreadable files as permission problems
fn read_image(path: &Path) -> Result<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(Error::PermissionDenied(
            format!("cannot read {}", path.display()),
        )),
        Err(e) => Err(Error::Io(e)),
    }
}
