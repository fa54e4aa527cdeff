//! Document persistence for receipts and insights
//!
//! - `DocumentStore` trait: the four collection operations
//! - `StoreClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backends: `FirestoreStore` (Firestore REST v1), `LocalStore` (SQLite)
//!
//! Documents read back from either backend pass through [`ReceiptRecord`] /
//! [`InsightRecord`], which fill defaults and drop documents that cannot be
//! turned into typed values.

mod filter;
mod firestore;
mod local;

pub use filter::{ReceiptFilter, SqlFilter};
pub use firestore::FirestoreStore;
pub use local::LocalStore;

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::warn;

use crate::category::category_from_stored;
use crate::config::{StoreConfig, StoreKind};
use crate::error::Result;
use crate::models::{iso_now, to_iso, Insight, Receipt, ReceiptInput};
use crate::month::{parse_iso_datetime, MonthKey};

/// Collection holding receipts
pub const RECEIPTS_COLLECTION: &str = "receipts";
/// Collection holding generated insights
pub const INSIGHTS_COLLECTION: &str = "insights";

const AUTO_ID_LEN: usize = 20;

/// Trait defining the persistence operations
///
/// Each call is a single round trip; there is no cache, offline queue or retry.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Save a receipt with a store-assigned `createdAt`
    ///
    /// The returned receipt carries the new id and a client-side "now" as
    /// `created_at`; the stored server timestamp is not read back.
    async fn add_receipt(&self, input: &ReceiptInput) -> Result<Receipt>;

    /// List receipts, newest `dateTime` first
    async fn list_receipts(&self, filter: &ReceiptFilter) -> Result<Vec<Receipt>>;

    /// Save an insight for a month
    async fn add_insight(&self, text: &str, month: MonthKey) -> Result<Insight>;

    /// List insights, newest `createdAt` first, optionally for one month
    async fn list_insights(&self, month: Option<MonthKey>) -> Result<Vec<Insight>>;

    /// Human-readable location (for status output and logs)
    fn location(&self) -> String;
}

/// Concrete store enum
#[derive(Clone)]
pub enum StoreClient {
    Firestore(FirestoreStore),
    Local(LocalStore),
}

impl StoreClient {
    /// Open the configured backend
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        match config.backend {
            StoreKind::Firestore => {
                Ok(StoreClient::Firestore(FirestoreStore::from_config(&config.firestore)?))
            }
            StoreKind::Local => Ok(StoreClient::Local(LocalStore::open(
                &config.local.resolved_path(),
            )?)),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            StoreClient::Firestore(_) => StoreKind::Firestore.as_str(),
            StoreClient::Local(_) => StoreKind::Local.as_str(),
        }
    }
}

#[async_trait]
impl DocumentStore for StoreClient {
    async fn add_receipt(&self, input: &ReceiptInput) -> Result<Receipt> {
        match self {
            StoreClient::Firestore(s) => s.add_receipt(input).await,
            StoreClient::Local(s) => s.add_receipt(input).await,
        }
    }

    async fn list_receipts(&self, filter: &ReceiptFilter) -> Result<Vec<Receipt>> {
        match self {
            StoreClient::Firestore(s) => s.list_receipts(filter).await,
            StoreClient::Local(s) => s.list_receipts(filter).await,
        }
    }

    async fn add_insight(&self, text: &str, month: MonthKey) -> Result<Insight> {
        match self {
            StoreClient::Firestore(s) => s.add_insight(text, month).await,
            StoreClient::Local(s) => s.add_insight(text, month).await,
        }
    }

    async fn list_insights(&self, month: Option<MonthKey>) -> Result<Vec<Insight>> {
        match self {
            StoreClient::Firestore(s) => s.list_insights(month).await,
            StoreClient::Local(s) => s.list_insights(month).await,
        }
    }

    fn location(&self) -> String {
        match self {
            StoreClient::Firestore(s) => s.location(),
            StoreClient::Local(s) => s.location(),
        }
    }
}

/// Random 20-character alphanumeric document id
pub fn auto_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(AUTO_ID_LEN)
        .map(char::from)
        .collect()
}

/// A receipt document as read from a backend, before validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiptRecord {
    pub id: String,
    pub total: Option<f64>,
    pub date_time: Option<String>,
    pub merchant: Option<String>,
    pub category: Option<String>,
    pub created_at: Option<String>,
}

impl ReceiptRecord {
    /// Typed receipt, or `None` (with a warning) when `dateTime` or
    /// `merchant` is missing
    pub fn into_receipt(self) -> Option<Receipt> {
        let (Some(date_time), Some(merchant)) = (self.date_time, self.merchant) else {
            warn!(id = %self.id, "Skipping receipt document without dateTime or merchant");
            return None;
        };

        Some(Receipt {
            id: self.id,
            total: self
                .total
                .filter(|t| t.is_finite() && *t >= 0.0)
                .unwrap_or(0.0),
            date_time,
            merchant,
            category: category_from_stored(self.category.as_deref().unwrap_or_default()),
            created_at: normalize_timestamp(self.created_at),
        })
    }
}

/// An insight document as read from a backend, before validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsightRecord {
    pub id: String,
    pub text: Option<String>,
    pub month: Option<String>,
    pub created_at: Option<String>,
}

impl InsightRecord {
    /// Typed insight, or `None` (with a warning) when `text` or a valid
    /// `month` is missing
    pub fn into_insight(self) -> Option<Insight> {
        let month = self.month.as_deref().and_then(|m| m.parse::<MonthKey>().ok());
        let (Some(text), Some(month)) = (self.text, month) else {
            warn!(id = %self.id, "Skipping insight document without text or month");
            return None;
        };

        Some(Insight {
            id: self.id,
            month,
            text,
            created_at: normalize_timestamp(self.created_at),
        })
    }
}

/// Re-emit a stored timestamp in receipt format, `now` when absent
fn normalize_timestamp(value: Option<String>) -> String {
    match value {
        Some(raw) => parse_iso_datetime(&raw)
            .map(|dt| to_iso(&dt))
            .unwrap_or(raw),
        None => iso_now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;

    fn full_record() -> ReceiptRecord {
        ReceiptRecord {
            id: "abc".into(),
            total: Some(12.5),
            date_time: Some("2025-03-02T10:00:00.000Z".into()),
            merchant: Some("Padaria".into()),
            category: Some("alimentacao".into()),
            created_at: Some("2025-03-02T10:00:05.123456Z".into()),
        }
    }

    #[test]
    fn test_auto_id_shape() {
        let id = auto_id();
        assert_eq!(id.len(), 20);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(auto_id(), id);
    }

    #[test]
    fn test_receipt_record_decodes() {
        let receipt = full_record().into_receipt().unwrap();
        assert_eq!(receipt.id, "abc");
        assert_eq!(receipt.total, 12.5);
        assert_eq!(receipt.category, Category::Alimentacao);
        assert_eq!(receipt.created_at, "2025-03-02T10:00:05.123Z");
    }

    #[test]
    fn test_receipt_record_defaults() {
        let receipt = ReceiptRecord {
            total: None,
            category: Some("Supermercado Dia".into()),
            created_at: None,
            ..full_record()
        }
        .into_receipt()
        .unwrap();

        assert_eq!(receipt.total, 0.0);
        assert_eq!(receipt.category, Category::Mercado);
        assert!(receipt.created_at.ends_with('Z'));

        let negative = ReceiptRecord {
            total: Some(-1.0),
            ..full_record()
        };
        assert_eq!(negative.into_receipt().unwrap().total, 0.0);
    }

    #[test]
    fn test_incomplete_receipts_are_skipped() {
        let no_date = ReceiptRecord {
            date_time: None,
            ..full_record()
        };
        assert!(no_date.into_receipt().is_none());

        let no_merchant = ReceiptRecord {
            merchant: None,
            ..full_record()
        };
        assert!(no_merchant.into_receipt().is_none());
    }

    #[test]
    fn test_insight_record() {
        let record = InsightRecord {
            id: "i1".into(),
            text: Some("Gastou menos".into()),
            month: Some("2025-03".into()),
            created_at: Some("2025-03-31T12:00:00Z".into()),
        };
        let insight = record.clone().into_insight().unwrap();
        assert_eq!(insight.month.to_string(), "2025-03");
        assert_eq!(insight.created_at, "2025-03-31T12:00:00.000Z");

        let bad_month = InsightRecord {
            month: Some("março".into()),
            ..record.clone()
        };
        assert!(bad_month.into_insight().is_none());

        let no_text = InsightRecord {
            text: None,
            ..record
        };
        assert!(no_text.into_insight().is_none());
    }
}
