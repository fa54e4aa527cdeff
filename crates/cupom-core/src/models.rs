//! Domain models for receipts and insights

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::month::MonthKey;

/// Merchant name used when the model could not read one
pub const UNKNOWN_MERCHANT: &str = "Desconhecido";

/// Purchase data extracted from a receipt, before it is saved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptInput {
    /// Purchase total, never negative
    pub total: f64,
    /// ISO-8601 timestamp of the purchase (UTC, millisecond precision)
    pub date_time: String,
    pub merchant: String,
    pub category: Category,
}

/// A saved receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Store-assigned identifier
    pub id: String,
    pub total: f64,
    pub date_time: String,
    pub merchant: String,
    pub category: Category,
    /// ISO-8601 creation timestamp
    pub created_at: String,
}

impl Receipt {
    /// Merge input data with the identifier and timestamp assigned on save
    pub fn from_input(id: String, input: ReceiptInput, created_at: String) -> Self {
        Self {
            id,
            total: input.total,
            date_time: input.date_time,
            merchant: input.merchant,
            category: input.category,
            created_at,
        }
    }

    /// The purchase data without store metadata
    pub fn input(&self) -> ReceiptInput {
        ReceiptInput {
            total: self.total,
            date_time: self.date_time.clone(),
            merchant: self.merchant.clone(),
            category: self.category,
        }
    }
}

/// AI-generated narrative about one month of spending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub id: String,
    pub month: MonthKey,
    pub text: String,
    pub created_at: String,
}

/// Format a timestamp the way receipts store it: `2025-03-01T10:00:00.000Z`
pub fn to_iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current instant in receipt timestamp format
pub fn iso_now() -> String {
    to_iso(&Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_input_wire_form() {
        let input = ReceiptInput {
            total: 45.9,
            date_time: "2025-03-01T10:00:00.000Z".to_string(),
            merchant: "Padaria X".to_string(),
            category: Category::Mercado,
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["dateTime"], "2025-03-01T10:00:00.000Z");
        assert_eq!(json["category"], "mercado");
        assert_eq!(json["total"], 45.9);
    }

    #[test]
    fn test_receipt_from_input_round_trips_input() {
        let input = ReceiptInput {
            total: 12.0,
            date_time: "2025-03-02T08:00:00.000Z".to_string(),
            merchant: "Uber".to_string(),
            category: Category::Transporte,
        };
        let receipt = Receipt::from_input("abc".into(), input.clone(), iso_now());
        assert_eq!(receipt.id, "abc");
        assert_eq!(receipt.input(), input);
    }

    #[test]
    fn test_iso_format_has_millis_and_z() {
        let dt = DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(to_iso(&dt), "2025-03-01T10:00:00.000Z");
        assert!(iso_now().ends_with('Z'));
    }
}
