//! Monthly spending aggregation
//!
//! Turns one month of receipts into totals per category. The same summary is
//! rendered as bars by the CLI and handed to the model as JSON when generating
//! insights.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::models::Receipt;
use crate::month::MonthKey;

/// Spending in one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpending {
    pub category: Category,
    pub amount: f64,
    pub percentage: f64,
    pub receipt_count: usize,
}

/// Aggregated spending for a month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month: MonthKey,
    pub total: f64,
    #[serde(rename = "byCat")]
    pub by_category: BTreeMap<Category, f64>,
    pub receipt_count: usize,
}

impl MonthlySummary {
    /// Aggregate receipts already filtered to `month`
    pub fn from_receipts(month: MonthKey, receipts: &[Receipt]) -> Self {
        let mut by_category = BTreeMap::new();
        let mut total = 0.0;

        for receipt in receipts {
            let amount = sanitize_amount(receipt.total);
            *by_category.entry(receipt.category).or_insert(0.0) += amount;
            total += amount;
        }

        Self {
            month,
            total,
            by_category,
            receipt_count: receipts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_category.is_empty()
    }

    /// Largest single-category total (0 when empty), used to scale bars
    pub fn max_category_total(&self) -> f64 {
        self.by_category.values().copied().fold(0.0, f64::max)
    }

    /// Per-category breakdown, largest first
    pub fn categories(&self, receipts: &[Receipt]) -> Vec<CategorySpending> {
        let mut spending: Vec<CategorySpending> = self
            .by_category
            .iter()
            .map(|(category, amount)| CategorySpending {
                category: *category,
                amount: *amount,
                percentage: if self.total > 0.0 {
                    amount / self.total * 100.0
                } else {
                    0.0
                },
                receipt_count: receipts.iter().filter(|r| r.category == *category).count(),
            })
            .collect();

        spending.sort_by(|a, b| {
            b.amount
                .partial_cmp(&a.amount)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        spending
    }

    /// Compact JSON handed to the model: `{"month", "total", "byCat"}`
    pub fn to_prompt_json(&self) -> String {
        serde_json::json!({
            "month": self.month.to_string(),
            "total": round_cents(self.total),
            "byCat": self
                .by_category
                .iter()
                .map(|(category, amount)| (category.as_str().to_string(), round_cents(*amount)))
                .collect::<serde_json::Map<String, serde_json::Value>>(),
        })
        .to_string()
    }
}

fn sanitize_amount(amount: f64) -> f64 {
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}

fn round_cents(amount: f64) -> serde_json::Value {
    serde_json::Value::from((amount * 100.0).round() / 100.0)
}
