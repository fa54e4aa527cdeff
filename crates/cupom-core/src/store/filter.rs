//! Receipt filter builder
//!
//! One filter drives both backends: the SQLite store turns it into a WHERE
//! clause, the Firestore store into structured-query field filters.

use crate::category::Category;
use crate::month::MonthKey;

/// Optional month and category restrictions for a receipt listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiptFilter {
    pub month: Option<MonthKey>,
    pub category: Option<Category>,
}

/// SQL components built from a filter
pub struct SqlFilter {
    /// WHERE clause including "WHERE" keyword (empty if no conditions)
    pub where_clause: String,
    /// Parameters for the query (boxed for rusqlite compatibility)
    pub params: Vec<Box<dyn rusqlite::ToSql>>,
}

impl SqlFilter {
    /// Get parameter references for query execution
    pub fn params_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}

impl ReceiptFilter {
    /// Create a new filter builder (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Shortcut for a single month
    pub fn for_month(month: MonthKey) -> Self {
        Self::new().month(Some(month))
    }

    /// Set month filter
    pub fn month(mut self, month: Option<MonthKey>) -> Self {
        self.month = month;
        self
    }

    /// Set category filter
    pub fn category(mut self, category: Option<Category>) -> Self {
        self.category = category;
        self
    }

    /// Half-open range on the ISO `dateTime` string:
    /// `["YYYY-MM-01", first day of the next month)`
    pub fn date_bounds(&self) -> Option<(String, String)> {
        self.month
            .map(|month| (month.first_day(), month.next().first_day()))
    }

    /// Build the SQL components for the `receipts` table
    pub fn to_sql(&self) -> SqlFilter {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some((start, end)) = self.date_bounds() {
            conditions.push("date_time >= ?");
            conditions.push("date_time < ?");
            params.push(Box::new(start));
            params.push(Box::new(end));
        }

        if let Some(category) = self.category {
            conditions.push("category = ?");
            params.push(Box::new(category.as_str()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        SqlFilter {
            where_clause,
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter() {
        let sql = ReceiptFilter::new().to_sql();
        assert!(sql.where_clause.is_empty());
        assert!(sql.params.is_empty());
        assert_eq!(ReceiptFilter::new().date_bounds(), None);
    }

    #[test]
    fn test_month_bounds_are_half_open() {
        let march = ReceiptFilter::for_month(MonthKey::new(2025, 3).unwrap());
        assert_eq!(
            march.date_bounds(),
            Some(("2025-03-01".to_string(), "2025-04-01".to_string()))
        );

        let december = ReceiptFilter::for_month(MonthKey::new(2024, 12).unwrap());
        assert_eq!(
            december.date_bounds(),
            Some(("2024-12-01".to_string(), "2025-01-01".to_string()))
        );
    }

    #[test]
    fn test_bounds_on_iso_strings() {
        let (start, end) = ReceiptFilter::for_month(MonthKey::new(2025, 3).unwrap())
            .date_bounds()
            .unwrap();
        let inside = ["2025-03-01T00:00:00.000Z", "2025-03-31T23:59:59.999Z"];
        let outside = ["2025-02-28T23:59:59.999Z", "2025-04-01T00:00:00.000Z"];

        for date in inside {
            assert!(date >= start.as_str() && date < end.as_str(), "{}", date);
        }
        for date in outside {
            assert!(!(date >= start.as_str() && date < end.as_str()), "{}", date);
        }
    }

    #[test]
    fn test_month_and_category_sql() {
        let sql = ReceiptFilter::for_month(MonthKey::new(2025, 3).unwrap())
            .category(Some(Category::Lazer))
            .to_sql();
        assert_eq!(
            sql.where_clause,
            "WHERE date_time >= ? AND date_time < ? AND category = ?"
        );
        assert_eq!(sql.params_refs().len(), 3);
    }
}
