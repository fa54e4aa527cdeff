//! SQLite document store with connection pooling and migrations
//!
//! Mirrors the Firestore collections as two tables. `created_at` is filled by
//! a column default, the local stand-in for a server timestamp.

use std::path::Path;

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tracing::{debug, info};

use super::{auto_id, DocumentStore, InsightRecord, ReceiptFilter, ReceiptRecord};
use crate::error::Result;
use crate::models::{iso_now, Insight, Receipt, ReceiptInput};
use crate::month::MonthKey;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// SQLite-backed store
#[derive(Clone)]
pub struct LocalStore {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl LocalStore {
    /// Open (or create) a database file and run migrations
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(4).build(manager)?;

        let store = Self {
            pool,
            db_path: path.display().to_string(),
        };
        store.run_migrations()?;

        info!(path = %store.db_path, "Opened local store");
        Ok(store)
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because every pooled
    /// connection to `:memory:` would see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "cupom_test_{}_{}.db",
            std::process::id(),
            id
        ));

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::open(&path)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block writers
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS receipts (
                id TEXT PRIMARY KEY,
                total REAL,
                date_time TEXT,
                merchant TEXT,
                category TEXT,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_receipts_date_time ON receipts(date_time);
            CREATE INDEX IF NOT EXISTS idx_receipts_category ON receipts(category, date_time);

            CREATE TABLE IF NOT EXISTS insights (
                id TEXT PRIMARY KEY,
                text TEXT,
                month TEXT,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_insights_month ON insights(month, created_at);
            "#,
        )?;

        Ok(())
    }

    fn insert_receipt(&self, input: &ReceiptInput) -> Result<Receipt> {
        let conn = self.conn()?;
        let id = auto_id();

        conn.execute(
            "INSERT INTO receipts (id, total, date_time, merchant, category) VALUES (?, ?, ?, ?, ?)",
            params![
                id,
                input.total,
                input.date_time,
                input.merchant,
                input.category.as_str(),
            ],
        )?;

        info!(id = %id, merchant = %input.merchant, total = input.total, "Saved receipt");
        Ok(Receipt::from_input(id, input.clone(), iso_now()))
    }

    fn query_receipts(&self, filter: &ReceiptFilter) -> Result<Vec<Receipt>> {
        let conn = self.conn()?;
        let sql_filter = filter.to_sql();
        let sql = format!(
            "SELECT id, total, date_time, merchant, category, created_at
             FROM receipts {}
             ORDER BY date_time DESC, created_at DESC",
            sql_filter.where_clause
        );
        debug!(sql = %sql, "Listing receipts");

        let params_refs = sql_filter.params_refs();
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_refs.as_slice(), |row| {
                Ok(ReceiptRecord {
                    id: row.get(0)?,
                    total: row.get(1)?,
                    date_time: row.get(2)?,
                    merchant: row.get(3)?,
                    category: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records
            .into_iter()
            .filter_map(ReceiptRecord::into_receipt)
            .collect())
    }

    fn insert_insight(&self, text: &str, month: MonthKey) -> Result<Insight> {
        let conn = self.conn()?;
        let id = auto_id();

        conn.execute(
            "INSERT INTO insights (id, text, month) VALUES (?, ?, ?)",
            params![id, text, month.to_string()],
        )?;

        info!(id = %id, month = %month, "Saved insight");
        Ok(Insight {
            id,
            month,
            text: text.to_string(),
            created_at: iso_now(),
        })
    }

    fn query_insights(&self, month: Option<MonthKey>) -> Result<Vec<Insight>> {
        let conn = self.conn()?;

        let mut sql = String::from("SELECT id, text, month, created_at FROM insights");
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(month) = month {
            sql.push_str(" WHERE month = ?");
            params_vec.push(Box::new(month.to_string()));
        }
        sql.push_str(" ORDER BY created_at DESC, rowid DESC");

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_refs.as_slice(), |row| {
                Ok(InsightRecord {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    month: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records
            .into_iter()
            .filter_map(InsightRecord::into_insight)
            .collect())
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn add_receipt(&self, input: &ReceiptInput) -> Result<Receipt> {
        self.insert_receipt(input)
    }

    async fn list_receipts(&self, filter: &ReceiptFilter) -> Result<Vec<Receipt>> {
        self.query_receipts(filter)
    }

    async fn add_insight(&self, text: &str, month: MonthKey) -> Result<Insight> {
        self.insert_insight(text, month)
    }

    async fn list_insights(&self, month: Option<MonthKey>) -> Result<Vec<Insight>> {
        self.query_insights(month)
    }

    fn location(&self) -> String {
        self.db_path.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;

    fn input(date_time: &str, merchant: &str, category: Category, total: f64) -> ReceiptInput {
        ReceiptInput {
            total,
            date_time: date_time.to_string(),
            merchant: merchant.to_string(),
            category,
        }
    }

    fn march() -> MonthKey {
        MonthKey::new(2025, 3).unwrap()
    }

    #[tokio::test]
    async fn test_add_then_list_by_month() {
        let store = LocalStore::in_memory().unwrap();
        let saved = store
            .add_receipt(&input("2025-03-10T12:00:00.000Z", "Padaria", Category::Alimentacao, 9.5))
            .await
            .unwrap();

        assert_eq!(saved.id.len(), 20);
        assert_eq!(saved.merchant, "Padaria");

        let listed = store
            .list_receipts(&ReceiptFilter::for_month(march()))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, saved.id);
        assert_eq!(listed[0].input(), saved.input());
        assert!(listed[0].created_at.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_month_filter_and_order() {
        let store = LocalStore::in_memory().unwrap();
        for (date, merchant) in [
            ("2025-02-28T23:59:59.999Z", "Fevereiro"),
            ("2025-03-01T00:00:00.000Z", "Primeiro"),
            ("2025-03-20T08:00:00.000Z", "Meio"),
            ("2025-03-31T23:59:59.000Z", "Ultimo"),
            ("2025-04-01T00:00:00.000Z", "Abril"),
        ] {
            store
                .add_receipt(&input(date, merchant, Category::Outros, 1.0))
                .await
                .unwrap();
        }

        let listed = store
            .list_receipts(&ReceiptFilter::for_month(march()))
            .await
            .unwrap();
        let merchants: Vec<&str> = listed.iter().map(|r| r.merchant.as_str()).collect();
        assert_eq!(merchants, vec!["Ultimo", "Meio", "Primeiro"]);

        let all = store.list_receipts(&ReceiptFilter::new()).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].merchant, "Abril");
    }

    #[tokio::test]
    async fn test_category_filter() {
        let store = LocalStore::in_memory().unwrap();
        store
            .add_receipt(&input("2025-03-05T10:00:00.000Z", "Uber", Category::Transporte, 20.0))
            .await
            .unwrap();
        store
            .add_receipt(&input("2025-03-06T10:00:00.000Z", "Cinema", Category::Lazer, 30.0))
            .await
            .unwrap();

        let filter = ReceiptFilter::for_month(march()).category(Some(Category::Lazer));
        let listed = store.list_receipts(&filter).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].merchant, "Cinema");
    }

    #[tokio::test]
    async fn test_incomplete_rows_are_skipped() {
        let store = LocalStore::in_memory().unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO receipts (id, total, date_time) VALUES ('broken', 5, '2025-03-02T00:00:00.000Z')",
                [],
            )
            .unwrap();
        store
            .add_receipt(&input("2025-03-03T00:00:00.000Z", "Ok", Category::Saude, 5.0))
            .await
            .unwrap();

        let listed = store
            .list_receipts(&ReceiptFilter::for_month(march()))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].merchant, "Ok");
    }

    #[tokio::test]
    async fn test_insights_newest_first_with_month_filter() {
        let store = LocalStore::in_memory().unwrap();
        let february = march().prev();

        store.add_insight("antigo", march()).await.unwrap();
        store.add_insight("fevereiro", february).await.unwrap();
        let newest = store.add_insight("novo", march()).await.unwrap();
        assert_eq!(newest.month, march());

        let march_insights = store.list_insights(Some(march())).await.unwrap();
        let texts: Vec<&str> = march_insights.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["novo", "antigo"]);

        let all = store.list_insights(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].text, "novo");
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cupom.db");
        let store = LocalStore::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), path.display().to_string());
    }
}
