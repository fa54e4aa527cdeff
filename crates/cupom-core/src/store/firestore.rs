//! Firestore document store (REST v1)
//!
//! Writes go through `documents:commit` so the server can stamp `createdAt`
//! with its own clock (`REQUEST_TIME` transform). Reads use
//! `documents:runQuery` with a structured query built from the filter.
//!
//! # Configuration
//!
//! - `FIRESTORE_PROJECT_ID`: Project id (required)
//! - `FIRESTORE_API_KEY`: Web API key, sent as `key=` (optional)
//! - `FIRESTORE_AUTH_TOKEN`: OAuth bearer token (optional)
//! - `FIRESTORE_EMULATOR_HOST`: `host:port` of a local emulator (optional)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::{
    auto_id, DocumentStore, InsightRecord, ReceiptFilter, ReceiptRecord, INSIGHTS_COLLECTION,
    RECEIPTS_COLLECTION,
};
use crate::config::FirestoreConfig;
use crate::error::{Error, Result};
use crate::models::{iso_now, Insight, Receipt, ReceiptInput};
use crate::month::MonthKey;

/// Firestore REST client for the receipts and insights collections
#[derive(Clone)]
pub struct FirestoreStore {
    http_client: Client,
    base_url: String,
    project_id: String,
    database: String,
    api_key: Option<String>,
    auth_token: Option<String>,
}

impl FirestoreStore {
    /// Create a client for a project's default database
    pub fn new(base_url: &str, project_id: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            database: crate::config::DEFAULT_FIRESTORE_DATABASE.to_string(),
            api_key: None,
            auth_token: None,
        }
    }

    /// Build from configuration; the project id is required
    pub fn from_config(config: &FirestoreConfig) -> Result<Self> {
        let project_id = config
            .project_id
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "Firestore project not configured. Set FIRESTORE_PROJECT_ID \
                     or store.firestore.project_id"
                        .into(),
                )
            })?;

        let mut store = Self::new(&config.effective_base_url(), project_id)
            .with_database(&config.database)
            .with_api_key(config.api_key.clone())
            .with_auth_token(config.auth_token.clone());

        if let Some(secs) = config.timeout_secs {
            store.http_client = Client::builder()
                .timeout(Duration::from_secs(secs))
                .build()?;
        }
        Ok(store)
    }

    pub fn with_database(mut self, database: &str) -> Self {
        self.database = database.to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token.filter(|t| !t.is_empty());
        self
    }

    /// `projects/{project}/databases/{database}/documents`
    fn documents_path(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project_id, self.database
        )
    }

    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.documents_path(), collection, id)
    }

    /// POST to `{documents}:{method}` and return the JSON body
    async fn call(&self, method: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/v1/{}:{}", self.base_url, self.documents_path(), method);

        let mut request = self.http_client.post(&url).json(body);
        if let Some(ref key) = self.api_key {
            request = request.query(&[("key", key)]);
        }
        if let Some(ref token) = self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    Error::Store(format!("Firestore denied {}: {}", method, message))
                }
                _ => Error::Store(format!("Firestore {} failed ({}): {}", method, status, message)),
            });
        }

        Ok(response.json().await?)
    }

    /// Create a document with a fresh id and a server-side `createdAt`
    async fn create(&self, collection: &str, fields: Map<String, Value>) -> Result<String> {
        let id = auto_id();
        let body = commit_body(&self.document_name(collection, &id), fields);
        self.call("commit", &body).await?;
        Ok(id)
    }

    /// Run a structured query and return the documents it matched
    async fn run_query(&self, structured_query: Value) -> Result<Vec<Value>> {
        debug!(query = %structured_query, "Running Firestore query");
        let body = json!({ "structuredQuery": structured_query });
        let response = self.call("runQuery", &body).await?;

        Ok(match response {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|mut item| item.get_mut("document").map(Value::take))
                .collect(),
            _ => Vec::new(),
        })
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn add_receipt(&self, input: &ReceiptInput) -> Result<Receipt> {
        let id = self.create(RECEIPTS_COLLECTION, receipt_fields(input)).await?;
        info!(id = %id, merchant = %input.merchant, total = input.total, "Saved receipt");
        Ok(Receipt::from_input(id, input.clone(), iso_now()))
    }

    async fn list_receipts(&self, filter: &ReceiptFilter) -> Result<Vec<Receipt>> {
        let documents = self.run_query(receipts_query(filter)).await?;
        Ok(documents
            .iter()
            .filter_map(decode_receipt)
            .filter_map(ReceiptRecord::into_receipt)
            .collect())
    }

    async fn add_insight(&self, text: &str, month: MonthKey) -> Result<Insight> {
        let id = self.create(INSIGHTS_COLLECTION, insight_fields(text, month)).await?;
        info!(id = %id, month = %month, "Saved insight");
        Ok(Insight {
            id,
            month,
            text: text.to_string(),
            created_at: iso_now(),
        })
    }

    async fn list_insights(&self, month: Option<MonthKey>) -> Result<Vec<Insight>> {
        let documents = self.run_query(insights_query(month)).await?;
        Ok(documents
            .iter()
            .filter_map(decode_insight)
            .filter_map(InsightRecord::into_insight)
            .collect())
    }

    fn location(&self) -> String {
        format!("{} ({})", self.base_url, self.documents_path())
    }
}

fn string_value(value: &str) -> Value {
    json!({ "stringValue": value })
}

fn receipt_fields(input: &ReceiptInput) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("total".into(), json!({ "doubleValue": input.total }));
    fields.insert("dateTime".into(), string_value(&input.date_time));
    fields.insert("merchant".into(), string_value(&input.merchant));
    fields.insert("category".into(), string_value(input.category.as_str()));
    fields
}

fn insight_fields(text: &str, month: MonthKey) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("text".into(), string_value(text));
    fields.insert("month".into(), string_value(&month.to_string()));
    fields
}

/// A create-only write with `createdAt` set to the server's request time
fn commit_body(name: &str, fields: Map<String, Value>) -> Value {
    json!({
        "writes": [{
            "update": { "name": name, "fields": fields },
            "currentDocument": { "exists": false },
            "updateTransforms": [{
                "fieldPath": "createdAt",
                "setToServerValue": "REQUEST_TIME"
            }]
        }]
    })
}

fn field_filter(field: &str, op: &str, value: Value) -> Value {
    json!({
        "fieldFilter": {
            "field": { "fieldPath": field },
            "op": op,
            "value": value
        }
    })
}

/// Single filters are sent bare; several are combined with AND
fn combine_filters(mut filters: Vec<Value>) -> Option<Value> {
    match filters.len() {
        0 => None,
        1 => filters.pop(),
        _ => Some(json!({
            "compositeFilter": { "op": "AND", "filters": filters }
        })),
    }
}

fn structured_query(collection: &str, filters: Vec<Value>, order_by: &str) -> Value {
    let mut query = json!({
        "from": [{ "collectionId": collection }],
        "orderBy": [{
            "field": { "fieldPath": order_by },
            "direction": "DESCENDING"
        }]
    });
    if let Some(filter) = combine_filters(filters) {
        query["where"] = filter;
    }
    query
}

fn receipts_query(filter: &ReceiptFilter) -> Value {
    let mut filters = Vec::new();
    if let Some((start, end)) = filter.date_bounds() {
        filters.push(field_filter(
            "dateTime",
            "GREATER_THAN_OR_EQUAL",
            string_value(&start),
        ));
        filters.push(field_filter("dateTime", "LESS_THAN", string_value(&end)));
    }
    if let Some(category) = filter.category {
        filters.push(field_filter("category", "EQUAL", string_value(category.as_str())));
    }
    structured_query(RECEIPTS_COLLECTION, filters, "dateTime")
}

fn insights_query(month: Option<MonthKey>) -> Value {
    let filters = month
        .map(|m| vec![field_filter("month", "EQUAL", string_value(&m.to_string()))])
        .unwrap_or_default();
    structured_query(INSIGHTS_COLLECTION, filters, "createdAt")
}

/// Last path segment of a document name
fn document_id(document: &Value) -> Option<String> {
    document["name"]
        .as_str()
        .and_then(|name| name.rsplit('/').next())
        .map(String::from)
}

/// Text of a string or timestamp value
fn read_text(fields: &Value, key: &str) -> Option<String> {
    let value = &fields[key];
    value["stringValue"]
        .as_str()
        .or_else(|| value["timestampValue"].as_str())
        .map(String::from)
}

/// Numeric value; Firestore sends 64-bit integers as strings
fn read_number(fields: &Value, key: &str) -> Option<f64> {
    let value = &fields[key];
    if let Some(n) = value["doubleValue"].as_f64() {
        return Some(n);
    }
    match &value["integerValue"] {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => value["stringValue"]
            .as_str()
            .and_then(|s| s.trim().parse().ok()),
    }
}

fn decode_receipt(document: &Value) -> Option<ReceiptRecord> {
    let fields = &document["fields"];
    Some(ReceiptRecord {
        id: document_id(document)?,
        total: read_number(fields, "total"),
        date_time: read_text(fields, "dateTime"),
        merchant: read_text(fields, "merchant"),
        category: read_text(fields, "category"),
        created_at: read_text(fields, "createdAt"),
    })
}

fn decode_insight(document: &Value) -> Option<InsightRecord> {
    let fields = &document["fields"];
    Some(InsightRecord {
        id: document_id(document)?,
        text: read_text(fields, "text"),
        month: read_text(fields, "month"),
        created_at: read_text(fields, "createdAt"),
    })
}

/// Pull `error.message` out of a Google API error body (object or array form)
fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| match v {
            Value::Array(items) => items.first(),
            other => Some(other),
        })
        .and_then(|v| v["error"]["message"].as_str())
        .map(String::from)
        .unwrap_or_else(|| body.trim().to_string())
}
