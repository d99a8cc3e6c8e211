//! Client for the hosted document store (Firestore REST API).
//!
//! This module provides the `FirestoreClient` for reading the city
//! reference directory, querying registry entries, and submitting new
//! entries. Access is unauthenticated apart from the project API key;
//! the collections are world-readable by design.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::CitySource;
use crate::models::{City, Entry, EntryDraft};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the Firestore REST API
const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Collection holding the city reference directory
const CITIES_COLLECTION: &str = "cities";

/// Collection holding submitted registry entries
const ENTRIES_COLLECTION: &str = "registros";

/// Page size for the city directory read. The reference set is a few
/// hundred documents, so one page covers it.
const CITIES_PAGE_SIZE: u32 = 300;

/// Result cap for entry searches.
pub const DEFAULT_SEARCH_LIMIT: u32 = 50;

// ============================================================================
// Wire format
// ============================================================================

/// A typed Firestore scalar value.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum FireValue {
    #[serde(rename = "stringValue")]
    String(String),
    /// 64-bit integers travel as decimal strings
    #[serde(rename = "integerValue")]
    Integer(String),
    #[serde(rename = "doubleValue")]
    Double(f64),
    #[serde(rename = "booleanValue")]
    Boolean(bool),
    #[serde(rename = "timestampValue")]
    Timestamp(DateTime<Utc>),
    #[serde(rename = "nullValue")]
    Null(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
struct FireDocument {
    /// Full resource name; the last path segment is the document id
    name: String,
    #[serde(default)]
    fields: HashMap<String, FireValue>,
}

impl FireDocument {
    fn doc_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(FireValue::String(s)) => Some(s),
            _ => None,
        }
    }

    fn int_field(&self, key: &str) -> Option<i64> {
        match self.fields.get(key) {
            Some(FireValue::Integer(raw)) => raw.parse().ok(),
            Some(FireValue::Double(d)) => Some(*d as i64),
            _ => None,
        }
    }

    fn time_field(&self, key: &str) -> Option<DateTime<Utc>> {
        match self.fields.get(key) {
            Some(FireValue::Timestamp(ts)) => Some(*ts),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct CreateDocumentBody {
    fields: HashMap<String, FireValue>,
}

#[derive(Debug, Deserialize)]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<FireDocument>,
}

#[derive(Debug, Deserialize)]
struct RunQueryRow {
    document: Option<FireDocument>,
}

fn to_city(doc: &FireDocument) -> Option<City> {
    match (doc.str_field("name"), doc.str_field("province")) {
        (Some(name), Some(province)) => Some(City {
            id: doc.doc_id().to_string(),
            name: name.to_string(),
            province: province.to_string(),
        }),
        _ => {
            warn!(doc = %doc.name, "City document missing required fields");
            None
        }
    }
}

fn to_entry(doc: &FireDocument) -> Option<Entry> {
    let (Some(first_name), Some(last_name), Some(city_id)) = (
        doc.str_field("first_name"),
        doc.str_field("last_name"),
        doc.str_field("city_id"),
    ) else {
        warn!(doc = %doc.name, "Entry document missing required fields");
        return None;
    };

    Some(Entry {
        id: doc.doc_id().to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        city_id: city_id.to_string(),
        description: doc.str_field("description").unwrap_or_default().to_string(),
        age: doc.int_field("age"),
        gender: doc.str_field("gender").map(str::to_string),
        created_at: doc.time_field("created_at"),
    })
}

// ============================================================================
// Client
// ============================================================================

/// Client for the registry's document store.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct FirestoreClient {
    client: Client,
    project_id: String,
    api_key: String,
}

impl FirestoreClient {
    pub fn new(project_id: String, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            project_id,
            api_key,
        })
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            FIRESTORE_BASE_URL, self.project_id
        )
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    // ===== Cities =====

    /// Fetch the whole city reference directory, ordered by name.
    /// The directory fits in a single page, so no pagination loop.
    pub async fn fetch_cities(&self) -> Result<Vec<City>> {
        let url = format!("{}/{}", self.documents_url(), CITIES_COLLECTION);
        let page_size = CITIES_PAGE_SIZE.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("orderBy", "name"),
                ("pageSize", page_size.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("Failed to fetch city directory")?;

        let response = Self::check_response(response).await?;

        let parsed: ListDocumentsResponse = response
            .json()
            .await
            .context("Failed to parse city directory response")?;

        debug!(count = parsed.documents.len(), "City directory response received");
        Ok(parsed.documents.iter().filter_map(to_city).collect())
    }

    // ===== Entries =====

    /// Query registry entries, newest first, optionally filtered to one
    /// city. Term matching over names happens client-side on the returned
    /// page (`Entry::matches_term`).
    pub async fn search_entries(&self, city_id: Option<&str>, limit: u32) -> Result<Vec<Entry>> {
        let mut query = serde_json::json!({
            "from": [{ "collectionId": ENTRIES_COLLECTION }],
            "orderBy": [{ "field": { "fieldPath": "created_at" }, "direction": "DESCENDING" }],
            "limit": limit,
        });

        // The filtered form needs the composite index city_id ASC, created_at DESC
        if let Some(city_id) = city_id {
            query["where"] = serde_json::json!({
                "fieldFilter": {
                    "field": { "fieldPath": "city_id" },
                    "op": "EQUAL",
                    "value": { "stringValue": city_id },
                }
            });
        }

        let url = format!("{}:runQuery", self.documents_url());
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&serde_json::json!({ "structuredQuery": query }))
            .send()
            .await
            .context("Failed to run entry search")?;

        let response = Self::check_response(response).await?;

        let rows: Vec<RunQueryRow> = response
            .json()
            .await
            .context("Failed to parse entry search response")?;

        let entries: Vec<Entry> = rows
            .iter()
            .filter_map(|row| row.document.as_ref())
            .filter_map(to_entry)
            .collect();

        debug!(count = entries.len(), "Entry search returned");
        Ok(entries)
    }

    /// Insert one entry document. Create-only: the registry never updates
    /// or deletes entries from the client.
    pub async fn submit_entry(&self, draft: &EntryDraft) -> Result<String> {
        let mut fields: HashMap<String, FireValue> = HashMap::new();
        fields.insert("first_name".into(), FireValue::String(draft.first_name.clone()));
        fields.insert("last_name".into(), FireValue::String(draft.last_name.clone()));
        fields.insert("search_name".into(), FireValue::String(draft.search_name()));
        fields.insert("age".into(), FireValue::Integer(draft.age.to_string()));
        fields.insert("gender".into(), FireValue::String(draft.gender.clone()));
        fields.insert("city_id".into(), FireValue::String(draft.city_id.clone()));
        fields.insert("description".into(), FireValue::String(draft.description.clone()));
        fields.insert("accepted_terms".into(), FireValue::Boolean(draft.accepted_terms));
        fields.insert("created_at".into(), FireValue::Timestamp(Utc::now()));

        let url = format!("{}/{}", self.documents_url(), ENTRIES_COLLECTION);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&CreateDocumentBody { fields })
            .send()
            .await
            .context("Failed to submit entry")?;

        let response = Self::check_response(response).await?;

        let created: FireDocument = response
            .json()
            .await
            .context("Failed to parse submitted entry response")?;

        Ok(created.doc_id().to_string())
    }
}

#[async_trait::async_trait]
impl CitySource for FirestoreClient {
    async fn fetch_all(&self) -> Result<Vec<City>> {
        self.fetch_cities().await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_doc(value: serde_json::Value) -> FireDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_to_city_reads_fields_and_doc_id() {
        let doc = parse_doc(json!({
            "name": "projects/demo/databases/(default)/documents/cities/pichincha-quito",
            "fields": {
                "name": { "stringValue": "Quito" },
                "province": { "stringValue": "Pichincha" }
            },
            "createTime": "2026-01-01T00:00:00Z",
            "updateTime": "2026-01-01T00:00:00Z"
        }));

        let city = to_city(&doc).unwrap();
        assert_eq!(city.id, "pichincha-quito");
        assert_eq!(city.name, "Quito");
        assert_eq!(city.province, "Pichincha");
    }

    #[test]
    fn test_to_city_skips_incomplete_documents() {
        let doc = parse_doc(json!({
            "name": "projects/demo/databases/(default)/documents/cities/broken",
            "fields": { "name": { "stringValue": "Quito" } }
        }));
        assert!(to_city(&doc).is_none());
    }

    #[test]
    fn test_to_entry_decodes_typed_and_optional_fields() {
        let doc = parse_doc(json!({
            "name": "projects/demo/databases/(default)/documents/registros/abc123",
            "fields": {
                "first_name": { "stringValue": "Juan" },
                "last_name": { "stringValue": "Pérez" },
                "city_id": { "stringValue": "pichincha-quito" },
                "description": { "stringValue": "..." },
                "age": { "integerValue": "33" },
                "accepted_terms": { "booleanValue": true },
                "created_at": { "timestampValue": "2026-08-01T10:00:00Z" }
            }
        }));

        let entry = to_entry(&doc).unwrap();
        assert_eq!(entry.id, "abc123");
        assert_eq!(entry.age, Some(33));
        assert_eq!(entry.gender, None);
        assert_eq!(
            entry.created_at.unwrap(),
            "2026-08-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn test_run_query_rows_without_documents_are_skipped() {
        let rows: Vec<RunQueryRow> = serde_json::from_value(json!([
            { "readTime": "2026-08-01T10:00:00Z" },
            {
                "document": {
                    "name": "projects/demo/databases/(default)/documents/registros/abc123",
                    "fields": {
                        "first_name": { "stringValue": "Juan" },
                        "last_name": { "stringValue": "Pérez" },
                        "city_id": { "stringValue": "pichincha-quito" }
                    }
                },
                "readTime": "2026-08-01T10:00:00Z"
            }
        ]))
        .unwrap();

        let entries: Vec<Entry> = rows
            .iter()
            .filter_map(|row| row.document.as_ref())
            .filter_map(to_entry)
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].first_name, "Juan");
    }

    #[test]
    fn test_fire_value_wire_shapes() {
        assert_eq!(
            serde_json::to_value(FireValue::Integer("33".to_string())).unwrap(),
            json!({ "integerValue": "33" })
        );
        assert_eq!(
            serde_json::to_value(FireValue::Boolean(true)).unwrap(),
            json!({ "booleanValue": true })
        );
        assert_eq!(
            serde_json::to_value(FireValue::String("Quito".to_string())).unwrap(),
            json!({ "stringValue": "Quito" })
        );
    }
}
