//! Record store seam and the Airtable implementation.
//!
//! The store holds one row per technology. The loop takes one full snapshot
//! per run (`list_all`) and writes back individual field groups via partial
//! updates; untouched columns keep their prior values.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::error::{EnrichError, EnrichResult};

const AIRTABLE_API_BASE: &str = "https://api.airtable.com/v0";

/// One stored row, as it travels on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: String,
    #[serde(rename = "createdTime")]
    pub created_at: DateTime<Utc>,
    pub fields: Map<String, Value>,
}

/// Store contract: full snapshot plus partial field updates by record id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All records, in store order. One snapshot per run; no delta fetch.
    async fn list_all(&self) -> EnrichResult<Vec<RawRecord>>;

    /// Partial update: only the named fields are touched.
    async fn update(&self, id: &str, fields: Map<String, Value>) -> EnrichResult<()>;
}

// ---------------------------------------------------------------------------
// Airtable client
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ListResponse {
    records: Vec<RawRecord>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Serialize)]
struct UpdateRequest<'a> {
    fields: &'a Map<String, Value>,
}

/// Thin client for the Airtable records API.
pub struct AirtableStore {
    token: String,
    table_url: String,
    client: reqwest::Client,
}

impl AirtableStore {
    pub fn new(token: &str, base: &str, table: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            token: token.trim().to_string(),
            table_url: format!("{}/{}/{}", AIRTABLE_API_BASE, base, table),
            client,
        }
    }

    async fn check(res: reqwest::Response, action: &str) -> EnrichResult<reqwest::Response> {
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(EnrichError::Store(format!(
                "{} returned {}: {}",
                action, status, body
            )));
        }
        Ok(res)
    }
}

#[async_trait]
impl RecordStore for AirtableStore {
    async fn list_all(&self) -> EnrichResult<Vec<RawRecord>> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;
        // Airtable pages at 100 records; follow the offset cursor until exhausted.
        loop {
            let mut req = self
                .client
                .get(&self.table_url)
                .bearer_auth(&self.token);
            if let Some(ref cursor) = offset {
                req = req.query(&[("offset", cursor)]);
            }
            let res = Self::check(req.send().await?, "list").await?;
            let page: ListResponse = res.json().await?;
            records.extend(page.records);
            match page.offset {
                Some(cursor) => offset = Some(cursor),
                None => break,
            }
        }
        tracing::debug!(target: "tbr::store", count = records.len(), "record snapshot fetched");
        Ok(records)
    }

    async fn update(&self, id: &str, fields: Map<String, Value>) -> EnrichResult<()> {
        let url = format!("{}/{}", self.table_url, id);
        let res = self
            .client
            .patch(&url)
            .bearer_auth(&self.token)
            .json(&UpdateRequest { fields: &fields })
            .send()
            .await?;
        Self::check(res, "update").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_record_wire_shape() {
        let json = r#"{
            "id": "recXYZ",
            "createdTime": "2020-02-26T00:00:00.000Z",
            "fields": { "name": "CRISPR", "year": 2016, "blurb": "gene editing" }
        }"#;
        let rec: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.id, "recXYZ");
        assert_eq!(rec.fields.get("name").unwrap(), "CRISPR");
        assert_eq!(rec.fields.get("year").unwrap().as_i64(), Some(2016));
    }
}
