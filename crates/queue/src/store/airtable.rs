//! Airtable-backed record store.
//!
//! One table row per [`MentionRecord`]. Columns:
//! `Mentioned` (person key), `Student` (author), `Day` (`YYYY-MM-DD`),
//! `Messages` (JSON array of strings), `Timestamp` (first seen, RFC 3339),
//! `Channel`. A row with a single legacy `Message` column decodes as a
//! one-message record, and a row without `Day` takes the UTC date of its
//! `Timestamp`. Queries filter on `Day` and the person key, so such rows
//! only surface when fetched by id.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

use super::{MentionRecord, MentionStore, NewMention};
use crate::error::StoreError;

/// Airtable accepts at most 10 record ids per delete request.
const DELETE_BATCH: usize = 10;
/// Retry hint when Airtable rate limits without saying for how long.
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct QueueFields {
    #[serde(rename = "Mentioned")]
    mentioned: String,
    #[serde(rename = "Student")]
    student: String,
    #[serde(rename = "Day", default, skip_serializing_if = "Option::is_none")]
    day: Option<String>,
    #[serde(rename = "Messages", default, skip_serializing_if = "Option::is_none")]
    messages: Option<String>,
    #[serde(rename = "Message", default, skip_serializing)]
    legacy_message: Option<String>,
    #[serde(rename = "Timestamp")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "Channel", default, skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AirtableRecord {
    id: String,
    fields: QueueFields,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    records: Vec<AirtableRecord>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    records: Vec<DeletedRecord>,
}

#[derive(Debug, Deserialize)]
struct DeletedRecord {
    #[serde(default)]
    deleted: bool,
}

#[derive(Debug, Serialize)]
struct FieldsBody<'a, T> {
    fields: &'a T,
}

#[derive(Debug, Serialize)]
struct MessagesPatch {
    #[serde(rename = "Messages")]
    messages: String,
    #[serde(rename = "Channel")]
    channel: String,
}

impl AirtableRecord {
    fn into_mention(self) -> Result<MentionRecord, StoreError> {
        let AirtableRecord { id, fields } = self;

        let messages = match (&fields.messages, &fields.legacy_message) {
            (Some(json), _) => serde_json::from_str::<Vec<String>>(json).map_err(|e| {
                StoreError::Malformed {
                    id: id.clone(),
                    reason: format!("Messages is not a JSON string array: {e}"),
                }
            })?,
            (None, Some(single)) => vec![single.clone()],
            (None, None) => Vec::new(),
        };

        let day = match &fields.day {
            Some(day) => NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| {
                StoreError::Malformed {
                    id: id.clone(),
                    reason: format!("bad Day '{day}': {e}"),
                }
            })?,
            None => fields.timestamp.date_naive(),
        };

        Ok(MentionRecord {
            id,
            person: fields.mentioned,
            author: fields.student,
            day,
            messages,
            first_seen_at: fields.timestamp,
            source_channel: fields
                .channel
                .unwrap_or_else(|| offhours_core::UNKNOWN_CHANNEL.to_string()),
        })
    }
}

/// Escape a value for use inside a single-quoted Airtable formula string.
fn formula_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn encode_messages(messages: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(messages)
        .map_err(|e| StoreError::Unavailable(format!("failed to encode messages: {e}")))
}

/// Stores mention records in an Airtable table over its REST API.
#[derive(Debug)]
pub struct AirtableStore {
    table_url: Url,
    api_key: String,
    client: reqwest::Client,
}

impl AirtableStore {
    /// `api_base` is usually `https://api.airtable.com/v0`.
    pub fn new(
        api_base: &str,
        base_id: &str,
        table: &str,
        api_key: String,
    ) -> Result<Self, StoreError> {
        if api_key.is_empty() || base_id.is_empty() {
            return Err(StoreError::Unavailable(
                "Airtable API key and base id are required".to_string(),
            ));
        }

        let mut table_url = Url::parse(api_base)
            .map_err(|e| StoreError::Unavailable(format!("invalid Airtable API base: {e}")))?;
        table_url
            .path_segments_mut()
            .map_err(|_| StoreError::Unavailable(format!("Airtable API base cannot be a base URL: {api_base}")))?
            .pop_if_empty()
            .push(base_id)
            .push(table);

        Ok(Self {
            table_url,
            api_key,
            client: reqwest::Client::new(),
        })
    }

    fn record_url(&self, record_id: &str) -> Url {
        let mut url = self.table_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(record_id);
        }
        url
    }

    /// Map non-2xx responses onto store errors.
    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(StoreError::RateLimited {
                retry_after_secs: DEFAULT_RETRY_AFTER_SECS,
            });
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(format!("{what}: {body}")));
        }
        tracing::warn!(%status, body = %body, what, "Airtable request failed");
        Err(StoreError::Unavailable(format!("{what} returned {status}: {body}")))
    }

    /// Run a list query, following pagination offsets.
    async fn select(&self, formula: String) -> Result<Vec<MentionRecord>, StoreError> {
        let mut out = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = vec![
                ("filterByFormula", formula.clone()),
                ("sort[0][field]", "Timestamp".to_string()),
                ("sort[0][direction]", "asc".to_string()),
            ];
            if let Some(ref o) = offset {
                query.push(("offset", o.clone()));
            }

            let response = self
                .client
                .get(self.table_url.clone())
                .bearer_auth(&self.api_key)
                .query(&query)
                .send()
                .await?;
            let page: ListResponse = Self::check(response, "list").await?.json().await?;

            for record in page.records {
                out.push(record.into_mention()?);
            }

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(out)
    }

    async fn get(&self, record_id: &str) -> Result<MentionRecord, StoreError> {
        let response = self
            .client
            .get(self.record_url(record_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let record: AirtableRecord = Self::check(response, "get").await?.json().await?;
        record.into_mention()
    }
}

#[async_trait]
impl MentionStore for AirtableStore {
    async fn find_record(
        &self,
        person: &str,
        author: &str,
        day: NaiveDate,
    ) -> Result<Option<MentionRecord>, StoreError> {
        let formula = format!(
            "AND({{Mentioned}} = {}, {{Student}} = {}, {{Day}} = {})",
            formula_literal(person),
            formula_literal(author),
            formula_literal(&day.format("%Y-%m-%d").to_string()),
        );
        Ok(self.select(formula).await?.into_iter().next())
    }

    async fn create_record(&self, new: NewMention) -> Result<MentionRecord, StoreError> {
        let fields = QueueFields {
            mentioned: new.person.clone(),
            student: new.author.clone(),
            day: Some(new.day.format("%Y-%m-%d").to_string()),
            messages: Some(encode_messages(std::slice::from_ref(&new.text))?),
            legacy_message: None,
            timestamp: new.at,
            channel: Some(new.channel.clone()),
        };

        let response = self
            .client
            .post(self.table_url.clone())
            .bearer_auth(&self.api_key)
            .json(&FieldsBody { fields: &fields })
            .send()
            .await?;
        let record: AirtableRecord = Self::check(response, "create").await?.json().await?;

        tracing::debug!(id = %record.id, person = %new.person, author = %new.author, "Airtable record created");
        record.into_mention()
    }

    async fn append_message(
        &self,
        record_id: &str,
        text: &str,
        channel: &str,
    ) -> Result<MentionRecord, StoreError> {
        let mut current = self.get(record_id).await?;
        if !current.contains_message(text) {
            current.messages.push(text.to_string());
        }

        let patch = MessagesPatch {
            messages: encode_messages(&current.messages)?,
            channel: channel.to_string(),
        };
        let response = self
            .client
            .patch(self.record_url(record_id))
            .bearer_auth(&self.api_key)
            .json(&FieldsBody { fields: &patch })
            .send()
            .await?;
        let record: AirtableRecord = Self::check(response, "append").await?.json().await?;
        record.into_mention()
    }

    async fn list_records(
        &self,
        person: &str,
        day: NaiveDate,
    ) -> Result<Vec<MentionRecord>, StoreError> {
        let formula = format!(
            "AND({{Mentioned}} = {}, {{Day}} = {})",
            formula_literal(person),
            formula_literal(&day.format("%Y-%m-%d").to_string()),
        );
        self.select(formula).await
    }

    async fn list_person_records(&self, person: &str) -> Result<Vec<MentionRecord>, StoreError> {
        self.select(format!("{{Mentioned}} = {}", formula_literal(person)))
            .await
    }

    async fn delete_records(&self, ids: &[String]) -> Result<usize, StoreError> {
        let mut deleted = 0;
        for batch in ids.chunks(DELETE_BATCH) {
            let query: Vec<(&str, &str)> = batch.iter().map(|id| ("records[]", id.as_str())).collect();
            let response = self
                .client
                .delete(self.table_url.clone())
                .bearer_auth(&self.api_key)
                .query(&query)
                .send()
                .await?;
            let body: DeleteResponse = Self::check(response, "delete").await?.json().await?;
            deleted += body.records.iter().filter(|r| r.deleted).count();
        }
        Ok(deleted)
    }

    fn backend_name(&self) -> &str {
        "airtable"
    }
}
