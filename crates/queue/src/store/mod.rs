//! Mention record store trait and types.

mod airtable;
mod memory;

pub use airtable::AirtableStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// All out-of-hours messages one author sent one person on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionRecord {
    /// Store-assigned identifier.
    pub id: String,
    /// `MonitoredPerson::key`.
    pub person: String,
    pub author: String,
    /// Calendar day in the roster's reference zone.
    pub day: NaiveDate,
    /// Message texts in arrival order, without exact duplicates.
    pub messages: Vec<String>,
    pub first_seen_at: DateTime<Utc>,
    pub source_channel: String,
}

impl MentionRecord {
    pub fn contains_message(&self, text: &str) -> bool {
        self.messages.iter().any(|m| m == text)
    }
}

/// Input for creating a record on the first mention of the day.
#[derive(Debug, Clone)]
pub struct NewMention {
    pub person: String,
    pub author: String,
    pub day: NaiveDate,
    pub text: String,
    pub channel: String,
    pub at: DateTime<Utc>,
}

impl NewMention {
    fn into_record(self, id: String) -> MentionRecord {
        MentionRecord {
            id,
            person: self.person,
            author: self.author,
            day: self.day,
            messages: vec![self.text],
            first_seen_at: self.at,
            source_channel: self.channel,
        }
    }
}

/// Persistence collaborator for mention records.
///
/// The store does not enforce one record per (person, author, day); the
/// ingestion pipeline does that with find-or-create.
#[async_trait]
pub trait MentionStore: Send + Sync {
    async fn find_record(
        &self,
        person: &str,
        author: &str,
        day: NaiveDate,
    ) -> Result<Option<MentionRecord>, StoreError>;

    async fn create_record(&self, new: NewMention) -> Result<MentionRecord, StoreError>;

    /// Append `text` unless the record already holds it verbatim, and set
    /// its channel to `channel`.
    async fn append_message(
        &self,
        record_id: &str,
        text: &str,
        channel: &str,
    ) -> Result<MentionRecord, StoreError>;

    /// Records for one person and day, ordered by `first_seen_at` ascending.
    async fn list_records(
        &self,
        person: &str,
        day: NaiveDate,
    ) -> Result<Vec<MentionRecord>, StoreError>;

    /// Every record for one person, any day.
    async fn list_person_records(&self, person: &str) -> Result<Vec<MentionRecord>, StoreError>;

    /// Delete by id; returns how many records were removed.
    async fn delete_records(&self, ids: &[String]) -> Result<usize, StoreError>;

    /// Backend name for logs (e.g., "memory", "airtable").
    fn backend_name(&self) -> &str;
}
