//! In-process record store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{MentionRecord, MentionStore, NewMention};
use crate::error::StoreError;

/// Keeps records in memory; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, MentionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert records as-is, keeping their ids.
    pub async fn seed(&self, records: impl IntoIterator<Item = MentionRecord>) {
        let mut guard = self.records.write().await;
        for record in records {
            guard.insert(record.id.clone(), record);
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn sorted(mut records: Vec<MentionRecord>) -> Vec<MentionRecord> {
    records.sort_by(|a, b| {
        a.first_seen_at
            .cmp(&b.first_seen_at)
            .then_with(|| a.author.cmp(&b.author))
    });
    records
}

#[async_trait]
impl MentionStore for MemoryStore {
    async fn find_record(
        &self,
        person: &str,
        author: &str,
        day: NaiveDate,
    ) -> Result<Option<MentionRecord>, StoreError> {
        let guard = self.records.read().await;
        let found = guard
            .values()
            .filter(|r| r.person == person && r.author == author && r.day == day)
            .min_by_key(|r| r.first_seen_at)
            .cloned();
        Ok(found)
    }

    async fn create_record(&self, new: NewMention) -> Result<MentionRecord, StoreError> {
        let record = new.into_record(Uuid::new_v4().to_string());
        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn append_message(
        &self,
        record_id: &str,
        text: &str,
        channel: &str,
    ) -> Result<MentionRecord, StoreError> {
        let mut guard = self.records.write().await;
        let record = guard
            .get_mut(record_id)
            .ok_or_else(|| StoreError::NotFound(record_id.to_string()))?;
        if !record.contains_message(text) {
            record.messages.push(text.to_string());
        }
        record.source_channel = channel.to_string();
        Ok(record.clone())
    }

    async fn list_records(
        &self,
        person: &str,
        day: NaiveDate,
    ) -> Result<Vec<MentionRecord>, StoreError> {
        let guard = self.records.read().await;
        Ok(sorted(
            guard
                .values()
                .filter(|r| r.person == person && r.day == day)
                .cloned()
                .collect(),
        ))
    }

    async fn list_person_records(&self, person: &str) -> Result<Vec<MentionRecord>, StoreError> {
        let guard = self.records.read().await;
        Ok(sorted(
            guard.values().filter(|r| r.person == person).cloned().collect(),
        ))
    }

    async fn delete_records(&self, ids: &[String]) -> Result<usize, StoreError> {
        let mut guard = self.records.write().await;
        Ok(ids.iter().filter(|id| guard.remove(*id).is_some()).count())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    fn new_mention(author: &str, text: &str, minute: u32) -> NewMention {
        NewMention {
            person: "coach".to_string(),
            author: author.to_string(),
            day: day(),
            text: text.to_string(),
            channel: "general".to_string(),
            at: Utc.with_ymd_and_hms(2025, 6, 10, 20, minute, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn create_then_find() {
        let store = MemoryStore::new();
        let created = store.create_record(new_mention("alice", "hi", 0)).await.unwrap();
        let found = store
            .find_record("coach", "alice", day())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created, found);
        assert_eq!(found.messages, vec!["hi"]);
        assert!(store.find_record("coach", "bob", day()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn append_updates_channel() {
        let store = MemoryStore::new();
        let rec = store.create_record(new_mention("alice", "hi", 0)).await.unwrap();
        let rec = store.append_message(&rec.id, "bye", "help-desk").await.unwrap();
        assert_eq!(rec.messages, vec!["hi", "bye"]);
        assert_eq!(rec.source_channel, "help-desk");
    }

    #[tokio::test]
    async fn append_known_text_only_moves_channel() {
        let store = MemoryStore::new();
        let rec = store.create_record(new_mention("alice", "hi", 0)).await.unwrap();
        let rec = store.append_message(&rec.id, "hi", "help-desk").await.unwrap();
        assert_eq!(rec.messages, vec!["hi"]);
        assert_eq!(rec.source_channel, "help-desk");
    }

    #[tokio::test]
    async fn append_to_missing_record() {
        let store = MemoryStore::new();
        let err = store.append_message("nope", "x", "y").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_is_ordered_by_first_seen() {
        let store = MemoryStore::new();
        store.create_record(new_mention("carol", "c", 30)).await.unwrap();
        store.create_record(new_mention("alice", "a", 10)).await.unwrap();
        store.create_record(new_mention("bob", "b", 20)).await.unwrap();

        let authors: Vec<_> = store
            .list_records("coach", day())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.author)
            .collect();
        assert_eq!(authors, vec!["alice", "bob", "carol"]);
    }

    #[tokio::test]
    async fn delete_counts_only_existing() {
        let store = MemoryStore::new();
        let a = store.create_record(new_mention("alice", "a", 0)).await.unwrap();
        let removed = store
            .delete_records(&[a.id.clone(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.is_empty().await);
    }
}
