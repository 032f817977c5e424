//! Daily digest of queued mentions for one person.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use offhours_core::MonitoredPerson;

use crate::error::StoreError;
use crate::store::{MentionRecord, MentionStore};

/// Everything one author queued for one person on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorDigest {
    pub author: String,
    pub first_seen_at: DateTime<Utc>,
    /// Deduplicated, in first-occurrence order.
    pub messages: Vec<String>,
    pub source_channel: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Digest {
    pub person_key: String,
    pub person_name: String,
    pub day: NaiveDate,
    #[serde(skip)]
    pub tz: Tz,
    /// Ordered by `first_seen_at`, then author.
    pub authors: Vec<AuthorDigest>,
}

impl Digest {
    pub fn message_count(&self) -> usize {
        self.authors.iter().map(|a| a.messages.len()).sum()
    }

    /// Chat-ready text: a header line then one numbered entry per author.
    pub fn render(&self) -> String {
        let mut out = format!(
            "**Daily Mention Summary for {}** ({})",
            self.person_name,
            self.day.format("%A, %B %-d, %Y")
        );
        for (i, author) in self.authors.iter().enumerate() {
            let first_seen = author.first_seen_at.with_timezone(&self.tz);
            out.push_str(&format!(
                "\n{}. **{}** (first at {} in {})",
                i + 1,
                author.author,
                first_seen.format("%H:%M %Z"),
                author.source_channel
            ));
            for message in &author.messages {
                out.push_str(&format!("\n   • {message}"));
            }
        }
        out
    }
}

/// Fold a day's records into a digest.
///
/// Records from the same author are merged, so duplicates left behind by
/// concurrent find-or-create still produce a single entry.
pub fn digest_from_records(
    person: &MonitoredPerson,
    day: NaiveDate,
    tz: Tz,
    records: &[MentionRecord],
) -> Option<Digest> {
    let mut by_author: BTreeMap<&str, AuthorDigest> = BTreeMap::new();

    let mut ordered: Vec<&MentionRecord> = records.iter().collect();
    ordered.sort_by(|a, b| {
        a.first_seen_at
            .cmp(&b.first_seen_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    for record in ordered {
        let entry = by_author
            .entry(record.author.as_str())
            .or_insert_with(|| AuthorDigest {
                author: record.author.clone(),
                first_seen_at: record.first_seen_at,
                messages: Vec::new(),
                source_channel: record.source_channel.clone(),
            });
        for message in &record.messages {
            if !entry.messages.contains(message) {
                entry.messages.push(message.clone());
            }
        }
    }

    if by_author.is_empty() {
        return None;
    }

    let mut authors: Vec<AuthorDigest> = by_author.into_values().collect();
    authors.sort_by(|a, b| {
        a.first_seen_at
            .cmp(&b.first_seen_at)
            .then_with(|| a.author.cmp(&b.author))
    });

    Some(Digest {
        person_key: person.key.clone(),
        person_name: person.name.clone(),
        day,
        tz,
        authors,
    })
}

/// Builds digests from the record store.
#[derive(Clone)]
pub struct SummaryBuilder {
    store: Arc<dyn MentionStore>,
    tz: Tz,
}

impl SummaryBuilder {
    pub fn new(store: Arc<dyn MentionStore>, tz: Tz) -> Self {
        Self { store, tz }
    }

    /// `None` when nothing was queued for the person that day.
    pub async fn build_summary(
        &self,
        person: &MonitoredPerson,
        day: NaiveDate,
    ) -> Result<Option<Digest>, StoreError> {
        let records = self.store.list_records(&person.key, day).await?;
        tracing::debug!(person = %person.key, %day, records = records.len(), "Building summary");
        Ok(digest_from_records(person, day, self.tz, &records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{coach_roster, day, ny, record};

    fn coach() -> MonitoredPerson {
        coach_roster().people.remove(0)
    }

    #[test]
    fn authors_ordered_by_first_seen() {
        let records = vec![
            record("carol", &["c1"], ny(2025, 6, 10, 20, 0)),
            record("alice", &["a1", "a2"], ny(2025, 6, 10, 16, 0)),
            record("bob", &["b1"], ny(2025, 6, 10, 18, 0)),
        ];
        let digest = digest_from_records(
            &coach(),
            day(2025, 6, 10),
            chrono_tz::America::New_York,
            &records,
        )
        .unwrap();
        let order: Vec<_> = digest.authors.iter().map(|a| a.author.as_str()).collect();
        assert_eq!(order, vec!["alice", "bob", "carol"]);
        assert_eq!(digest.message_count(), 4);
    }

    #[test]
    fn messages_deduplicated_in_first_occurrence_order() {
        let records = vec![record("alice", &["hi", "bye", "hi", "again", "bye"], ny(2025, 6, 10, 16, 0))];
        let digest = digest_from_records(
            &coach(),
            day(2025, 6, 10),
            chrono_tz::America::New_York,
            &records,
        )
        .unwrap();
        assert_eq!(digest.authors[0].messages, vec!["hi", "bye", "again"]);
    }

    #[test]
    fn duplicate_records_for_one_author_merge() {
        let mut late = record("alice", &["hi", "later"], ny(2025, 6, 10, 17, 0));
        late.id = "rec-late".to_string();
        let records = vec![late, record("alice", &["hi"], ny(2025, 6, 10, 16, 0))];
        let digest = digest_from_records(
            &coach(),
            day(2025, 6, 10),
            chrono_tz::America::New_York,
            &records,
        )
        .unwrap();
        assert_eq!(digest.authors.len(), 1);
        assert_eq!(digest.authors[0].first_seen_at, ny(2025, 6, 10, 16, 0));
        assert_eq!(digest.authors[0].messages, vec!["hi", "later"]);
    }

    #[test]
    fn input_order_does_not_matter() {
        let a = record("alice", &["a"], ny(2025, 6, 10, 16, 0));
        let b = record("bob", &["b"], ny(2025, 6, 10, 16, 0));
        let tz = chrono_tz::America::New_York;
        let one = digest_from_records(&coach(), day(2025, 6, 10), tz, &[a.clone(), b.clone()]);
        let two = digest_from_records(&coach(), day(2025, 6, 10), tz, &[b, a]);
        assert_eq!(one, two);
    }

    #[test]
    fn render_layout() {
        let records = vec![
            record("alice", &["hi", "bye"], ny(2025, 6, 10, 16, 0)),
            record("bob", &["help"], ny(2025, 6, 10, 18, 30)),
        ];
        let text = digest_from_records(
            &coach(),
            day(2025, 6, 10),
            chrono_tz::America::New_York,
            &records,
        )
        .unwrap()
        .render();
        assert_eq!(
            text,
            "**Daily Mention Summary for Coach** (Tuesday, June 10, 2025)\n\
             1. **alice** (first at 16:00 EDT in general)\n   • hi\n   • bye\n\
             2. **bob** (first at 18:30 EDT in general)\n   • help"
        );
    }

    #[test]
    fn no_records_no_digest() {
        assert!(digest_from_records(
            &coach(),
            day(2025, 6, 10),
            chrono_tz::America::New_York,
            &[]
        )
        .is_none());
    }

    #[tokio::test]
    async fn builder_reads_only_that_day() {
        let store = Arc::new(MemoryStore::new());
        store
            .seed([
                record("alice", &["today"], ny(2025, 6, 10, 16, 0)),
                record("bob", &["yesterday"], ny(2025, 6, 9, 16, 0)),
            ])
            .await;
        let builder = SummaryBuilder::new(store, chrono_tz::America::New_York);
        let digest = builder
            .build_summary(&coach(), day(2025, 6, 10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(digest.authors.len(), 1);
        assert_eq!(digest.authors[0].author, "alice");
        assert!(builder
            .build_summary(&coach(), day(2025, 6, 11))
            .await
            .unwrap()
            .is_none());
    }
}
