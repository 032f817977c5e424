//! Mention ingestion pipeline.
//!
//! Decides per inbound message whether the mentioned person is in office,
//! and otherwise records the mention and acknowledges the author once a day.

use std::sync::Arc;

use chrono::Datelike;
use serde::Serialize;

use offhours_core::availability::{
    describe_next_available, is_available, is_weekend, local_time, next_available,
};
use offhours_core::classify::{classify, classify_all};
use offhours_core::{MessageEvent, MonitoredPerson, Roster};
use offhours_notify::ChatSink;

use crate::error::QueueError;
use crate::latch::ReplyLatch;
use crate::reply::{ReplyComposer, ReplyContext, ReplyReason};
use crate::store::{MentionRecord, MentionStore, NewMention};
use crate::toggle::ToggleState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    FromBot,
    NoMonitoredPerson,
}

/// What happened to a queued mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuedMention {
    pub person: String,
    pub record_id: String,
    /// First mention of the day from this author.
    pub created: bool,
    /// Text was added to an existing record.
    pub appended: bool,
    /// The author was sent the out-of-office reply.
    pub replied: bool,
    pub position: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    Ignored { reason: IgnoreReason },
    InOffice { person: String },
    Queued(QueuedMention),
}

pub struct MentionPipeline {
    roster: Arc<Roster>,
    store: Arc<dyn MentionStore>,
    sink: Arc<dyn ChatSink>,
    toggles: Arc<ToggleState>,
    latch: Arc<ReplyLatch>,
    composer: ReplyComposer,
}

impl MentionPipeline {
    pub fn new(
        roster: Arc<Roster>,
        store: Arc<dyn MentionStore>,
        sink: Arc<dyn ChatSink>,
        toggles: Arc<ToggleState>,
        latch: Arc<ReplyLatch>,
        composer: ReplyComposer,
    ) -> Self {
        Self {
            roster,
            store,
            sink,
            toggles,
            latch,
            composer,
        }
    }

    /// Handle one inbound message.
    ///
    /// Store failures abort before any reply is sent.
    pub async fn handle(&self, event: &MessageEvent) -> Result<IngestOutcome, QueueError> {
        if event.is_from_bot {
            return Ok(IngestOutcome::Ignored {
                reason: IgnoreReason::FromBot,
            });
        }

        let Some(person) = classify(event, &self.roster) else {
            return Ok(IngestOutcome::Ignored {
                reason: IgnoreReason::NoMonitoredPerson,
            });
        };
        if event.mentioned_ids.len() > 1 {
            let ignored: Vec<&str> = classify_all(event, &self.roster)
                .into_iter()
                .skip(1)
                .map(|p| p.key.as_str())
                .collect();
            if !ignored.is_empty() {
                tracing::debug!(
                    person = %person.key,
                    ?ignored,
                    "Several monitored people mentioned, queueing for the first"
                );
            }
        }

        let now = local_time(self.roster.timezone, event.received_at);
        let available = is_available(person, &now)?;
        let enabled = self.toggles.is_enabled(&person.key).await?;
        tracing::debug!(
            person = %person.key,
            author = %event.author_name,
            available,
            enabled,
            "Mention classified"
        );

        if available && enabled {
            return Ok(IngestOutcome::InOffice {
                person: person.key.clone(),
            });
        }

        let (reason, next_phrase) = if available {
            (ReplyReason::Paused, None)
        } else {
            let next = next_available(person, &now)?;
            let reason = if is_weekend(now.weekday()) {
                ReplyReason::Weekend
            } else {
                ReplyReason::OutOfHours
            };
            (reason, Some(describe_next_available(&now, &next)))
        };

        let day = now.date_naive();
        let (record, created, appended) = self.upsert(person, event, day).await?;

        let mut position = None;
        let mut replied = false;
        if self.latch.try_latch(&person.key, &event.author_name, day).await {
            position = self.queue_position(person, event, day).await;
            let ctx = ReplyContext {
                author_id: event.author_id.clone(),
                author_name: event.author_name.clone(),
                coach: person.name.clone(),
                reason,
                next_available: next_phrase,
                position,
            };
            replied = self.send_reply(event, &ctx).await;
            if !replied {
                self.latch
                    .release(&person.key, &event.author_name, day)
                    .await;
            }
        }

        tracing::info!(
            person = %person.key,
            author = %event.author_name,
            record = %record.id,
            created,
            appended,
            replied,
            "Mention queued"
        );

        Ok(IngestOutcome::Queued(QueuedMention {
            person: person.key.clone(),
            record_id: record.id,
            created,
            appended,
            replied,
            position,
        }))
    }

    /// Find-or-create today's record; identical text is not stored twice,
    /// but the channel still moves to the latest one.
    async fn upsert(
        &self,
        person: &MonitoredPerson,
        event: &MessageEvent,
        day: chrono::NaiveDate,
    ) -> Result<(MentionRecord, bool, bool), QueueError> {
        let existing = self
            .store
            .find_record(&person.key, &event.author_name, day)
            .await?;

        match existing {
            Some(record)
                if record.contains_message(&event.text)
                    && record.source_channel == event.channel_label() =>
            {
                tracing::debug!(record = %record.id, "Duplicate message text, nothing to store");
                Ok((record, false, false))
            }
            Some(record) => {
                let appended = !record.contains_message(&event.text);
                let updated = self
                    .store
                    .append_message(&record.id, &event.text, event.channel_label())
                    .await?;
                Ok((updated, false, appended))
            }
            None => {
                let created = self
                    .store
                    .create_record(NewMention {
                        person: person.key.clone(),
                        author: event.author_name.clone(),
                        day,
                        text: event.text.clone(),
                        channel: event.channel_label().to_string(),
                        at: event.received_at,
                    })
                    .await?;
                Ok((created, true, false))
            }
        }
    }

    /// 1-based position of the author among today's records. Best effort.
    async fn queue_position(
        &self,
        person: &MonitoredPerson,
        event: &MessageEvent,
        day: chrono::NaiveDate,
    ) -> Option<usize> {
        match self.store.list_records(&person.key, day).await {
            Ok(records) => records
                .iter()
                .position(|r| r.author == event.author_name)
                .map(|i| i + 1),
            Err(e) => {
                tracing::warn!(person = %person.key, error = %e, "Could not compute queue position");
                None
            }
        }
    }

    async fn send_reply(&self, event: &MessageEvent, ctx: &ReplyContext) -> bool {
        let text = match self.composer.compose(ctx) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Reply template failed to render");
                return false;
            }
        };
        match self.sink.send_reply(event, &text).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    sink = self.sink.sink_name(),
                    author = %event.author_name,
                    error = %e,
                    "Reply not delivered"
                );
                false
            }
        }
    }
}
