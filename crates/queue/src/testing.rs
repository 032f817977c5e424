//! Shared fixtures for queue tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use offhours_core::{AvailabilityWindow, MessageEvent, MonitoredPerson, Roster};
use offhours_notify::{ChatSink, NotifyError};

use crate::error::StoreError;
use crate::store::{MentionRecord, MentionStore, NewMention};

pub const COACH_HANDLE: &str = "100";

/// One coach, "Coach", reachable 10:00-15:00 New York time on weekdays.
pub fn coach_roster() -> Roster {
    Roster::new(
        chrono_tz::America::New_York,
        vec![MonitoredPerson::new(
            "coach",
            "Coach",
            COACH_HANDLE,
            vec![AvailabilityWindow::new(600, 900).unwrap()],
        )],
    )
    .unwrap()
}

/// New York wall-clock time as a UTC instant.
pub fn ny(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    chrono_tz::America::New_York
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A message from `author` mentioning the coach.
pub fn mention(author: &str, text: &str, at: DateTime<Utc>) -> MessageEvent {
    MessageEvent {
        author_id: format!("id-{author}"),
        author_name: author.to_string(),
        is_from_bot: false,
        text: text.to_string(),
        mentioned_ids: [COACH_HANDLE.to_string()].into_iter().collect(),
        channel_label: Some("general".to_string()),
        channel_id: Some("chan-1".to_string()),
        message_id: Some(format!("msg-{}", at.timestamp())),
        received_at: at,
    }
}

pub fn record(author: &str, messages: &[&str], first_seen_at: DateTime<Utc>) -> MentionRecord {
    MentionRecord {
        id: format!("rec-{author}-{}", first_seen_at.timestamp()),
        person: "coach".to_string(),
        author: author.to_string(),
        day: first_seen_at
            .with_timezone(&chrono_tz::America::New_York)
            .date_naive(),
        messages: messages.iter().map(|m| m.to_string()).collect(),
        first_seen_at,
        source_channel: "general".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Reply { to: String, text: String },
    Channel { channel_id: String, text: String },
}

/// Records outbound messages; can be switched to fail.
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Sent>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn replies(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Reply { text, .. } => Some(text),
                Sent::Channel { .. } => None,
            })
            .collect()
    }

    pub fn channel_posts(&self) -> Vec<(String, String)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Channel { channel_id, text } => Some((channel_id, text)),
                Sent::Reply { .. } => None,
            })
            .collect()
    }

    fn check(&self) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Rejected {
                status: 503,
                body: "down".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChatSink for RecordingSink {
    async fn send_reply(&self, event: &MessageEvent, text: &str) -> Result<(), NotifyError> {
        self.check()?;
        self.sent.lock().unwrap().push(Sent::Reply {
            to: event.author_name.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_to_channel(&self, channel_id: &str, text: &str) -> Result<(), NotifyError> {
        self.check()?;
        self.sent.lock().unwrap().push(Sent::Channel {
            channel_id: channel_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "recording"
    }
}

/// Store whose every call fails.
#[derive(Debug, Default)]
pub struct FailingStore;

fn down() -> StoreError {
    StoreError::Unavailable("store offline".to_string())
}

#[async_trait]
impl MentionStore for FailingStore {
    async fn find_record(
        &self,
        _person: &str,
        _author: &str,
        _day: NaiveDate,
    ) -> Result<Option<MentionRecord>, StoreError> {
        Err(down())
    }

    async fn create_record(&self, _new: NewMention) -> Result<MentionRecord, StoreError> {
        Err(down())
    }

    async fn append_message(
        &self,
        _record_id: &str,
        _text: &str,
        _channel: &str,
    ) -> Result<MentionRecord, StoreError> {
        Err(down())
    }

    async fn list_records(
        &self,
        _person: &str,
        _day: NaiveDate,
    ) -> Result<Vec<MentionRecord>, StoreError> {
        Err(down())
    }

    async fn list_person_records(&self, _person: &str) -> Result<Vec<MentionRecord>, StoreError> {
        Err(down())
    }

    async fn delete_records(&self, _ids: &[String]) -> Result<usize, StoreError> {
        Err(down())
    }

    fn backend_name(&self) -> &str {
        "failing"
    }
}
