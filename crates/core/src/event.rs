//! Inbound chat events as delivered by the chat collaborator.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label used when an event does not say where it came from.
pub const UNKNOWN_CHANNEL: &str = "Unknown";

/// A chat message that may reference monitored people.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    pub author_id: String,
    /// Username of the sender; queue records are keyed by it.
    pub author_name: String,
    #[serde(default)]
    pub is_from_bot: bool,
    pub text: String,
    /// Platform ids referenced by the message.
    #[serde(default)]
    pub mentioned_ids: BTreeSet<String>,
    #[serde(default)]
    pub channel_label: Option<String>,
    /// Platform channel id, needed to reply in place.
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl MessageEvent {
    pub fn channel_label(&self) -> &str {
        self.channel_label
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(UNKNOWN_CHANNEL)
    }
}

/// Administrative command issued through the chat platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEvent {
    /// Platform id of whoever issued the command.
    pub acting_principal_id: String,
    #[serde(flatten)]
    pub command: AdminCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum AdminCommand {
    /// Show today's queue for a coach.
    ListQueue { coach: String },
    /// Drop one student's entry for today.
    ClearEntry { coach: String, student: String },
    /// Drop every queued entry for a coach.
    ClearAll {
        coach: String,
        #[serde(default)]
        confirm: bool,
    },
    /// Enable/disable queueing; flips the current state when `enabled` is absent.
    Toggle {
        coach: String,
        #[serde(default)]
        enabled: Option<bool>,
    },
}

impl AdminCommand {
    pub fn coach(&self) -> &str {
        match self {
            AdminCommand::ListQueue { coach }
            | AdminCommand::ClearEntry { coach, .. }
            | AdminCommand::ClearAll { coach, .. }
            | AdminCommand::Toggle { coach, .. } => coach,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AdminCommand::ListQueue { .. } => "list_queue",
            AdminCommand::ClearEntry { .. } => "clear_entry",
            AdminCommand::ClearAll { .. } => "clear_all",
            AdminCommand::Toggle { .. } => "toggle",
        }
    }
}
