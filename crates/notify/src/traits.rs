//! ChatSink trait definition and shared error types.

use offhours_core::MessageEvent;

/// Errors that can occur while delivering a chat message.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot reply: {0}")]
    MissingTarget(String),

    #[error("Chat API returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

/// Outbound side of the chat platform.
#[async_trait::async_trait]
pub trait ChatSink: Send + Sync {
    /// Reply to the message that produced `event`.
    async fn send_reply(&self, event: &MessageEvent, text: &str) -> Result<(), NotifyError>;

    /// Post a standalone message to a channel.
    async fn send_to_channel(&self, channel_id: &str, text: &str) -> Result<(), NotifyError>;

    /// Human-readable name for this sink (e.g., "discord", "webhook").
    fn sink_name(&self) -> &str;
}
