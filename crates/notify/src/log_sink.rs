//! Sink that only logs outbound messages.
//!
//! Used when no chat credentials are configured, so the queue keeps working
//! and replies are visible in the logs.

use offhours_core::MessageEvent;

use crate::traits::{ChatSink, NotifyError};

#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait::async_trait]
impl ChatSink for LogSink {
    async fn send_reply(&self, event: &MessageEvent, text: &str) -> Result<(), NotifyError> {
        tracing::info!(
            author = %event.author_name,
            channel = %event.channel_label(),
            text,
            "reply (log sink)"
        );
        Ok(())
    }

    async fn send_to_channel(&self, channel_id: &str, text: &str) -> Result<(), NotifyError> {
        tracing::info!(channel_id, text, "channel post (log sink)");
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "log"
    }
}
