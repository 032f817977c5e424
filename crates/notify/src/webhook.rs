//! Generic HTTP relay sink.
//!
//! For deployments where the chat gateway runs in another process: outbound
//! text is POSTed as JSON and the relay delivers it to the platform.

use std::collections::HashMap;

use serde::Serialize;

use offhours_core::MessageEvent;

use crate::secrets::expand_env;
use crate::traits::{ChatSink, NotifyError};

/// JSON payload posted to the relay.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RelayMessage<'a> {
    /// `"reply"` or `"channel"`.
    pub kind: &'static str,
    pub channel_id: Option<&'a str>,
    pub reply_to: Option<&'a str>,
    pub text: &'a str,
}

#[derive(Debug)]
pub struct WebhookSink {
    url: String,
    headers: Vec<(String, String)>,
    client: reqwest::Client,
}

impl WebhookSink {
    /// `${VAR}` references in the URL and header values are expanded here,
    /// once; a missing variable fails construction.
    pub fn new(url: String, headers: HashMap<String, String>) -> Result<Self, NotifyError> {
        let headers = headers
            .into_iter()
            .map(|(name, value)| Ok((name, expand_env(&value)?)))
            .collect::<Result<Vec<_>, NotifyError>>()?;
        Ok(Self {
            url: expand_env(&url)?,
            headers,
            client: reqwest::Client::new(),
        })
    }

    async fn post(&self, message: &RelayMessage<'_>) -> Result<(), NotifyError> {
        let request = self
            .headers
            .iter()
            .fold(self.client.post(&self.url).json(message), |req, (name, value)| {
                req.header(name.as_str(), value.as_str())
            });

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            tracing::debug!(kind = message.kind, "Relay accepted message");
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        tracing::warn!(url = %self.url, %status, body = %body, "Relay rejected message");
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait::async_trait]
impl ChatSink for WebhookSink {
    async fn send_reply(&self, event: &MessageEvent, text: &str) -> Result<(), NotifyError> {
        self.post(&RelayMessage {
            kind: "reply",
            channel_id: event.channel_id.as_deref(),
            reply_to: event.message_id.as_deref(),
            text,
        })
        .await
    }

    async fn send_to_channel(&self, channel_id: &str, text: &str) -> Result<(), NotifyError> {
        self.post(&RelayMessage {
            kind: "channel",
            channel_id: Some(channel_id),
            reply_to: None,
            text,
        })
        .await
    }

    fn sink_name(&self) -> &str {
        "webhook"
    }
}
