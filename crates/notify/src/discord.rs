//! Discord REST API sink.
//!
//! Posts through `POST /channels/{id}/messages` with a bot token. Replies
//! carry a `message_reference` so they thread under the original message.
//! Content longer than Discord's 2000-character limit is split on line
//! boundaries where possible.

use offhours_core::MessageEvent;

use crate::secrets::expand_env;
use crate::traits::{ChatSink, NotifyError};

/// Discord's per-message content limit.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Sends chat messages via the Discord REST API.
#[derive(Debug)]
pub struct DiscordSink {
    api_base: String,
    bot_token: String,
    client: reqwest::Client,
}

impl DiscordSink {
    /// Creates a new `DiscordSink` from configuration values.
    ///
    /// `${VAR}` references in the token are expanded from the environment.
    /// Returns [`NotifyError::Config`] if the token ends up empty or a
    /// referenced variable is missing.
    pub fn from_config(bot_token: String, api_base: String) -> Result<Self, NotifyError> {
        let resolved_token = expand_env(&bot_token)?;

        if resolved_token.is_empty() {
            return Err(NotifyError::Config(
                "Discord bot token must not be empty".to_string(),
            ));
        }

        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: resolved_token,
            client: reqwest::Client::new(),
        })
    }

    async fn post_message(
        &self,
        channel_id: &str,
        content: &str,
        reply_to: Option<&str>,
    ) -> Result<(), NotifyError> {
        let url = format!("{}/channels/{}/messages", self.api_base, channel_id);

        for (i, chunk) in split_message(content, DISCORD_MESSAGE_LIMIT).iter().enumerate() {
            let mut body = serde_json::json!({
                "content": chunk,
                "allowed_mentions": { "parse": ["users"] },
            });
            if let (0, Some(message_id)) = (i, reply_to) {
                body["message_reference"] = serde_json::json!({
                    "message_id": message_id,
                    "fail_if_not_exists": false,
                });
            }

            let response = self
                .client
                .post(&url)
                .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.bot_token))
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let resp_body: serde_json::Value = response.json().await.unwrap_or_default();
                let retry_after = resp_body
                    .get("retry_after")
                    .and_then(|v| v.as_f64())
                    .map(|secs| secs.ceil() as u64)
                    .unwrap_or(5);
                return Err(NotifyError::RateLimited {
                    retry_after_secs: retry_after,
                });
            }
            if !status.is_success() {
                let body_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<unreadable body>".to_string());
                tracing::warn!(channel_id, %status, body = %body_text, "Discord rejected message");
                return Err(NotifyError::Rejected {
                    status: status.as_u16(),
                    body: body_text,
                });
            }
        }

        tracing::debug!(channel_id, reply = reply_to.is_some(), "Discord message sent");
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChatSink for DiscordSink {
    async fn send_reply(&self, event: &MessageEvent, text: &str) -> Result<(), NotifyError> {
        let channel_id = event.channel_id.as_deref().ok_or_else(|| {
            NotifyError::MissingTarget(format!(
                "event from '{}' carries no channel id",
                event.author_name
            ))
        })?;
        self.post_message(channel_id, text, event.message_id.as_deref())
            .await
    }

    async fn send_to_channel(&self, channel_id: &str, text: &str) -> Result<(), NotifyError> {
        self.post_message(channel_id, text, None).await
    }

    fn sink_name(&self) -> &str {
        "discord"
    }
}

/// Split `text` into chunks of at most `limit` characters.
///
/// Prefers breaking after a newline, then after a space; a single word
/// longer than the limit is hard cut.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunker = Chunker::new(limit);
    for line in text.split_inclusive('\n') {
        if line.chars().count() <= limit {
            chunker.push(line);
            continue;
        }
        for word in line.split_inclusive(' ') {
            if word.chars().count() <= limit {
                chunker.push(word);
                continue;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(limit) {
                chunker.push(&piece.iter().collect::<String>());
            }
        }
    }
    chunker.finish()
}

/// Packs pieces into chunks, starting a new chunk when the next piece would overflow.
struct Chunker {
    limit: usize,
    chunks: Vec<String>,
    current: String,
    current_len: usize,
}

impl Chunker {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            chunks: Vec::new(),
            current: String::new(),
            current_len: 0,
        }
    }

    fn push(&mut self, piece: &str) {
        let len = piece.chars().count();
        if self.current_len + len > self.limit && !self.current.is_empty() {
            self.chunks.push(std::mem::take(&mut self.current));
            self.current_len = 0;
        }
        self.current.push_str(piece);
        self.current_len += len;
    }

    fn finish(mut self) -> Vec<String> {
        if !self.current.is_empty() {
            self.chunks.push(self.current);
        }
        self.chunks
    }
}
