//! Outbound chat delivery for the mention queue.
//!
//! This crate provides:
//! - `ChatSink` trait for replying to a message or posting to a channel
//! - Discord REST, generic webhook relay, and log-only implementations
//! - Minijinja rendering for reply templates

pub mod discord;
pub mod log_sink;
mod secrets;
pub mod templating;
pub mod traits;
pub mod webhook;

pub use discord::DiscordSink;
pub use log_sink::LogSink;
pub use templating::TemplateRenderer;
pub use traits::{ChatSink, NotifyError};
pub use webhook::WebhookSink;
