//! Out-of-hours mention queue.
//!
//! This crate provides:
//! - `MentionStore` trait with in-memory and Airtable backends
//! - `MentionPipeline` deciding whether a mention is queued, merged, or ignored
//! - `SummaryBuilder` and `DailySummaryJob` for the per-coach daily digest
//! - `AdminCommands` for listing, clearing, and toggling queues
//! - Process-local `ToggleState` and `ReplyLatch`

pub mod admin;
pub mod error;
pub mod ingest;
pub mod job;
pub mod latch;
pub mod reply;
pub mod store;
pub mod summary;
pub mod toggle;

#[cfg(test)]
pub(crate) mod testing;

pub use admin::{AdminCommands, CommandOutcome, CommandReply};
pub use error::{QueueError, StoreError};
pub use ingest::{IgnoreReason, IngestOutcome, MentionPipeline, QueuedMention};
pub use job::{DailySummaryJob, PersonSummary, SummaryRunReport, SummaryStatus};
pub use latch::ReplyLatch;
pub use reply::{ReplyComposer, ReplyContext, ReplyReason, DEFAULT_REPLY_TEMPLATE};
pub use store::{AirtableStore, MemoryStore, MentionRecord, MentionStore, NewMention};
pub use summary::{AuthorDigest, Digest, SummaryBuilder};
pub use toggle::ToggleState;
