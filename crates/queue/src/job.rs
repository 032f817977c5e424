//! The daily summary run.
//!
//! Shared by the scheduler and the on-demand HTTP trigger so both do the same
//! thing: one digest per roster entry, posted to the summary channel.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use offhours_core::availability::local_time;
use offhours_core::Roster;
use offhours_notify::ChatSink;

use crate::latch::ReplyLatch;
use crate::summary::SummaryBuilder;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SummaryStatus {
    Posted { authors: usize, messages: usize },
    /// Nothing queued that day.
    Empty,
    /// Built but not delivered, e.g. no summary channel configured.
    NotPosted { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonSummary {
    pub person: String,
    #[serde(flatten)]
    pub status: SummaryStatus,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryRunReport {
    pub day: NaiveDate,
    pub people: Vec<PersonSummary>,
    /// Reply-latch entries from earlier days dropped during this run.
    pub latch_evicted: usize,
}

impl SummaryRunReport {
    pub fn failures(&self) -> usize {
        self.people
            .iter()
            .filter(|p| matches!(p.status, SummaryStatus::Failed { .. }))
            .count()
    }
}

pub struct DailySummaryJob {
    roster: Arc<Roster>,
    builder: SummaryBuilder,
    sink: Arc<dyn ChatSink>,
    latch: Arc<ReplyLatch>,
    channel: Option<String>,
}

impl DailySummaryJob {
    pub fn new(
        roster: Arc<Roster>,
        builder: SummaryBuilder,
        sink: Arc<dyn ChatSink>,
        latch: Arc<ReplyLatch>,
        channel: Option<String>,
    ) -> Self {
        Self {
            roster,
            builder,
            sink,
            latch,
            channel,
        }
    }

    /// Build and post every person's digest for the local day containing `now`.
    ///
    /// One person's failure is recorded in the report and does not stop the
    /// others.
    pub async fn run(&self, now: DateTime<Utc>) -> SummaryRunReport {
        let day = local_time(self.roster.timezone, now).date_naive();
        tracing::info!(%day, people = self.roster.len(), "Daily summary run started");

        let mut people = Vec::with_capacity(self.roster.len());
        for person in &self.roster.people {
            let (status, text) = match self.builder.build_summary(person, day).await {
                Ok(None) => (SummaryStatus::Empty, None),
                Ok(Some(digest)) => {
                    let text = digest.render();
                    let status = match &self.channel {
                        None => SummaryStatus::NotPosted {
                            reason: "no summary channel configured".to_string(),
                        },
                        Some(channel) => match self.sink.send_to_channel(channel, &text).await {
                            Ok(()) => SummaryStatus::Posted {
                                authors: digest.authors.len(),
                                messages: digest.message_count(),
                            },
                            Err(e) => {
                                tracing::error!(person = %person.key, error = %e, "Summary post failed");
                                SummaryStatus::Failed {
                                    error: e.to_string(),
                                }
                            }
                        },
                    };
                    (status, Some(text))
                }
                Err(e) => {
                    tracing::error!(person = %person.key, error = %e, "Summary build failed");
                    (
                        SummaryStatus::Failed {
                            error: e.to_string(),
                        },
                        None,
                    )
                }
            };
            people.push(PersonSummary {
                person: person.key.clone(),
                status,
                text,
            });
        }

        let latch_evicted = self.latch.evict_before(day).await;
        let report = SummaryRunReport {
            day,
            people,
            latch_evicted,
        };
        tracing::info!(
            %day,
            failures = report.failures(),
            latch_evicted,
            "Daily summary run finished"
        );
        report
    }
}
