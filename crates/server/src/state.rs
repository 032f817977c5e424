use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use offhours_core::config::{ChatConfig, StoreConfig};
use offhours_core::{Config, Roster};
use offhours_notify::{ChatSink, DiscordSink, LogSink, WebhookSink};
use offhours_queue::{
    AdminCommands, AirtableStore, DailySummaryJob, MemoryStore, MentionPipeline, MentionStore,
    ReplyComposer, ReplyLatch, SummaryBuilder, ToggleState,
};

/// Everything request handlers and the scheduler share.
pub struct AppState {
    pub config: Config,
    pub roster: Arc<Roster>,
    pub store: Arc<dyn MentionStore>,
    pub sink: Arc<dyn ChatSink>,
    pub toggles: Arc<ToggleState>,
    pub latch: Arc<ReplyLatch>,
    pub pipeline: MentionPipeline,
    pub summary_job: DailySummaryJob,
    pub admin: AdminCommands,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Load the roster and wire up collaborators named by `config`.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let roster = Roster::load(&config.roster_path)
            .with_context(|| format!("loading roster from {}", config.roster_path.display()))?;
        let store = build_store(&config.store)?;
        let sink = build_sink(&config.chat);
        Self::build(config, roster, store, sink)
    }

    pub fn build(
        config: Config,
        roster: Roster,
        store: Arc<dyn MentionStore>,
        sink: Arc<dyn ChatSink>,
    ) -> anyhow::Result<Self> {
        let roster = Arc::new(roster);
        let toggles = Arc::new(ToggleState::new(&roster));
        let latch = Arc::new(ReplyLatch::new(config.queue.reply_latch_capacity));
        let composer = ReplyComposer::new(config.queue.reply_template.as_deref())
            .context("invalid REPLY_TEMPLATE")?;

        let pipeline = MentionPipeline::new(
            roster.clone(),
            store.clone(),
            sink.clone(),
            toggles.clone(),
            latch.clone(),
            composer,
        );

        if config.chat.summary_channel_id.is_none() {
            warn!("SUMMARY_CHANNEL_ID not set — digests will be built but not posted");
        }
        let summary_job = DailySummaryJob::new(
            roster.clone(),
            SummaryBuilder::new(store.clone(), roster.timezone),
            sink.clone(),
            latch.clone(),
            config.chat.summary_channel_id.clone(),
        );

        let admin = AdminCommands::new(
            roster.clone(),
            store.clone(),
            toggles.clone(),
            sink.clone(),
            config.queue.admin_ids.clone(),
            config.chat.audit_channel().map(str::to_string),
        );

        info!(
            people = roster.len(),
            store = store.backend_name(),
            sink = sink.sink_name(),
            "Application state ready"
        );

        Ok(Self {
            config,
            roster,
            store,
            sink,
            toggles,
            latch,
            pipeline,
            summary_job,
            admin,
            started_at: Utc::now(),
        })
    }
}

fn build_store(cfg: &StoreConfig) -> anyhow::Result<Arc<dyn MentionStore>> {
    match cfg.backend.as_str() {
        "memory" => {
            warn!("Using in-memory record store — queued mentions are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        "airtable" => {
            let (Some(api_key), Some(base_id)) = (&cfg.airtable_api_key, &cfg.airtable_base_id)
            else {
                anyhow::bail!("STORE_BACKEND=airtable requires AIRTABLE_API_KEY and AIRTABLE_BASE_ID");
            };
            let store = AirtableStore::new(
                &cfg.airtable_api_base,
                base_id,
                &cfg.airtable_table,
                api_key.clone(),
            )?;
            info!(table = %cfg.airtable_table, "Airtable record store configured");
            Ok(Arc::new(store))
        }
        other => anyhow::bail!("unknown STORE_BACKEND '{other}' (expected memory or airtable)"),
    }
}

/// Discord when a token is set, then the relay webhook, then log-only.
fn build_sink(chat: &ChatConfig) -> Arc<dyn ChatSink> {
    if let Some(token) = &chat.discord_token {
        match DiscordSink::from_config(token.clone(), chat.discord_api_base.clone()) {
            Ok(sink) => {
                info!("Chat sink: Discord REST");
                return Arc::new(sink);
            }
            Err(e) => warn!(error = %e, "Discord sink not available"),
        }
    }
    if let Some(url) = &chat.webhook_url {
        match WebhookSink::new(url.clone(), HashMap::new()) {
            Ok(sink) => {
                info!("Chat sink: relay webhook");
                return Arc::new(sink);
            }
            Err(e) => warn!(error = %e, "Webhook sink not available"),
        }
    }
    warn!("No chat credentials configured — replies and digests will only be logged");
    Arc::new(LogSink)
}
