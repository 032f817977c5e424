use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

/// Parse a profiled env var, falling back to `default` when unset or invalid.
fn profiled_env_parse<T: FromStr>(profile: &str, key: &str, default: T) -> T {
    match profiled_env_opt(profile, key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparseable config value");
            default
        }),
        None => default,
    }
}

fn profiled_env_list(profile: &str, key: &str) -> Vec<String> {
    profiled_env_opt(profile, key)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub roster_path: PathBuf,
    pub chat: ChatConfig,
    pub schedule: ScheduleConfig,
    pub store: StoreConfig,
    pub queue: QueueConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `OFFHOURS_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("OFFHOURS_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            roster_path: PathBuf::from(profiled_env_or(p, "ROSTER_PATH", "config/roster.yaml")),
            chat: ChatConfig::from_env_profiled(p),
            schedule: ScheduleConfig::from_env_profiled(p),
            store: StoreConfig::from_env_profiled(p),
            queue: QueueConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:    {}:{}", self.server.host, self.server.port);
        tracing::info!("  roster:    {}", self.roster_path.display());
        tracing::info!(
            "  chat:      discord={}, webhook={}, summary_channel={}",
            self.chat.discord_token.is_some(),
            self.chat.webhook_url.is_some(),
            self.chat.summary_channel_id.as_deref().unwrap_or("(none)")
        );
        tracing::info!("  schedule:  cron='{}'", self.schedule.summary_cron);
        tracing::info!("  store:     backend={}", self.store.backend);
        tracing::info!(
            "  queue:     admins={}, latch_capacity={}",
            self.queue.admin_ids.len(),
            self.queue.reply_latch_capacity
        );
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "roster_path": self.roster_path,
            "chat": {
                "discord_configured": self.chat.discord_token.is_some(),
                "webhook_configured": self.chat.webhook_url.is_some(),
                "summary_channel_id": self.chat.summary_channel_id,
                "audit_channel_id": self.chat.audit_channel(),
            },
            "schedule": { "summary_cron": self.schedule.summary_cron },
            "store": {
                "backend": self.store.backend,
                "airtable_configured": self.store.airtable_configured(),
            },
            "queue": {
                "admin_count": self.queue.admin_ids.len(),
                "reply_latch_capacity": self.queue.reply_latch_capacity,
                "custom_reply_template": self.queue.reply_template.is_some(),
            },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_parse(p, "PORT", 3000),
        }
    }
}

// ── Chat platform ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub discord_token: Option<String>,
    pub discord_api_base: String,
    /// Relay endpoint used instead of Discord when set.
    pub webhook_url: Option<String>,
    pub summary_channel_id: Option<String>,
    pub audit_channel_id: Option<String>,
}

impl ChatConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            discord_token: profiled_env_opt(p, "DISCORD_TOKEN"),
            discord_api_base: profiled_env_or(p, "DISCORD_API_BASE", "https://discord.com/api/v10"),
            webhook_url: profiled_env_opt(p, "CHAT_WEBHOOK_URL"),
            summary_channel_id: profiled_env_opt(p, "SUMMARY_CHANNEL_ID")
                .or_else(|| profiled_env_opt(p, "CHECK_CHANNEL_ID")),
            audit_channel_id: profiled_env_opt(p, "AUDIT_CHANNEL_ID"),
        }
    }

    /// Toggle audit notices go to the audit channel, else the summary channel.
    pub fn audit_channel(&self) -> Option<&str> {
        self.audit_channel_id
            .as_deref()
            .or(self.summary_channel_id.as_deref())
    }
}

// ── Daily schedule ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// 5- or 6-field cron expression, evaluated in the roster's time zone.
    pub summary_cron: String,
    pub tick_secs: u64,
}

impl ScheduleConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            summary_cron: profiled_env_or(p, "SUMMARY_CRON", "0 22 * * *"),
            tick_secs: profiled_env_parse(p, "SCHEDULER_TICK_SECS", 30),
        }
    }
}

// ── Record store ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "memory" or "airtable"
    pub backend: String,
    pub airtable_api_key: Option<String>,
    pub airtable_base_id: Option<String>,
    pub airtable_table: String,
    pub airtable_api_base: String,
}

impl StoreConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            backend: profiled_env_or(p, "STORE_BACKEND", "memory").to_lowercase(),
            airtable_api_key: profiled_env_opt(p, "AIRTABLE_API_KEY"),
            airtable_base_id: profiled_env_opt(p, "AIRTABLE_BASE_ID"),
            airtable_table: profiled_env_or(p, "AIRTABLE_TABLE", "Queue"),
            airtable_api_base: profiled_env_or(p, "AIRTABLE_API_BASE", "https://api.airtable.com/v0"),
        }
    }

    pub fn airtable_configured(&self) -> bool {
        self.airtable_api_key.is_some() && self.airtable_base_id.is_some()
    }
}

// ── Queue behaviour ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Principals allowed to list and clear any coach's queue.
    pub admin_ids: Vec<String>,
    pub reply_latch_capacity: usize,
    /// Minijinja template overriding the built-in reply text.
    pub reply_template: Option<String>,
}

impl QueueConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            admin_ids: profiled_env_list(p, "ADMIN_IDS"),
            reply_latch_capacity: profiled_env_parse(p, "REPLY_LATCH_CAPACITY", 4096),
            reply_template: profiled_env_opt(p, "REPLY_TEMPLATE"),
        }
    }
}
