mod api;
mod router;
mod scheduler;
mod state;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use offhours_core::availability::{
    describe_next_available, is_available, local_time, next_available,
};
use offhours_core::{Config, Roster};

use crate::scheduler::SummarySchedule;
use crate::state::AppState;

// ── CLI ─────────────────────────────────────────────────────────────

/// Out-of-hours mention queue for chat communities.
#[derive(Parser, Debug)]
#[command(name = "offhours", version, about)]
struct Cli {
    /// Roster file; overrides ROSTER_PATH.
    #[arg(long, global = true)]
    roster: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server and the daily summary scheduler (default).
    Serve,
    /// Validate the roster and print who is available right now.
    CheckRoster,
    /// Build and post today's digests once, then exit.
    RunSummary,
}

fn load_config(cli: &Cli) -> Config {
    offhours_core::config::load_dotenv();
    let mut config = Config::from_env();
    if let Some(path) = &cli.roster {
        config.roster_path = path.clone();
    }
    config
}

fn check_roster(config: &Config) -> anyhow::Result<()> {
    let roster = Roster::load(&config.roster_path)
        .with_context(|| format!("loading roster from {}", config.roster_path.display()))?;
    println!(
        "{}: {} people, zone {}",
        config.roster_path.display(),
        roster.len(),
        roster.timezone
    );
    let now = local_time(roster.timezone, Utc::now());
    for person in &roster.people {
        let windows: Vec<String> = person.windows.iter().map(|w| w.to_string()).collect();
        let status = if is_available(person, &now)? {
            "available now".to_string()
        } else {
            format!("back {}", describe_next_available(&now, &next_available(person, &now)?))
        };
        println!(
            "  {} ({}, handle {}): {} [{status}]",
            person.key,
            person.name,
            person.handle,
            windows.join(", ")
        );
    }
    Ok(())
}

async fn run_summary(config: Config) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let report = state.summary_job.run(Utc::now()).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.failures() > 0 {
        anyhow::bail!("{} digest(s) failed", report.failures());
    }
    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    config.log_summary();
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::from_config(config)?);

    let schedule_cfg = &state.config.schedule;
    if state.config.chat.summary_channel_id.is_none() {
        warn!("Summary scheduler disabled: no SUMMARY_CHANNEL_ID");
    } else {
        let schedule = SummarySchedule::parse(&schedule_cfg.summary_cron, state.roster.timezone)
            .with_context(|| format!("invalid SUMMARY_CRON '{}'", schedule_cfg.summary_cron))?;
        let tick = Duration::from_secs(schedule_cfg.tick_secs.max(1));
        tokio::spawn(scheduler::run_summary_loop(state.clone(), schedule, tick));
    }

    let app = router::build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::CheckRoster => check_roster(&config),
        Command::RunSummary => run_summary(config).await,
    }
}
