//! Administrative commands: list, clear, toggle.
//!
//! Every command produces a [`CommandReply`]; denials and store failures are
//! reported to the caller instead of being swallowed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use offhours_core::availability::local_time;
use offhours_core::{AdminCommand, CommandEvent, MonitoredPerson, Roster};
use offhours_notify::ChatSink;

use crate::store::MentionStore;
use crate::summary::SummaryBuilder;
use crate::toggle::ToggleState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandOutcome {
    Listed { authors: usize },
    Cleared { count: usize },
    NothingToDo,
    Toggled { enabled: bool },
    Denied,
    NeedsConfirmation { pending: usize },
    UnknownCoach,
    Failed,
}

/// Acknowledgement returned to whoever issued the command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandReply {
    pub text: String,
    /// Visible only to the caller.
    pub ephemeral: bool,
    pub outcome: CommandOutcome,
}

impl CommandReply {
    fn private(outcome: CommandOutcome, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ephemeral: true,
            outcome,
        }
    }
}

pub struct AdminCommands {
    roster: Arc<Roster>,
    store: Arc<dyn MentionStore>,
    toggles: Arc<ToggleState>,
    builder: SummaryBuilder,
    sink: Arc<dyn ChatSink>,
    admin_ids: Vec<String>,
    audit_channel: Option<String>,
}

impl AdminCommands {
    pub fn new(
        roster: Arc<Roster>,
        store: Arc<dyn MentionStore>,
        toggles: Arc<ToggleState>,
        sink: Arc<dyn ChatSink>,
        admin_ids: Vec<String>,
        audit_channel: Option<String>,
    ) -> Self {
        let builder = SummaryBuilder::new(store.clone(), roster.timezone);
        Self {
            roster,
            store,
            toggles,
            builder,
            sink,
            admin_ids,
            audit_channel,
        }
    }

    fn is_admin(&self, principal: &str) -> bool {
        self.admin_ids.iter().any(|id| id == principal)
    }

    pub async fn execute(&self, event: &CommandEvent, now: DateTime<Utc>) -> CommandReply {
        let command = &event.command;
        let actor = event.acting_principal_id.as_str();

        let person = match self.roster.resolve(command.coach()) {
            Ok(person) => person,
            Err(_) => {
                return CommandReply::private(
                    CommandOutcome::UnknownCoach,
                    format!("I don't know a coach called '{}'.", command.coach()),
                )
            }
        };

        let is_self = actor == person.handle;
        let allowed = match command {
            AdminCommand::Toggle { .. } => is_self,
            _ => is_self || self.is_admin(actor),
        };
        if !allowed {
            tracing::warn!(
                command = command.name(),
                actor,
                person = %person.key,
                "Admin command denied"
            );
            let why = match command {
                AdminCommand::Toggle { .. } => {
                    format!("Only {} can change their own queueing.", person.name)
                }
                _ => format!("You are not allowed to manage {}'s queue.", person.name),
            };
            return CommandReply::private(CommandOutcome::Denied, why);
        }

        tracing::info!(command = command.name(), actor, person = %person.key, "Admin command");
        let today = local_time(self.roster.timezone, now).date_naive();

        match command {
            AdminCommand::ListQueue { .. } => self.list_queue(person, today).await,
            AdminCommand::ClearEntry { student, .. } => {
                self.clear_entry(person, student, today).await
            }
            AdminCommand::ClearAll { confirm, .. } => self.clear_all(person, *confirm).await,
            AdminCommand::Toggle { enabled, .. } => self.toggle(person, *enabled).await,
        }
    }

    async fn list_queue(&self, person: &MonitoredPerson, today: chrono::NaiveDate) -> CommandReply {
        match self.builder.build_summary(person, today).await {
            Ok(Some(digest)) => CommandReply::private(
                CommandOutcome::Listed {
                    authors: digest.authors.len(),
                },
                digest.render(),
            ),
            Ok(None) => CommandReply::private(
                CommandOutcome::NothingToDo,
                format!("No queued mentions for {} today.", person.name),
            ),
            Err(e) => self.failed("list_queue", person, e),
        }
    }

    async fn clear_entry(
        &self,
        person: &MonitoredPerson,
        student: &str,
        today: chrono::NaiveDate,
    ) -> CommandReply {
        let ids: Vec<String> = match self.store.list_records(&person.key, today).await {
            Ok(records) => records
                .into_iter()
                .filter(|r| r.author.eq_ignore_ascii_case(student))
                .map(|r| r.id)
                .collect(),
            Err(e) => return self.failed("clear_entry", person, e),
        };
        if ids.is_empty() {
            return CommandReply::private(
                CommandOutcome::NothingToDo,
                format!("{student} has nothing queued for {} today.", person.name),
            );
        }
        match self.store.delete_records(&ids).await {
            Ok(count) => CommandReply::private(
                CommandOutcome::Cleared { count },
                format!("Cleared {student}'s entry from {}'s queue.", person.name),
            ),
            Err(e) => self.failed("clear_entry", person, e),
        }
    }

    async fn clear_all(&self, person: &MonitoredPerson, confirm: bool) -> CommandReply {
        let ids: Vec<String> = match self.store.list_person_records(&person.key).await {
            Ok(records) => records.into_iter().map(|r| r.id).collect(),
            Err(e) => return self.failed("clear_all", person, e),
        };
        if ids.is_empty() {
            return CommandReply::private(
                CommandOutcome::NothingToDo,
                format!("{}'s queue is already empty.", person.name),
            );
        }
        if !confirm {
            return CommandReply::private(
                CommandOutcome::NeedsConfirmation { pending: ids.len() },
                format!(
                    "This deletes all {} queued entries for {}. Re-run with confirm set to true.",
                    ids.len(),
                    person.name
                ),
            );
        }
        match self.store.delete_records(&ids).await {
            Ok(count) => CommandReply::private(
                CommandOutcome::Cleared { count },
                format!("Cleared {count} queued entries for {}.", person.name),
            ),
            Err(e) => self.failed("clear_all", person, e),
        }
    }

    async fn toggle(&self, person: &MonitoredPerson, enabled: Option<bool>) -> CommandReply {
        let target = match enabled {
            Some(value) => value,
            None => match self.toggles.is_enabled(&person.key).await {
                Ok(current) => !current,
                Err(e) => return self.failed("toggle", person, e),
            },
        };
        if let Err(e) = self.toggles.set_enabled(&person.key, target).await {
            return self.failed("toggle", person, e);
        }

        let state = if target { "on" } else { "off" };
        if let Some(channel) = &self.audit_channel {
            let notice = format!("{} turned queueing {state}.", person.name);
            if let Err(e) = self.sink.send_to_channel(channel, &notice).await {
                tracing::warn!(person = %person.key, error = %e, "Toggle audit notice not delivered");
            }
        }

        CommandReply::private(
            CommandOutcome::Toggled { enabled: target },
            format!("Queueing for {} is now {state}.", person.name),
        )
    }

    fn failed(
        &self,
        command: &str,
        person: &MonitoredPerson,
        error: impl std::fmt::Display,
    ) -> CommandReply {
        tracing::error!(command, person = %person.key, %error, "Admin command failed");
        CommandReply::private(
            CommandOutcome::Failed,
            format!("Couldn't complete {command} for {}: {error}", person.name),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{coach_roster, ny, record, FailingStore, RecordingSink, COACH_HANDLE};

    struct Harness {
        admin: AdminCommands,
        store: Arc<MemoryStore>,
        toggles: Arc<ToggleState>,
        sink: Arc<RecordingSink>,
    }

    async fn harness() -> Harness {
        let roster = Arc::new(coach_roster());
        let store = Arc::new(MemoryStore::new());
        store
            .seed([
                record("alice", &["hi"], ny(2025, 6, 10, 16, 0)),
                record("bob", &["help"], ny(2025, 6, 10, 17, 0)),
                record("carol", &["old"], ny(2025, 6, 9, 17, 0)),
            ])
            .await;
        let toggles = Arc::new(ToggleState::new(&roster));
        let sink = RecordingSink::new();
        let admin = AdminCommands::new(
            roster,
            store.clone(),
            toggles.clone(),
            sink.clone(),
            vec!["admin-1".to_string()],
            Some("audit".to_string()),
        );
        Harness {
            admin,
            store,
            toggles,
            sink,
        }
    }

    fn cmd(actor: &str, command: AdminCommand) -> CommandEvent {
        CommandEvent {
            acting_principal_id: actor.to_string(),
            command,
        }
    }

    fn now() -> DateTime<Utc> {
        ny(2025, 6, 10, 21, 0)
    }

    #[tokio::test]
    async fn toggle_by_other_principal_is_denied() {
        let h = harness().await;
        for actor in ["someone-else", "admin-1"] {
            let reply = h
                .admin
                .execute(
                    &cmd(
                        actor,
                        AdminCommand::Toggle {
                            coach: "coach".to_string(),
                            enabled: Some(false),
                        },
                    ),
                    now(),
                )
                .await;
            assert_eq!(reply.outcome, CommandOutcome::Denied);
        }
        assert!(h.toggles.is_enabled("coach").await.unwrap());
        assert!(h.sink.sent().is_empty());
    }

    #[tokio::test]
    async fn self_toggle_flips_and_audits() {
        let h = harness().await;
        let reply = h
            .admin
            .execute(
                &cmd(
                    COACH_HANDLE,
                    AdminCommand::Toggle {
                        coach: "Coach".to_string(),
                        enabled: None,
                    },
                ),
                now(),
            )
            .await;
        assert_eq!(reply.outcome, CommandOutcome::Toggled { enabled: false });
        assert!(!h.toggles.is_enabled("coach").await.unwrap());
        assert_eq!(
            h.sink.channel_posts(),
            vec![("audit".to_string(), "Coach turned queueing off.".to_string())]
        );
    }

    #[tokio::test]
    async fn list_shows_todays_digest() {
        let h = harness().await;
        let reply = h
            .admin
            .execute(
                &cmd(
                    "admin-1",
                    AdminCommand::ListQueue {
                        coach: "coach".to_string(),
                    },
                ),
                now(),
            )
            .await;
        assert_eq!(reply.outcome, CommandOutcome::Listed { authors: 2 });
        assert!(reply.ephemeral);
        assert!(reply.text.contains("alice") && reply.text.contains("bob"));
        assert!(!reply.text.contains("carol"));
    }

    #[tokio::test]
    async fn clear_entry_removes_only_that_author() {
        let h = harness().await;
        let reply = h
            .admin
            .execute(
                &cmd(
                    COACH_HANDLE,
                    AdminCommand::ClearEntry {
                        coach: "coach".to_string(),
                        student: "alice".to_string(),
                    },
                ),
                now(),
            )
            .await;
        assert_eq!(reply.outcome, CommandOutcome::Cleared { count: 1 });
        assert_eq!(h.store.len().await, 2);

        let again = h
            .admin
            .execute(
                &cmd(
                    COACH_HANDLE,
                    AdminCommand::ClearEntry {
                        coach: "coach".to_string(),
                        student: "alice".to_string(),
                    },
                ),
                now(),
            )
            .await;
        assert_eq!(again.outcome, CommandOutcome::NothingToDo);
    }

    #[tokio::test]
    async fn clear_all_requires_confirmation() {
        let h = harness().await;
        let unconfirmed = h
            .admin
            .execute(
                &cmd(
                    "admin-1",
                    AdminCommand::ClearAll {
                        coach: "coach".to_string(),
                        confirm: false,
                    },
                ),
                now(),
            )
            .await;
        assert_eq!(
            unconfirmed.outcome,
            CommandOutcome::NeedsConfirmation { pending: 3 }
        );
        assert_eq!(h.store.len().await, 3);

        let confirmed = h
            .admin
            .execute(
                &cmd(
                    "admin-1",
                    AdminCommand::ClearAll {
                        coach: "coach".to_string(),
                        confirm: true,
                    },
                ),
                now(),
            )
            .await;
        assert_eq!(confirmed.outcome, CommandOutcome::Cleared { count: 3 });
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn clear_by_stranger_is_denied() {
        let h = harness().await;
        let reply = h
            .admin
            .execute(
                &cmd(
                    "stranger",
                    AdminCommand::ClearAll {
                        coach: "coach".to_string(),
                        confirm: true,
                    },
                ),
                now(),
            )
            .await;
        assert_eq!(reply.outcome, CommandOutcome::Denied);
        assert_eq!(h.store.len().await, 3);
    }

    #[tokio::test]
    async fn unknown_coach_is_acknowledged() {
        let h = harness().await;
        let reply = h
            .admin
            .execute(
                &cmd(
                    "admin-1",
                    AdminCommand::ListQueue {
                        coach: "nobody".to_string(),
                    },
                ),
                now(),
            )
            .await;
        assert_eq!(reply.outcome, CommandOutcome::UnknownCoach);
        assert!(reply.text.contains("nobody"));
    }

    #[tokio::test]
    async fn store_failure_is_acknowledged() {
        let roster = Arc::new(coach_roster());
        let admin = AdminCommands::new(
            roster.clone(),
            Arc::new(FailingStore),
            Arc::new(ToggleState::new(&roster)),
            RecordingSink::new(),
            Vec::new(),
            None,
        );
        let reply = admin
            .execute(
                &cmd(
                    COACH_HANDLE,
                    AdminCommand::ListQueue {
                        coach: "coach".to_string(),
                    },
                ),
                now(),
            )
            .await;
        assert_eq!(reply.outcome, CommandOutcome::Failed);
        assert!(reply.text.contains("store offline"));
    }
}
