//! Friendly out-of-office reply text.

use serde::Serialize;

use offhours_notify::{NotifyError, TemplateRenderer};

/// Built-in reply used when no template override is configured.
pub const DEFAULT_REPLY_TEMPLATE: &str = "Hi {{ author_id | mention }}, {{ coach }} is \
{% if reason == \"paused\" %}not taking live questions right now\
{% elif reason == \"weekend\" %}away for the weekend\
{% else %}currently offline{% endif %}. \
I've queued your message{% if position %} and you're #{{ position }} in line{% endif %}.\
{% if next_available %} {{ coach }} should be back {{ next_available }}.{% endif %}";

/// Why a mention was queued instead of left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyReason {
    OutOfHours,
    Weekend,
    /// The person switched queueing off while inside their hours.
    Paused,
}

/// Values available to the reply template.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyContext {
    pub author_id: String,
    pub author_name: String,
    /// Display name of the mentioned person.
    pub coach: String,
    pub reason: ReplyReason,
    /// Phrase such as "on Wednesday at 10:00 EDT"; absent when paused.
    pub next_available: Option<String>,
    /// 1-based place among today's queued authors.
    pub position: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ReplyComposer {
    renderer: TemplateRenderer,
}

impl ReplyComposer {
    /// Use `template` if given, otherwise [`DEFAULT_REPLY_TEMPLATE`].
    pub fn new(template: Option<&str>) -> Result<Self, NotifyError> {
        let renderer = TemplateRenderer::new(template.unwrap_or(DEFAULT_REPLY_TEMPLATE))?;
        Ok(Self { renderer })
    }

    pub fn compose(&self, ctx: &ReplyContext) -> Result<String, NotifyError> {
        self.renderer.render(ctx)
    }
}
