//! Minijinja template rendering for outbound chat text.
//!
//! The template string is validated once at construction; a fresh
//! [`minijinja::Environment`] is created per render call since templates are
//! dynamic strings, not pre-registered files.

use serde::Serialize;

use crate::traits::NotifyError;

/// Renders one template string against serializable contexts.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    template: String,
}

impl TemplateRenderer {
    /// Create a renderer, rejecting templates with syntax errors.
    pub fn new(template: impl Into<String>) -> Result<Self, NotifyError> {
        let template = template.into();
        Self::build_env()
            .template_from_str(&template)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(Self { template })
    }

    /// Build a configured minijinja environment with custom filters.
    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.add_filter("mention", mention_filter);
        env.add_filter("lower", lower_filter);
        env.add_filter("upper", upper_filter);
        env
    }

    /// Render the template with the given context.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if rendering fails.
    pub fn render<S: Serialize>(&self, ctx: &S) -> Result<String, NotifyError> {
        Self::build_env()
            .render_str(&self.template, ctx)
            .map(|s| s.trim().to_string())
            .map_err(|e| NotifyError::Template(e.to_string()))
    }
}

/// Custom filter: turn a platform user id into a Discord mention.
fn mention_filter(user_id: String) -> String {
    format!("<@{user_id}>")
}

/// Custom filter: lowercase a string.
fn lower_filter(value: String) -> String {
    value.to_lowercase()
}

/// Custom filter: uppercase a string.
fn upper_filter(value: String) -> String {
    value.to_uppercase()
}
