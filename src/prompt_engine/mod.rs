// prompt_engine/mod.rs — Main Prompt Engine

mod compositor;
mod types;

pub use compositor::{compose, fill_placeholders, has_unfilled};
pub use types::{EngineError, PlaceholderValues, PreparedPrompt, PromptSelection};

use crate::catalog::{self, Catalog};
use std::path::Path;

/// Prompt Engine - turns a catalog selection into a final instruction
pub struct PromptEngine {
    catalog: Catalog,
}

impl PromptEngine {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Load a custom catalog when a path is given, else use the built-in one
    pub fn from_path(path: Option<&Path>) -> Self {
        let catalog = match path {
            Some(path) => match catalog::load_catalog(path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!("Failed to load catalog: {}. Using built-in catalog.", e);
                    Catalog::builtin()
                }
            },
            None => Catalog::builtin(),
        };

        tracing::info!(
            "PromptEngine initialized: {} categories, {} styles",
            catalog.categories.len(),
            catalog.styles.len()
        );

        Self::new(catalog)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Resolve the template (first-template fallback on a miss), compose, and
    /// apply a hand-edited override if one was supplied.
    pub fn prepare(&self, selection: &PromptSelection) -> Result<PreparedPrompt, EngineError> {
        let resolution = self
            .catalog
            .resolve_template(&selection.category, &selection.template)?;
        let template = resolution.template();
        let style = self.catalog.style_or_plain(selection.style.as_deref());

        let override_text = selection
            .override_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let text = match override_text {
            Some(edited) => fill_placeholders(edited, &selection.values),
            None => compose(template, &selection.values, &style),
        };

        tracing::debug!(
            template = %template.label,
            style = %style.label,
            chars = text.chars().count(),
            "Prompt prepared"
        );

        Ok(PreparedPrompt {
            text,
            template_used: template.label.clone(),
            style_used: style.label,
            template_fallback: resolution.is_fallback(),
            overridden: override_text.is_some(),
        })
    }
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new(Catalog::builtin())
    }
}
