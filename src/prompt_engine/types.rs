// prompt_engine/types.rs — Core types for Prompt Engine

use crate::catalog::{CatalogError, Placeholder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// User-supplied placeholder values; blank entries count as missing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderValues(BTreeMap<Placeholder, String>);

impl PlaceholderValues {
    pub fn with(mut self, placeholder: Placeholder, value: impl Into<String>) -> Self {
        self.set(placeholder, value);
        self
    }

    pub fn set(&mut self, placeholder: Placeholder, value: impl Into<String>) {
        self.0.insert(placeholder, value.into());
    }

    /// Build from optional values, skipping `None`
    pub fn from_options<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Placeholder, Option<String>)>,
    {
        let mut values = Self::default();
        for (placeholder, value) in pairs {
            if let Some(value) = value {
                values.set(placeholder, value);
            }
        }
        values
    }

    pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
        self.0
            .get(&placeholder)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Value to substitute: the user's, or the placeholder's fallback literal
    pub fn resolve(&self, placeholder: Placeholder) -> &str {
        self.get(placeholder).unwrap_or_else(|| placeholder.fallback())
    }
}

/// What the user picked: category, template, values and style
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptSelection {
    pub category: String,
    pub template: String,
    pub values: PlaceholderValues,
    pub style: Option<String>,
    /// Hand-edited final instruction; replaces the composed text when non-blank
    pub override_text: Option<String>,
}

/// Result of preparing an instruction for sending
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedPrompt {
    pub text: String,
    pub template_used: String,
    pub style_used: String,
    pub template_fallback: bool,
    pub overridden: bool,
}

/// Prompt Engine errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}
