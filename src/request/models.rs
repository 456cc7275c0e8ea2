// request/models.rs — Model capability table

use serde::{Deserialize, Serialize};

/// Declared capabilities of a model identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub identifier: String,
    #[serde(default)]
    pub supports_extended_reasoning: bool,
    /// Largest reasoning budget the model accepts; `None` means no known ceiling
    #[serde(default)]
    pub max_reasoning_budget: Option<u32>,
}

impl ModelProfile {
    pub fn new(identifier: impl Into<String>, supports_extended_reasoning: bool) -> Self {
        Self {
            identifier: identifier.into(),
            supports_extended_reasoning,
            max_reasoning_budget: None,
        }
    }

    pub fn with_max_reasoning_budget(mut self, max: u32) -> Self {
        self.max_reasoning_budget = Some(max);
        self
    }

    /// `requested` capped at the model's ceiling
    pub fn reasoning_budget(&self, requested: u32) -> u32 {
        match self.max_reasoning_budget {
            Some(max) => requested.min(max),
            None => requested,
        }
    }
}

const KNOWN_MODELS: &[(&str, bool, Option<u32>)] = &[
    ("gemini-3-pro-preview", true, None),
    ("gemini-2.5-pro", true, Some(32_768)),
    ("gemini-2.5-flash", true, Some(24_576)),
    ("gemini-2.0-flash", false, None),
    ("gemini-2.0-flash-lite", false, None),
];

/// Explicit capability table; later entries override earlier ones
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    profiles: Vec<ModelProfile>,
}

impl ModelCatalog {
    pub fn builtin() -> Self {
        Self {
            profiles: KNOWN_MODELS
                .iter()
                .map(|(id, reasoning, max)| ModelProfile {
                    max_reasoning_budget: *max,
                    ..ModelProfile::new(*id, *reasoning)
                })
                .collect(),
        }
    }

    /// Built-in table extended (or overridden) by configured entries
    pub fn with_overrides(extra: &[ModelProfile]) -> Self {
        let mut catalog = Self::builtin();
        for profile in extra {
            catalog.insert(profile.clone());
        }
        catalog
    }

    pub fn insert(&mut self, profile: ModelProfile) {
        match self
            .profiles
            .iter_mut()
            .find(|p| p.identifier == profile.identifier)
        {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
    }

    pub fn get(&self, identifier: &str) -> Option<&ModelProfile> {
        self.profiles.iter().find(|p| p.identifier == identifier)
    }

    /// Profile for `identifier`; unknown models get no extended reasoning
    pub fn profile(&self, identifier: &str) -> ModelProfile {
        let identifier = identifier.trim();
        match self.get(identifier) {
            Some(profile) => profile.clone(),
            None => {
                tracing::warn!(
                    "Model '{}' not in capability table, assuming no extended reasoning",
                    identifier
                );
                ModelProfile::new(identifier, false)
            }
        }
    }

    pub fn profiles(&self) -> &[ModelProfile] {
        &self.profiles
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
