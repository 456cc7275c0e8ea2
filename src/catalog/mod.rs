// catalog/mod.rs — Template catalog: categories, instruction templates, style modifiers

mod builtin;
mod loader;

pub use loader::load_catalog;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fallback literal substituted when a placeholder has no value
pub const UNSPECIFIED: &str = "[未填寫]";

/// Fixed placeholder vocabulary shared by every template
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    CurrentJob,
    StrengthA,
    StrengthB,
}

impl Placeholder {
    pub const ALL: [Placeholder; 3] = [
        Placeholder::CurrentJob,
        Placeholder::StrengthA,
        Placeholder::StrengthB,
    ];

    /// Key used in template bodies and on the command line
    pub fn key(&self) -> &'static str {
        match self {
            Placeholder::CurrentJob => "current_job",
            Placeholder::StrengthA => "strength_a",
            Placeholder::StrengthB => "strength_b",
        }
    }

    /// Literal token as it appears inside a template body
    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::CurrentJob => "{current_job}",
            Placeholder::StrengthA => "{strength_a}",
            Placeholder::StrengthB => "{strength_b}",
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            Placeholder::CurrentJob => "目前從事職業",
            Placeholder::StrengthA => "強項 A",
            Placeholder::StrengthB => "強項 B",
        }
    }

    pub fn fallback(&self) -> &'static str {
        match self {
            Placeholder::CurrentJob | Placeholder::StrengthA | Placeholder::StrengthB => UNSPECIFIED,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == key.trim())
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionTemplate {
    pub label: String,
    #[serde(rename = "template")]
    pub body: String,
}

impl InstructionTemplate {
    pub fn new(label: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            body: body.into(),
        }
    }

    /// Placeholders referenced by the body, in vocabulary order
    pub fn placeholders(&self) -> Vec<Placeholder> {
        Placeholder::ALL
            .into_iter()
            .filter(|p| self.body.contains(p.token()))
            .collect()
    }

    pub fn has_variables(&self) -> bool {
        !self.placeholders().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub title: String,
    pub items: Vec<InstructionTemplate>,
}

impl Category {
    pub fn template(&self, label: &str) -> Option<&InstructionTemplate> {
        self.items.iter().find(|t| t.label == label)
    }

    pub fn first(&self) -> Option<&InstructionTemplate> {
        self.items.first()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleModifier {
    pub label: String,
    #[serde(default)]
    pub suffix: String,
}

impl StyleModifier {
    pub fn new(label: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            suffix: suffix.into(),
        }
    }

    /// The no-op style: empty suffix
    pub fn plain() -> Self {
        Self::new(builtin::DEFAULT_STYLE_LABEL, "")
    }
}

/// Catalog errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Template '{label}' not found in category '{category}'")]
    TemplateNotFound { category: String, label: String },

    #[error("Invalid catalog: {0}")]
    Invalid(String),

    #[error("Failed to read catalog {path}: {message}")]
    Io { path: String, message: String },
}

/// Outcome of resolving a template, recording whether the fallback applied
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateResolution<'a> {
    Exact(&'a InstructionTemplate),
    Fallback {
        requested: String,
        template: &'a InstructionTemplate,
    },
}

impl<'a> TemplateResolution<'a> {
    pub fn template(&self) -> &'a InstructionTemplate {
        match self {
            TemplateResolution::Exact(t) => t,
            TemplateResolution::Fallback { template, .. } => template,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, TemplateResolution::Fallback { .. })
    }
}

/// Read-only catalog of instruction templates and style modifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub categories: Vec<Category>,
    #[serde(default)]
    pub styles: Vec<StyleModifier>,
}

impl Catalog {
    /// The catalog compiled into the binary
    pub fn builtin() -> Self {
        builtin::catalog()
    }

    pub fn list_categories(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.title.as_str()).collect()
    }

    pub fn category(&self, title: &str) -> Result<&Category, CatalogError> {
        self.categories
            .iter()
            .find(|c| c.title == title)
            .ok_or_else(|| CatalogError::CategoryNotFound(title.to_string()))
    }

    pub fn list_templates(&self, category: &str) -> Result<Vec<&str>, CatalogError> {
        Ok(self
            .category(category)?
            .items
            .iter()
            .map(|t| t.label.as_str())
            .collect())
    }

    pub fn get_template(&self, category: &str, label: &str) -> Result<&InstructionTemplate, CatalogError> {
        self.category(category)?
            .template(label)
            .ok_or_else(|| CatalogError::TemplateNotFound {
                category: category.to_string(),
                label: label.to_string(),
            })
    }

    /// Look up a template, falling back to the category's first template on a miss.
    /// Only an unknown (or empty) category is an error.
    pub fn resolve_template(&self, category: &str, label: &str) -> Result<TemplateResolution<'_>, CatalogError> {
        let cat = self.category(category)?;
        if let Some(template) = cat.template(label) {
            return Ok(TemplateResolution::Exact(template));
        }

        let first = cat
            .first()
            .ok_or_else(|| CatalogError::Invalid(format!("Category '{}' has no templates", category)))?;

        tracing::warn!(
            category = %category,
            requested = %label,
            fallback = %first.label,
            "Template not found, using first template of category"
        );

        Ok(TemplateResolution::Fallback {
            requested: label.to_string(),
            template: first,
        })
    }

    pub fn list_styles(&self) -> Vec<&str> {
        self.styles.iter().map(|s| s.label.as_str()).collect()
    }

    pub fn style(&self, label: &str) -> Option<&StyleModifier> {
        self.styles.iter().find(|s| s.label == label)
    }

    /// Style lookup with the empty style as the fallback
    pub fn style_or_plain(&self, label: Option<&str>) -> StyleModifier {
        match label {
            None => StyleModifier::plain(),
            Some(label) => match self.style(label) {
                Some(style) => style.clone(),
                None => {
                    tracing::warn!(style = %label, "Unknown style modifier, using plain style");
                    StyleModifier::plain()
                }
            },
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
