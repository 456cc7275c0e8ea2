// catalog/loader.rs — Catalog loading and validation

use super::{Catalog, CatalogError, Placeholder};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

/// Load a catalog from a JSON file path
pub fn load_catalog(path: &Path) -> Result<Catalog, CatalogError> {
    let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut catalog: Catalog = serde_json::from_str(&content)
        .map_err(|e| CatalogError::Invalid(format!("Invalid JSON in {}: {}", path.display(), e)))?;

    if catalog.styles.is_empty() {
        catalog.styles = Catalog::builtin().styles;
    }

    validate(&catalog)?;

    tracing::info!(
        "Loaded {} categories, {} styles from {}",
        catalog.categories.len(),
        catalog.styles.len(),
        path.display()
    );
    Ok(catalog)
}

pub(crate) fn validate(catalog: &Catalog) -> Result<(), CatalogError> {
    if catalog.categories.is_empty() {
        return Err(CatalogError::Invalid("Catalog has no categories".to_string()));
    }

    let mut titles = HashSet::new();
    for category in &catalog.categories {
        if category.title.trim().is_empty() {
            return Err(CatalogError::Invalid("Category with empty title".to_string()));
        }
        if !titles.insert(category.title.as_str()) {
            return Err(CatalogError::Invalid(format!(
                "Duplicate category '{}'",
                category.title
            )));
        }
        if category.items.is_empty() {
            return Err(CatalogError::Invalid(format!(
                "Category '{}' has no templates",
                category.title
            )));
        }

        let mut labels = HashSet::new();
        for template in &category.items {
            if template.label.trim().is_empty() || template.body.trim().is_empty() {
                return Err(CatalogError::Invalid(format!(
                    "Template missing required fields in '{}': label='{}'",
                    category.title, template.label
                )));
            }
            if !labels.insert(template.label.as_str()) {
                return Err(CatalogError::Invalid(format!(
                    "Duplicate template label '{}' in '{}'",
                    template.label, category.title
                )));
            }
            for token in unknown_tokens(&template.body) {
                tracing::warn!(
                    "Template '{}' uses unknown placeholder {{{}}}; it will be sent verbatim",
                    template.label,
                    token
                );
            }
        }
    }

    let mut styles = HashSet::new();
    for style in &catalog.styles {
        if !styles.insert(style.label.as_str()) {
            return Err(CatalogError::Invalid(format!(
                "Duplicate style label '{}'",
                style.label
            )));
        }
    }

    Ok(())
}

fn unknown_tokens(body: &str) -> Vec<String> {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    let re = TOKEN_RE.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").expect("valid placeholder regex"));

    re.captures_iter(body)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|key| Placeholder::from_key(key).is_none())
        .map(str::to_string)
        .collect()
}
