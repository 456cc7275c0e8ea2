// prompt_engine/compositor.rs — Placeholder substitution and style suffixing

use super::types::PlaceholderValues;
use crate::catalog::{InstructionTemplate, Placeholder, StyleModifier};

/// Fill every placeholder of the template, then append the style suffix
pub fn compose(template: &InstructionTemplate, values: &PlaceholderValues, style: &StyleModifier) -> String {
    let mut text = fill_placeholders(&template.body, values);
    text.push_str(&style.suffix);
    text
}

/// Single left-to-right pass over `body`; substituted values are never rescanned,
/// so a value that happens to contain a token is inserted literally.
pub fn fill_placeholders(body: &str, values: &PlaceholderValues) -> String {
    let mut result = String::with_capacity(body.len());
    let mut rest = body;

    while let Some(start) = rest.find('{') {
        result.push_str(&rest[..start]);
        let candidate = &rest[start..];

        match Placeholder::ALL.iter().find(|p| candidate.starts_with(p.token())) {
            Some(placeholder) => {
                result.push_str(values.resolve(*placeholder));
                rest = &candidate[placeholder.token().len()..];
            }
            None => {
                result.push('{');
                rest = &candidate[1..];
            }
        }
    }

    result.push_str(rest);
    result
}

/// True if any vocabulary token is still present
pub fn has_unfilled(text: &str) -> bool {
    Placeholder::ALL.iter().any(|p| text.contains(p.token()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, UNSPECIFIED};

    #[test]
    fn test_every_builtin_template_is_fully_substituted() {
        let catalog = Catalog::builtin();
        let empty = PlaceholderValues::default();
        let filled = PlaceholderValues::default()
            .with(Placeholder::CurrentJob, "產品經理")
            .with(Placeholder::StrengthA, "直覺")
            .with(Placeholder::StrengthB, "邏輯");

        for category in &catalog.categories {
            for template in &category.items {
                for style in &catalog.styles {
                    for values in [&empty, &filled] {
                        let text = compose(template, values, style);
                        assert!(!has_unfilled(&text), "unfilled token in '{}'", template.label);
                    }
                }
            }
        }
    }

    #[test]
    fn test_missing_values_use_fallback() {
        let template = InstructionTemplate::new("t", "我目前正在做 {current_job}。");
        let text = compose(&template, &PlaceholderValues::default(), &StyleModifier::plain());
        assert_eq!(text, format!("我目前正在做 {}。", UNSPECIFIED));
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let template = InstructionTemplate::new("t", "{strength_a}");
        let values = PlaceholderValues::default().with(Placeholder::StrengthA, "   ");
        assert_eq!(compose(&template, &values, &StyleModifier::plain()), UNSPECIFIED);
    }

    #[test]
    fn test_suffix_appended_after_substitution() {
        let template = InstructionTemplate::new("t", "A={strength_a}");
        let style = StyleModifier::new("s", " {strength_b}");
        let values = PlaceholderValues::default()
            .with(Placeholder::StrengthA, "x")
            .with(Placeholder::StrengthB, "y");

        let text = compose(&template, &values, &style);
        assert_eq!(text, "A=x {strength_b}");
        assert!(text.ends_with(&style.suffix));
    }

    #[test]
    fn test_repeated_tokens_all_replaced() {
        let template = InstructionTemplate::new("t", "{current_job}/{current_job}");
        let values = PlaceholderValues::default().with(Placeholder::CurrentJob, "工程師");
        assert_eq!(compose(&template, &values, &StyleModifier::plain()), "工程師/工程師");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let template = InstructionTemplate::new("t", "{strength_a} {current_job}");
        let values = PlaceholderValues::default().with(Placeholder::StrengthA, "{current_job}");
        let text = fill_placeholders(&template.body, &values);
        assert_eq!(text, format!("{{current_job}} {}", UNSPECIFIED));
    }

    #[test]
    fn test_unrelated_braces_untouched() {
        let values = PlaceholderValues::default();
        assert_eq!(fill_placeholders("{not_a_slot} {", &values), "{not_a_slot} {");
    }

    #[test]
    fn test_compose_is_idempotent() {
        let catalog = Catalog::builtin();
        let template = catalog.get_template("三. 進階運勢能量", "職業戰略家模式").unwrap();
        let style = catalog.style_or_plain(Some("能量"));
        let values = PlaceholderValues::default().with(Placeholder::StrengthA, "溝通");
        assert_eq!(compose(template, &values, &style), compose(template, &values, &style));
    }
}
