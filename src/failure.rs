// failure.rs — Maps inference errors to user-facing categories and guidance

use crate::inference::LLMError;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

pub const DEFAULT_COOLDOWN_SECS: u64 = 60;
pub const DEFAULT_FALLBACK_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    RateLimited,
    Generic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    pub kind: FailureKind,
    pub guidance: String,
}

/// Advisory only: classification never triggers a retry
#[derive(Debug, Clone)]
pub struct FailureClassifier {
    cooldown_secs: u64,
    fallback_model: String,
}

impl FailureClassifier {
    pub fn new(cooldown_secs: u64, fallback_model: impl Into<String>) -> Self {
        Self {
            cooldown_secs,
            fallback_model: fallback_model.into(),
        }
    }

    pub fn classify(&self, error: &LLMError) -> FailureReport {
        self.report(error, None)
    }

    /// Like [`classify`](Self::classify), but never suggests the model that just failed
    pub fn classify_for_model(&self, error: &LLMError, model: &str) -> FailureReport {
        self.report(error, Some(model))
    }

    fn report(&self, error: &LLMError, failing_model: Option<&str>) -> FailureReport {
        if is_rate_limited(error) {
            let wait = format!(
                "請求過於頻繁或已達配額上限 (429)。請稍候約 {} 秒後再試",
                self.cooldown_secs
            );
            let guidance = if failing_model.map(str::trim) == Some(self.fallback_model.as_str()) {
                format!("{}。", wait)
            } else {
                format!("{}，或改用較低成本的模型（例如 {}）。", wait, self.fallback_model)
            };
            return FailureReport {
                kind: FailureKind::RateLimited,
                guidance,
            };
        }

        FailureReport {
            kind: FailureKind::Generic,
            guidance: format!("錯誤: {}", error),
        }
    }
}

impl Default for FailureClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN_SECS, DEFAULT_FALLBACK_MODEL)
    }
}

/// Classify with the default cooldown and fallback model
pub fn classify(error: &LLMError) -> FailureReport {
    FailureClassifier::default().classify(error)
}

fn is_rate_limited(error: &LLMError) -> bool {
    match error {
        LLMError::RateLimited(_) => return true,
        LLMError::AuthenticationError { .. } | LLMError::Blocked(_) => return false,
        _ => {}
    }

    // Quota wording only counts when no status is known
    if let Some(status) = error.status_code() {
        return status == 429;
    }

    static QUOTA_RE: OnceLock<Regex> = OnceLock::new();
    let re = QUOTA_RE.get_or_init(|| {
        Regex::new(r"(?i)\b429\b|resource[_ ]exhausted|quota|rate[- ]?limit|too many requests")
            .expect("valid quota regex")
    });
    re.is_match(&error.to_string())
}
