use crate::inference::LLMError;
use crate::request::GenerationRequest;

/// Compatibility retry: a request whose reasoning budget is rejected as an
/// unsupported argument is resent without it. Nothing else is retried.
pub struct RetryPolicy {
    max_retries: u8,
}

impl RetryPolicy {
    pub fn new(max_retries: u8) -> Self {
        Self { max_retries }
    }

    pub fn should_retry(&self, attempt: u8, error: &LLMError, request: &GenerationRequest) -> bool {
        if attempt >= self.max_retries {
            return false;
        }

        error.is_unsupported_parameter() && request.reasoning_budget.is_some()
    }

    pub fn downgrade(&self, attempt: u8, request: &GenerationRequest) -> GenerationRequest {
        tracing::info!(
            "Reasoning budget rejected by service, retrying without it (attempt {})",
            attempt + 2
        );
        request.without_reasoning()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1)
    }
}
