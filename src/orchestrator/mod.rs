// orchestrator/mod.rs — Runs one analysis end to end

use crate::config::{AppConfig, SessionConfig};
use crate::failure::{FailureClassifier, FailureReport};
use crate::inference::{
    consume_until, FragmentStream, GeminiAdapter, InferenceTransport, LLMError, StreamedResult,
};
use crate::prompt_engine::{EngineError, PreparedPrompt, PromptEngine, PromptSelection};
use crate::request::{GenerationRequest, ImageAttachment, ModelCatalog, RequestBuilder};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use self::retry::RetryPolicy;

pub mod retry;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Prompt error: {0}")]
    Prompt(#[from] EngineError),

    #[error("{}", .report.guidance)]
    Inference {
        source: LLMError,
        report: FailureReport,
        /// Text streamed before the failure
        partial: String,
    },
}

impl AnalysisError {
    pub fn report(&self) -> Option<&FailureReport> {
        match self {
            AnalysisError::Inference { report, .. } => Some(report),
            AnalysisError::Prompt(_) => None,
        }
    }
}

/// One "analyze" action, as handed over by the UI layer
#[derive(Debug, Clone, Default)]
pub struct AnalysisInput {
    pub selection: PromptSelection,
    pub images: Vec<ImageAttachment>,
    /// Model identifier; the configured default when `None`
    pub model: Option<String>,
    /// Sampling temperature; the configured default when `None`
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub id: String,
    pub prompt: PreparedPrompt,
    pub model: String,
    pub reasoning_budget: Option<u32>,
    pub attempts: u8,
    pub result: StreamedResult,
}

/// Template → compose → build → stream, with failures classified for the user
pub struct AnalysisOrchestrator {
    engine: PromptEngine,
    models: ModelCatalog,
    builder: RequestBuilder,
    transport: Box<dyn InferenceTransport>,
    classifier: FailureClassifier,
    retry_policy: RetryPolicy,
    default_model: String,
    temperature: f32,
    timeout: Option<Duration>,
}

impl AnalysisOrchestrator {
    pub fn new(config: &AppConfig, engine: PromptEngine, transport: Box<dyn InferenceTransport>) -> Self {
        let builder = RequestBuilder::new(config.reasoning_budget)
            .with_top_p(config.top_p)
            .with_system_instruction(config.system_instruction.clone());

        tracing::info!(
            "Orchestrator ready: transport={}, model={}, timeout={:?}",
            transport.name(),
            config.model,
            config.request_timeout()
        );

        Self {
            engine,
            models: ModelCatalog::with_overrides(&config.models),
            builder,
            transport,
            classifier: FailureClassifier::new(config.rate_limit_cooldown_secs, config.fallback_model.clone()),
            retry_policy: RetryPolicy::default(),
            default_model: config.model.clone(),
            temperature: config.temperature,
            timeout: config.request_timeout(),
        }
    }

    /// Gemini transport built from the session's credentials
    pub fn from_session(session: &SessionConfig) -> Self {
        let engine = PromptEngine::from_path(session.app.catalog_path.as_deref());
        let transport = GeminiAdapter::new(
            session.credentials.api_key().to_string(),
            Some(session.app.endpoint.as_str()),
        );
        Self::new(&session.app, engine, Box::new(transport))
    }

    pub fn engine(&self) -> &PromptEngine {
        &self.engine
    }

    pub fn models(&self) -> &ModelCatalog {
        &self.models
    }

    /// Run one analysis. `on_update` receives the cumulative text after every fragment.
    pub async fn run_analysis<F>(&self, input: AnalysisInput, on_update: F) -> Result<AnalysisOutcome, AnalysisError>
    where
        F: FnMut(&str),
    {
        let id = Uuid::new_v4().to_string();
        let deadline = self.timeout.map(|t| Instant::now() + t);

        let prompt = self.engine.prepare(&input.selection)?;
        let model_id = input
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.default_model.as_str());
        let profile = self.models.profile(model_id);

        tracing::info!(
            analysis_id = %id,
            model = %profile.identifier,
            images = input.images.len(),
            template = %prompt.template_used,
            "Starting analysis"
        );

        let temperature = input.temperature.unwrap_or(self.temperature);
        let request = self
            .builder
            .build(input.images, prompt.text.clone(), &profile, temperature);

        let (stream, request, attempts) = self
            .open_with_fallback(request, deadline)
            .await
            .map_err(|e| self.fail(&id, &profile.identifier, e, String::new()))?;

        match consume_until(stream, deadline, on_update).await {
            Ok(result) => {
                tracing::info!(analysis_id = %id, attempts, "Analysis completed");
                Ok(AnalysisOutcome {
                    id,
                    prompt,
                    model: request.model,
                    reasoning_budget: request.reasoning_budget,
                    attempts,
                    result,
                })
            }
            Err(failure) => Err(self.fail(&id, &request.model, failure.error, failure.partial.into_text())),
        }
    }

    async fn open_with_fallback(
        &self,
        mut request: GenerationRequest,
        deadline: Option<Instant>,
    ) -> Result<(FragmentStream, GenerationRequest, u8), LLMError> {
        let mut attempt = 0u8;

        loop {
            match self.try_open(&request, deadline).await {
                Ok(stream) => return Ok((stream, request, attempt + 1)),
                Err(e) => {
                    tracing::warn!(
                        "Transport {} attempt {} failed: {:?}",
                        self.transport.name(),
                        attempt + 1,
                        e
                    );

                    if self.retry_policy.should_retry(attempt, &e, &request) {
                        request = self.retry_policy.downgrade(attempt, &request);
                        attempt += 1;
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }

    async fn try_open(&self, request: &GenerationRequest, deadline: Option<Instant>) -> Result<FragmentStream, LLMError> {
        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, self.transport.open_stream(request))
                .await
                .unwrap_or(Err(LLMError::Timeout)),
            None => self.transport.open_stream(request).await,
        }
    }

    fn fail(&self, id: &str, model: &str, error: LLMError, partial: String) -> AnalysisError {
        let report = self.classifier.classify_for_model(&error, model);
        tracing::error!(analysis_id = %id, kind = ?report.kind, "Analysis failed: {}", error);
        AnalysisError::Inference {
            source: error,
            report,
            partial,
        }
    }
}
