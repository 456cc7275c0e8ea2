use async_trait::async_trait;
use celestial_lens::catalog::Placeholder;
use celestial_lens::config::AppConfig;
use celestial_lens::failure::FailureKind;
use celestial_lens::inference::{FragmentStream, InferenceTransport, LLMError, StreamStatus};
use celestial_lens::orchestrator::{AnalysisError, AnalysisInput, AnalysisOrchestrator};
use celestial_lens::prompt_engine::{PlaceholderValues, PromptEngine, PromptSelection};
use celestial_lens::request::{ImageAttachment, PayloadPart};
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

type Reply = Result<Vec<Result<String, LLMError>>, LLMError>;

#[derive(Clone, Default)]
struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    seen: Arc<Mutex<Vec<celestial_lens::request::GenerationRequest>>>,
}

impl ScriptedTransport {
    fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            seen: Arc::default(),
        }
    }

    fn requests(&self) -> Vec<celestial_lens::request::GenerationRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceTransport for ScriptedTransport {
    async fn open_stream(
        &self,
        request: &celestial_lens::request::GenerationRequest,
    ) -> Result<FragmentStream, LLMError> {
        self.seen.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LLMError::ProviderError("no scripted reply".into())));
        reply.map(|items| stream::iter(items).boxed())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn fragments(parts: &[&str]) -> Reply {
    Ok(parts.iter().map(|p| Ok(p.to_string())).collect())
}

fn orchestrator(transport: &ScriptedTransport, model: &str) -> AnalysisOrchestrator {
    let config = AppConfig {
        model: model.to_string(),
        ..AppConfig::default()
    };
    AnalysisOrchestrator::new(&config, PromptEngine::default(), Box::new(transport.clone()))
}

fn image(name: &str) -> ImageAttachment {
    ImageAttachment::new(name, "image/png", vec![1, 2, 3]).unwrap()
}

fn first_selection(engine: &PromptEngine) -> PromptSelection {
    let category = &engine.catalog().categories[0];
    PromptSelection {
        category: category.title.clone(),
        template: category.items[0].label.clone(),
        ..PromptSelection::default()
    }
}

#[tokio::test]
async fn streams_cumulative_text_to_observer() {
    let transport = ScriptedTransport::new(vec![fragments(&["A", "B", "C"])]);
    let orch = orchestrator(&transport, "gemini-2.5-flash");
    let input = AnalysisInput {
        selection: first_selection(orch.engine()),
        images: vec![image("chart.png")],
        ..AnalysisInput::default()
    };

    let mut updates = Vec::new();
    let outcome = orch
        .run_analysis(input, |text| updates.push(text.to_string()))
        .await
        .unwrap();

    assert_eq!(updates, vec!["A", "AB", "ABC"]);
    assert_eq!(outcome.result.text(), "ABC");
    assert_eq!(outcome.result.status(), StreamStatus::Completed);
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn images_precede_instruction_in_upload_order() {
    let transport = ScriptedTransport::new(vec![fragments(&["ok"])]);
    let orch = orchestrator(&transport, "gemini-2.5-flash");
    let input = AnalysisInput {
        selection: first_selection(orch.engine()),
        images: vec![image("second.png"), image("first.png")],
        ..AnalysisInput::default()
    };

    orch.run_analysis(input, |_| {}).await.unwrap();

    let requests = transport.requests();
    let payload = requests[0].payload();
    assert_eq!(payload.len(), 3);
    assert!(matches!(payload[0], PayloadPart::Image(img) if img.name == "second.png"));
    assert!(matches!(payload[1], PayloadPart::Image(img) if img.name == "first.png"));
    assert!(matches!(payload[2], PayloadPart::Text(_)));
}

#[tokio::test]
async fn rate_limit_is_classified_and_not_retried() {
    let transport = ScriptedTransport::new(vec![Err(LLMError::RateLimited("quota exceeded".into()))]);
    let orch = orchestrator(&transport, "gemini-3-pro-preview");
    let input = AnalysisInput {
        selection: first_selection(orch.engine()),
        images: vec![image("chart.png")],
        ..AnalysisInput::default()
    };

    let err = orch.run_analysis(input, |_| {}).await.unwrap_err();

    assert_eq!(err.report().map(|r| r.kind), Some(FailureKind::RateLimited));
    assert!(!err.to_string().is_empty());
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn unsupported_reasoning_is_retried_once_without_budget() {
    let transport = ScriptedTransport::new(vec![
        Err(LLMError::UnsupportedParameter {
            parameter: "thinkingConfig".into(),
            message: "Unknown name \"thinkingConfig\"".into(),
        }),
        fragments(&["解讀"]),
    ]);
    let orch = orchestrator(&transport, "gemini-3-pro-preview");
    let input = AnalysisInput {
        selection: first_selection(orch.engine()),
        images: vec![image("chart.png")],
        ..AnalysisInput::default()
    };

    let outcome = orch.run_analysis(input, |_| {}).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].reasoning_budget.is_some());
    assert_eq!(requests[1].reasoning_budget, None);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.reasoning_budget, None);
    assert_eq!(outcome.result.text(), "解讀");
}

#[tokio::test]
async fn second_unsupported_rejection_is_reported() {
    let unsupported = || {
        Err(LLMError::UnsupportedParameter {
            parameter: "thinkingConfig".into(),
            message: "thinking not supported".into(),
        })
    };
    let transport = ScriptedTransport::new(vec![unsupported(), unsupported()]);
    let orch = orchestrator(&transport, "gemini-2.5-pro");
    let input = AnalysisInput {
        selection: first_selection(orch.engine()),
        images: vec![image("chart.png")],
        ..AnalysisInput::default()
    };

    let err = orch.run_analysis(input, |_| {}).await.unwrap_err();

    assert_eq!(err.report().map(|r| r.kind), Some(FailureKind::Generic));
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn model_without_reasoning_never_carries_budget() {
    let transport = ScriptedTransport::new(vec![fragments(&["x"])]);
    let orch = orchestrator(&transport, "gemini-2.0-flash");
    let input = AnalysisInput {
        selection: first_selection(orch.engine()),
        images: vec![image("chart.png")],
        ..AnalysisInput::default()
    };

    orch.run_analysis(input, |_| {}).await.unwrap();

    assert_eq!(transport.requests()[0].reasoning_budget, None);
}

#[tokio::test]
async fn unknown_template_falls_back_to_first() {
    let transport = ScriptedTransport::new(vec![fragments(&["x"])]);
    let orch = orchestrator(&transport, "gemini-2.5-flash");
    let mut selection = first_selection(orch.engine());
    let expected = selection.template.clone();
    selection.template = "不存在的模板".to_string();

    let outcome = orch
        .run_analysis(
            AnalysisInput {
                selection,
                images: vec![image("chart.png")],
                ..AnalysisInput::default()
            },
            |_| {},
        )
        .await
        .unwrap();

    assert!(outcome.prompt.template_fallback);
    assert_eq!(outcome.prompt.template_used, expected);
}

#[tokio::test]
async fn placeholder_values_reach_the_instruction() {
    let transport = ScriptedTransport::new(vec![fragments(&["x"])]);
    let orch = orchestrator(&transport, "gemini-2.5-flash");

    let (category, template) = orch
        .engine()
        .catalog()
        .categories
        .iter()
        .find_map(|c| {
            c.items
                .iter()
                .find(|t| t.placeholders().contains(&Placeholder::CurrentJob))
                .map(|t| (c.title.clone(), t.label.clone()))
        })
        .expect("builtin catalog has a job template");

    let selection = PromptSelection {
        category,
        template,
        values: PlaceholderValues::default().with(Placeholder::CurrentJob, "軟體工程師"),
        ..PromptSelection::default()
    };

    orch.run_analysis(
        AnalysisInput {
            selection,
            images: vec![image("chart.png")],
            ..AnalysisInput::default()
        },
        |_| {},
    )
    .await
    .unwrap();

    let instruction = &transport.requests()[0].instruction;
    assert!(instruction.contains("軟體工程師"));
    assert!(!instruction.contains("{current_job}"));
}

#[tokio::test]
async fn mid_stream_failure_keeps_partial_text() {
    let transport = ScriptedTransport::new(vec![Ok(vec![
        Ok("命".to_string()),
        Ok("盤".to_string()),
        Err(LLMError::NetworkError("Stream interrupted: reset".into())),
    ])]);
    let orch = orchestrator(&transport, "gemini-2.5-flash");
    let input = AnalysisInput {
        selection: first_selection(orch.engine()),
        images: vec![image("chart.png")],
        ..AnalysisInput::default()
    };

    let mut last = String::new();
    let err = orch
        .run_analysis(input, |text| last = text.to_string())
        .await
        .unwrap_err();

    assert_eq!(last, "命盤");
    match err {
        AnalysisError::Inference { partial, report, .. } => {
            assert_eq!(partial, "命盤");
            assert_eq!(report.kind, FailureKind::Generic);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unknown_category_is_a_prompt_error() {
    let transport = ScriptedTransport::new(vec![]);
    let orch = orchestrator(&transport, "gemini-2.5-flash");
    let input = AnalysisInput {
        selection: PromptSelection {
            category: "不存在".into(),
            ..PromptSelection::default()
        },
        images: vec![image("chart.png")],
        ..AnalysisInput::default()
    };

    let err = orch.run_analysis(input, |_| {}).await.unwrap_err();

    assert!(matches!(err, AnalysisError::Prompt(_)));
    assert!(transport.requests().is_empty());
}

struct StalledTransport;

#[async_trait]
impl InferenceTransport for StalledTransport {
    async fn open_stream(
        &self,
        _request: &celestial_lens::request::GenerationRequest,
    ) -> Result<FragmentStream, LLMError> {
        futures::future::pending().await
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

#[tokio::test(start_paused = true)]
async fn deadline_expires_while_opening_stream() {
    let config = AppConfig {
        model: "gemini-2.5-flash".into(),
        request_timeout_secs: Some(5),
        ..AppConfig::default()
    };
    let orch = AnalysisOrchestrator::new(&config, PromptEngine::default(), Box::new(StalledTransport));
    let input = AnalysisInput {
        selection: first_selection(orch.engine()),
        images: vec![image("chart.png")],
        ..AnalysisInput::default()
    };

    let err = orch.run_analysis(input, |_| {}).await.unwrap_err();

    match err {
        AnalysisError::Inference { source, report, partial } => {
            assert_eq!(source, LLMError::Timeout);
            assert_eq!(report.kind, FailureKind::Generic);
            assert!(partial.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn rate_limit_on_fallback_model_does_not_suggest_it_again() {
    let transport = ScriptedTransport::new(vec![Err(LLMError::RateLimited("quota exceeded".into()))]);
    let fallback = AppConfig::default().fallback_model;
    let orch = orchestrator(&transport, &fallback);
    let input = AnalysisInput {
        selection: first_selection(orch.engine()),
        images: vec![image("chart.png")],
        ..AnalysisInput::default()
    };

    let err = orch.run_analysis(input, |_| {}).await.unwrap_err();

    let report = err.report().expect("classified failure");
    assert_eq!(report.kind, FailureKind::RateLimited);
    assert!(!report.guidance.contains(&fallback));
}

#[tokio::test]
async fn fallback_model_budget_stays_within_ceiling() {
    let transport = ScriptedTransport::new(vec![fragments(&["x"])]);
    let orch = orchestrator(&transport, "gemini-2.5-flash");
    let input = AnalysisInput {
        selection: first_selection(orch.engine()),
        images: vec![image("chart.png")],
        ..AnalysisInput::default()
    };

    orch.run_analysis(input, |_| {}).await.unwrap();

    assert_eq!(transport.requests()[0].reasoning_budget, Some(24_576));
}
