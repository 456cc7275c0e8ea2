// inference/mod.rs — Inference transport trait and stream consumer

pub mod gemini;
mod sse;
mod stream;
mod types;

pub use gemini::GeminiAdapter;
pub use sse::{event_stream, SseDecoder};
pub use stream::{consume, consume_until, StreamFailure, StreamStatus, StreamedResult};
pub use types::{FragmentStream, LLMError};

use crate::request::GenerationRequest;
use async_trait::async_trait;

/// A remote multimodal service that answers with a stream of text fragments
#[async_trait]
pub trait InferenceTransport: Send + Sync {
    /// Open one streaming request. Rejections that happen before any fragment
    /// is produced (bad parameters, quota) are returned here.
    async fn open_stream(&self, request: &GenerationRequest) -> Result<FragmentStream, LLMError>;

    /// Provider name
    fn name(&self) -> &str;
}
