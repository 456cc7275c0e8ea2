// inference/stream.rs — Folding streamed fragments into a growing buffer

use super::types::{FragmentStream, LLMError};
use futures::StreamExt;
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamStatus {
    Streaming,
    Completed,
    Failed,
}

/// Append-only buffer for one request; frozen once completed or failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamedResult {
    text: String,
    fragments: usize,
    status: StreamStatus,
}

impl StreamedResult {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            fragments: 0,
            status: StreamStatus::Streaming,
        }
    }

    /// Append a fragment and return the cumulative text.
    /// Appending to a finalized buffer is ignored.
    pub fn append(&mut self, fragment: &str) -> &str {
        if self.is_final() {
            tracing::warn!("Ignoring fragment appended after stream end");
            return &self.text;
        }
        self.text.push_str(fragment);
        self.fragments += 1;
        &self.text
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    pub fn status(&self) -> StreamStatus {
        self.status
    }

    pub fn is_final(&self) -> bool {
        self.status != StreamStatus::Streaming
    }

    fn complete(&mut self) {
        self.status = StreamStatus::Completed;
    }

    fn fail(&mut self) {
        self.status = StreamStatus::Failed;
    }
}

impl Default for StreamedResult {
    fn default() -> Self {
        Self::new()
    }
}

/// A stream that ended in error, with whatever text arrived before it
#[derive(Debug, Error)]
#[error("{error}")]
pub struct StreamFailure {
    pub error: LLMError,
    pub partial: StreamedResult,
}

/// Consume the stream, pushing the cumulative buffer to `on_update` after every fragment
pub async fn consume<F>(stream: FragmentStream, on_update: F) -> Result<StreamedResult, StreamFailure>
where
    F: FnMut(&str),
{
    consume_until(stream, None, on_update).await
}

/// Like [`consume`], but gives up with [`LLMError::Timeout`] once `deadline` passes
pub async fn consume_until<F>(
    mut stream: FragmentStream,
    deadline: Option<Instant>,
    mut on_update: F,
) -> Result<StreamedResult, StreamFailure>
where
    F: FnMut(&str),
{
    let mut result = StreamedResult::new();

    loop {
        let next = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, stream.next()).await {
                Ok(item) => item,
                Err(_) => Some(Err(LLMError::Timeout)),
            },
            None => stream.next().await,
        };

        match next {
            Some(Ok(fragment)) => {
                if fragment.is_empty() {
                    continue;
                }
                on_update(result.append(&fragment));
            }
            Some(Err(error)) => {
                result.fail();
                tracing::warn!(
                    fragments = result.fragment_count(),
                    "Stream failed: {}",
                    error
                );
                return Err(StreamFailure {
                    error,
                    partial: result,
                });
            }
            None => {
                result.complete();
                tracing::info!(
                    fragments = result.fragment_count(),
                    chars = result.text().chars().count(),
                    "Stream completed"
                );
                return Ok(result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::time::Duration;

    fn fragments(items: Vec<Result<&str, LLMError>>) -> FragmentStream {
        let owned: Vec<Result<String, LLMError>> =
            items.into_iter().map(|r| r.map(str::to_string)).collect();
        stream::iter(owned).boxed()
    }

    #[tokio::test]
    async fn test_cumulative_buffer_sequence() {
        let mut seen = Vec::new();
        let result = consume(fragments(vec![Ok("A"), Ok("B"), Ok("C")]), |text| {
            seen.push(text.to_string())
        })
        .await
        .unwrap();

        assert_eq!(seen, vec!["A", "AB", "ABC"]);
        assert_eq!(result.text(), "ABC");
        assert_eq!(result.status(), StreamStatus::Completed);
        assert_eq!(result.fragment_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_stream_completes_empty() {
        let result = consume(fragments(vec![]), |_| panic!("no updates expected"))
            .await
            .unwrap();
        assert_eq!(result.text(), "");
        assert!(result.is_final());
    }

    #[tokio::test]
    async fn test_error_keeps_partial_text() {
        let mut updates = 0;
        let failure = consume(
            fragments(vec![Ok("命"), Err(LLMError::RateLimited("quota".into())), Ok("never")]),
            |_| updates += 1,
        )
        .await
        .unwrap_err();

        assert_eq!(updates, 1);
        assert_eq!(failure.partial.text(), "命");
        assert_eq!(failure.partial.status(), StreamStatus::Failed);
        assert_eq!(failure.error.status_code(), Some(429));
    }

    #[tokio::test]
    async fn test_finalized_buffer_ignores_append() {
        let mut result = consume(fragments(vec![Ok("done")]), |_| {}).await.unwrap();
        assert_eq!(result.append("more"), "done");
        assert_eq!(result.fragment_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_times_out_pending_stream() {
        let slow = stream::once(async { Ok::<_, LLMError>("first".to_string()) })
            .chain(stream::pending())
            .boxed();
        let deadline = Instant::now() + Duration::from_secs(5);

        let failure = consume_until(slow, Some(deadline), |_| {}).await.unwrap_err();
        assert_eq!(failure.error, LLMError::Timeout);
        assert_eq!(failure.partial.text(), "first");
    }
}
