// inference/sse.rs — Server-sent events decoding over a byte stream

use super::types::LLMError;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

/// Incremental SSE decoder. Bytes are buffered until a full line is seen, so
/// multi-byte UTF-8 sequences split across network chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning the data payloads of every completed event
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&line);

            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing event not terminated by a blank line
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest).into_owned();
            let line = line.trim_end_matches('\r');
            if let Some(event) = self.process_line(line) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(value) = line.strip_prefix("data:") {
            self.data
                .push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let event = self.data.join("\n");
        self.data.clear();
        Some(event)
    }
}

struct EventState<S> {
    bytes: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, LLMError>>,
    done: bool,
}

/// Turn a byte stream into a stream of SSE data payloads. A transport error
/// is yielded once and ends the stream.
pub fn event_stream<S, B, E>(bytes: S) -> BoxStream<'static, Result<String, LLMError>>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = EventState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.done {
                return None;
            }

            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    st.pending
                        .extend(st.decoder.push(chunk.as_ref()).into_iter().map(Ok));
                }
                Some(Err(e)) => {
                    st.done = true;
                    st.pending
                        .push_back(Err(LLMError::NetworkError(format!("Stream interrupted: {}", e))));
                }
                None => {
                    st.done = true;
                    if let Some(event) = st.decoder.finish() {
                        st.pending.push_back(Ok(event));
                    }
                }
            }
        }
    })
    .boxed()
}
