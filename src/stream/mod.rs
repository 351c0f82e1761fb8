//! Streaming chat responses.
//!
//! The body is a sequence of `data: ` lines. Each carries either the literal
//! `[DONE]` sentinel or a JSON object with optional `content` and `thinking`
//! fields. A cancellation token armed with the stream timeout bounds the
//! whole call and is disarmed as soon as the stream ends.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::{ApiClient, PendingRequest, Transport};
use crate::error::{ClientError, Result};
use crate::types::{StreamEvent, StreamPayload, StreamRequest, StreamSummary};

/// Streaming endpoint.
pub const STREAM_PATH: &str = "/chat/api/stream/";

const DONE_SENTINEL: &str = "[DONE]";

/// One decoded `data:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    Payload(StreamPayload),
    Done,
}

impl StreamFrame {
    /// Events in delivery order: thinking before content.
    pub fn into_events(self) -> Vec<StreamEvent> {
        match self {
            Self::Done => vec![StreamEvent::Done],
            Self::Payload(payload) => payload
                .thinking
                .map(StreamEvent::Thinking)
                .into_iter()
                .chain(payload.content.map(StreamEvent::Content))
                .collect(),
        }
    }
}

/// Decode one line. Blank lines, comments, non-data fields and unparseable
/// payloads yield `None`.
pub fn parse_stream_line(line: &str) -> Option<StreamFrame> {
    let line = line.trim_end_matches('\r');
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data).trim();
    if data == DONE_SENTINEL {
        return Some(StreamFrame::Done);
    }
    match serde_json::from_str::<StreamPayload>(data) {
        Ok(payload) => Some(StreamFrame::Payload(payload)),
        Err(err) => {
            debug!(error = %err, data, "skipping unparseable stream payload");
            None
        }
    }
}

/// Reassembles lines from arbitrarily split body chunks.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Feed a chunk; returns every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            lines.push(String::from_utf8_lossy(&line[..end]).into_owned());
        }
        lines
    }

    /// Whatever is left once the body has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// Cancels a token after a deadline unless dropped first.
struct ArmedTimeout {
    timer: JoinHandle<()>,
}

impl ArmedTimeout {
    fn arm(token: CancellationToken, timeout: Duration, fired: Arc<AtomicBool>) -> Self {
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            fired.store(true, Ordering::SeqCst);
            token.cancel();
        });
        Self { timer }
    }
}

impl Drop for ArmedTimeout {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

enum Raced<T> {
    Cancelled,
    Ready(T),
}

/// A running stream of [`StreamEvent`]s.
///
/// Dropping it or calling [`cancel`](Self::cancel) aborts the request.
pub struct EventStream {
    cancel: CancellationToken,
    inner: BoxStream<'static, Result<StreamEvent>>,
}

impl EventStream {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Stream for EventStream {
    type Item = Result<StreamEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

type TextCallback = Box<dyn FnMut(&str) + Send>;

/// Callbacks driven by [`ApiClient::stream_chat`].
#[derive(Default)]
pub struct StreamCallbacks {
    on_message: Option<TextCallback>,
    on_thinking: Option<TextCallback>,
    on_error: Option<Box<dyn FnMut(&ClientError) + Send>>,
    on_complete: Option<Box<dyn FnMut() + Send>>,
}

impl StreamCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_message(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_message = Some(Box::new(f));
        self
    }

    pub fn on_thinking(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_thinking = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnMut(&ClientError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }
}

impl ApiClient {
    /// Open the streaming endpoint.
    ///
    /// The initial response goes through the same single-refresh protocol as
    /// every other call. The configured stream timeout bounds everything up
    /// to the last event and yields [`ClientError::Timeout`] when it fires.
    pub fn stream_events(&self, request: &StreamRequest) -> Result<EventStream> {
        let pending = PendingRequest::post(STREAM_PATH, request)?;
        let timeout = self.config().stream_timeout;
        let cancel = CancellationToken::new();
        let fired = Arc::new(AtomicBool::new(false));
        let client = self.clone();
        let token = cancel.clone();

        let inner = async_stream::stream! {
            let _armed = ArmedTimeout::arm(token.clone(), timeout, fired.clone());
            let interrupted = || {
                if fired.load(Ordering::SeqCst) {
                    ClientError::Timeout(timeout.as_millis() as u64)
                } else {
                    ClientError::Cancelled
                }
            };

            let opened = tokio::select! {
                biased;
                _ = token.cancelled() => Raced::Cancelled,
                result = client.dispatch(pending, Transport::Streaming) => Raced::Ready(result),
            };
            let response = match opened {
                Raced::Cancelled => {
                    yield Err(interrupted());
                    return;
                }
                Raced::Ready(Err(err)) => {
                    yield Err(err);
                    return;
                }
                Raced::Ready(Ok(response)) => response,
            };

            let mut body = response.bytes_stream();
            let mut lines = LineBuffer::default();
            loop {
                let next = tokio::select! {
                    biased;
                    _ = token.cancelled() => Raced::Cancelled,
                    chunk = body.next() => Raced::Ready(chunk),
                };
                let chunk = match next {
                    Raced::Cancelled => {
                        yield Err(interrupted());
                        return;
                    }
                    Raced::Ready(None) => break,
                    Raced::Ready(Some(Err(err))) => {
                        yield Err(ClientError::Stream(err.to_string()));
                        return;
                    }
                    Raced::Ready(Some(Ok(chunk))) => chunk,
                };
                for line in lines.push(&chunk) {
                    let Some(frame) = parse_stream_line(&line) else { continue };
                    for event in frame.into_events() {
                        let done = event == StreamEvent::Done;
                        yield Ok(event);
                        if done {
                            return;
                        }
                    }
                }
            }

            if let Some(frame) = lines.finish().as_deref().and_then(parse_stream_line) {
                for event in frame.into_events() {
                    yield Ok(event);
                }
            }
        };

        Ok(EventStream {
            cancel,
            inner: Box::pin(inner),
        })
    }

    /// Stream a reply, dispatching events to `callbacks`.
    ///
    /// `on_complete` runs once when the stream ends normally (sentinel or
    /// end of body); `on_error` runs once on failure, after which the error
    /// is also returned.
    pub async fn stream_chat(
        &self,
        request: &StreamRequest,
        mut callbacks: StreamCallbacks,
    ) -> Result<StreamSummary> {
        let mut summary = StreamSummary::default();
        let mut events = match self.stream_events(request) {
            Ok(events) => events,
            Err(err) => {
                if let Some(on_error) = callbacks.on_error.as_mut() {
                    on_error(&err);
                }
                return Err(err);
            }
        };

        while let Some(event) = events.next().await {
            match event {
                Ok(StreamEvent::Content(text)) => {
                    if let Some(on_message) = callbacks.on_message.as_mut() {
                        on_message(&text);
                    }
                    summary.content.push_str(&text);
                }
                Ok(StreamEvent::Thinking(text)) => {
                    if let Some(on_thinking) = callbacks.on_thinking.as_mut() {
                        on_thinking(&text);
                    }
                    summary.thinking.push_str(&text);
                }
                Ok(StreamEvent::Done) => {
                    summary.finished = true;
                    break;
                }
                Err(err) => {
                    if let Some(on_error) = callbacks.on_error.as_mut() {
                        on_error(&err);
                    }
                    return Err(err);
                }
            }
        }

        if let Some(on_complete) = callbacks.on_complete.as_mut() {
            on_complete();
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn content_line_decodes() {
        assert_eq!(
            parse_stream_line(r#"data: {"content":"hi"}"#).map(StreamFrame::into_events),
            Some(vec![StreamEvent::Content("hi".into())])
        );
    }

    #[test]
    fn done_sentinel_decodes() {
        assert_eq!(parse_stream_line("data: [DONE]"), Some(StreamFrame::Done));
        assert_eq!(parse_stream_line("data: [DONE]\r"), Some(StreamFrame::Done));
    }

    #[test]
    fn thinking_comes_before_content() {
        let frame = parse_stream_line(r#"data: {"content":"answer","thinking":"hmm"}"#).unwrap();
        assert_eq!(
            frame.into_events(),
            vec![
                StreamEvent::Thinking("hmm".into()),
                StreamEvent::Content("answer".into())
            ]
        );
    }

    #[test]
    fn noise_is_skipped() {
        assert_eq!(parse_stream_line(""), None);
        assert_eq!(parse_stream_line(": keep-alive"), None);
        assert_eq!(parse_stream_line("event: message"), None);
        assert_eq!(parse_stream_line("data: not json"), None);
    }

    #[test]
    fn empty_object_yields_no_events() {
        let frame = parse_stream_line("data: {}").unwrap();
        assert!(frame.into_events().is_empty());
    }

    #[test]
    fn lines_reassemble_across_chunks() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"data: {\"con").is_empty());
        assert_eq!(
            buffer.push(b"tent\":\"hi\"}\n\ndata: [DO"),
            vec![r#"data: {"content":"hi"}"#.to_string(), String::new()]
        );
        assert_eq!(buffer.push(b"NE]\n"), vec!["data: [DONE]".to_string()]);
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn multibyte_text_split_mid_character() {
        let text = "data: {\"content\":\"你好\"}\n".as_bytes();
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(&text[..20]).is_empty());
        let lines = buffer.push(&text[20..]);
        assert_eq!(
            parse_stream_line(&lines[0]).map(StreamFrame::into_events),
            Some(vec![StreamEvent::Content("你好".into())])
        );
    }
}
