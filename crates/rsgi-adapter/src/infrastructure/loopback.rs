//! An in-memory ServerProtocol host.
//!
//! [`LoopbackProtocol`] plays the host server's part for one request without
//! any sockets: it hands out a fixed list of body chunks and records every
//! terminal response call so it can be inspected afterwards.
//!
//! ```text
//!   chunks ──next_chunk()──▶ adapter ──response_*()──▶ recorded responses
//! ```
//!
//! A correct adapter makes at most one response call per request, so
//! [`LoopbackProtocol::responses`] should never hold more than one entry.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use rsgi_core::{ResponseHeaders, ServerProtocol, StreamTransmitter, TransmitError};

/// Which terminal operation the adapter called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOp {
    Empty,
    Bytes,
    File(PathBuf),
    Stream,
}

/// One recorded terminal response call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedResponse {
    pub op: ResponseOp,
    pub status: u16,
    pub headers: ResponseHeaders,
    /// The body as received: one entry for `Bytes`, one per chunk for
    /// `Stream`, none for `Empty` and `File`.
    pub chunks: Vec<Bytes>,
}

impl RecordedResponse {
    /// The body chunks joined together.
    pub fn body(&self) -> Bytes {
        let mut body = BytesMut::new();
        for chunk in &self.chunks {
            body.extend_from_slice(chunk);
        }
        body.freeze()
    }

    /// The first header value with this name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

type Recorded = Arc<Mutex<Vec<RecordedResponse>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// An in-memory host for one request.
#[derive(Debug, Default)]
pub struct LoopbackProtocol {
    inbound: Mutex<VecDeque<Bytes>>,
    recorded: Recorded,
    stream_limit: Option<usize>,
}

impl LoopbackProtocol {
    /// A host whose request body is `chunks`, in order.
    pub fn new(chunks: Vec<Bytes>) -> Self {
        Self {
            inbound: Mutex::new(chunks.into()),
            recorded: Arc::default(),
            stream_limit: None,
        }
    }

    /// Makes streamed responses fail with [`TransmitError::Closed`] after
    /// `limit` chunks, as if the client hung up.
    pub fn with_stream_limit(mut self, limit: usize) -> Self {
        self.stream_limit = Some(limit);
        self
    }

    /// Every terminal call made so far.
    pub fn responses(&self) -> Vec<RecordedResponse> {
        lock(&self.recorded).clone()
    }

    /// The single terminal call, if one was made.
    pub fn response(&self) -> Option<RecordedResponse> {
        lock(&self.recorded).first().cloned()
    }

    /// Request body chunks the adapter has not pulled yet.
    pub fn remaining_chunks(&self) -> usize {
        lock(&self.inbound).len()
    }

    fn record(&self, op: ResponseOp, status: u16, headers: ResponseHeaders, chunks: Vec<Bytes>) {
        lock(&self.recorded).push(RecordedResponse {
            op,
            status,
            headers,
            chunks,
        });
    }
}

#[async_trait]
impl ServerProtocol for LoopbackProtocol {
    async fn next_chunk(&self) -> Option<Bytes> {
        lock(&self.inbound).pop_front()
    }

    fn response_empty(&self, status: u16, headers: ResponseHeaders) {
        self.record(ResponseOp::Empty, status, headers, Vec::new());
    }

    fn response_bytes(&self, status: u16, headers: ResponseHeaders, body: Bytes) {
        self.record(ResponseOp::Bytes, status, headers, vec![body]);
    }

    fn response_file(&self, status: u16, headers: ResponseHeaders, file: PathBuf) {
        self.record(ResponseOp::File(file), status, headers, Vec::new());
    }

    fn response_stream(&self, status: u16, headers: ResponseHeaders) -> Box<dyn StreamTransmitter> {
        let index = {
            let mut recorded = lock(&self.recorded);
            recorded.push(RecordedResponse {
                op: ResponseOp::Stream,
                status,
                headers,
                chunks: Vec::new(),
            });
            recorded.len() - 1
        };
        Box::new(LoopbackTransmitter {
            recorded: Arc::clone(&self.recorded),
            index,
            remaining: self.stream_limit,
        })
    }
}

/// Appends streamed chunks to the recorded response they belong to.
struct LoopbackTransmitter {
    recorded: Recorded,
    index: usize,
    remaining: Option<usize>,
}

#[async_trait]
impl StreamTransmitter for LoopbackTransmitter {
    async fn send_bytes(&mut self, chunk: Bytes) -> Result<(), TransmitError> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Err(TransmitError::Closed);
            }
            *remaining -= 1;
        }
        let mut recorded = lock(&self.recorded);
        let response = recorded
            .get_mut(self.index)
            .ok_or_else(|| TransmitError::Host("recorded response vanished".to_string()))?;
        response.chunks.push(chunk);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_chunks_are_handed_out_in_order_then_none() {
        let protocol = LoopbackProtocol::new(vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]);

        assert_eq!(protocol.next_chunk().await, Some(Bytes::from_static(b"a")));
        assert_eq!(protocol.next_chunk().await, Some(Bytes::from_static(b"b")));
        assert_eq!(protocol.next_chunk().await, None);
        assert_eq!(protocol.next_chunk().await, None);
    }

    #[tokio::test]
    async fn test_stream_records_chunks() {
        // Arrange
        let protocol = LoopbackProtocol::new(vec![]);

        // Act
        let mut tx = protocol.response_stream(200, vec![("x".into(), "y".into())]);
        tx.send_bytes(Bytes::from_static(b"he")).await.unwrap();
        tx.send_bytes(Bytes::from_static(b"llo")).await.unwrap();

        // Assert
        let recorded = protocol.response().unwrap();
        assert_eq!(recorded.op, ResponseOp::Stream);
        assert_eq!(recorded.body(), Bytes::from_static(b"hello"));
        assert_eq!(recorded.header("X"), Some("y"));
    }

    #[tokio::test]
    async fn test_stream_limit_closes_stream() {
        let protocol = LoopbackProtocol::new(vec![]).with_stream_limit(1);
        let mut tx = protocol.response_stream(200, vec![]);

        assert!(tx.send_bytes(Bytes::from_static(b"1")).await.is_ok());
        assert!(matches!(
            tx.send_bytes(Bytes::from_static(b"2")).await,
            Err(TransmitError::Closed)
        ));
    }

    #[test]
    fn test_each_terminal_call_is_recorded() {
        let protocol = LoopbackProtocol::new(vec![]);

        protocol.response_empty(204, vec![]);
        protocol.response_file(200, vec![], PathBuf::from("/a"));

        let ops: Vec<ResponseOp> = protocol.responses().into_iter().map(|r| r.op).collect();
        assert_eq!(ops, vec![ResponseOp::Empty, ResponseOp::File(PathBuf::from("/a"))]);
    }
}
