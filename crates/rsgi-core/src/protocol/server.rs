//! The capability set a host server exposes to the adapter.
//!
//! A host server adapter (or a test double) implements [`ServerProtocol`]:
//!
//! 1. A lazy sequence of inbound body chunks ([`ServerProtocol::next_chunk`]).
//!    End of body is an explicit `None`, never an error.
//! 2. Four terminal response operations.  The adapter calls exactly one of
//!    them per request, or none at all when the application never started a
//!    response.
//!
//! The streaming operation returns a [`StreamTransmitter`] that receives the
//! body chunks one by one.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use super::messages::ResponseHeaders;

/// A host-side failure while streaming a response body.
#[derive(Debug, Error)]
pub enum TransmitError {
    /// The client went away before the stream finished.
    #[error("stream closed by peer")]
    Closed,

    /// Any other host-reported failure.
    #[error("transmit failed: {0}")]
    Host(String),
}

/// An open streaming response on the host server.
#[async_trait]
pub trait StreamTransmitter: Send {
    async fn send_bytes(&mut self, chunk: Bytes) -> Result<(), TransmitError>;
}

/// The protocol object for one request on the host server.
#[async_trait]
pub trait ServerProtocol: Send + Sync {
    /// Pulls the next inbound request body chunk; `None` once exhausted.
    async fn next_chunk(&self) -> Option<Bytes>;

    /// Responds with headers only.
    fn response_empty(&self, status: u16, headers: ResponseHeaders);

    /// Responds with a single in-memory body.
    fn response_bytes(&self, status: u16, headers: ResponseHeaders, body: Bytes);

    /// Responds with the content of a file on disk.
    fn response_file(&self, status: u16, headers: ResponseHeaders, file: PathBuf);

    /// Starts a streaming response; the body follows through the transmitter.
    fn response_stream(&self, status: u16, headers: ResponseHeaders)
        -> Box<dyn StreamTransmitter>;
}
