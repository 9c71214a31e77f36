//! The response model.
//!
//! A [`Response`] is created empty for each request, filled by the response
//! assembler from the application's send events, consumed once by the
//! response emitter and then cleared.  It is never shared between requests.

use std::path::PathBuf;

use rsgi_core::{BodyBuffer, ResponseHeaders, DEFAULT_SPOOL_THRESHOLD};

/// Terminal kind recorded while assembling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// The application asked for a file via `http.response.pathsend`.
    PathSend,
}

/// Everything collected about one response.
#[derive(Debug)]
pub struct Response {
    /// `None` until an `http.response.start` event is seen.
    pub status: Option<u16>,
    pub headers: ResponseHeaders,
    pub body: BodyBuffer,
    pub path: Option<PathBuf>,
    pub kind: Option<ResponseKind>,
}

impl Response {
    /// Creates an empty model whose body spills to disk beyond `spool_threshold`.
    pub fn new(spool_threshold: usize) -> Self {
        Self {
            status: None,
            headers: Vec::new(),
            body: BodyBuffer::new(spool_threshold),
            path: None,
            kind: None,
        }
    }

    /// `true` once a response start has been observed.
    pub fn is_started(&self) -> bool {
        self.status.is_some()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(DEFAULT_SPOOL_THRESHOLD)
    }
}

/// The terminal host operation performed for a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    /// No response was started; nothing was sent to the host.
    Dropped,
    File { status: u16, path: PathBuf },
    Empty { status: u16 },
    Bytes { status: u16, len: usize },
    Stream { status: u16, chunks: usize },
    /// Emission began but the body could not be read back or the host
    /// rejected a chunk.
    Failed { status: u16 },
}

impl Emission {
    /// Short label for log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Emission::Dropped => "dropped",
            Emission::File { .. } => "file",
            Emission::Empty { .. } => "empty",
            Emission::Bytes { .. } => "bytes",
            Emission::Stream { .. } => "stream",
            Emission::Failed { .. } => "failed",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
