//! Response emission: [`Response`] → exactly one host operation.
//!
//! The decision, evaluated in order:
//!
//! 1. no status        → nothing is sent ([`Emission::Dropped`])
//! 2. a path is set    → `response_file`, whatever the body holds
//! 3. zero body chunks → `response_empty`
//! 4. one body chunk   → `response_bytes` with that chunk
//! 5. two or more      → `response_stream`, then every chunk in order
//!
//! The body buffer is cleared afterwards on every path, including failures,
//! so a spill file never outlives its request.

use rsgi_core::{BufferError, ServerProtocol, TransmitError};
use thiserror::Error;
use tracing::debug;

use crate::domain::{Emission, Response};

/// Failure while handing a response to the host.
#[derive(Debug, Error)]
pub enum EmitError {
    /// The buffered body could not be read back.
    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// The host rejected a streamed chunk.
    #[error(transparent)]
    Transmit(#[from] TransmitError),
}

/// Emits `response` through `protocol` and clears its body.
///
/// # Errors
///
/// Returns [`EmitError`] if the body cannot be read back or a streamed chunk
/// is rejected.  The host call has already been made at that point.
pub async fn emit_response(
    protocol: &dyn ServerProtocol,
    response: &mut Response,
) -> Result<Emission, EmitError> {
    let result = emit(protocol, response).await;
    response.body.clear();
    result
}

async fn emit(protocol: &dyn ServerProtocol, response: &mut Response) -> Result<Emission, EmitError> {
    let Some(status) = response.status else {
        debug!("no response start; nothing to emit");
        return Ok(Emission::Dropped);
    };
    let headers = std::mem::take(&mut response.headers);

    if let Some(path) = response.path.take() {
        protocol.response_file(status, headers, path.clone());
        return Ok(Emission::File { status, path });
    }

    match response.body.len() {
        0 => {
            protocol.response_empty(status, headers);
            Ok(Emission::Empty { status })
        }
        1 => {
            let body = response.body.read_all()?;
            let len = body.len();
            protocol.response_bytes(status, headers, body);
            Ok(Emission::Bytes { status, len })
        }
        chunks => {
            let mut transmitter = protocol.response_stream(status, headers);
            while let Some(chunk) = response.body.next_chunk()? {
                transmitter.send_bytes(chunk).await?;
            }
            Ok(Emission::Stream { status, chunks })
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
