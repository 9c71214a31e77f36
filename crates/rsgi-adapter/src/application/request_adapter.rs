//! The per-request adapter.
//!
//! One call to [`RequestAdapter::handle`] is one request:
//!
//! ```text
//!   ServerScope ──translate──▶ HttpScope
//!                                  │
//!                     MessageBridge (application task)
//!                                  │ queued events
//!                          assemble_response
//!                                  │ Response
//!                            emit_response ──▶ host server
//! ```
//!
//! Only an invalid scope is reported to the caller.  Everything that goes
//! wrong after translation (the application failing, the body buffer or the
//! host failing during emission) is logged and turned into an [`Emission`].

use std::future::Future;
use std::sync::Arc;

use rsgi_core::{Application, ServerProtocol, ServerScope, SharedState};
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::{AdapterConfig, Emission};

use super::message_bridge::{AppOutcome, MessageBridge};
use super::response_assembler::assemble_response;
use super::response_emitter::emit_response;
use super::scope_translator::{translate_scope, ScopeError};

/// Handles HTTP requests for one application.
///
/// Holds nothing request-specific; clones are cheap and may serve requests
/// concurrently.
#[derive(Clone)]
pub struct RequestAdapter {
    app: Arc<dyn Application>,
    config: Arc<AdapterConfig>,
    state: SharedState,
}

impl RequestAdapter {
    pub fn new(app: Arc<dyn Application>, config: Arc<AdapterConfig>, state: SharedState) -> Self {
        Self { app, config, state }
    }

    /// Serves one request to completion.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::InvalidInput`] if `scope` is missing or empty.
    /// The application is not invoked in that case.
    pub async fn handle(
        &self,
        scope: Option<&ServerScope>,
        protocol: Arc<dyn ServerProtocol>,
    ) -> Result<Emission, ScopeError> {
        self.handle_until(scope, protocol, std::future::pending())
            .await
    }

    /// Serves one request, giving up on the application once `cancel`
    /// resolves.
    ///
    /// Whatever the application sent before cancellation is still assembled
    /// and emitted.
    ///
    /// # Errors
    ///
    /// Same as [`RequestAdapter::handle`].
    pub async fn handle_until<C>(
        &self,
        scope: Option<&ServerScope>,
        protocol: Arc<dyn ServerProtocol>,
        cancel: C,
    ) -> Result<Emission, ScopeError>
    where
        C: Future<Output = ()> + Send,
    {
        let http_scope = translate_scope(scope, &self.config.asgi(), &self.state)?;

        let span = info_span!(
            "request",
            request_id = %Uuid::new_v4(),
            method = %http_scope.method,
            path = %http_scope.path,
        );

        async move {
            let bridge = MessageBridge::new(Arc::clone(&self.app), Arc::clone(&protocol));
            let mut run = bridge.run_until(http_scope, cancel).await;
            if run.outcome != AppOutcome::Completed {
                debug!(outcome = ?run.outcome, "emitting whatever the application sent");
            }

            let mut response = match assemble_response(&mut run.events, self.config.spool_threshold) {
                Ok(response) => response,
                Err(err) => {
                    warn!(error = %err, "response body could not be buffered; nothing emitted");
                    return Ok(Emission::Dropped);
                }
            };

            let status = response.status;
            match emit_response(protocol.as_ref(), &mut response).await {
                Ok(emission) => {
                    debug!(emission = emission.label(), "response emitted");
                    Ok(emission)
                }
                Err(err) => {
                    warn!(error = %err, "response emission failed");
                    Ok(Emission::Failed {
                        status: status.unwrap_or_default(),
                    })
                }
            }
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for RequestAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAdapter")
            .field("config", &self.config)
            .field("state_entries", &self.state.len())
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
