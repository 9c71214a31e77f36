//! The message bridge: one application invocation for one request.
//!
//! The two sides disagree on who drives:
//!
//! - the application *pulls* request body chunks with `receive()` and *pushes*
//!   response events with `send()`;
//! - the host server expects the adapter to pull chunks from it and finish
//!   with exactly one terminal response call.
//!
//! The bridge reconciles them with two explicit channels instead of closures
//! that mutate shared flags:
//!
//! ```text
//!   host body ──next_chunk()──▶ HttpReceiveSource ──receive()──▶ application
//!                                     ▲ watch<ReceiveKind>
//!   response queue ◀──mpsc── HttpSendSink ◀──────send()────────── application
//! ```
//!
//! The application runs in its own Tokio task so that an error, a panic or a
//! cancellation is observed here as a value.  None of them reaches the caller:
//! whatever was queued before the failure is handed on for assembly.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use rsgi_core::{
    Application, ChannelError, HttpScope, Message, MessageSink, MessageSource, Receiver, Scope,
    Sender, ServerProtocol,
};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};

/// Which kind of event `receive()` currently reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveKind {
    /// `http.request` events carrying body chunks.
    Request,
    /// `http.disconnect`, once the application has finished its response.
    Disconnect,
}

/// How the application invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppOutcome {
    Completed,
    /// The application returned an error.
    Failed(String),
    /// The application panicked.
    Panicked(String),
    /// The invocation was cancelled before it finished.
    Cancelled,
}

/// The result of one bridge run: how the application ended and the queue of
/// everything it sent.
#[derive(Debug)]
pub struct BridgeRun {
    pub outcome: AppOutcome,
    pub events: mpsc::UnboundedReceiver<Message>,
}

// ── receive() backend ─────────────────────────────────────────────────────────

struct HttpReceiveSource {
    protocol: Arc<dyn ServerProtocol>,
    kind: watch::Receiver<ReceiveKind>,
}

#[async_trait]
impl MessageSource for HttpReceiveSource {
    async fn receive(&mut self) -> Result<Message, ChannelError> {
        let pulled = self.protocol.next_chunk().await;
        if *self.kind.borrow() == ReceiveKind::Disconnect {
            return Ok(Message::HttpDisconnect);
        }
        // An exhausted body is reported as an ordinary final chunk, never as
        // an error.
        Ok(match pulled {
            Some(body) => Message::HttpRequest {
                body,
                more_body: true,
            },
            None => Message::HttpRequest {
                body: Bytes::new(),
                more_body: false,
            },
        })
    }
}

// ── send() backend ────────────────────────────────────────────────────────────

struct HttpSendSink {
    queue: mpsc::UnboundedSender<Message>,
    kind: watch::Sender<ReceiveKind>,
}

#[async_trait]
impl MessageSink for HttpSendSink {
    async fn send(&self, message: Message) -> Result<(), ChannelError> {
        if message.more_body() == Some(false) {
            self.kind.send_replace(ReceiveKind::Disconnect);
        }
        self.queue.send(message).map_err(|_| ChannelError::Closed)
    }
}

// ── Application task ──────────────────────────────────────────────────────────

/// The spawned application, aborted when dropped.
///
/// A host cancels a request by dropping its future; the application must not
/// outlive it.
struct AppTask(JoinHandle<anyhow::Result<()>>);

impl Drop for AppTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

// ── Bridge ────────────────────────────────────────────────────────────────────

/// Drives one application invocation against one request.
pub struct MessageBridge {
    app: Arc<dyn Application>,
    protocol: Arc<dyn ServerProtocol>,
}

impl MessageBridge {
    pub fn new(app: Arc<dyn Application>, protocol: Arc<dyn ServerProtocol>) -> Self {
        Self { app, protocol }
    }

    /// Runs the application to completion.
    pub async fn run(&self, scope: HttpScope) -> BridgeRun {
        self.run_until(scope, std::future::pending()).await
    }

    /// Runs the application until it finishes or `cancel` resolves.
    ///
    /// On cancellation the application task is aborted and the events it
    /// queued so far are still returned.
    pub async fn run_until<C>(&self, scope: HttpScope, cancel: C) -> BridgeRun
    where
        C: Future<Output = ()> + Send,
    {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (kind_tx, kind_rx) = watch::channel(ReceiveKind::Request);

        let receive = Receiver::new(HttpReceiveSource {
            protocol: Arc::clone(&self.protocol),
            kind: kind_rx,
        });
        let send = Sender::new(HttpSendSink {
            queue: queue_tx,
            kind: kind_tx,
        });

        let app = Arc::clone(&self.app);
        let mut task = AppTask(tokio::spawn(async move {
            app.call(Scope::Http(scope), receive, send).await
        }));

        let outcome = tokio::select! {
            joined = &mut task.0 => classify(joined),
            () = cancel => {
                task.0.abort();
                // Wait for the abort to land so no event can be queued after
                // assembly has started.  An application that already finished
                // keeps its own outcome.
                classify((&mut task.0).await)
            }
        };

        BridgeRun {
            outcome,
            events: queue_rx,
        }
    }
}

/// Turns the application task's join result into an [`AppOutcome`], logging
/// every abnormal ending.
pub(crate) fn classify(joined: Result<anyhow::Result<()>, JoinError>) -> AppOutcome {
    match joined {
        Ok(Ok(())) => AppOutcome::Completed,
        Ok(Err(err)) => {
            warn!(error = ?err, "application raised an error");
            AppOutcome::Failed(format!("{err:#}"))
        }
        Err(join) if join.is_cancelled() => {
            debug!("application cancelled");
            AppOutcome::Cancelled
        }
        Err(join) => {
            let message = panic_message(join.into_panic());
            warn!(panic = %message, "application panicked");
            AppOutcome::Panicked(message)
        }
    }
}

/// Extracts the text of a panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
