//! The lifespan coordinator.
//!
//! # What is the lifespan handshake? (for beginners)
//!
//! Before serving requests the host gives the application a chance to set
//! things up (open a database pool, warm a cache), and before exiting a
//! chance to tear them down.  The application is invoked once with a
//! lifespan scope and talks through the same `receive` / `send` channels:
//!
//! ```text
//!   coordinator                         application
//!   ───────────                         ───────────
//!   lifespan.startup            ──▶
//!                               ◀──     lifespan.startup.complete | .failed
//!        ... requests are served ...
//!   lifespan.shutdown           ──▶
//!                               ◀──     lifespan.shutdown.complete | .failed
//! ```
//!
//! # State machine
//!
//! ```text
//!   NotStarted ─startup()─▶ Starting ─complete─▶ Started ─shutdown()─▶ ShuttingDown ─complete─▶ Stopped
//!                              │ failed / app error                          │ app error
//!                              ▼                                             ▼
//!                           Errored ◀────────────────────────────────────────┘
//! ```
//!
//! An application that returns without ever answering simply does not
//! support lifespan; the coordinator then ends in `Stopped`.  An application
//! that *fails* without sending a `.failed` message is treated the same way
//! but ends in `Errored` and is flagged as unsupported.
//!
//! # Threading model
//!
//! The application runs in its own Tokio task.  Two one-shot signals, backed
//! by `tokio::sync::watch`, let `startup()` and `shutdown()` wait for it.
//! The task sets both signals when it ends, whatever the reason, so neither
//! waiter can hang on an application that has already gone away.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rsgi_core::{
    Application, AsgiVersion, ChannelError, LifespanScope, Message, MessageSink, Receiver, Scope,
    Sender, SharedState,
};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

use super::message_bridge::panic_message;

/// Where the lifespan handshake currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifespanState {
    NotStarted,
    Starting,
    Started,
    ShuttingDown,
    Stopped,
    Errored,
}

impl fmt::Display for LifespanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifespanState::NotStarted => "not-started",
            LifespanState::Starting => "starting",
            LifespanState::Started => "started",
            LifespanState::ShuttingDown => "shutting-down",
            LifespanState::Stopped => "stopped",
            LifespanState::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Errors reported by the lifespan coordinator and the bridge on top of it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifespanError {
    /// `startup()` was called a second time.
    #[error("lifespan already started (state: {state})")]
    AlreadyStarted { state: LifespanState },

    /// Startup errored and the configuration says not to serve.
    #[error("lifespan startup failed: {reason}")]
    StartupAborted { reason: String },
}

// ── Signals ───────────────────────────────────────────────────────────────────

/// A one-shot flag that can be awaited.
#[derive(Clone)]
struct Signal(Arc<watch::Sender<bool>>);

impl Signal {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self(Arc::new(tx))
    }

    fn set(&self) {
        self.0.send_replace(true);
    }

    fn is_set(&self) -> bool {
        *self.0.borrow()
    }

    async fn wait(&self) {
        let mut rx = self.0.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|set| *set).await;
    }
}

// ── Shared handshake state ────────────────────────────────────────────────────

#[derive(Debug)]
struct Status {
    state: LifespanState,
    unsupported: bool,
    startup_failed: bool,
    shutdown_failed: bool,
    error: Option<String>,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            state: LifespanState::NotStarted,
            unsupported: false,
            startup_failed: false,
            shutdown_failed: false,
            error: None,
        }
    }
}

struct Handshake {
    status: Mutex<Status>,
    startup: Signal,
    shutdown: Signal,
}

impl Handshake {
    fn new() -> Self {
        Self {
            status: Mutex::new(Status::default()),
            startup: Signal::new(),
            shutdown: Signal::new(),
        }
    }

    fn status(&self) -> MutexGuard<'_, Status> {
        // Never held across an await.
        self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Applies one message sent by the application.
    fn dispatch(&self, message: Message) -> Result<(), ChannelError> {
        let kind = message.type_name();
        match message {
            Message::LifespanStartupComplete => {
                self.expect_startup_pending(kind)?;
                self.status().state = LifespanState::Started;
                info!("lifespan startup complete");
                self.startup.set();
            }
            Message::LifespanStartupFailed { message } => {
                self.expect_startup_pending(kind)?;
                {
                    let mut status = self.status();
                    status.startup_failed = true;
                    status.state = LifespanState::Errored;
                }
                log_failure("startup", message.as_deref());
                self.startup.set();
            }
            Message::LifespanShutdownComplete => {
                self.expect_shutdown_pending(kind)?;
                self.status().state = LifespanState::Stopped;
                info!("lifespan shutdown complete");
                self.shutdown.set();
            }
            Message::LifespanShutdownFailed { message } => {
                self.expect_shutdown_pending(kind)?;
                {
                    let mut status = self.status();
                    status.shutdown_failed = true;
                    status.state = LifespanState::Stopped;
                }
                log_failure("shutdown", message.as_deref());
                self.shutdown.set();
            }
            _ => {
                error!(kind, "unexpected message during lifespan");
                return Err(ChannelError::UnexpectedMessage { kind });
            }
        }
        Ok(())
    }

    fn expect_startup_pending(&self, kind: &'static str) -> Result<(), ChannelError> {
        if self.startup.is_set() || self.shutdown.is_set() {
            return Err(self.invalid_transition(kind));
        }
        Ok(())
    }

    fn expect_shutdown_pending(&self, kind: &'static str) -> Result<(), ChannelError> {
        if !self.startup.is_set() || self.shutdown.is_set() {
            return Err(self.invalid_transition(kind));
        }
        Ok(())
    }

    fn invalid_transition(&self, kind: &'static str) -> ChannelError {
        let state = self.status().state.to_string();
        error!(kind, %state, "lifespan message out of order");
        ChannelError::InvalidTransition {
            message: kind,
            state,
        }
    }

    /// Records that the application failed outside the handshake protocol.
    fn mark_errored(&self, failure: String) {
        let mut status = self.status();
        status.state = LifespanState::Errored;
        if !status.startup_failed && !status.shutdown_failed {
            status.unsupported = true;
            warn!(error = %failure, "application lifespan failed; treating lifespan as unsupported");
        } else {
            debug!(error = %failure, "application raised after reporting lifespan failure");
        }
        status.error = Some(failure);
    }
}

fn log_failure(phase: &str, message: Option<&str>) {
    match message.filter(|text| !text.is_empty()) {
        Some(text) => error!(phase, reason = text, "lifespan {phase} failed"),
        None => error!(phase, "lifespan {phase} failed"),
    }
}

/// Backs the application's `send` channel during lifespan.
struct LifespanSink {
    handshake: Arc<Handshake>,
}

#[async_trait]
impl MessageSink for LifespanSink {
    async fn send(&self, message: Message) -> Result<(), ChannelError> {
        self.handshake.dispatch(message)
    }
}

// ── Coordinator ───────────────────────────────────────────────────────────────

/// Runs the lifespan handshake for one application, once per process.
pub struct LifespanCoordinator {
    app: Arc<dyn Application>,
    asgi: AsgiVersion,
    shared: SharedState,
    handshake: Arc<Handshake>,
    events: mpsc::UnboundedSender<Message>,
    pending: Option<mpsc::UnboundedReceiver<Message>>,
    task: Option<JoinHandle<()>>,
    app_task: Option<AbortHandle>,
}

impl LifespanCoordinator {
    pub fn new(app: Arc<dyn Application>, asgi: AsgiVersion) -> Self {
        let (events, pending) = mpsc::unbounded_channel();
        Self {
            app,
            asgi,
            shared: SharedState::new(),
            handshake: Arc::new(Handshake::new()),
            events,
            pending: Some(pending),
            task: None,
            app_task: None,
        }
    }

    /// Sends `lifespan.startup` and waits until the application answers or
    /// ends.
    ///
    /// The outcome is read from [`state`](Self::state) and the failure
    /// accessors; an application failure is never returned as an error.
    ///
    /// # Errors
    ///
    /// Returns [`LifespanError::AlreadyStarted`] if called more than once.
    pub async fn startup(&mut self) -> Result<(), LifespanError> {
        let Some(pending) = self.pending.take() else {
            return Err(LifespanError::AlreadyStarted {
                state: self.state(),
            });
        };
        self.handshake.status().state = LifespanState::Starting;
        debug!("lifespan startup");

        // Queued before the task starts so it is the first thing received.
        let _ = self.events.send(Message::LifespanStartup);

        let scope = Scope::Lifespan(LifespanScope {
            asgi: self.asgi.clone(),
            state: self.shared.clone(),
        });
        let receive = Receiver::new(pending);
        let send = Sender::new(LifespanSink {
            handshake: Arc::clone(&self.handshake),
        });

        let app = Arc::clone(&self.app);
        let app_task = tokio::spawn(async move { app.call(scope, receive, send).await });
        self.app_task = Some(app_task.abort_handle());

        let handshake = Arc::clone(&self.handshake);
        self.task = Some(tokio::spawn(async move {
            let failure = match app_task.await {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(format!("{err:#}")),
                Err(join) if join.is_panic() => Some(panic_message(join.into_panic())),
                Err(_) => None,
            };
            if let Some(failure) = failure {
                handshake.mark_errored(failure);
            }
            handshake.startup.set();
            handshake.shutdown.set();
        }));

        self.handshake.startup.wait().await;

        let state = {
            let mut status = self.handshake.status();
            if status.state == LifespanState::Starting {
                debug!("application returned without answering lifespan startup");
                status.state = LifespanState::Stopped;
            }
            status.state
        };
        if state == LifespanState::Errored {
            self.abort_tasks();
        }
        Ok(())
    }

    /// Sends `lifespan.shutdown` and waits until the application answers or
    /// ends.
    ///
    /// The shared state is cleared first.  If lifespan errored, never ran or
    /// already stopped, this returns at once without sending anything.
    pub async fn shutdown(&mut self) {
        self.shared.clear();

        match self.state() {
            LifespanState::Errored => {
                debug!("lifespan errored; skipping shutdown handshake");
                return;
            }
            LifespanState::NotStarted | LifespanState::Stopped => return,
            _ => {}
        }

        self.handshake.status().state = LifespanState::ShuttingDown;
        debug!("lifespan shutdown");
        let _ = self.events.send(Message::LifespanShutdown);

        self.handshake.shutdown.wait().await;

        let mut status = self.handshake.status();
        if status.state == LifespanState::ShuttingDown {
            debug!("application returned without answering lifespan shutdown");
            status.state = LifespanState::Stopped;
        }
        drop(status);
        // The background task only sets flags from here on; let it finish.
        self.task = None;
        self.app_task = None;
    }

    fn abort_tasks(&mut self) {
        if let Some(app_task) = self.app_task.take() {
            app_task.abort();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn state(&self) -> LifespanState {
        self.handshake.status().state
    }

    /// `true` once the application failed, reported a startup failure or
    /// raised during shutdown.
    pub fn is_errored(&self) -> bool {
        self.state() == LifespanState::Errored
    }

    /// `true` if the application raised without ever sending a `.failed`
    /// message.
    pub fn is_unsupported(&self) -> bool {
        self.handshake.status().unsupported
    }

    pub fn startup_failed(&self) -> bool {
        self.handshake.status().startup_failed
    }

    pub fn shutdown_failed(&self) -> bool {
        self.handshake.status().shutdown_failed
    }

    /// The application's failure, if it raised or panicked.
    pub fn error(&self) -> Option<String> {
        self.handshake.status().error.clone()
    }

    /// The process-wide state shared with every request scope.
    pub fn state_handle(&self) -> &SharedState {
        &self.shared
    }
}

impl Drop for LifespanCoordinator {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

impl fmt::Debug for LifespanCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifespanCoordinator")
            .field("status", &*self.handshake.status())
            .field("asgi", &self.asgi)
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
