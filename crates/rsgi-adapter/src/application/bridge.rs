//! [`RsgiBridge`]: the object a host server talks to.
//!
//! It owns the application, the configuration and the lifespan coordinator,
//! and hands each request to a [`RequestAdapter`] that shares the lifespan
//! state.  The host drives it in three phases:
//!
//! ```text
//!   startup()  once, before the first request
//!   handle()   once per request, possibly concurrently
//!   shutdown() once, after the last request
//! ```

use std::future::Future;
use std::sync::Arc;

use rsgi_core::{Application, ServerProtocol, ServerScope};
use tracing::{error, info};

use crate::domain::{AdapterConfig, Emission};

use super::lifespan::{LifespanCoordinator, LifespanError, LifespanState};
use super::request_adapter::RequestAdapter;
use super::scope_translator::ScopeError;

/// Runs one AppProtocol application on a ServerProtocol host.
pub struct RsgiBridge {
    config: Arc<AdapterConfig>,
    lifespan: LifespanCoordinator,
    requests: RequestAdapter,
}

impl RsgiBridge {
    pub fn new(app: impl Application, config: AdapterConfig) -> Self {
        Self::from_arc(Arc::new(app), config)
    }

    /// Builds a bridge around an application that is already shared.
    pub fn from_arc(app: Arc<dyn Application>, config: AdapterConfig) -> Self {
        let config = Arc::new(config);
        let lifespan = LifespanCoordinator::new(Arc::clone(&app), config.asgi());
        let requests = RequestAdapter::new(
            app,
            Arc::clone(&config),
            lifespan.state_handle().clone(),
        );
        Self {
            config,
            lifespan,
            requests,
        }
    }

    /// Runs the lifespan startup handshake.
    ///
    /// # Errors
    ///
    /// Returns [`LifespanError::StartupAborted`] when startup errored and
    /// `abort_on_lifespan_error` is set, and [`LifespanError::AlreadyStarted`]
    /// on a second call.  Without the abort policy an errored startup is
    /// logged and serving continues.
    pub async fn startup(&mut self) -> Result<LifespanState, LifespanError> {
        self.lifespan.startup().await?;
        let state = self.lifespan.state();

        if state == LifespanState::Errored {
            let reason = self
                .lifespan
                .error()
                .unwrap_or_else(|| "application reported startup failure".to_string());
            if self.config.abort_on_lifespan_error {
                error!(%reason, "lifespan startup failed; refusing to serve");
                return Err(LifespanError::StartupAborted { reason });
            }
            info!(%reason, "lifespan startup errored; serving without it");
        }
        Ok(state)
    }

    /// Serves one request.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::InvalidInput`] for a missing or empty scope.
    pub async fn handle(
        &self,
        scope: Option<&ServerScope>,
        protocol: Arc<dyn ServerProtocol>,
    ) -> Result<Emission, ScopeError> {
        self.request_adapter().handle(scope, protocol).await
    }

    /// Serves one request until `cancel` resolves.
    ///
    /// # Errors
    ///
    /// Same as [`RsgiBridge::handle`].
    pub async fn handle_until<C>(
        &self,
        scope: Option<&ServerScope>,
        protocol: Arc<dyn ServerProtocol>,
        cancel: C,
    ) -> Result<Emission, ScopeError>
    where
        C: Future<Output = ()> + Send,
    {
        self.request_adapter()
            .handle_until(scope, protocol, cancel)
            .await
    }

    /// Runs the lifespan shutdown handshake.
    pub async fn shutdown(&mut self) {
        self.lifespan.shutdown().await;
        info!(state = %self.lifespan.state(), "lifespan finished");
    }

    /// A fresh request handler sharing this bridge's application, config and
    /// lifespan state; can be moved into per-connection tasks.
    pub fn request_adapter(&self) -> RequestAdapter {
        self.requests.clone()
    }

    pub fn lifespan(&self) -> &LifespanCoordinator {
        &self.lifespan
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }
}

impl std::fmt::Debug for RsgiBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsgiBridge")
            .field("config", &self.config)
            .field("lifespan", &self.lifespan)
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
