//! The application entry point.
//!
//! An AppProtocol application is anything that can be called with a scope and
//! the two channel handles.  It is invoked once per HTTP request and once per
//! process for the lifespan handshake; [`Scope`] tells the two apart.
//!
//! Plain async closures qualify through the blanket impl:
//!
//! ```rust
//! use rsgi_core::{Application, Message, Receiver, Scope, Sender};
//!
//! let app = |_scope: Scope, _receive: Receiver, send: Sender| async move {
//!     send.send(Message::response_start(204, vec![])).await?;
//!     Ok::<(), anyhow::Error>(())
//! };
//! fn assert_app<A: Application>(_: &A) {}
//! assert_app(&app);
//! ```

use std::future::Future;

use async_trait::async_trait;

use super::channel::{Receiver, Sender};
use super::scope::Scope;

/// A callable AppProtocol application.
#[async_trait]
pub trait Application: Send + Sync + 'static {
    /// Runs the application for one scope.
    ///
    /// Returning an error (or panicking) is absorbed by the adapter: for a
    /// request the events sent so far still become the response, for the
    /// lifespan handshake the coordinator is marked errored.
    async fn call(&self, scope: Scope, receive: Receiver, send: Sender) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> Application for F
where
    F: Fn(Scope, Receiver, Sender) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn call(&self, scope: Scope, receive: Receiver, send: Sender) -> anyhow::Result<()> {
        (self)(scope, receive, send).await
    }
}
