//! Integration tests for the lifespan handshake through [`RsgiBridge`].
//!
//! # Purpose
//!
//! These tests run the full startup → requests → shutdown sequence a host
//! server performs, with applications that behave well, fail politely, fail
//! loudly, or ignore lifespan altogether.  They verify:
//!
//! - Startup returns as soon as the application answers, not when it exits.
//! - Shutdown always returns (no deadlock), whatever the application did.
//! - The abort policy turns an errored startup into an error for the host.
//! - State stored during startup is visible to requests and cleared on
//!   shutdown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rsgi_adapter::application::{demo::DemoApp, LifespanError, LifespanState, RsgiBridge};
use rsgi_adapter::domain::AdapterConfig;
use rsgi_adapter::infrastructure::LoopbackProtocol;
use rsgi_core::{Message, Receiver, Scope, Sender, ServerScope};
use tokio::time::timeout;

const DEADLINE: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_full_lifecycle_with_demo_app() {
    // Arrange
    let mut bridge = RsgiBridge::new(DemoApp::default(), AdapterConfig::default());

    // Act: startup, one request, shutdown
    let state = timeout(DEADLINE, bridge.startup()).await.unwrap().unwrap();
    let shared = bridge.lifespan().state_handle().clone();
    let scope = ServerScope {
        proto: "http".to_string(),
        method: "GET".to_string(),
        path: Some("/state".to_string()),
        ..ServerScope::default()
    };
    let protocol = Arc::new(LoopbackProtocol::new(vec![]));
    bridge.handle(Some(&scope), protocol.clone()).await.unwrap();
    timeout(DEADLINE, bridge.shutdown()).await.unwrap();

    // Assert
    assert_eq!(state, LifespanState::Started);
    assert_eq!(
        protocol.response().unwrap().body().as_ref(),
        b"hello from lifespan"
    );
    assert_eq!(bridge.lifespan().state(), LifespanState::Stopped);
    assert!(shared.is_empty(), "shutdown clears the shared state");
}

#[tokio::test]
async fn test_startup_returns_before_application_exits() {
    // Arrange: the application keeps running after answering startup
    let app = |_scope: Scope, mut receive: Receiver, send: Sender| async move {
        receive.receive().await?;
        send.send(Message::LifespanStartupComplete).await?;
        receive.receive().await?;
        send.send(Message::LifespanShutdownComplete).await?;
        Ok::<(), anyhow::Error>(())
    };
    let mut bridge = RsgiBridge::new(app, AdapterConfig::default());

    // Act
    let state = timeout(DEADLINE, bridge.startup()).await.unwrap().unwrap();

    // Assert
    assert_eq!(state, LifespanState::Started);
    timeout(DEADLINE, bridge.shutdown()).await.unwrap();
    assert_eq!(bridge.lifespan().state(), LifespanState::Stopped);
}

#[tokio::test]
async fn test_raising_application_does_not_block_and_skips_shutdown() {
    // Arrange: count how many times the application is invoked
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let app = move |_scope: Scope, _receive: Receiver, _send: Sender| {
        counted.fetch_add(1, Ordering::SeqCst);
        async move { Err::<(), _>(anyhow::anyhow!("lifespan is not supported here")) }
    };
    let mut bridge = RsgiBridge::new(app, AdapterConfig::default());

    // Act
    let state = timeout(DEADLINE, bridge.startup()).await.unwrap().unwrap();
    timeout(DEADLINE, bridge.shutdown()).await.unwrap();

    // Assert
    assert_eq!(state, LifespanState::Errored);
    assert!(bridge.lifespan().is_unsupported());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(bridge.lifespan().state(), LifespanState::Errored);
}

#[tokio::test]
async fn test_abort_policy_rejects_errored_startup() {
    let app = |_scope: Scope, _receive: Receiver, _send: Sender| async move {
        Err::<(), _>(anyhow::anyhow!("cannot connect"))
    };
    let config = AdapterConfig {
        abort_on_lifespan_error: true,
        ..AdapterConfig::default()
    };
    let mut bridge = RsgiBridge::new(app, config);

    let result = timeout(DEADLINE, bridge.startup()).await.unwrap();

    assert_eq!(
        result,
        Err(LifespanError::StartupAborted {
            reason: "cannot connect".to_string()
        })
    );
}

#[tokio::test]
async fn test_requests_are_served_after_tolerated_startup_failure() {
    let app = |scope: Scope, mut receive: Receiver, send: Sender| async move {
        match scope {
            Scope::Lifespan(_) => {
                receive.receive().await?;
                send.send(Message::LifespanStartupFailed { message: None }).await?;
            }
            Scope::Http(_) => {
                send.send(Message::response_start(200, vec![])).await?;
                send.send(Message::response_body("still serving", false)).await?;
            }
        }
        Ok::<(), anyhow::Error>(())
    };
    let mut bridge = RsgiBridge::new(app, AdapterConfig::default());
    bridge.startup().await.unwrap();
    let scope = ServerScope {
        proto: "http".to_string(),
        method: "GET".to_string(),
        path: Some("/".to_string()),
        ..ServerScope::default()
    };
    let protocol = Arc::new(LoopbackProtocol::new(vec![]));

    bridge.handle(Some(&scope), protocol.clone()).await.unwrap();

    assert!(bridge.lifespan().startup_failed());
    assert_eq!(protocol.response().unwrap().body().as_ref(), b"still serving");
}

#[tokio::test]
async fn test_application_ignoring_lifespan_stops_cleanly() {
    let app = |_scope: Scope, _receive: Receiver, _send: Sender| async move {
        Ok::<(), anyhow::Error>(())
    };
    let mut bridge = RsgiBridge::new(app, AdapterConfig::default());

    let state = timeout(DEADLINE, bridge.startup()).await.unwrap().unwrap();
    timeout(DEADLINE, bridge.shutdown()).await.unwrap();

    assert_eq!(state, LifespanState::Stopped);
    assert!(!bridge.lifespan().is_errored());
}
