//! rsgi-adapter library crate.
//!
//! Lets an application written against the AppProtocol interface (one async
//! entry point called with `scope`, `receive` and `send`) run unmodified on a
//! ServerProtocol host server (scope object + protocol object with direct
//! response-construction methods).
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Host server (ServerScope + ServerProtocol)
//!         ↕
//! [rsgi-adapter]
//!   ├── domain/           Pure types: AdapterConfig, Response model
//!   ├── application/      Scope translation, message bridge, assembly,
//!   │                     emission, lifespan coordination
//!   └── infrastructure/
//!         ├── loopback/   In-memory host server (tests, demo binary)
//!         └── logging/    tracing setup and the debug toggle
//!         ↕
//! Application (HttpScope + Receiver + Sender)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no async code and no I/O beyond reading a config file.
//! - `application` depends on `domain` and `rsgi-core` only.
//! - `infrastructure` may depend on every other layer.
//!
//! # Typical use
//!
//! ```no_run
//! use std::sync::Arc;
//! use rsgi_adapter::application::{demo::DemoApp, RsgiBridge};
//! use rsgi_adapter::domain::AdapterConfig;
//! use rsgi_adapter::infrastructure::loopback::LoopbackProtocol;
//! use rsgi_core::ServerScope;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mut bridge = RsgiBridge::new(DemoApp::default(), AdapterConfig::default());
//! bridge.startup().await?;
//!
//! let scope = ServerScope { proto: "http".into(), method: "GET".into(), path: Some("/".into()), ..Default::default() };
//! let protocol = Arc::new(LoopbackProtocol::new(Vec::new()));
//! bridge.handle(Some(&scope), protocol.clone()).await?;
//!
//! bridge.shutdown().await;
//! # Ok(())
//! # }
//! ```

/// Domain layer: configuration and the response model.
pub mod domain;

/// Application layer: the adapter itself.
pub mod application;

/// Infrastructure layer: in-memory host server and logging.
pub mod infrastructure;
