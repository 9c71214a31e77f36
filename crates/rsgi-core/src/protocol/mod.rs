//! AppProtocol / ServerProtocol contracts.
//!
//! - [`messages`] – every event kind exchanged with the application.
//! - [`scope`]    – host-side and application-side scope types.
//! - [`channel`]  – the `receive` / `send` handles passed to the application.
//! - [`server`]   – the capability set a host server must expose.
//! - [`app`]      – the entry point an application must expose.

pub mod app;
pub mod channel;
pub mod messages;
pub mod scope;
pub mod server;

/// Default AppProtocol interface version advertised in every scope.
pub const DEFAULT_ASGI_VERSION: &str = "3.0";

/// Default AppProtocol HTTP spec version advertised in every scope.
pub const DEFAULT_SPEC_VERSION: &str = "2.3";
