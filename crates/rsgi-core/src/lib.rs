//! # rsgi-core
//!
//! Shared vocabulary for running an AppProtocol application (a single async
//! entry point called with `scope`, `receive` and `send`) on top of a
//! ServerProtocol host (a server that hands over a scope object plus a
//! protocol object with direct response-construction methods).
//!
//! This crate has no sockets and no server loop.  It defines:
//!
//! - **`protocol`** – The event vocabulary exchanged with the application
//!   ([`Message`]), the scope types on both sides of the adapter, the
//!   `receive`/`send` channel handles, and the capability traits that a host
//!   server ([`ServerProtocol`]) and an application ([`Application`]) must
//!   implement.
//!
//! - **`body`** – The [`BodyBuffer`]: an append-only, sequentially consumed
//!   byte container that keeps small responses in memory and transparently
//!   spills large ones to a temporary file.
//!
//! # How the pieces fit together (for beginners)
//!
//! ```text
//! Host server ──(ServerScope, ServerProtocol)──▶ adapter
//!                                                  │
//!                        HttpScope + Receiver + Sender
//!                                                  ▼
//!                                             Application
//! ```
//!
//! The adapter itself (scope translation, the message bridge, response
//! assembly and emission, lifespan) lives in the `rsgi-adapter` crate.

pub mod body;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `rsgi_core::Message` instead of `rsgi_core::protocol::messages::Message`.
pub use body::{BodyBuffer, BufferError, Payload, DEFAULT_SPOOL_THRESHOLD};
pub use protocol::app::Application;
pub use protocol::channel::{ChannelError, MessageSink, MessageSource, Receiver, Sender};
pub use protocol::messages::{Headers, Message, ResponseHeaders};
pub use protocol::scope::{
    AsgiVersion, HttpScope, LifespanScope, Scope, ServerScope, SharedState,
};
pub use protocol::server::{ServerProtocol, StreamTransmitter, TransmitError};
