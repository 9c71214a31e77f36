//! Infrastructure layer for rsgi-adapter.
//!
//! Everything that touches the outside world lives here.
//!
//! # Responsibilities
//!
//! - An in-memory ServerProtocol host that feeds a request body and records
//!   the terminal response call (used by the demo binary and the tests)
//! - Installing the `tracing` subscriber with the adapter's debug toggle
//!
//! # What does NOT belong here?
//!
//! - Scope translation, assembly and emission (that is the application layer)
//! - Configuration types (that is the domain layer)

pub mod logging;
pub mod loopback;

pub use logging::init_tracing;
pub use loopback::{LoopbackProtocol, RecordedResponse, ResponseOp};
