//! Application layer: the adapter itself.
//!
//! | Module                | Responsibility                                    |
//! |-----------------------|---------------------------------------------------|
//! | `scope_translator`    | ServerScope → HttpScope                           |
//! | `message_bridge`      | runs the application with receive/send channels   |
//! | `response_assembler`  | queued send events → Response model               |
//! | `response_emitter`    | Response model → one host operation               |
//! | `request_adapter`     | the four steps above, per request                 |
//! | `lifespan`            | startup / shutdown handshake state machine        |
//! | `bridge`              | [`RsgiBridge`], the host-facing entry point       |
//! | `demo`                | a small application for the demo binary and tests |

pub mod bridge;
pub mod demo;
pub mod lifespan;
pub mod message_bridge;
pub mod request_adapter;
pub mod response_assembler;
pub mod response_emitter;
pub mod scope_translator;

pub use bridge::RsgiBridge;
pub use lifespan::{LifespanCoordinator, LifespanError, LifespanState};
pub use message_bridge::{AppOutcome, BridgeRun, MessageBridge, ReceiveKind};
pub use request_adapter::RequestAdapter;
pub use response_assembler::assemble_response;
pub use response_emitter::{emit_response, EmitError};
pub use scope_translator::{translate_scope, ScopeError};
