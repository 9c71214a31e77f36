//! Domain layer for rsgi-adapter.
//!
//! Plain data types with no dependency on the async runtime:
//!
//! - [`AdapterConfig`] – versions, spill threshold, lifespan policy, debug flag.
//! - [`Response`] – the response model assembled from the application's
//!   events, and [`Emission`], the terminal operation chosen for it.

pub mod config;
pub mod response;

pub use config::{AdapterConfig, ConfigError, DEBUG_ENV_VAR};
pub use response::{Emission, Response, ResponseKind};
