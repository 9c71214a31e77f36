//! Response body storage.
//!
//! [`Payload`] is the data carried by an `http.response.body` event.
//! [`BodyBuffer`] collects those payloads for one response, in order, until
//! the adapter decides how to hand them to the host server.

mod buffer;

pub use buffer::{BodyBuffer, BufferError, DEFAULT_SPOOL_THRESHOLD};

use bytes::Bytes;

/// Data carried by a response body event.
///
/// Only bytes and text can be buffered.  `Unsupported` stands for any other
/// value an application managed to put in a body field (for example when the
/// event was decoded from a loosely typed source); the buffer logs it and
/// drops it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Bytes(Bytes),
    /// Converted to UTF-8 bytes when buffered.
    Text(String),
    Unsupported { type_name: String },
}

impl Payload {
    pub fn unsupported(type_name: impl Into<String>) -> Self {
        Payload::Unsupported {
            type_name: type_name.into(),
        }
    }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self {
        Payload::Bytes(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(value))
    }
}

impl From<&'static [u8]> for Payload {
    fn from(value: &'static [u8]) -> Self {
        Payload::Bytes(Bytes::from_static(value))
    }
}

impl<const N: usize> From<&'static [u8; N]> for Payload {
    fn from(value: &'static [u8; N]) -> Self {
        Payload::Bytes(Bytes::from_static(value))
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_string())
    }
}
