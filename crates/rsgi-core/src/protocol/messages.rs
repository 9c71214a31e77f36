//! The AppProtocol event vocabulary.
//!
//! Every value that crosses the `receive` / `send` boundary is a [`Message`].
//! The `type` strings returned by [`Message::type_name`] are byte-for-byte the
//! ones defined by the upstream HTTP and lifespan specifications, so logs and
//! any dynamic dispatch on the type name interoperate with other servers.
//!
//! # Direction of each message
//!
//! ```text
//! adapter ──▶ application   http.request, http.disconnect,
//!                           lifespan.startup, lifespan.shutdown
//! application ──▶ adapter   http.response.start, http.response.body,
//!                           http.response.pathsend,
//!                           lifespan.{startup,shutdown}.{complete,failed}
//! ```

use std::path::PathBuf;

use bytes::Bytes;

use crate::body::Payload;

/// Header list in AppProtocol form: byte pairs, insertion order preserved,
/// duplicates allowed.
pub type Headers = Vec<(Vec<u8>, Vec<u8>)>;

/// Header list in ServerProtocol form: text pairs handed to the host server.
pub type ResponseHeaders = Vec<(String, String)>;

// ── Type strings ──────────────────────────────────────────────────────────────

pub const HTTP_REQUEST: &str = "http.request";
pub const HTTP_DISCONNECT: &str = "http.disconnect";
pub const HTTP_RESPONSE_START: &str = "http.response.start";
pub const HTTP_RESPONSE_BODY: &str = "http.response.body";
pub const HTTP_RESPONSE_PATHSEND: &str = "http.response.pathsend";
pub const LIFESPAN_STARTUP: &str = "lifespan.startup";
pub const LIFESPAN_STARTUP_COMPLETE: &str = "lifespan.startup.complete";
pub const LIFESPAN_STARTUP_FAILED: &str = "lifespan.startup.failed";
pub const LIFESPAN_SHUTDOWN: &str = "lifespan.shutdown";
pub const LIFESPAN_SHUTDOWN_COMPLETE: &str = "lifespan.shutdown.complete";
pub const LIFESPAN_SHUTDOWN_FAILED: &str = "lifespan.shutdown.failed";

/// One event exchanged between the adapter and the application.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A request body chunk.  `more_body == false` marks the end of the body.
    HttpRequest { body: Bytes, more_body: bool },

    /// The client side is gone, or the response has already been completed.
    HttpDisconnect,

    /// Starts the response.  The latest one received wins.
    HttpResponseStart {
        status: u16,
        headers: Headers,
        trailers: bool,
    },

    /// A response body chunk.
    ///
    /// `more_body` is `None` when the application did not set the flag at
    /// all; only an explicit `Some(false)` terminates the response.
    HttpResponseBody {
        body: Payload,
        more_body: Option<bool>,
    },

    /// Asks the host server to send a file as the response body.
    HttpResponsePathSend { path: PathBuf },

    LifespanStartup,
    LifespanStartupComplete,
    LifespanStartupFailed { message: Option<String> },
    LifespanShutdown,
    LifespanShutdownComplete,
    LifespanShutdownFailed { message: Option<String> },
}

impl Message {
    /// Returns the AppProtocol `type` string for this message.
    pub fn type_name(&self) -> &'static str {
        match self {
            Message::HttpRequest { .. } => HTTP_REQUEST,
            Message::HttpDisconnect => HTTP_DISCONNECT,
            Message::HttpResponseStart { .. } => HTTP_RESPONSE_START,
            Message::HttpResponseBody { .. } => HTTP_RESPONSE_BODY,
            Message::HttpResponsePathSend { .. } => HTTP_RESPONSE_PATHSEND,
            Message::LifespanStartup => LIFESPAN_STARTUP,
            Message::LifespanStartupComplete => LIFESPAN_STARTUP_COMPLETE,
            Message::LifespanStartupFailed { .. } => LIFESPAN_STARTUP_FAILED,
            Message::LifespanShutdown => LIFESPAN_SHUTDOWN,
            Message::LifespanShutdownComplete => LIFESPAN_SHUTDOWN_COMPLETE,
            Message::LifespanShutdownFailed { .. } => LIFESPAN_SHUTDOWN_FAILED,
        }
    }

    /// The message's more-data flag, if it carries one.
    pub fn more_body(&self) -> Option<bool> {
        match self {
            Message::HttpRequest { more_body, .. } => Some(*more_body),
            Message::HttpResponseBody { more_body, .. } => *more_body,
            _ => None,
        }
    }

    /// Convenience constructor for `http.response.start` without trailers.
    pub fn response_start(status: u16, headers: Headers) -> Self {
        Message::HttpResponseStart {
            status,
            headers,
            trailers: false,
        }
    }

    /// Convenience constructor for `http.response.body`.
    pub fn response_body(body: impl Into<Payload>, more_body: bool) -> Self {
        Message::HttpResponseBody {
            body: body.into(),
            more_body: Some(more_body),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_type_names_match_upstream_strings() {
        assert_eq!(
            Message::HttpRequest {
                body: Bytes::new(),
                more_body: false
            }
            .type_name(),
            "http.request"
        );
        assert_eq!(Message::HttpDisconnect.type_name(), "http.disconnect");
        assert_eq!(
            Message::response_start(200, vec![]).type_name(),
            "http.response.start"
        );
        assert_eq!(
            Message::response_body(b"x".to_vec(), false).type_name(),
            "http.response.body"
        );
        assert_eq!(
            Message::HttpResponsePathSend {
                path: PathBuf::from("a.txt")
            }
            .type_name(),
            "http.response.pathsend"
        );
    }

    #[test]
    fn test_lifespan_type_names_match_upstream_strings() {
        let cases = [
            (Message::LifespanStartup, "lifespan.startup"),
            (Message::LifespanStartupComplete, "lifespan.startup.complete"),
            (
                Message::LifespanStartupFailed { message: None },
                "lifespan.startup.failed",
            ),
            (Message::LifespanShutdown, "lifespan.shutdown"),
            (Message::LifespanShutdownComplete, "lifespan.shutdown.complete"),
            (
                Message::LifespanShutdownFailed { message: None },
                "lifespan.shutdown.failed",
            ),
        ];
        for (msg, expected) in cases {
            assert_eq!(msg.type_name(), expected);
        }
    }

    #[test]
    fn test_more_body_is_none_when_flag_not_set() {
        let msg = Message::HttpResponseBody {
            body: Payload::from("hi"),
            more_body: None,
        };
        assert_eq!(msg.more_body(), None);
    }

    #[test]
    fn test_more_body_reports_explicit_false() {
        let msg = Message::response_body("hi", false);
        assert_eq!(msg.more_body(), Some(false));
    }

    #[test]
    fn test_more_body_absent_on_control_messages() {
        assert_eq!(Message::LifespanStartup.more_body(), None);
        assert_eq!(Message::response_start(204, vec![]).more_body(), None);
    }
}
