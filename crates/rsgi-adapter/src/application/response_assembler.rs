//! Response assembly: queued send events → [`Response`].
//!
//! Runs after the application has finished (or was cancelled) and folds the
//! queue into one response model:
//!
//! | Event                    | Effect                                          |
//! |--------------------------|-------------------------------------------------|
//! | `http.response.start`    | record status; decode header pairs to text      |
//! | `http.response.body`     | append the chunk to the body buffer             |
//! | `http.response.pathsend` | record the path and tag the response            |
//! | anything else            | ignored                                         |
//!
//! Events are folded strictly in the order the application sent them.

use rsgi_core::{BufferError, Message};
use tokio::sync::mpsc;
use tracing::trace;

use crate::domain::{Response, ResponseKind};

/// Drains `events` into a fresh [`Response`].
///
/// # Errors
///
/// Returns [`BufferError`] if the body's spill file cannot be written.
pub fn assemble_response(
    events: &mut mpsc::UnboundedReceiver<Message>,
    spool_threshold: usize,
) -> Result<Response, BufferError> {
    let mut response = Response::new(spool_threshold);
    while let Ok(message) = events.try_recv() {
        apply(&mut response, message)?;
    }
    Ok(response)
}

fn apply(response: &mut Response, message: Message) -> Result<(), BufferError> {
    match message {
        Message::HttpResponseStart {
            status, headers, ..
        } => {
            response.status = Some(status);
            response.headers = headers
                .into_iter()
                .map(|(name, value)| {
                    (
                        String::from_utf8_lossy(&name).into_owned(),
                        String::from_utf8_lossy(&value).into_owned(),
                    )
                })
                .collect();
        }
        Message::HttpResponseBody { body, .. } => {
            response.body.append(body)?;
        }
        Message::HttpResponsePathSend { path } => {
            response.path = Some(path);
            response.kind = Some(ResponseKind::PathSend);
        }
        other => trace!(kind = other.type_name(), "ignoring event during assembly"),
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use rsgi_core::Payload;
    use std::path::PathBuf;

    fn queue(messages: Vec<Message>) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        for message in messages {
            tx.send(message).unwrap();
        }
        rx
    }

    #[test]
    fn test_start_and_body_are_folded_in_order() {
        // Arrange
        let mut events = queue(vec![
            Message::response_start(
                201,
                vec![(b"content-type".to_vec(), b"text/plain".to_vec())],
            ),
            Message::response_body("he", true),
            Message::response_body("llo", false),
        ]);

        // Act
        let mut response = assemble_response(&mut events, 1024).unwrap();

        // Assert
        assert_eq!(response.status, Some(201));
        assert_eq!(
            response.headers,
            vec![("content-type".to_string(), "text/plain".to_string())]
        );
        assert_eq!(response.body.len(), 2);
        assert_eq!(response.body.next_chunk().unwrap(), Some(Bytes::from_static(b"he")));
        assert_eq!(response.body.next_chunk().unwrap(), Some(Bytes::from_static(b"llo")));
    }

    #[test]
    fn test_pathsend_records_path_and_kind() {
        let mut events = queue(vec![
            Message::response_start(200, vec![]),
            Message::HttpResponsePathSend { path: PathBuf::from("/tmp/a.txt") },
        ]);

        let response = assemble_response(&mut events, 1024).unwrap();

        assert_eq!(response.path, Some(PathBuf::from("/tmp/a.txt")));
        assert_eq!(response.kind, Some(ResponseKind::PathSend));
    }

    #[test]
    fn test_empty_queue_gives_unstarted_response() {
        let mut events = queue(vec![]);
        let response = assemble_response(&mut events, 1024).unwrap();
        assert!(!response.is_started());
    }

    #[test]
    fn test_unknown_events_are_ignored() {
        let mut events = queue(vec![
            Message::HttpDisconnect,
            Message::LifespanStartupComplete,
            Message::response_start(204, vec![]),
        ]);

        let response = assemble_response(&mut events, 1024).unwrap();

        assert_eq!(response.status, Some(204));
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_unsupported_body_is_dropped_without_failing() {
        let mut events = queue(vec![
            Message::response_start(200, vec![]),
            Message::HttpResponseBody {
                body: Payload::unsupported("i64"),
                more_body: Some(false),
            },
        ]);

        let response = assemble_response(&mut events, 1024).unwrap();

        assert!(response.body.is_empty());
    }

    #[test]
    fn test_invalid_utf8_header_bytes_are_replaced() {
        let mut events = queue(vec![Message::response_start(
            200,
            vec![(b"x-raw".to_vec(), vec![0xFF, b'a'])],
        )]);

        let response = assemble_response(&mut events, 1024).unwrap();

        assert_eq!(response.headers[0].1, "\u{FFFD}a");
    }

    #[test]
    fn test_body_before_start_is_kept_but_response_unstarted() {
        let mut events = queue(vec![Message::response_body("orphan", false)]);

        let response = assemble_response(&mut events, 1024).unwrap();

        assert!(!response.is_started());
        assert_eq!(response.body.len(), 1);
    }
}
