//! The `receive` / `send` handles given to the application.
//!
//! An AppProtocol application pulls inbound events by calling `receive()` and
//! pushes outbound events by calling `send(event)`.  Here both sides are plain
//! handles backed by a trait object, so the adapter can plug in a different
//! backend for HTTP requests and for the lifespan handshake while the
//! application sees a single API.
//!
//! # Backends
//!
//! | Handle       | HTTP request backend            | Lifespan backend          |
//! |--------------|---------------------------------|---------------------------|
//! | [`Receiver`] | pulls host body chunks lazily   | lifespan event queue      |
//! | [`Sender`]   | enqueues for response assembly  | state-machine dispatcher  |

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::messages::Message;

/// Errors returned by `receive()` / `send()`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The other side of the channel is gone.
    #[error("channel closed")]
    Closed,

    /// The message kind is not accepted on this channel.
    #[error("unexpected message type '{kind}'")]
    UnexpectedMessage { kind: &'static str },

    /// The message arrived in an order the handshake does not allow.
    ///
    /// This is a contract violation by the application, not a recoverable
    /// runtime condition.
    #[error("invalid lifespan state transition: '{message}' received while {state}")]
    InvalidTransition { message: &'static str, state: String },
}

/// Produces inbound messages for an application.
#[async_trait]
pub trait MessageSource: Send {
    async fn receive(&mut self) -> Result<Message, ChannelError>;
}

/// Accepts outbound messages from an application.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), ChannelError>;
}

#[async_trait]
impl MessageSource for mpsc::UnboundedReceiver<Message> {
    async fn receive(&mut self) -> Result<Message, ChannelError> {
        self.recv().await.ok_or(ChannelError::Closed)
    }
}

/// The application's `receive` callable.
pub struct Receiver {
    source: Box<dyn MessageSource>,
}

impl Receiver {
    pub fn new(source: impl MessageSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// Waits for the next inbound message.
    pub async fn receive(&mut self) -> Result<Message, ChannelError> {
        self.source.receive().await
    }
}

impl std::fmt::Debug for Receiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver").finish_non_exhaustive()
    }
}

/// The application's `send` callable.  Cheap to clone.
#[derive(Clone)]
pub struct Sender {
    sink: Arc<dyn MessageSink>,
}

impl Sender {
    pub fn new(sink: impl MessageSink + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Hands one outbound message to the adapter.
    pub async fn send(&self, message: Message) -> Result<(), ChannelError> {
        self.sink.send(message).await
    }
}

impl std::fmt::Debug for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender").finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectingSink {
        seen: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl MessageSink for Arc<CollectingSink> {
        async fn send(&self, message: Message) -> Result<(), ChannelError> {
            self.seen.lock().unwrap().push(message.type_name());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_queue_receiver_yields_messages_in_order() {
        // Arrange
        let (tx, rx) = mpsc::unbounded_channel();
        let mut receiver = Receiver::new(rx);
        tx.send(Message::LifespanStartup).unwrap();
        tx.send(Message::LifespanShutdown).unwrap();

        // Act / Assert
        assert_eq!(receiver.receive().await, Ok(Message::LifespanStartup));
        assert_eq!(receiver.receive().await, Ok(Message::LifespanShutdown));
    }

    #[tokio::test]
    async fn test_queue_receiver_reports_closed_after_sender_dropped() {
        let (tx, rx) = mpsc::unbounded_channel::<Message>();
        let mut receiver = Receiver::new(rx);
        drop(tx);

        assert_eq!(receiver.receive().await, Err(ChannelError::Closed));
    }

    #[tokio::test]
    async fn test_sender_clones_share_one_sink() {
        let sink = Arc::new(CollectingSink::default());
        let sender = Sender::new(Arc::clone(&sink));
        let clone = sender.clone();

        sender.send(Message::LifespanStartupComplete).await.unwrap();
        clone.send(Message::LifespanShutdownComplete).await.unwrap();

        assert_eq!(
            *sink.seen.lock().unwrap(),
            vec!["lifespan.startup.complete", "lifespan.shutdown.complete"]
        );
    }

    #[test]
    fn test_invalid_transition_display_names_message_and_state() {
        let err = ChannelError::InvalidTransition {
            message: "lifespan.shutdown.complete",
            state: "starting".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid lifespan state transition: 'lifespan.shutdown.complete' received while starting"
        );
    }
}
