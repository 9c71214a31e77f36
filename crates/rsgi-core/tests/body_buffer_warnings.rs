//! Integration test for the unsupported-payload warning.
//!
//! Kept in its own test binary so the capturing subscriber is the only
//! dispatcher that ever sees the buffer's warning callsite.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rsgi_core::{BodyBuffer, Payload};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Counts WARN-level events.
struct WarnCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[test]
fn test_unsupported_append_emits_exactly_one_warning() {
    // Arrange
    let warnings = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(WarnCounter(Arc::clone(&warnings)));
    let mut buffer = BodyBuffer::default();
    buffer.append(b"ok").unwrap();

    // Act
    let accepted = tracing::subscriber::with_default(subscriber, || {
        buffer.append(Payload::unsupported("int")).unwrap()
    });

    // Assert
    assert!(!accepted);
    assert_eq!(buffer.len(), 1, "chunk count must be unchanged");
    assert_eq!(warnings.load(Ordering::SeqCst), 1, "exactly one warning");
}
