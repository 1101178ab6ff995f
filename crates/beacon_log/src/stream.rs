//! Event stream plumbing between run nodes and the presentation layer.

use crate::event::NodeEvent;
use tokio::sync::mpsc;

/// Destination for node events
///
/// Implementations must be cheap to call from many tasks at once; the
/// engine emits from whichever task observed the transition.
pub trait EventSink: Send + Sync {
    /// Append one event
    fn emit(&self, event: NodeEvent);
}

/// Sink that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: NodeEvent) {}
}

/// Sink feeding an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<NodeEvent>,
}

impl EventSink for ChannelSink {
    fn emit(&self, event: NodeEvent) {
        // A dropped receiver means nobody is watching any more.
        let _ = self.tx.send(event);
    }
}

/// Receiving end of a `ChannelSink`
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<NodeEvent>,
}

impl EventStream {
    /// Wait for the next event; `None` once every sink is dropped
    pub async fn recv(&mut self) -> Option<NodeEvent> {
        self.rx.recv().await
    }

    /// Take every event currently buffered, without waiting
    pub fn drain(&mut self) -> Vec<NodeEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Create a connected sink and stream
#[must_use]
pub fn event_channel() -> (ChannelSink, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSink { tx }, EventStream { rx })
}
