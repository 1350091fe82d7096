//! Outbound event sinks. Rules plugins and the turn machine emit through
//! `EventSink` and never care whether the host collects, forwards or drops.

use tokio::sync::mpsc::UnboundedSender;

pub trait EventSink<E> {
    fn emit(&mut self, event: E);
}

impl<E> EventSink<E> for Vec<E> {
    fn emit(&mut self, event: E) {
        self.push(event);
    }
}

impl<E> EventSink<E> for UnboundedSender<E> {
    fn emit(&mut self, event: E) {
        if self.send(event).is_err() {
            tracing::trace!("event receiver dropped, discarding event");
        }
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl<E> EventSink<E> for NullSink {
    fn emit(&mut self, _event: E) {}
}
