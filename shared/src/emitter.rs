//! Event emission from native modules to the scripting layer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use compact_str::{CompactString, format_compact};
use crux_bridge::{BridgeValue, EmitOperation};
use futures::channel::mpsc;
use itertools::Itertools;

use crate::logging::Logger;

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display(
    "`{event}` is not a supported event type for {module}. Supported events are: {supported}"
)]
pub struct UnsupportedEvent {
    pub module: CompactString,
    pub event: CompactString,
    pub supported: CompactString,
}

/// A cloneable handle to emit events on behalf of one module.
///
/// It may be moved into continuations and other threads; emitted events reach the shell the next
/// time the core processes an event.
#[derive(Clone)]
pub struct Emitter {
    module: CompactString,
    supported: Arc<[CompactString]>,
    listeners: Arc<AtomicUsize>,
    deliver_unobserved: Arc<AtomicBool>,
    sender: mpsc::UnboundedSender<EmitOperation>,
    logger: Logger,
}

impl Emitter {
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn supports(&self, event: &str) -> bool {
        self.supported.iter().any(|e| e.as_str() == event)
    }

    /// The number of listeners the scripting layer has registered for this module.
    pub fn listener_count(&self) -> usize {
        self.listeners.load(Ordering::Relaxed)
    }

    pub fn emit(&self, event: &str, body: impl Into<BridgeValue>) -> Result<(), UnsupportedEvent> {
        if !self.supports(event) {
            return Err(UnsupportedEvent {
                module: self.module.clone(),
                event: event.into(),
                supported: self.supported.iter().join(", ").into(),
            });
        }
        if self.listener_count() == 0 {
            self.logger
                .warn(format_compact!("Sending `{event}` with no listeners registered."));
            if !self.deliver_unobserved.load(Ordering::Relaxed) {
                return Ok(());
            }
        }
        let operation = EmitOperation {
            module: self.module.clone(),
            event: event.into(),
            body: body.into(),
        };
        // Fails only when the core is gone.
        let _ = self.sender.unbounded_send(operation);
        Ok(())
    }

    /// Count a new listener. Returns the new count.
    pub(crate) fn add_listener(&self) -> usize {
        self.listeners.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Forget up to `count` listeners. Returns the counts before and after.
    pub(crate) fn remove_listeners(&self, count: usize) -> (usize, usize) {
        let before = self
            .listeners
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(count))
            })
            .unwrap_or_else(|n| n);
        (before, before.saturating_sub(count))
    }
}

/// The receiving end of all emitters.
pub struct EventQueue {
    deliver_unobserved: Arc<AtomicBool>,
    sender: mpsc::UnboundedSender<EmitOperation>,
    receiver: mpsc::UnboundedReceiver<EmitOperation>,
}

impl EventQueue {
    pub fn new(deliver_unobserved: bool) -> Self {
        let (sender, receiver) = mpsc::unbounded();
        Self {
            deliver_unobserved: Arc::new(AtomicBool::new(deliver_unobserved)),
            sender,
            receiver,
        }
    }

    /// Create the emitter of a module. Each module should get exactly one, as the emitter also
    /// holds the module's listener count.
    pub fn emitter(
        &self,
        module: impl Into<CompactString>,
        supported: &[&str],
        logger: Logger,
    ) -> Emitter {
        Emitter {
            module: module.into(),
            supported: supported.iter().map(|&e| CompactString::from(e)).collect(),
            listeners: Arc::new(AtomicUsize::new(0)),
            deliver_unobserved: self.deliver_unobserved.clone(),
            sender: self.sender.clone(),
            logger,
        }
    }

    pub fn set_deliver_unobserved(&self, deliver: bool) {
        self.deliver_unobserved.store(deliver, Ordering::Relaxed);
    }

    pub fn drain(&mut self) -> Vec<EmitOperation> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use crux_bridge::LogLevel;

    use super::*;
    use crate::logging::LogQueue;

    fn setup(deliver_unobserved: bool) -> (EventQueue, LogQueue, Emitter) {
        let events = EventQueue::new(deliver_unobserved);
        let logs = LogQueue::new(LogLevel::Trace);
        let emitter = events.emitter(
            "LiveActivityModule",
            &["LiveActivityStateChanged"],
            logs.logger("LiveActivityModule"),
        );
        (events, logs, emitter)
    }

    #[test]
    fn unsupported_events_are_refused() {
        let (mut events, _logs, emitter) = setup(true);
        let err = emitter.emit("TimerStarted", BridgeValue::Null).unwrap_err();
        assert_eq!(
            err.to_string(),
            "`TimerStarted` is not a supported event type for LiveActivityModule. \
             Supported events are: LiveActivityStateChanged"
        );
        assert!(events.drain().is_empty());
    }

    #[test]
    fn emitting_without_listeners_warns_but_delivers() {
        let (mut events, mut logs, emitter) = setup(true);
        emitter.emit("LiveActivityStateChanged", true).unwrap();
        assert_eq!(
            events.drain(),
            vec![EmitOperation {
                module: "LiveActivityModule".into(),
                event: "LiveActivityStateChanged".into(),
                body: BridgeValue::Bool(true),
            }]
        );
        let warnings = logs.drain();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, LogLevel::Warn);
    }

    #[test]
    fn unobserved_events_can_be_dropped() {
        let (mut events, _logs, emitter) = setup(false);
        emitter.emit("LiveActivityStateChanged", true).unwrap();
        assert!(events.drain().is_empty());

        emitter.add_listener();
        emitter.emit("LiveActivityStateChanged", false).unwrap();
        assert_eq!(events.drain().len(), 1);
    }

    #[test]
    fn listener_count_saturates_at_zero() {
        let (_events, _logs, emitter) = setup(true);
        assert_eq!(emitter.add_listener(), 1);
        assert_eq!(emitter.add_listener(), 2);
        assert_eq!(emitter.remove_listeners(5), (2, 0));
        assert_eq!(emitter.remove_listeners(1), (0, 0));
        assert_eq!(emitter.listener_count(), 0);
    }
}
