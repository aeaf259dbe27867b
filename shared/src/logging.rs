//! The logging facility handed to native modules.
//!
//! Records always go to `tracing`. Those at or above the configured level are also queued for
//! the shell, which prints them in the scripting layer's console.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use compact_str::CompactString;
use crux_bridge::{LogLevel, LogOperation};
use futures::channel::mpsc;

/// A cloneable handle to log from a module.
#[derive(Clone)]
pub struct Logger {
    source: CompactString,
    threshold: Arc<AtomicU8>,
    sender: mpsc::UnboundedSender<LogOperation>,
}

impl Logger {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn log(&self, level: LogLevel, message: impl Into<CompactString>) {
        let message = message.into();
        let source = self.source.as_str();
        match level {
            LogLevel::Trace => tracing::trace!(source, "{message}"),
            LogLevel::Info => tracing::info!(source, "{message}"),
            LogLevel::Warn => tracing::warn!(source, "{message}"),
            LogLevel::Error => tracing::error!(source, "{message}"),
            LogLevel::Fatal => tracing::error!(source, fatal = true, "{message}"),
        }
        if level as u8 >= self.threshold.load(Ordering::Relaxed) {
            let record = LogOperation {
                level,
                source: self.source.clone(),
                message,
            };
            // Fails only when the core is gone, and then there is nobody to show it to.
            let _ = self.sender.unbounded_send(record);
        }
    }

    pub fn trace(&self, message: impl Into<CompactString>) {
        self.log(LogLevel::Trace, message);
    }

    pub fn info(&self, message: impl Into<CompactString>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<CompactString>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<CompactString>) {
        self.log(LogLevel::Error, message);
    }

    pub fn fatal(&self, message: impl Into<CompactString>) {
        self.log(LogLevel::Fatal, message);
    }
}

/// The receiving end of all loggers.
pub struct LogQueue {
    threshold: Arc<AtomicU8>,
    sender: mpsc::UnboundedSender<LogOperation>,
    receiver: mpsc::UnboundedReceiver<LogOperation>,
}

impl LogQueue {
    pub fn new(threshold: LogLevel) -> Self {
        let (sender, receiver) = mpsc::unbounded();
        Self {
            threshold: Arc::new(AtomicU8::new(threshold as u8)),
            sender,
            receiver,
        }
    }

    pub fn logger(&self, source: impl Into<CompactString>) -> Logger {
        Logger {
            source: source.into(),
            threshold: self.threshold.clone(),
            sender: self.sender.clone(),
        }
    }

    /// Change the level for all loggers created from this queue.
    pub fn set_threshold(&self, level: LogLevel) {
        self.threshold.store(level as u8, Ordering::Relaxed);
    }

    pub fn threshold(&self) -> LogLevel {
        LogLevel::from_u8(self.threshold.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub fn drain(&mut self) -> Vec<LogOperation> {
        let mut records = Vec::new();
        while let Ok(record) = self.receiver.try_recv() {
            records.push(record);
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_records_above_threshold_reach_the_shell() {
        let mut queue = LogQueue::new(LogLevel::Warn);
        let logger = queue.logger("LiveActivityModule");
        logger.info("starting");
        logger.warn("no listeners");
        logger.fatal("gone");

        let records = queue.drain();
        assert_eq!(
            records
                .iter()
                .map(|r| (r.level, r.message.as_str()))
                .collect::<Vec<_>>(),
            vec![(LogLevel::Warn, "no listeners"), (LogLevel::Fatal, "gone")]
        );
        assert!(records.iter().all(|r| r.source == "LiveActivityModule"));
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn threshold_applies_to_existing_loggers() {
        let mut queue = LogQueue::new(LogLevel::Error);
        let logger = queue.logger("Bridge");
        logger.trace("hidden");
        queue.set_threshold(LogLevel::Trace);
        assert_eq!(queue.threshold(), LogLevel::Trace);
        logger.trace("shown");
        assert_eq!(queue.drain().len(), 1);
    }

    #[test]
    fn records_from_other_threads_are_drained_in_order() {
        let mut queue = LogQueue::new(LogLevel::Info);
        let logger = queue.logger("LiveActivityModule");
        std::thread::spawn(move || {
            logger.info("first");
            logger.error("second");
        })
        .join()
        .unwrap();

        let messages: Vec<_> = queue.drain().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, ["first", "second"]);
        assert!(queue.drain().is_empty());
    }
}
