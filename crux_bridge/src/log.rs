use std::future::Future;
use std::marker::PhantomData;

use compact_str::CompactString;
use crux_core::{
    Request,
    capability::Operation,
    command::{Command, NotificationBuilder},
};
use serde::{Deserialize, Serialize};

/// Severity of a log record, from least to most severe.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum LogLevel {
    #[display("trace")]
    Trace = 0,
    #[default]
    #[display("info")]
    Info = 1,
    #[display("warn")]
    Warn = 2,
    #[display("error")]
    Error = 3,
    #[display("fatal")]
    Fatal = 4,
}

impl LogLevel {
    pub fn from_u8(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::Trace),
            1 => Some(Self::Info),
            2 => Some(Self::Warn),
            3 => Some(Self::Error),
            4 => Some(Self::Fatal),
            _ => None,
        }
    }
}

/// A log record forwarded to the shell so it shows up in the scripting layer's console.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogOperation {
    pub level: LogLevel,
    /// The module (or other component) which logged the record.
    pub source: CompactString,
    pub message: CompactString,
}

impl Operation for LogOperation {
    type Output = ();
}

/// The logging capability API.
#[derive(Clone)]
pub struct Log<Effect, Event> {
    effect: PhantomData<Effect>,
    event: PhantomData<Event>,
}

impl<Effect, Event> Log<Effect, Event>
where
    Effect: Send + From<Request<LogOperation>> + 'static,
    Event: Send + 'static,
{
    pub fn log(
        operation: LogOperation,
    ) -> NotificationBuilder<Effect, Event, impl Future<Output = ()>> {
        Command::notify_shell(operation)
    }
}
