use std::collections::BTreeMap;
use std::error::Error;
use std::future::Future;
use std::marker::PhantomData;

use compact_str::{CompactString, format_compact};
use crux_core::{
    Request,
    capability::Operation,
    command::{Command, NotificationBuilder},
};
use serde::{Deserialize, Serialize};

use crate::BridgeValue;

/// The identifier the scripting layer gave to a call. Unique among pending calls.
pub type CallId = u32;

/// Code used when a rejection is created with an empty code.
pub const UNSPECIFIED_CODE: &str = "EUNSPECIFIED";
/// Message used when a rejection is created with an empty message.
pub const UNSPECIFIED_MESSAGE: &str = "Unspecified error";

/// A structured error attached to a rejection.
///
/// Mirrors what a native platform error carries: a domain, a numeric code, a description and
/// arbitrary extra information.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorObject {
    pub domain: CompactString,
    pub code: i64,
    pub description: CompactString,
    /// Descriptions of the underlying errors, outermost first.
    pub underlying: Vec<CompactString>,
    pub user_info: BTreeMap<CompactString, BridgeValue>,
}

impl ErrorObject {
    pub fn new(domain: impl Into<CompactString>, description: impl Into<CompactString>) -> Self {
        Self {
            domain: domain.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    /// Capture a Rust error and its chain of sources.
    pub fn from_error<E: Error>(error: &E) -> Self {
        let mut underlying = Vec::new();
        let mut source = error.source();
        while let Some(e) = source {
            underlying.push(format_compact!("{e}"));
            source = e.source();
        }
        Self {
            domain: std::any::type_name::<E>().into(),
            code: 0,
            description: format_compact!("{error}"),
            underlying,
            user_info: BTreeMap::new(),
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    pub fn with_user_info(mut self, key: impl Into<CompactString>, value: BridgeValue) -> Self {
        self.user_info.insert(key.into(), value);
        self
    }
}

/// Why a call failed: a machine readable code, a message for humans and possibly a structured
/// error.
///
/// The code and the message are never empty.
#[derive(
    Clone, Debug, PartialEq, Serialize, Deserialize, derive_more::Display, derive_more::Error,
)]
#[display("{code}: {message}")]
pub struct PromiseError {
    code: CompactString,
    message: CompactString,
    error: Option<ErrorObject>,
}

impl PromiseError {
    pub fn new(code: impl Into<CompactString>, message: impl Into<CompactString>) -> Self {
        let non_empty = |s: CompactString, fallback: &str| {
            if s.trim().is_empty() {
                CompactString::from(fallback)
            } else {
                s
            }
        };
        Self {
            code: non_empty(code.into(), UNSPECIFIED_CODE),
            message: non_empty(message.into(), UNSPECIFIED_MESSAGE),
            error: None,
        }
    }

    /// A rejection whose message is the display of `error`, with `error` attached.
    pub fn from_error<E: Error>(code: impl Into<CompactString>, error: &E) -> Self {
        Self::new(code, format_compact!("{error}")).with_error(ErrorObject::from_error(error))
    }

    pub fn with_error(mut self, error: ErrorObject) -> Self {
        self.error = Some(error);
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn error(&self) -> Option<&ErrorObject> {
        self.error.as_ref()
    }
}

/// The single outcome of a call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Settlement {
    Resolved(BridgeValue),
    Rejected(PromiseError),
}

impl Settlement {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn into_result(self) -> Result<BridgeValue, PromiseError> {
        match self {
            Self::Resolved(value) => Ok(value),
            Self::Rejected(error) => Err(error),
        }
    }
}

impl From<Result<BridgeValue, PromiseError>> for Settlement {
    fn from(result: Result<BridgeValue, PromiseError>) -> Self {
        match result {
            Ok(value) => Self::Resolved(value),
            Err(error) => Self::Rejected(error),
        }
    }
}

/// Tell the shell that a call has been settled. The shell resolves or rejects the promise it
/// handed to the scripting layer for `call_id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleOperation {
    pub call_id: CallId,
    pub settlement: Settlement,
}

impl Operation for SettleOperation {
    type Output = ();
}

/// The settlement capability API.
#[derive(Clone)]
pub struct Promises<Effect, Event> {
    effect: PhantomData<Effect>,
    event: PhantomData<Event>,
}

impl<Effect, Event> Promises<Effect, Event>
where
    Effect: Send + From<Request<SettleOperation>> + 'static,
    Event: Send + 'static,
{
    /// Deliver the outcome of a call to the shell.
    pub fn settle(
        call_id: CallId,
        settlement: Settlement,
    ) -> NotificationBuilder<Effect, Event, impl Future<Output = ()>> {
        Command::notify_shell(SettleOperation {
            call_id,
            settlement,
        })
    }
}
