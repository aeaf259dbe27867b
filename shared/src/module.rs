//! The contract between the bridge and a native module.

use std::collections::BTreeMap;

use compact_str::{CompactString, format_compact};
use crux_bridge::{BridgeValue, ConvertError, ErrorObject, FromBridge, PromiseError};

use crate::Command;
use crate::config::BridgeConfig;
use crate::emitter::Emitter;
use crate::logging::Logger;
use crate::promise::Promise;

pub const UNKNOWN_METHOD_CODE: &str = "E_UNKNOWN_METHOD";
pub const INVALID_ARGUMENT_CODE: &str = "E_INVALID_ARGUMENT";
pub const MODULE_FAILURE_CODE: &str = "E_MODULE_FAILURE";

/// A method call from the scripting layer with positional arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodCall {
    pub method: CompactString,
    pub args: Vec<BridgeValue>,
}

impl MethodCall {
    pub fn new(method: impl Into<CompactString>, args: Vec<BridgeValue>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }

    /// Read argument `index`. A missing argument reads as null, so optional trailing arguments
    /// can be omitted.
    pub fn arg<T: FromBridge>(&self, index: usize) -> Result<T, InvokeError> {
        const NULL: &BridgeValue = &BridgeValue::Null;
        T::from_bridge(self.args.get(index).unwrap_or(NULL)).map_err(|source| {
            InvokeError::InvalidArgument {
                method: self.method.clone(),
                index,
                source,
            }
        })
    }
}

/// How a module answers a call.
pub enum Reply {
    Resolve(BridgeValue),
    Reject(PromiseError),
    /// The answer comes later. The module has taken the promise with
    /// [`ModuleContext::defer`] and settles it from the returned command.
    Pending(Command),
}

impl Reply {
    pub fn resolve(value: impl Into<BridgeValue>) -> Self {
        Self::Resolve(value.into())
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum InvokeError {
    #[display("{module} has no method named {method}")]
    UnknownMethod {
        module: CompactString,
        method: CompactString,
    },
    #[display("Argument {index} of {method} is invalid: {source}")]
    InvalidArgument {
        method: CompactString,
        index: usize,
        source: ConvertError,
    },
    #[display("{message}")]
    Failure { message: CompactString },
}

impl InvokeError {
    pub fn unknown_method(module: &str, method: &str) -> Self {
        Self::UnknownMethod {
            module: module.into(),
            method: method.into(),
        }
    }

    pub fn failure(message: impl Into<CompactString>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownMethod { .. } => UNKNOWN_METHOD_CODE,
            Self::InvalidArgument { .. } => INVALID_ARGUMENT_CODE,
            Self::Failure { .. } => MODULE_FAILURE_CODE,
        }
    }
}

impl From<InvokeError> for PromiseError {
    fn from(e: InvokeError) -> Self {
        match &e {
            InvokeError::InvalidArgument { index, .. } => {
                PromiseError::new(e.code(), format_compact!("{e}")).with_error(
                    ErrorObject::from_error(&e)
                        .with_user_info("argumentIndex", BridgeValue::from(*index)),
                )
            }
            _ => PromiseError::new(e.code(), format_compact!("{e}")),
        }
    }
}

/// What a module gets to work with while handling a call.
pub struct ModuleContext<'a> {
    config: &'a BridgeConfig,
    emitter: &'a Emitter,
    logger: &'a Logger,
    promise: Option<Promise>,
}

impl<'a> ModuleContext<'a> {
    pub(crate) fn new(
        config: &'a BridgeConfig,
        emitter: &'a Emitter,
        logger: &'a Logger,
        promise: Option<Promise>,
    ) -> Self {
        Self {
            config,
            emitter,
            logger,
            promise,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        self.config
    }

    pub fn emitter(&self) -> &Emitter {
        self.emitter
    }

    pub fn logger(&self) -> &Logger {
        self.logger
    }

    /// Take the promise of the current call and answer later.
    ///
    /// `settle_later` receives the promise and returns the command which eventually settles it.
    /// Outside of a call there is no promise, and the reply is an empty command.
    pub fn defer(&mut self, settle_later: impl FnOnce(Promise) -> Command) -> Reply {
        match self.promise.take() {
            Some(promise) => Reply::Pending(settle_later(promise)),
            None => Reply::Pending(Command::done()),
        }
    }

    pub(crate) fn take_promise(&mut self) -> Option<Promise> {
        self.promise.take()
    }
}

/// A native component callable by name from the scripting layer.
pub trait NativeModule: Send + Sync {
    /// The name the scripting layer uses to find the module. Must be unique and non-empty.
    fn name(&self) -> &str;

    /// The methods the scripting layer may call.
    fn methods(&self) -> &[&'static str];

    /// Constants exported to the scripting layer when the module is loaded.
    fn constants(&self, _config: &BridgeConfig) -> BTreeMap<CompactString, BridgeValue> {
        BTreeMap::new()
    }

    /// The names of the events the module may emit.
    fn supported_events(&self) -> &[&'static str] {
        &[]
    }

    /// Whether the shell must set the module up on its main (UI) thread.
    fn requires_main_queue_setup(&self) -> bool {
        false
    }

    /// Handle a call to one of [`NativeModule::methods`].
    fn invoke(&mut self, call: &MethodCall, cx: &mut ModuleContext<'_>)
        -> Result<Reply, InvokeError>;

    /// Called when the first listener is added.
    fn start_observing(&mut self, _cx: &mut ModuleContext<'_>) {}

    /// Called when the last listener is removed.
    fn stop_observing(&mut self, _cx: &mut ModuleContext<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::EventQueue;
    use crate::logging::LogQueue;

    #[test]
    fn missing_arguments_read_as_null() {
        let call = MethodCall::new("startLiveActivity", vec![BridgeValue::from("Office")]);
        assert_eq!(call.arg::<String>(0).unwrap(), "Office");
        assert_eq!(call.arg::<Option<String>>(1).unwrap(), None);
        assert!(matches!(
            call.arg::<String>(1),
            Err(InvokeError::InvalidArgument { index: 1, .. })
        ));
    }

    #[test]
    fn invalid_argument_maps_to_a_rejection() {
        let call = MethodCall::new("updateLiveActivity", vec![BridgeValue::Float(1.5)]);
        let err: PromiseError = call.arg::<u64>(0).unwrap_err().into();
        assert_eq!(err.code(), INVALID_ARGUMENT_CODE);
        assert_eq!(
            err.message(),
            "Argument 0 of updateLiveActivity is invalid: 1.5 is out of range for u64"
        );
        let object = err.error().unwrap();
        assert_eq!(object.user_info["argumentIndex"], BridgeValue::Int(0));
    }

    #[test]
    fn other_errors_keep_their_code() {
        let err: PromiseError = InvokeError::unknown_method("BridgeInfo", "ping").into();
        assert_eq!(err.code(), UNKNOWN_METHOD_CODE);
        assert_eq!(err.message(), "BridgeInfo has no method named ping");
        assert!(err.error().is_none());
    }

    #[test]
    fn context_exposes_config_emitter_and_logger() {
        let config = BridgeConfig {
            platform: "android".into(),
            ..BridgeConfig::default()
        };
        let logs = LogQueue::new(config.log_level);
        let logger = logs.logger("BridgeInfo");
        let events = EventQueue::new(config.emit_without_listeners);
        let emitter = events.emitter("BridgeInfo", &[], logger.clone());

        let mut cx = ModuleContext::new(&config, &emitter, &logger, None);
        assert_eq!(cx.config().platform, "android");
        assert_eq!(cx.emitter().module(), "BridgeInfo");
        assert_eq!(cx.logger().source(), "BridgeInfo");
        // Without a call there is no promise to hand over.
        assert!(matches!(cx.defer(|_| unreachable!()), Reply::Pending(_)));
    }
}
