//! Native modules by name.

use std::collections::BTreeMap;

use compact_str::{CompactString, format_compact};
use crux_bridge::{EmitOperation, LogOperation, PromiseError};

use crate::Command;
use crate::bridge_app::view_types::ModuleView;
use crate::config::BridgeConfig;
use crate::emitter::{Emitter, EventQueue};
use crate::logging::{LogQueue, Logger};
use crate::module::{InvokeError, MethodCall, ModuleContext, NativeModule, Reply};
use crate::promise::Promise;

pub const UNKNOWN_MODULE_CODE: &str = "E_UNKNOWN_MODULE";

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum RegisterError {
    #[display("Module names must not be empty")]
    EmptyName,
    #[display("A module named {name} is already registered")]
    Duplicate { name: CompactString },
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ListenerError {
    #[display("Native module {module} is not registered")]
    UnknownModule { module: CompactString },
    #[display("`{event}` is not a supported event type for {module}")]
    UnsupportedEvent {
        module: CompactString,
        event: CompactString,
    },
}

struct Entry {
    module: Box<dyn NativeModule>,
    emitter: Emitter,
    logger: Logger,
}

/// All registered native modules, plus the queues their emitters and loggers feed.
pub struct ModuleRegistry {
    modules: BTreeMap<CompactString, Entry>,
    events: EventQueue,
    logs: LogQueue,
}

impl ModuleRegistry {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            modules: BTreeMap::new(),
            events: EventQueue::new(config.emit_without_listeners),
            logs: LogQueue::new(config.log_level),
        }
    }

    pub fn register(&mut self, module: impl NativeModule + 'static) -> Result<(), RegisterError> {
        let name = CompactString::from(module.name());
        if name.trim().is_empty() {
            return Err(RegisterError::EmptyName);
        }
        if self.modules.contains_key(&name) {
            return Err(RegisterError::Duplicate { name });
        }
        let logger = self.logs.logger(name.clone());
        let emitter = self
            .events
            .emitter(name.clone(), module.supported_events(), logger.clone());
        tracing::debug!(module = %name, "registered native module");
        self.modules.insert(
            name,
            Entry {
                module: Box::new(module),
                emitter,
                logger,
            },
        );
        Ok(())
    }

    pub fn contains(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// A logger which isn't tied to a module.
    pub fn logger(&self, source: &str) -> Logger {
        self.logs.logger(source)
    }

    /// Apply a new configuration to the emitters and loggers.
    pub fn configure(&self, config: &BridgeConfig) {
        self.logs.set_threshold(config.log_level);
        self.events.set_deliver_unobserved(config.emit_without_listeners);
    }

    /// Dispatch a call. The promise is settled by the time this returns unless the module
    /// answered with [`Reply::Pending`].
    pub fn invoke(
        &mut self,
        module: &str,
        call: MethodCall,
        promise: Promise,
        config: &BridgeConfig,
    ) -> Command {
        let Some(entry) = self.modules.get_mut(module) else {
            promise.reject(PromiseError::new(
                UNKNOWN_MODULE_CODE,
                format_compact!("Native module {module} is not registered"),
            ));
            return Command::done();
        };
        let Entry {
            module: native,
            emitter,
            logger,
        } = entry;
        if !native.methods().iter().any(|m| *m == call.method.as_str()) {
            promise.reject(InvokeError::unknown_method(module, &call.method).into());
            return Command::done();
        }

        let call_id = promise.call_id();
        tracing::debug!(call_id, module, method = %call.method, "invoking native method");
        let mut cx = ModuleContext::new(config, emitter, logger, Some(promise));
        let result = native.invoke(&call, &mut cx);
        match (result, cx.take_promise()) {
            (Ok(Reply::Resolve(value)), Some(promise)) => promise.resolve(value),
            (Ok(Reply::Reject(error)), Some(promise)) => promise.reject(error),
            (Err(e), Some(promise)) => promise.reject(e.into()),
            (Ok(Reply::Pending(command)), None) => return command,
            (Ok(Reply::Pending(command)), Some(promise)) => {
                // Dropping it rejects the call, which is the best we can do.
                tracing::warn!(
                    call_id,
                    module,
                    method = %call.method,
                    "pending reply without a deferred promise"
                );
                drop(promise);
                return command;
            }
            (Ok(_), None) => {
                tracing::warn!(
                    call_id,
                    module,
                    method = %call.method,
                    "ignoring reply to a deferred call"
                );
            }
            (Err(e), None) => {
                tracing::warn!(
                    call_id,
                    module,
                    method = %call.method,
                    "ignoring error of a deferred call: {e}"
                );
            }
        }
        Command::done()
    }

    /// Register a listener for `event` on `module`. Returns the new listener count.
    ///
    /// The module starts observing when its first listener is added.
    pub fn add_listener(
        &mut self,
        module: &str,
        event: &str,
        config: &BridgeConfig,
    ) -> Result<usize, ListenerError> {
        let entry = self
            .modules
            .get_mut(module)
            .ok_or_else(|| ListenerError::UnknownModule {
                module: module.into(),
            })?;
        if !entry.emitter.supports(event) {
            return Err(ListenerError::UnsupportedEvent {
                module: module.into(),
                event: event.into(),
            });
        }
        let count = entry.emitter.add_listener();
        if count == 1 {
            let mut cx = ModuleContext::new(config, &entry.emitter, &entry.logger, None);
            entry.module.start_observing(&mut cx);
        }
        Ok(count)
    }

    /// Forget `count` listeners of `module`. Returns the new listener count.
    ///
    /// The module stops observing when its last listener is removed.
    pub fn remove_listeners(
        &mut self,
        module: &str,
        count: usize,
        config: &BridgeConfig,
    ) -> Result<usize, ListenerError> {
        let entry = self
            .modules
            .get_mut(module)
            .ok_or_else(|| ListenerError::UnknownModule {
                module: module.into(),
            })?;
        let (before, after) = entry.emitter.remove_listeners(count);
        if before > 0 && after == 0 {
            let mut cx = ModuleContext::new(config, &entry.emitter, &entry.logger, None);
            entry.module.stop_observing(&mut cx);
        }
        Ok(after)
    }

    /// Describe every module, sorted by name.
    pub fn describe(&self, config: &BridgeConfig) -> Vec<ModuleView> {
        self.modules
            .iter()
            .map(|(name, entry)| ModuleView {
                name: name.clone(),
                methods: entry.module.methods().iter().map(|&m| m.into()).collect(),
                constants: entry.module.constants(config),
                supported_events: entry
                    .module
                    .supported_events()
                    .iter()
                    .map(|&e| e.into())
                    .collect(),
                listener_count: entry.emitter.listener_count(),
                requires_main_queue_setup: entry.module.requires_main_queue_setup(),
            })
            .collect()
    }

    pub fn drain_events(&mut self) -> Vec<EmitOperation> {
        self.events.drain()
    }

    pub fn drain_logs(&mut self) -> Vec<LogOperation> {
        self.logs.drain()
    }
}
