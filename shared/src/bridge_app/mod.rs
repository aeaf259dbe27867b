pub mod view_types;

use compact_str::{CompactString, format_compact};
use crux_bridge::{
    ActivityOperation, BridgeValue, CallId, EmitOperation, EventEmitter, Log, LogOperation,
    PromiseError, Promises, SettleOperation, Settlement, WidgetOperation,
};
use crux_core::{
    App,
    macros::effect,
    render::{RenderOperation, render},
};
use serde::{Deserialize, Serialize};
use view_types::ViewModel;

use crate::config::BridgeConfig;
use crate::logging::Logger;
use crate::module::{MethodCall, NativeModule};
use crate::modules;
use crate::promise::PendingCalls;
use crate::registry::{ModuleRegistry, RegisterError};

use crate::Command;

/// Rejection code for calls beyond `BridgeConfig::max_pending_calls`.
pub const TOO_MANY_PENDING_CALLS_CODE: &str = "E_TOO_MANY_PENDING_CALLS";

/// A call from the scripting layer to a method of a native module.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NativeCall {
    /// Chosen by the shell. The settlement of the call carries the same id.
    pub call_id: CallId,
    pub module: CompactString,
    pub method: CompactString,
    pub args: Vec<BridgeValue>,
}

/// An event from the shell.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum Event {
    /// Call a native method. Exactly one `Effect::Settle` with the same call id follows,
    /// immediately or after the module's shell requests have been answered.
    Invoke(NativeCall),
    /// The scripting layer subscribed to an event of a module.
    AddListener {
        module: CompactString,
        event: CompactString,
    },
    /// The scripting layer dropped `count` subscriptions of a module.
    RemoveListeners { module: CompactString, count: u32 },
    /// Replace the configuration.
    Configure(BridgeConfig),
    /// Deliver settlements, events and log records produced outside of an update, e.g. from
    /// another thread. Also sent by continuations of shell requests.
    Flush,
}

/// All the possible side effects of the bridge.
///
/// If you port the bridge to a new platform, you need to implement these effects.
#[effect(typegen)]
pub enum Effect {
    Render(RenderOperation),
    Settle(SettleOperation),
    Emit(EmitOperation),
    Log(LogOperation),
    LiveActivity(ActivityOperation),
    Widget(WidgetOperation),
}

/// The state of the bridge.
pub struct Model {
    config: BridgeConfig,
    registry: ModuleRegistry,
    calls: PendingCalls,
    /// Logger for the bridge itself.
    logger: Logger,
}

impl Default for Model {
    /// A model with the app's native modules registered.
    fn default() -> Self {
        let mut model = Self::new(BridgeConfig::default());
        for result in modules::register_all(&mut model.registry) {
            if let Err(e) = result {
                tracing::error!("failed to register a builtin module: {e}");
            }
        }
        model
    }
}

impl Model {
    /// A model without any modules.
    pub fn new(config: BridgeConfig) -> Self {
        let registry = ModuleRegistry::new(&config);
        let logger = registry.logger("Bridge");
        Self {
            config,
            registry,
            calls: PendingCalls::default(),
            logger,
        }
    }

    pub fn register(&mut self, module: impl NativeModule + 'static) -> Result<(), RegisterError> {
        self.registry.register(module)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn pending_calls(&self) -> usize {
        self.calls.len()
    }
}

#[derive(Default)]
pub struct BridgeApp;

impl App for BridgeApp {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Effect = Effect;
    type Capabilities = (); // Deprecated, commands are used instead.

    fn update(
        &self,
        event: Self::Event,
        model: &mut Self::Model,
        _: &Self::Capabilities, // Deprecated argument
    ) -> Command {
        let action = update(model, event);
        Command::all([action, flush(model), render()])
    }

    fn view(&self, model: &Self::Model) -> Self::ViewModel {
        ViewModel {
            modules: model.registry.describe(&model.config),
            pending_calls: model.calls.len(),
            log_level: model.config.log_level,
            platform: model.config.platform.clone(),
        }
    }
}

fn update(model: &mut Model, event: Event) -> Command {
    match event {
        Event::Invoke(call) => invoke(model, call),
        Event::AddListener { module, event } => {
            match model.registry.add_listener(&module, &event, &model.config) {
                Ok(count) => tracing::debug!(%module, %event, count, "listener added"),
                Err(e) => model.logger.error(format_compact!("{e}")),
            }
            Command::done()
        }
        Event::RemoveListeners { module, count } => {
            if let Err(e) = model
                .registry
                .remove_listeners(&module, count as usize, &model.config)
            {
                model.logger.error(format_compact!("{e}"));
            }
            Command::done()
        }
        Event::Configure(config) => {
            tracing::debug!(?config, "configured");
            model.registry.configure(&config);
            model.config = config;
            Command::done()
        }
        Event::Flush => Command::done(),
    }
}

fn invoke(model: &mut Model, call: NativeCall) -> Command {
    let NativeCall {
        call_id,
        module,
        method,
        args,
    } = call;
    // The shell maps settlements to its promises by id, so a reused id can't be answered
    // without confusing the first call.
    if model.calls.contains(call_id) {
        model.logger.error(format_compact!(
            "Ignoring {module}.{method}: call {call_id} is already pending"
        ));
        return Command::done();
    }
    if model.calls.len() >= model.config.max_pending_calls {
        let error = PromiseError::new(
            TOO_MANY_PENDING_CALLS_CODE,
            format_compact!(
                "{} calls are pending, {module}.{method} was not called",
                model.calls.len()
            ),
        );
        return Promises::settle(call_id, Settlement::Rejected(error)).into();
    }
    match model.calls.open(call_id) {
        Ok(promise) => model.registry.invoke(
            &module,
            MethodCall::new(method, args),
            promise,
            &model.config,
        ),
        Err(e) => {
            model.logger.error(format_compact!("{e}"));
            Command::done()
        }
    }
}

/// Hand everything queued since the last update over to the shell: log records first, then
/// events, then settled calls.
fn flush(model: &mut Model) -> Command {
    let logs = model
        .registry
        .drain_logs()
        .into_iter()
        .map(|record| -> Command { Log::log(record).into() });
    let events = model
        .registry
        .drain_events()
        .into_iter()
        .map(|event| -> Command { EventEmitter::emit(event).into() });
    let settled = model
        .calls
        .drain_settled()
        .into_iter()
        .map(|(call_id, settlement)| -> Command { Promises::settle(call_id, settlement).into() });
    Command::all(logs.chain(events).chain(settled).collect::<Vec<_>>())
}

#[cfg(test)]
mod tests;
