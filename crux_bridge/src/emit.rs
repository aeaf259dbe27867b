use std::future::Future;
use std::marker::PhantomData;

use compact_str::CompactString;
use crux_core::{
    Request,
    capability::Operation,
    command::{Command, NotificationBuilder},
};
use serde::{Deserialize, Serialize};

use crate::BridgeValue;

/// An event pushed from a native module to the scripting layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmitOperation {
    /// The name of the module which emitted the event.
    pub module: CompactString,
    /// The event name, one of the module's supported events.
    pub event: CompactString,
    pub body: BridgeValue,
}

impl Operation for EmitOperation {
    type Output = ();
}

/// The event emission capability API.
#[derive(Clone)]
pub struct EventEmitter<Effect, Event> {
    effect: PhantomData<Effect>,
    event: PhantomData<Event>,
}

impl<Effect, Event> EventEmitter<Effect, Event>
where
    Effect: Send + From<Request<EmitOperation>> + 'static,
    Event: Send + 'static,
{
    /// Push an event to the shell, which dispatches it to the listeners in the scripting layer.
    pub fn emit(
        operation: EmitOperation,
    ) -> NotificationBuilder<Effect, Event, impl Future<Output = ()>> {
        Command::notify_shell(operation)
    }
}
