use std::future::Future;
use std::marker::PhantomData;

use compact_str::CompactString;
use crux_core::{
    Request,
    capability::Operation,
    command::{Command, RequestBuilder},
};
use serde::{Deserialize, Serialize};

use crate::BridgeValue;

/// Write to the storage shared between the app and its home screen widgets. The shell should
/// reload the widget timelines after a successful write.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetOperation {
    Write { key: CompactString, value: BridgeValue },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetResponse {
    Written,
    Failed { reason: CompactString },
}

impl Operation for WidgetOperation {
    type Output = WidgetResponse;
}

/// The widget storage capability API.
#[derive(Clone)]
pub struct WidgetStore<Effect, Event> {
    effect: PhantomData<Effect>,
    event: PhantomData<Event>,
}

impl<Effect, Event> WidgetStore<Effect, Event>
where
    Effect: Send + From<Request<WidgetOperation>> + 'static,
    Event: Send + 'static,
{
    pub fn write(
        key: impl Into<CompactString>,
        value: BridgeValue,
    ) -> RequestBuilder<Effect, Event, impl Future<Output = WidgetResponse>> {
        Command::request_from_shell(WidgetOperation::Write {
            key: key.into(),
            value,
        })
    }
}
