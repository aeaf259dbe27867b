//! Helpers for driving the core in unit tests.

use crux_bridge::{
    ActivityOperation, ActivityResponse, BridgeValue, CallId, Settlement, WidgetOperation,
    WidgetResponse,
};
use crux_core::{App, Request};

use crate::bridge_app::NativeCall;
use crate::{BridgeApp, Command, Effect, Event, Model};

pub fn invoke(call_id: CallId, module: &str, method: &str, args: Vec<BridgeValue>) -> Event {
    Event::Invoke(NativeCall {
        call_id,
        module: module.into(),
        method: method.into(),
        args,
    })
}

pub fn drive(model: &mut Model, event: Event) -> Command {
    BridgeApp.update(event, model, &())
}

/// Collect the settlements among the effects of `cmd`, dropping the other effects.
pub fn settlements(cmd: &mut Command) -> Vec<(CallId, Settlement)> {
    cmd.effects()
        .filter_map(|effect| match effect {
            Effect::Settle(request) => {
                let operation = request.operation.clone();
                Some((operation.call_id, operation.settlement))
            }
            _ => None,
        })
        .collect()
}

/// Take the first live activity request among the effects of `cmd`.
pub fn activity_request(cmd: &mut Command) -> Request<ActivityOperation> {
    cmd.effects()
        .find_map(|effect| match effect {
            Effect::LiveActivity(request) => Some(request),
            _ => None,
        })
        .expect("a live activity request")
}

/// Take the first widget request among the effects of `cmd`.
pub fn widget_request(cmd: &mut Command) -> Request<WidgetOperation> {
    cmd.effects()
        .find_map(|effect| match effect {
            Effect::Widget(request) => Some(request),
            _ => None,
        })
        .expect("a widget request")
}

/// Feed every event `cmd` has produced back into the core and collect the settlements.
pub fn follow_up(model: &mut Model, cmd: &mut Command) -> Vec<(CallId, Settlement)> {
    let events: Vec<Event> = cmd.events().collect();
    events
        .into_iter()
        .flat_map(|event| settlements(&mut drive(model, event)))
        .collect()
}

pub fn answer_activity(
    model: &mut Model,
    cmd: &mut Command,
    request: &mut Request<ActivityOperation>,
    response: ActivityResponse,
) -> Vec<(CallId, Settlement)> {
    request.resolve(response).expect("resolve live activity request");
    follow_up(model, cmd)
}

pub fn answer_widget(
    model: &mut Model,
    cmd: &mut Command,
    request: &mut Request<WidgetOperation>,
    response: WidgetResponse,
) -> Vec<(CallId, Settlement)> {
    request.resolve(response).expect("resolve widget request");
    follow_up(model, cmd)
}

/// Answer a live activity request and return every effect of the updates that follow.
pub fn answer_activity_effects(
    model: &mut Model,
    cmd: &mut Command,
    request: &mut Request<ActivityOperation>,
    response: ActivityResponse,
) -> Vec<Effect> {
    request.resolve(response).expect("resolve live activity request");
    let events: Vec<Event> = cmd.events().collect();
    events
        .into_iter()
        .flat_map(|event| drive(model, event).effects().collect::<Vec<_>>())
        .collect()
}
