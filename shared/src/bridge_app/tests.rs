use std::sync::{Arc, Mutex};
use std::thread;

use crux_bridge::{ActivityResponse, LogLevel, LogOperation, Settlement};
use crux_core::App;

use super::*;
use crate::module::{InvokeError, ModuleContext, Reply};
use crate::modules::{bridge_info, live_activity};
use crate::promise::Promise;
use crate::registry::UNKNOWN_MODULE_CODE;
use crate::testing::{activity_request, drive, invoke, settlements};

/// Hands every promise it gets to the test.
#[derive(Clone, Default)]
struct Handoff {
    promises: Arc<Mutex<Vec<Promise>>>,
}

impl NativeModule for Handoff {
    fn name(&self) -> &str {
        "Handoff"
    }

    fn methods(&self) -> &[&'static str] {
        &["wait"]
    }

    fn invoke(
        &mut self,
        _call: &MethodCall,
        cx: &mut ModuleContext<'_>,
    ) -> Result<Reply, InvokeError> {
        let promises = self.promises.clone();
        Ok(cx.defer(move |promise| {
            promises.lock().unwrap().push(promise);
            Command::done()
        }))
    }
}

impl Handoff {
    fn take(&self) -> Vec<Promise> {
        std::mem::take(&mut *self.promises.lock().unwrap())
    }
}

fn logs(cmd: &mut Command) -> Vec<LogOperation> {
    cmd.effects()
        .filter_map(|effect| match effect {
            Effect::Log(request) => Some(request.operation.clone()),
            _ => None,
        })
        .collect()
}

fn rejection_code(settled: &[(CallId, Settlement)]) -> &str {
    match settled {
        [(_, Settlement::Rejected(error))] => error.code(),
        other => panic!("expected a single rejection, got {other:?}"),
    }
}

#[test]
fn default_model_registers_the_app_modules() {
    let model = Model::default();
    let view = BridgeApp.view(&model);

    let names: Vec<&str> = view.modules.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, [bridge_info::MODULE_NAME, live_activity::MODULE_NAME]);

    let info = view.module(bridge_info::MODULE_NAME).unwrap();
    assert!(info.requires_main_queue_setup);
    assert!(info.has_method("getConstants"));
    assert_eq!(info.constants["platform"], BridgeValue::from("unknown"));

    let activities = view.module(live_activity::MODULE_NAME).unwrap();
    assert!(activities.has_method("syncJobsToWidget"));
    assert_eq!(
        activities.supported_events.as_slice(),
        [live_activity::STATE_CHANGED_EVENT]
    );
    assert_eq!(view.pending_calls, 0);
}

#[test]
fn every_update_renders() {
    let mut model = Model::default();
    let mut cmd = drive(&mut model, Event::Flush);
    assert!(cmd.effects().any(|effect| matches!(effect, Effect::Render(_))));
}

#[test]
fn unknown_modules_reject() {
    let mut model = Model::default();
    let mut cmd = drive(&mut model, invoke(1, "Geolocation", "watchPosition", vec![]));
    let settled = settlements(&mut cmd);
    assert_eq!(rejection_code(&settled), UNKNOWN_MODULE_CODE);
    assert_eq!(model.pending_calls(), 0);
}

#[test]
fn reused_call_ids_are_ignored() {
    let mut model = Model::default();
    let start = || {
        invoke(
            1,
            live_activity::MODULE_NAME,
            "startLiveActivity",
            vec!["Office".into()],
        )
    };
    let mut first = drive(&mut model, start());
    let _request = activity_request(&mut first);
    assert_eq!(model.pending_calls(), 1);

    let mut second = drive(&mut model, start());
    let effects: Vec<Effect> = second.effects().collect();
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::Settle(_) | Effect::LiveActivity(_))));
    let errors: Vec<LogOperation> = effects
        .into_iter()
        .filter_map(|effect| match effect {
            Effect::Log(request) => Some(request.operation.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].level, LogLevel::Error);
    assert_eq!(errors[0].source, "Bridge");
    assert_eq!(model.pending_calls(), 1);
}

#[test]
fn pending_calls_are_limited() {
    let mut model = Model::new(BridgeConfig {
        max_pending_calls: 1,
        ..BridgeConfig::default()
    });
    let handoff = Handoff::default();
    model.register(handoff.clone()).unwrap();

    let mut cmd = drive(&mut model, invoke(1, "Handoff", "wait", vec![]));
    assert!(settlements(&mut cmd).is_empty());

    let mut cmd = drive(&mut model, invoke(2, "Handoff", "wait", vec![]));
    let settled = settlements(&mut cmd);
    assert_eq!(settled[0].0, 2);
    assert_eq!(rejection_code(&settled), TOO_MANY_PENDING_CALLS_CODE);
    assert_eq!(handoff.take().len(), 1);
}

#[test]
fn calls_settled_on_other_threads_are_flushed() {
    let mut model = Model::new(BridgeConfig::default());
    let handoff = Handoff::default();
    model.register(handoff.clone()).unwrap();

    for call_id in [3, 4] {
        let mut cmd = drive(&mut model, invoke(call_id, "Handoff", "wait", vec![]));
        assert!(settlements(&mut cmd).is_empty());
    }
    assert_eq!(model.pending_calls(), 2);

    let workers: Vec<_> = handoff
        .take()
        .into_iter()
        .map(|promise| {
            thread::spawn(move || {
                let call_id = promise.call_id();
                promise.resolve(call_id * 10);
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let mut cmd = drive(&mut model, Event::Flush);
    let mut settled = settlements(&mut cmd);
    settled.sort_by_key(|(call_id, _)| *call_id);
    assert_eq!(
        settled,
        vec![
            (3, Settlement::Resolved(BridgeValue::from(30u32))),
            (4, Settlement::Resolved(BridgeValue::from(40u32))),
        ]
    );
    assert_eq!(model.pending_calls(), 0);

    // Settled calls are delivered once.
    let mut cmd = drive(&mut model, Event::Flush);
    assert!(settlements(&mut cmd).is_empty());
}

#[test]
fn configure_changes_the_log_level() {
    let mut model = Model::default();
    let sync = |call_id| {
        invoke(
            call_id,
            live_activity::MODULE_NAME,
            "syncJobsToWidget",
            vec![BridgeValue::from(Vec::<BridgeValue>::new())],
        )
    };

    let mut cmd = drive(&mut model, sync(1));
    let records = logs(&mut cmd);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, LogLevel::Info);
    assert_eq!(records[0].source, live_activity::MODULE_NAME);

    let config = BridgeConfig::from_json(r#"{"logLevel": "warn", "platform": "ios"}"#).unwrap();
    let _ = drive(&mut model, Event::Configure(config));
    assert_eq!(BridgeApp.view(&model).log_level, LogLevel::Warn);
    assert_eq!(BridgeApp.view(&model).platform, "ios");

    let mut cmd = drive(&mut model, sync(2));
    assert!(logs(&mut cmd).is_empty());
}

#[test]
fn listeners_are_counted_per_module() {
    let mut model = Model::default();
    let add = || Event::AddListener {
        module: live_activity::MODULE_NAME.into(),
        event: live_activity::STATE_CHANGED_EVENT.into(),
    };
    let _ = drive(&mut model, add());
    let _ = drive(&mut model, add());
    let count = |model: &Model| {
        BridgeApp
            .view(model)
            .module(live_activity::MODULE_NAME)
            .map(|m| m.listener_count)
    };
    assert_eq!(count(&model), Some(2));

    let _ = drive(
        &mut model,
        Event::RemoveListeners {
            module: live_activity::MODULE_NAME.into(),
            count: 5,
        },
    );
    assert_eq!(count(&model), Some(0));

    let mut cmd = drive(
        &mut model,
        Event::AddListener {
            module: bridge_info::MODULE_NAME.into(),
            event: "Changed".into(),
        },
    );
    let records = logs(&mut cmd);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, LogLevel::Error);
}

#[test]
fn logs_precede_events_which_precede_settlements() {
    let mut model = Model::default();
    let mut cmd = drive(
        &mut model,
        invoke(
            1,
            live_activity::MODULE_NAME,
            "startLiveActivity",
            vec!["Office".into()],
        ),
    );
    let mut request = activity_request(&mut cmd);
    request
        .resolve(ActivityResponse::Started {
            activity_id: "A1".into(),
        })
        .unwrap();
    let events: Vec<Event> = cmd.events().collect();
    assert_eq!(events.len(), 1);

    let mut cmd = drive(&mut model, events.into_iter().next().unwrap());
    let kinds: Vec<&str> = cmd
        .effects()
        .filter_map(|effect| match effect {
            Effect::Log(_) => Some("log"),
            Effect::Emit(_) => Some("emit"),
            Effect::Settle(_) => Some("settle"),
            _ => None,
        })
        .collect();
    // The event has no listeners, which is logged as a warning.
    assert_eq!(kinds, ["log", "emit", "settle"]);
}
