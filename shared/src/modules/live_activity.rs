//! The module behind the lock screen timer and the home screen widgets.
//!
//! The activity itself is drawn by the shell. This module keeps track of which activity belongs
//! to the running timer and turns the shell's answers into settled calls.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use compact_str::{CompactString, format_compact};
use crux_bridge::{ActivityResponse, BridgeValue, ErrorObject, LiveActivity, PromiseError};

use super::widget;
use crate::Event;
use crate::emitter::Emitter;
use crate::module::{InvokeError, MethodCall, ModuleContext, NativeModule, Reply};
use crate::promise::Promise;

pub const MODULE_NAME: &str = "LiveActivityModule";
pub const LIVE_ACTIVITY_ERROR: &str = "LIVE_ACTIVITY_ERROR";
/// Emitted whenever the tracked activity starts, updates or ends.
pub const STATE_CHANGED_EVENT: &str = "LiveActivityStateChanged";

const METHODS: &[&str] = &[
    "startLiveActivity",
    "updateLiveActivity",
    "endLiveActivity",
    "hasActiveLiveActivity",
    "endAllLiveActivities",
    "saveCalendarData",
    "syncJobsToWidget",
    "syncCalendarToWidget",
];

/// The id of the activity of the running timer, shared with the continuations of shell requests.
#[derive(Clone, Default)]
struct Tracked(Arc<Mutex<Option<CompactString>>>);

impl Tracked {
    fn lock(&self) -> MutexGuard<'_, Option<CompactString>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self) -> Option<CompactString> {
        self.lock().clone()
    }

    fn set(&self, activity_id: Option<CompactString>) {
        *self.lock() = activity_id;
    }
}

#[derive(Default)]
pub struct LiveActivityModule {
    current: Tracked,
}

impl LiveActivityModule {
    pub fn current_activity(&self) -> Option<CompactString> {
        self.current.get()
    }

    fn start(
        &mut self,
        call: &MethodCall,
        cx: &mut ModuleContext<'_>,
    ) -> Result<Reply, InvokeError> {
        let job_name: CompactString = call.arg(0)?;
        let location: Option<CompactString> = call.arg(1)?;
        if !cx.config().live_activities_enabled {
            return Ok(Reply::Reject(not_enabled()));
        }
        cx.logger()
            .info(format_compact!("Starting Live Activity for {job_name}"));
        let current = self.current.clone();
        let emitter = cx.emitter().clone();
        Ok(cx.defer(move |promise| {
            LiveActivity::start(job_name, location).then_send(move |response| {
                // The shell ends every existing activity before starting, whatever it answers.
                if let Some(ended) = current.lock().take() {
                    emit_state(&emitter, &ended, false, 0);
                }
                match response {
                    ActivityResponse::Started { activity_id } => {
                        current.set(Some(activity_id.clone()));
                        emit_state(&emitter, &activity_id, true, 0);
                        promise.resolve(activity_id);
                    }
                    other => reject_with(promise, other, "Failed to start Live Activity"),
                }
                Event::Flush
            })
        }))
    }

    fn update(
        &mut self,
        call: &MethodCall,
        cx: &mut ModuleContext<'_>,
    ) -> Result<Reply, InvokeError> {
        let elapsed_seconds: u64 = call.arg(0)?;
        if !cx.config().live_activities_enabled {
            return Ok(Reply::Reject(not_enabled()));
        }
        // Without a tracked activity the shell falls back to the first active one.
        let activity_id = self.current.get();
        let current = self.current.clone();
        let emitter = cx.emitter().clone();
        Ok(cx.defer(move |promise| {
            let requested = activity_id.clone();
            LiveActivity::update(activity_id, elapsed_seconds).then_send(move |response| {
                match response {
                    ActivityResponse::Updated { activity_id } => {
                        current.set(Some(activity_id.clone()));
                        emit_state(&emitter, &activity_id, true, elapsed_seconds);
                        promise.resolve(true);
                    }
                    ActivityResponse::NoActivity => {
                        if let Some(activity_id) = &requested {
                            forget(&current, activity_id);
                        }
                        promise.reject(no_activity());
                    }
                    other => reject_with(promise, other, "Failed to update Live Activity"),
                }
                Event::Flush
            })
        }))
    }

    fn end(
        &mut self,
        call: &MethodCall,
        cx: &mut ModuleContext<'_>,
    ) -> Result<Reply, InvokeError> {
        let elapsed_seconds: u64 = call.arg(0)?;
        if !cx.config().live_activities_enabled {
            return Ok(Reply::Reject(not_enabled()));
        }
        let Some(activity_id) = self.current.get() else {
            return Ok(Reply::Reject(no_activity()));
        };
        let current = self.current.clone();
        let emitter = cx.emitter().clone();
        Ok(cx.defer(move |promise| {
            LiveActivity::end(activity_id.clone(), elapsed_seconds).then_send(move |response| {
                match response {
                    ActivityResponse::Ended => {
                        forget(&current, &activity_id);
                        emit_state(&emitter, &activity_id, false, elapsed_seconds);
                        promise.resolve(true);
                    }
                    ActivityResponse::NoActivity => {
                        forget(&current, &activity_id);
                        promise.reject(no_activity());
                    }
                    other => reject_with(promise, other, "Failed to end Live Activity"),
                }
                Event::Flush
            })
        }))
    }

    fn has_active(&mut self, cx: &mut ModuleContext<'_>) -> Reply {
        if !cx.config().live_activities_enabled {
            return Reply::resolve(false);
        }
        if self.current.get().is_some() {
            return Reply::resolve(true);
        }
        // The shell may still show an activity started before the core was restarted.
        let current = self.current.clone();
        cx.defer(move |promise| {
            LiveActivity::list().then_send(move |response| {
                match response {
                    ActivityResponse::Active { activity_ids } => {
                        let first = activity_ids.into_iter().next();
                        let found = first.is_some();
                        if found {
                            current.set(first);
                        }
                        promise.resolve(found);
                    }
                    ActivityResponse::NotEnabled => promise.resolve(false),
                    other => reject_with(promise, other, "Failed to list Live Activities"),
                }
                Event::Flush
            })
        })
    }

    fn end_all(&mut self, cx: &mut ModuleContext<'_>) -> Reply {
        if !cx.config().live_activities_enabled {
            return Reply::resolve(true);
        }
        let current = self.current.clone();
        let emitter = cx.emitter().clone();
        cx.defer(move |promise| {
            LiveActivity::end_all().then_send(move |response| {
                match response {
                    ActivityResponse::Ended | ActivityResponse::NoActivity => {
                        if let Some(activity_id) = current.lock().take() {
                            emit_state(&emitter, &activity_id, false, 0);
                        }
                        promise.resolve(true);
                    }
                    other => reject_with(promise, other, "Failed to end Live Activities"),
                }
                Event::Flush
            })
        })
    }
}

impl NativeModule for LiveActivityModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn methods(&self) -> &[&'static str] {
        METHODS
    }

    fn supported_events(&self) -> &[&'static str] {
        &[STATE_CHANGED_EVENT]
    }

    fn invoke(
        &mut self,
        call: &MethodCall,
        cx: &mut ModuleContext<'_>,
    ) -> Result<Reply, InvokeError> {
        match call.method.as_str() {
            "startLiveActivity" => self.start(call, cx),
            "updateLiveActivity" => self.update(call, cx),
            "endLiveActivity" => self.end(call, cx),
            "hasActiveLiveActivity" => Ok(self.has_active(cx)),
            "endAllLiveActivities" => Ok(self.end_all(cx)),
            "saveCalendarData" => widget::save_calendar_data(call, cx),
            "syncJobsToWidget" => widget::sync_jobs(call, cx),
            "syncCalendarToWidget" => widget::sync_calendar(call, cx),
            other => Err(InvokeError::unknown_method(MODULE_NAME, other)),
        }
    }
}

/// Stop tracking `activity_id`, unless another activity has replaced it in the meantime.
fn forget(current: &Tracked, activity_id: &str) {
    let mut tracked = current.lock();
    if tracked.as_deref() == Some(activity_id) {
        *tracked = None;
    }
}

fn emit_state(emitter: &Emitter, activity_id: &str, is_running: bool, elapsed_seconds: u64) {
    let body = BridgeValue::map([
        ("activityId", BridgeValue::from(activity_id)),
        ("isRunning", BridgeValue::from(is_running)),
        ("elapsedSeconds", BridgeValue::from(elapsed_seconds)),
    ]);
    if let Err(e) = emitter.emit(STATE_CHANGED_EVENT, body) {
        tracing::error!("{e}");
    }
}

fn not_enabled() -> PromiseError {
    PromiseError::new(LIVE_ACTIVITY_ERROR, "Live Activities are not enabled")
}

fn no_activity() -> PromiseError {
    PromiseError::new(LIVE_ACTIVITY_ERROR, "No active Live Activity")
}

/// Reject with the error matching an unsuccessful response.
fn reject_with(promise: Promise, response: ActivityResponse, context: &str) {
    let error = match response {
        ActivityResponse::NotEnabled => not_enabled(),
        ActivityResponse::NoActivity => no_activity(),
        ActivityResponse::Failed { reason } => {
            PromiseError::new(LIVE_ACTIVITY_ERROR, format_compact!("{context}: {reason}"))
                .with_error(ErrorObject::new("LiveActivity", reason))
        }
        other => PromiseError::new(
            LIVE_ACTIVITY_ERROR,
            format_compact!("{context}: unexpected response {other:?}"),
        ),
    };
    promise.reject(error);
}
