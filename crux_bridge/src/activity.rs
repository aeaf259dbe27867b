use std::future::Future;
use std::marker::PhantomData;

use compact_str::CompactString;
use crux_core::{
    Request,
    capability::Operation,
    command::{Command, RequestBuilder},
};
use serde::{Deserialize, Serialize};

/// A request to the shell to manage the live activity shown on the lock screen while a work
/// timer runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityOperation {
    /// Start a new activity. All existing activities are ended first.
    Start {
        job_name: CompactString,
        location: Option<CompactString>,
    },
    /// Update the elapsed time of an activity.
    ///
    /// With `activity_id: None` the shell updates the first active activity it knows of, which
    /// lets an activity survive a restart of the core.
    Update {
        activity_id: Option<CompactString>,
        elapsed_seconds: u64,
    },
    /// End an activity, leaving the final elapsed time visible until the system dismisses it.
    End {
        activity_id: CompactString,
        elapsed_seconds: u64,
    },
    /// End every activity immediately.
    EndAll,
    /// List the ids of the active activities.
    List,
}

/// The shell's answer to an [`ActivityOperation`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityResponse {
    Started { activity_id: CompactString },
    Updated { activity_id: CompactString },
    Ended,
    Active { activity_ids: Vec<CompactString> },
    /// There was no activity to update or end.
    NoActivity,
    /// The user or the platform has disabled live activities.
    NotEnabled,
    Failed { reason: CompactString },
}

impl Operation for ActivityOperation {
    type Output = ActivityResponse;
}

/// The live activity capability API.
#[derive(Clone)]
pub struct LiveActivity<Effect, Event> {
    effect: PhantomData<Effect>,
    event: PhantomData<Event>,
}

impl<Effect, Event> LiveActivity<Effect, Event>
where
    Effect: Send + From<Request<ActivityOperation>> + 'static,
    Event: Send + 'static,
{
    pub fn start(
        job_name: CompactString,
        location: Option<CompactString>,
    ) -> RequestBuilder<Effect, Event, impl Future<Output = ActivityResponse>> {
        Command::request_from_shell(ActivityOperation::Start { job_name, location })
    }

    pub fn update(
        activity_id: Option<CompactString>,
        elapsed_seconds: u64,
    ) -> RequestBuilder<Effect, Event, impl Future<Output = ActivityResponse>> {
        Command::request_from_shell(ActivityOperation::Update {
            activity_id,
            elapsed_seconds,
        })
    }

    pub fn end(
        activity_id: CompactString,
        elapsed_seconds: u64,
    ) -> RequestBuilder<Effect, Event, impl Future<Output = ActivityResponse>> {
        Command::request_from_shell(ActivityOperation::End {
            activity_id,
            elapsed_seconds,
        })
    }

    pub fn end_all() -> RequestBuilder<Effect, Event, impl Future<Output = ActivityResponse>> {
        Command::request_from_shell(ActivityOperation::EndAll)
    }

    pub fn list() -> RequestBuilder<Effect, Event, impl Future<Output = ActivityResponse>> {
        Command::request_from_shell(ActivityOperation::List)
    }
}
