//! Data for the home screen widgets, written to the storage the app shares with them.

use chrono::NaiveDate;
use compact_str::{CompactString, format_compact};
use crux_bridge::{
    BridgeValue, ConvertError, ErrorObject, PromiseError, WidgetResponse, WidgetStore,
};
use serde::{Deserialize, Serialize};

use crate::Event;
use crate::module::{InvokeError, MethodCall, ModuleContext, Reply};

pub const WIDGET_SYNC_ERROR: &str = "WIDGET_SYNC_ERROR";
pub const JOBS_KEY: &str = "WorkTrack.JobsData";
pub const CALENDAR_KEY: &str = "WorkTrack.CalendarData";

const DEFAULT_JOB_NAME: &str = "Work";
const DEFAULT_JOB_COLOR: &str = "#059669";

/// A job as the scripting layer sends it. Every field may be missing.
#[derive(Deserialize)]
struct JobInput {
    #[serde(default)]
    name: Option<CompactString>,
    #[serde(default)]
    address: Option<CompactString>,
    #[serde(default)]
    location: Option<CompactString>,
    #[serde(default)]
    color: Option<CompactString>,
}

/// A job as the widgets read it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WidgetJob {
    pub name: CompactString,
    pub location: Option<CompactString>,
    pub color: CompactString,
}

impl JobInput {
    fn normalise(self) -> WidgetJob {
        let non_empty = |s: Option<CompactString>| s.filter(|s| !s.trim().is_empty());
        WidgetJob {
            name: non_empty(self.name).unwrap_or_else(|| DEFAULT_JOB_NAME.into()),
            location: non_empty(self.address).or_else(|| non_empty(self.location)),
            color: non_empty(self.color).unwrap_or_else(|| DEFAULT_JOB_COLOR.into()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayKind {
    Work,
    Vacation,
    Sick,
    Free,
    Scheduled,
}

/// One day of the mini calendar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: DayKind,
    #[serde(default)]
    pub job_name: Option<CompactString>,
    #[serde(default)]
    pub job_color: Option<CompactString>,
    #[serde(default)]
    pub hours: Option<f64>,
}

/// `saveCalendarData(data)`: store the calendar as it is, as long as it is a map or an array.
pub fn save_calendar_data(
    call: &MethodCall,
    cx: &mut ModuleContext<'_>,
) -> Result<Reply, InvokeError> {
    let data: BridgeValue = call.arg(0)?;
    if !matches!(data, BridgeValue::Map(_) | BridgeValue::Array(_)) {
        return Err(invalid(
            call,
            ConvertError::Mismatch {
                expected: "map or array",
                found: data.kind(),
            },
        ));
    }
    Ok(write(cx, CALENDAR_KEY, data))
}

/// `syncJobsToWidget(jobs)`
pub fn sync_jobs(call: &MethodCall, cx: &mut ModuleContext<'_>) -> Result<Reply, InvokeError> {
    let jobs: Vec<WidgetJob> = decode_items::<JobInput>(call)?
        .into_iter()
        .map(JobInput::normalise)
        .collect();
    cx.logger()
        .info(format_compact!("Syncing {} jobs to the widget", jobs.len()));
    let value = encode(&jobs)?;
    Ok(write(cx, JOBS_KEY, value))
}

/// `syncCalendarToWidget(days)`
pub fn sync_calendar(call: &MethodCall, cx: &mut ModuleContext<'_>) -> Result<Reply, InvokeError> {
    let days = decode_items::<CalendarDay>(call)?;
    cx.logger()
        .info(format_compact!("Syncing {} calendar days to the widget", days.len()));
    let value = encode(&days)?;
    Ok(write(cx, CALENDAR_KEY, value))
}

fn decode_items<T: serde::de::DeserializeOwned>(call: &MethodCall) -> Result<Vec<T>, InvokeError> {
    let items: Vec<BridgeValue> = call.arg(0)?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.decode()
                .map_err(|e| invalid(call, e.at(format_args!("[{i}]"))))
        })
        .collect()
}

fn encode<T: Serialize>(value: &T) -> Result<BridgeValue, InvokeError> {
    BridgeValue::encode(value).map_err(|e| InvokeError::failure(format_compact!("{e}")))
}

fn invalid(call: &MethodCall, source: ConvertError) -> InvokeError {
    InvokeError::InvalidArgument {
        method: call.method.clone(),
        index: 0,
        source,
    }
}

fn write(cx: &mut ModuleContext<'_>, key: &'static str, value: BridgeValue) -> Reply {
    cx.defer(move |promise| {
        WidgetStore::write(key, value).then_send(move |response| {
            match response {
                WidgetResponse::Written => promise.resolve(true),
                WidgetResponse::Failed { reason } => promise.reject(
                    PromiseError::new(
                        WIDGET_SYNC_ERROR,
                        format_compact!("Failed to write {key}: {reason}"),
                    )
                    .with_error(ErrorObject::new("WidgetStore", reason)),
                ),
            }
            Event::Flush
        })
    })
}
