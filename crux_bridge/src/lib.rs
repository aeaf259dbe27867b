//! Capabilities for the boundary between a Crux core and the scripting layer of its shell.
//!
//! Everything that crosses the boundary lives here: the dynamic [`BridgeValue`], conversion from
//! it to native types, the resolve/reject outcome of a call and the operations the core asks the
//! shell to perform.

mod activity;
mod convert;
mod emit;
mod log;
mod settle;
mod value;
mod widget;

pub use activity::{ActivityOperation, ActivityResponse, LiveActivity};
pub use convert::{ConvertError, FromBridge};
pub use emit::{EmitOperation, EventEmitter};
pub use log::{Log, LogLevel, LogOperation};
pub use settle::{
    CallId, ErrorObject, PromiseError, Promises, SettleOperation, Settlement, UNSPECIFIED_CODE,
    UNSPECIFIED_MESSAGE,
};
pub use value::BridgeValue;
pub use widget::{WidgetOperation, WidgetResponse, WidgetStore};
