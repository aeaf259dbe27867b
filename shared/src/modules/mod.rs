//! The native modules the app ships with.

pub mod bridge_info;
pub mod live_activity;
mod widget;

pub use widget::{CalendarDay, DayKind, WIDGET_SYNC_ERROR, WidgetJob};

use crate::registry::{ModuleRegistry, RegisterError};

pub fn register_all(registry: &mut ModuleRegistry) -> [Result<(), RegisterError>; 2] {
    [
        registry.register(bridge_info::BridgeInfo),
        registry.register(live_activity::LiveActivityModule::default()),
    ]
}
