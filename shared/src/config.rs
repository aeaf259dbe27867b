//! Runtime configuration of the bridge, sent by the shell with `Event::Configure`.

use compact_str::CompactString;
use crux_bridge::LogLevel;
use serde::{Deserialize, Serialize};

/// Every field has a default, so the shell only needs to send what it wants to change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Log records below this level are not forwarded to the shell. They still reach `tracing`.
    pub log_level: LogLevel,
    /// The platform the shell runs on, e.g. "ios" or "android". Exported as a module constant.
    pub platform: CompactString,
    /// Whether the platform supports live activities and the user has them enabled.
    pub live_activities_enabled: bool,
    /// Calls beyond this many unsettled ones are rejected right away.
    pub max_pending_calls: usize,
    /// Whether events are delivered when the scripting layer has no listener for the module.
    pub emit_without_listeners: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            platform: "unknown".into(),
            live_activities_enabled: true,
            max_pending_calls: 256,
            emit_without_listeners: true,
        }
    }
}

impl BridgeConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
