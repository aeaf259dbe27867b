//! What the shell gets from `view()`.
//!
//! The shell reads the module list to build the objects the scripting layer sees as native
//! modules, and may show it on a diagnostics screen.
use std::collections::BTreeMap;

use compact_str::CompactString;
use crux_bridge::{BridgeValue, LogLevel};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A registered native module as the scripting layer sees it.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleView {
    pub name: CompactString,
    pub methods: SmallVec<[CompactString; 8]>,
    pub constants: BTreeMap<CompactString, BridgeValue>,
    pub supported_events: SmallVec<[CompactString; 2]>,
    pub listener_count: usize,
    pub requires_main_queue_setup: bool,
}

impl ModuleView {
    pub fn has_method(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m.as_str() == method)
    }
}

/// The entire view model.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    /// Registered modules sorted by name.
    pub modules: Vec<ModuleView>,
    /// Calls which haven't been settled yet.
    pub pending_calls: usize,
    pub log_level: LogLevel,
    pub platform: CompactString,
}

impl ViewModel {
    pub fn module(&self, name: &str) -> Option<&ModuleView> {
        self.modules.iter().find(|m| m.name == name)
    }
}
