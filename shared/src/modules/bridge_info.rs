//! Lets the scripting layer check that the native side is there and what it runs on.

use std::collections::BTreeMap;

use compact_str::CompactString;
use crux_bridge::BridgeValue;

use crate::config::BridgeConfig;
use crate::module::{InvokeError, MethodCall, ModuleContext, NativeModule, Reply};

pub const MODULE_NAME: &str = "BridgeInfo";

#[derive(Default)]
pub struct BridgeInfo;

impl NativeModule for BridgeInfo {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn methods(&self) -> &[&'static str] {
        &["getConstants"]
    }

    fn constants(&self, config: &BridgeConfig) -> BTreeMap<CompactString, BridgeValue> {
        BTreeMap::from([
            ("isAvailable".into(), BridgeValue::Bool(true)),
            ("platform".into(), BridgeValue::from(config.platform.clone())),
            ("version".into(), BridgeValue::from(env!("CARGO_PKG_VERSION"))),
        ])
    }

    fn requires_main_queue_setup(&self) -> bool {
        true
    }

    fn invoke(
        &mut self,
        call: &MethodCall,
        cx: &mut ModuleContext<'_>,
    ) -> Result<Reply, InvokeError> {
        match call.method.as_str() {
            "getConstants" => Ok(Reply::Resolve(BridgeValue::Map(self.constants(cx.config())))),
            other => Err(InvokeError::unknown_method(MODULE_NAME, other)),
        }
    }
}
