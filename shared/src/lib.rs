pub mod bridge_app;
pub mod config;
pub mod emitter;
pub mod logging;
pub mod module;
pub mod modules;
pub mod promise;
pub mod registry;
#[cfg(test)]
mod testing;

use std::sync::LazyLock;

pub use bridge_app::*;
pub use crux_core::{Core, Request, bridge::Bridge};
#[cfg(target_family = "wasm")]
use wasm_bindgen::prelude::wasm_bindgen;

pub type Command = crux_core::Command<Effect, Event>;

uniffi::setup_scaffolding!();

static CORE: LazyLock<Bridge<BridgeApp>> = LazyLock::new(|| Bridge::new(Core::new()));

#[cfg_attr(target_family = "wasm", wasm_bindgen)]
#[cfg_attr(not(target_family = "wasm"), uniffi::export)]
pub fn process_event(data: Vec<u8>) -> Vec<u8> {
    CORE.process_event(&data).expect("the shell sent an event which couldn't be deserialized")
}

#[cfg_attr(target_family = "wasm", wasm_bindgen)]
#[cfg_attr(not(target_family = "wasm"), uniffi::export)]
pub fn handle_response(id: u32, data: Vec<u8>) -> Vec<u8> {
    CORE.handle_response(id, &data)
        .expect("the shell answered a request which doesn't exist or with the wrong output")
}

#[cfg_attr(target_family = "wasm", wasm_bindgen)]
#[cfg_attr(not(target_family = "wasm"), uniffi::export)]
pub fn view() -> Vec<u8> {
    CORE.view().expect("the view model couldn't be serialized")
}
