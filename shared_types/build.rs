use std::path::PathBuf;

use anyhow::Result;
use crux_bridge::{
    ActivityOperation, ActivityResponse, BridgeValue, LogLevel, Settlement, WidgetOperation,
    WidgetResponse,
};
use crux_core::typegen::TypeGen;
use shared::BridgeApp;

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=../shared");
    println!("cargo:rerun-if-changed=../crux_bridge");

    let mut gen = TypeGen::new();

    // Enums nested in events and effects are traced with all their variants.
    gen.register_type::<LogLevel>()?;
    gen.register_type::<BridgeValue>()?;
    gen.register_type::<Settlement>()?;
    gen.register_type::<ActivityOperation>()?;
    gen.register_type::<ActivityResponse>()?;
    gen.register_type::<WidgetOperation>()?;
    gen.register_type::<WidgetResponse>()?;
    gen.register_app::<BridgeApp>()?;

    let output_root = PathBuf::from("./generated");
    gen.swift("SharedTypes", output_root.join("swift"))?;
    gen.java("com.worktrack.shared_types", output_root.join("java"))?;

    Ok(())
}
