//! Loading the variant registry from JSON.
//!
//! ```json
//! { "layouts": [ { "variant": "nRF52840", "bootloader_addr": "0xF8000",
//!                  "settings_addr": "0xFF000", "app_area_addr": "0x27000" } ] }
//! ```
//!
//! Addresses may be numbers or strings in any base `parse_u32` accepts. Entries
//! are registered in file order, which is the order variants are tried in.
//! Reading a settings page past the end of a dump is an error, so tables list
//! layouts by ascending settings address.

use std::path::Path;

use log::debug;
use nrf_fw::{MemoryLayout, Variant, VariantRegistry};
use serde::Deserialize;

use crate::utils::parse_u32;
use crate::ToolError;

/// Layouts for the nRF52 family with the stock Nordic bootloader.
pub const DEFAULT_LAYOUTS: &str = include_str!("../config/layouts.json");

#[derive(Deserialize)]
#[serde(untagged)]
enum Address {
    Number(u32),
    Text(String),
}

impl Address {
    fn value(&self) -> Result<u32, ToolError> {
        match self {
            Address::Number(n) => Ok(*n),
            Address::Text(s) => parse_u32(s),
        }
    }
}

#[derive(Deserialize)]
struct LayoutEntry {
    variant: String,
    bootloader_addr: Address,
    settings_addr: Address,
    app_area_addr: Address,
}

#[derive(Deserialize)]
struct LayoutFile {
    layouts: Vec<LayoutEntry>,
}

pub fn parse_registry(json: &str) -> Result<VariantRegistry, ToolError> {
    let file: LayoutFile = serde_json::from_str(json)?;
    let mut registry = VariantRegistry::new();
    for entry in file.layouts {
        let variant: Variant = entry.variant.parse().map_err(|e| ToolError::Config(format!("{}", e)))?;
        let layout = MemoryLayout {
            bootloader_addr: entry.bootloader_addr.value()?,
            settings_addr: entry.settings_addr.value()?,
            app_area_addr: entry.app_area_addr.value()?,
        };
        if registry.lookup(variant).is_some() {
            return Err(ToolError::Config(format!("{} is listed more than once", variant)));
        }
        debug!("registry: {} {:x?}", variant, layout);
        registry.insert(variant, layout);
    }
    if registry.is_empty() {
        return Err(ToolError::Config(String::from("no layouts defined")));
    }
    Ok(registry)
}

pub fn default_registry() -> Result<VariantRegistry, ToolError> { parse_registry(DEFAULT_LAYOUTS) }

/// Load the registry at `path`, or the built-in table if there is none.
pub fn load_registry<P: AsRef<Path>>(path: Option<P>) -> Result<VariantRegistry, ToolError> {
    match path {
        Some(p) => parse_registry(&std::fs::read_to_string(p)?),
        None => default_registry(),
    }
}
