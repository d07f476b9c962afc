extern crate log;
mod error;
pub mod intel_hex;
pub mod package;
pub mod registry;
pub mod sdk_db;
pub mod utils;

pub use error::ToolError;
