//! Offline analysis of nRF52 firmware: variant detection, sub-image extraction,
//! MCUboot trailers, DFU init packets and signature checks.
pub mod dfu;
pub mod error;
pub mod firmware;
pub mod keys;
pub mod mcuboot;
pub mod scan;
pub mod sdk;
pub mod settings;
pub mod sig;
pub mod store;
pub mod variant;

#[cfg(test)]
mod test_util;

pub use dfu::{decode_packet, SignedEnvelope};
pub use error::FirmwareError;
pub use firmware::Firmware;
pub use keys::{find_verifying_key, EmbeddedKey, KeySuite};
pub use mcuboot::{McuBoot, McuBootHeader, TlvArea};
pub use sdk::{detect_sdk_version, sdk_fingerprint, SdkLookup};
pub use settings::SettingsRecord;
pub use sig::{verify_signature, PublicKey};
pub use store::ReadAt;
pub use variant::{MemoryLayout, Variant, VariantRegistry};
