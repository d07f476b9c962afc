//! Identify the nRF5 SDK a SoftDevice was built from.

use log::debug;
use sha2::{Digest, Sha256};

use crate::store::ReadAt;
use crate::FirmwareError;

pub const SDK_WINDOW_OFFSET: u64 = 0x1000;
pub const SDK_WINDOW_LEN: usize = 0x2710;

/// Maps hex-encoded SoftDevice fingerprints to SDK versions.
pub trait SdkLookup {
    fn sdk_version(&self, fingerprint: &str) -> Option<&str>;
}

/// SHA-256 over the start of the SoftDevice, just past the MBR.
pub fn sdk_fingerprint<R: ReadAt + ?Sized>(store: &R) -> Result<[u8; 32], FirmwareError> {
    let window = store.read_vec_at(SDK_WINDOW_LEN, SDK_WINDOW_OFFSET)?;
    Ok(Sha256::digest(&window).into())
}

pub fn detect_sdk_version<R: ReadAt + ?Sized, L: SdkLookup + ?Sized>(
    store: &R,
    lookup: &L,
) -> Result<String, FirmwareError> {
    let fingerprint = hex::encode(sdk_fingerprint(store)?);
    debug!("softdevice fingerprint {}", fingerprint);
    match lookup.sdk_version(&fingerprint) {
        Some(version) => Ok(version.to_string()),
        None => Err(FirmwareError::SdkVersionNotFound(fingerprint)),
    }
}
