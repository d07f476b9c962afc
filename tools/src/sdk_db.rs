//! The SDK fingerprint database, and generating entries for it from an SDK release archive.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use log::{debug, info};
use nrf_fw::{sdk_fingerprint, SdkLookup};
use serde::{Deserialize, Serialize};

use crate::intel_hex::hex_to_binary;
use crate::ToolError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftDeviceHash {
    #[serde(rename = "softDevice")]
    pub soft_device: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkEntry {
    #[serde(rename = "sdkVersion")]
    pub sdk_version: String,
    pub hashes: Vec<SoftDeviceHash>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkSignatures {
    pub signatures: Vec<SdkEntry>,
}

impl SdkSignatures {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<SdkSignatures, ToolError> {
        Ok(serde_json::from_slice(&std::fs::read(path)?)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ToolError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn append(&mut self, sdk_version: &str, hashes: Vec<SoftDeviceHash>) {
        self.signatures.push(SdkEntry { sdk_version: sdk_version.to_owned(), hashes });
    }
}

impl SdkLookup for SdkSignatures {
    fn sdk_version(&self, fingerprint: &str) -> Option<&str> {
        for entry in &self.signatures {
            if let Some(h) = entry.hashes.iter().find(|h| h.signature == fingerprint) {
                info!("sdk: fingerprint matches {} from {}", h.soft_device, entry.sdk_version);
                return Some(&entry.sdk_version);
            }
        }
        None
    }
}

/// `s132_nrf52_7.2.0_softdevice.hex` is labelled `S132`.
fn soft_device_label(name: &str) -> String {
    let base = name.rsplit('/').next().unwrap_or(name);
    base.split('_').next().unwrap_or(base).to_uppercase()
}

fn is_soft_device_hex(name: &str) -> bool { name.ends_with(".hex") && !name.contains("nRF5_SDK") }

fn scan_archive<R: Read + Seek>(r: R, found: &mut BTreeMap<String, String>) -> Result<(), ToolError> {
    let mut archive = zip::ZipArchive::new(r)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_owned();
        if name.ends_with(".zip") {
            debug!("sdk: descending into {}", name);
            let mut inner = Vec::new();
            entry.read_to_end(&mut inner)?;
            scan_archive(Cursor::new(inner), found)?;
        } else if is_soft_device_hex(&name) {
            let mut text = String::new();
            entry.read_to_string(&mut text)?;
            let image = hex_to_binary(&text)?;
            let fingerprint = hex::encode(sdk_fingerprint(&image)?);
            let label = soft_device_label(&name);
            debug!("sdk: {} -> {} {}", name, label, fingerprint);
            found.insert(label, fingerprint);
        }
    }
    Ok(())
}

/// Fingerprint every SoftDevice in an SDK release archive, including archives nested inside it.
pub fn scan_sdk_archive<R: Read + Seek>(r: R) -> Result<Vec<SoftDeviceHash>, ToolError> {
    let mut found = BTreeMap::new();
    scan_archive(r, &mut found)?;
    Ok(found.into_iter().map(|(soft_device, signature)| SoftDeviceHash { soft_device, signature }).collect())
}
