//! Locate a DER-encoded public key embedded in a bootloader image.

use log::debug;

use crate::scan::find_all;
use crate::FirmwareError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySuite {
    Rsa2048,
    Rsa3072,
    EcdsaP256,
    EcdsaP384,
    /// Ed25519 and X25519 keys share an encoding
    Ed25519,
}

impl KeySuite {
    pub const ALL: [KeySuite; 5] =
        [KeySuite::Rsa2048, KeySuite::Rsa3072, KeySuite::EcdsaP256, KeySuite::EcdsaP384, KeySuite::Ed25519];

    /// First four bytes of the suite's SubjectPublicKeyInfo (or RSAPublicKey) encoding.
    pub fn der_prefix(&self) -> [u8; 4] {
        match self {
            KeySuite::Rsa2048 => [0x30, 0x82, 0x01, 0x0a],
            KeySuite::Rsa3072 => [0x30, 0x82, 0x01, 0x8a],
            KeySuite::EcdsaP256 => [0x30, 0x59, 0x30, 0x13],
            KeySuite::EcdsaP384 => [0x30, 0x76, 0x30, 0x10],
            KeySuite::Ed25519 => [0x30, 0x2a, 0x30, 0x05],
        }
    }

    /// Full encoded length of a key of this suite.
    pub fn key_len(&self) -> usize {
        match self {
            KeySuite::Rsa2048 => 0x10e,
            KeySuite::Rsa3072 => 0x18e,
            KeySuite::EcdsaP256 => 0x5b,
            KeySuite::EcdsaP384 => 0x78,
            KeySuite::Ed25519 => 0x2c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedKey<'a> {
    pub suite: KeySuite,
    pub offset: usize,
    pub bytes: &'a [u8],
}

/// Find the earliest embedded key in `data`.
///
/// A prefix match only counts if the whole key fits in the buffer after it.
pub fn find_verifying_key(data: &[u8]) -> Result<EmbeddedKey<'_>, FirmwareError> {
    let mut best: Option<EmbeddedKey> = None;
    for suite in KeySuite::ALL {
        let prefix = suite.der_prefix();
        let hit = find_all(data, &prefix).find(|&offset| offset + suite.key_len() <= data.len());
        if let Some(offset) = hit {
            debug!("{:?} key prefix at {:08x}", suite, offset);
            if best.as_ref().map_or(true, |b| offset < b.offset) {
                best = Some(EmbeddedKey { suite, offset, bytes: &data[offset..offset + suite.key_len()] });
            }
        }
    }
    best.ok_or(FirmwareError::KeyNotFound)
}
