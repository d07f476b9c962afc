//! Firmware signature verification with ECDSA P-256 or Ed25519 public keys.
//!
//! Keys are accepted either as a PEM `PUBLIC KEY` block, or as raw bytes: 32 bytes
//! for Ed25519, 64 bytes (X || Y) or 65 bytes (0x04 || X || Y) for P-256.

use ed25519_dalek::Verifier;
use log::debug;
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use pkcs8::der::asn1::ObjectIdentifier;
use pkcs8::der::Decode;
use pkcs8::SubjectPublicKeyInfoRef;
use sha2::{Digest, Sha256};

use crate::FirmwareError;

pub const SIGNATURE_LENGTH: usize = 64;

const ID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const ID_ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");

#[derive(Debug, Clone)]
pub enum PublicKey {
    EllipticP256(p256::ecdsa::VerifyingKey),
    Edwards25519(ed25519_dalek::VerifyingKey),
}

fn invalid_key<E: std::fmt::Display>(e: E) -> FirmwareError { FirmwareError::InvalidPublicKey(format!("{}", e)) }

impl PublicKey {
    /// Decode a PEM `PUBLIC KEY` block.
    ///
    /// Returns `Ok(None)` for a well-formed key of an algorithm firmware can't be signed with.
    pub fn from_pem(text: &[u8]) -> Result<Option<PublicKey>, FirmwareError> {
        let block = pem::parse(text).map_err(invalid_key)?;
        if block.tag != "PUBLIC KEY" {
            return Err(FirmwareError::InvalidPublicKey(format!("unexpected PEM block {}", block.tag)));
        }
        let spki = SubjectPublicKeyInfoRef::from_der(&block.contents).map_err(invalid_key)?;
        let point = spki.subject_public_key.raw_bytes();
        if spki.algorithm.oid == ID_ED25519 {
            return Ok(Some(Self::ed25519(point)?));
        }
        if spki.algorithm.oid == ID_EC_PUBLIC_KEY {
            match spki.algorithm.parameters_oid() {
                Ok(curve) if curve == SECP256R1 => {
                    let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(point).map_err(invalid_key)?;
                    return Ok(Some(PublicKey::EllipticP256(key)));
                }
                other => debug!("unsupported EC curve {:?}", other),
            }
        } else {
            debug!("unsupported public key algorithm {}", spki.algorithm.oid);
        }
        Ok(None)
    }

    /// Interpret raw key bytes by their length.
    pub fn from_raw(key: &[u8]) -> Result<PublicKey, FirmwareError> {
        match key.len() {
            0x20 => Self::ed25519(key),
            0x40 | 0x41 => Self::p256_coordinates(key),
            n => Err(FirmwareError::InvalidPublicKey(format!("no key type is {} bytes long", n))),
        }
    }

    fn ed25519(key: &[u8]) -> Result<PublicKey, FirmwareError> {
        let bytes: [u8; 32] = key
            .try_into()
            .map_err(|_| FirmwareError::InvalidPublicKey(format!("invalid ed25519 key size {}", key.len())))?;
        Ok(PublicKey::Edwards25519(ed25519_dalek::VerifyingKey::from_bytes(&bytes).map_err(invalid_key)?))
    }

    fn p256_coordinates(key: &[u8]) -> Result<PublicKey, FirmwareError> {
        let xy = match key {
            [0x04, rest @ ..] if key.len() == 0x41 => rest,
            _ => key,
        };
        if xy.len() != 0x40 {
            return Err(FirmwareError::InvalidPublicKey(String::from("invalid ecdsa public key size")));
        }
        let mut sec1 = Vec::with_capacity(0x41);
        sec1.push(0x04);
        sec1.extend_from_slice(xy);
        let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1).map_err(invalid_key)?;
        Ok(PublicKey::EllipticP256(key))
    }

    /// `true` if `sig` is a valid signature over `msg`. P-256 signatures are over SHA-256(msg).
    pub fn verify(&self, msg: &[u8], sig: &[u8; SIGNATURE_LENGTH]) -> bool {
        match self {
            PublicKey::EllipticP256(key) => {
                // r or s outside [1, n) can't be a valid signature
                let Ok(signature) = p256::ecdsa::Signature::from_slice(sig) else {
                    return false;
                };
                let digest = Sha256::digest(msg);
                key.verify_prehash(&digest, &signature).is_ok()
            }
            PublicKey::Edwards25519(key) => {
                let signature = ed25519_dalek::Signature::from_bytes(sig);
                key.verify(msg, &signature).is_ok()
            }
        }
    }
}

fn verified(ok: bool) -> Result<(), FirmwareError> {
    if ok {
        Ok(())
    } else {
        Err(FirmwareError::SignatureMismatch)
    }
}

/// Verify a firmware signature. `key` is either PEM text or raw key bytes.
pub fn verify_signature(key: &[u8], msg: &[u8], sig: &[u8]) -> Result<(), FirmwareError> {
    let sig: &[u8; SIGNATURE_LENGTH] = sig.try_into().map_err(|_| FirmwareError::InvalidSignatureSize(sig.len()))?;
    if String::from_utf8_lossy(key).contains("PUBLIC KEY") {
        return match PublicKey::from_pem(key)? {
            Some(pk) => verified(pk.verify(msg, sig)),
            None => Err(FirmwareError::SignatureMismatch),
        };
    }
    verified(PublicKey::from_raw(key)?.verify(msg, sig))
}
