//! Signed init packets from nRF5 DFU packages.

include!(concat!(env!("OUT_DIR"), "/protos/mod.rs"));

use protobuf::Message;

use self::dfu_cc::{HashType, Packet, SignatureType};
use crate::sig::{verify_signature, SIGNATURE_LENGTH};
use crate::FirmwareError;

/// Decode the contents of a `.dat` file.
pub fn decode_packet(b: &[u8]) -> Result<Packet, FirmwareError> { Ok(Packet::parse_from_bytes(b)?) }

/// The signable part of an init packet, with hash and signature in big-endian order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    /// Serialized init command; this is what the signature covers
    pub command_bytes: Vec<u8>,
    /// SHA-256 of the firmware image
    pub hash: Vec<u8>,
    pub signature: Vec<u8>,
    pub signature_type: SignatureType,
}

impl SignedEnvelope {
    pub fn from_packet(packet: &Packet) -> Result<SignedEnvelope, FirmwareError> {
        let sc = packet.signed_command.as_ref().ok_or(FirmwareError::UnsignedFirmware)?;
        let cmd = sc.command.init.as_ref().ok_or(FirmwareError::MalformedEnvelope("no init command"))?;
        let command_bytes = cmd.write_to_bytes()?;

        let hash = cmd.hash.as_ref().ok_or(FirmwareError::MalformedEnvelope("no firmware hash"))?;
        if hash.hash_type() != HashType::SHA256 {
            return Err(FirmwareError::UnsupportedHashAlgorithm(format!("{:?}", hash.hash_type())));
        }
        let mut digest = hash.hash().to_vec();
        digest.reverse();

        // r and s are each stored little-endian
        let mut signature = sc.signature().to_vec();
        if signature.len() != SIGNATURE_LENGTH {
            return Err(FirmwareError::InvalidSignatureSize(signature.len()));
        }
        signature[..0x20].reverse();
        signature[0x20..].reverse();

        Ok(SignedEnvelope { command_bytes, hash: digest, signature, signature_type: sc.signature_type() })
    }

    /// Verify the init command against `key` (PEM text or raw key bytes).
    pub fn verify(&self, key: &[u8]) -> Result<(), FirmwareError> {
        verify_signature(key, &self.command_bytes, &self.signature)
    }
}

impl std::fmt::Display for SignedEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "- appHash: {}\n- signature: {}\n- cmd: {}",
            hex::encode(&self.hash),
            hex::encode(&self.signature),
            hex::encode(&self.command_bytes)
        )
    }
}
