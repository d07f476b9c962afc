use std::fmt;
use std::io;

use crate::mcuboot::TlvType;

#[derive(Debug)]
pub enum FirmwareError {
    /// The backing store couldn't satisfy a read
    Io(io::Error),

    /// CRC over a region didn't match the recorded value. The data may belong to a different variant.
    ChecksumMismatch { offset: u64, expected: u32, actual: u32 },

    /// Settings record was the wrong size or carried an unknown version
    MalformedSettings(String),

    /// No registered variant matched the image
    UnrecognizedVariant,

    /// No MCUboot header with valid padding was found
    HeaderNotFound,

    /// TLV info record carried an unknown magic
    InvalidTlvMagic(u16),

    /// A TLV entry appeared where a different type was required
    UnexpectedTlvType { offset: u64, expected: TlvType, actual: u8 },

    /// The init packet carries no signed command
    UnsignedFirmware,

    /// The init packet is missing a required section
    MalformedEnvelope(&'static str),

    /// Only SHA-256 firmware hashes are supported
    UnsupportedHashAlgorithm(String),

    /// Init packet couldn't be decoded or re-encoded
    Protobuf(protobuf::Error),

    /// Signatures are always 64 bytes
    InvalidSignatureSize(usize),

    /// Key bytes couldn't be turned into a public key
    InvalidPublicKey(String),

    /// The signature check ran and did not pass
    SignatureMismatch,

    /// No embedded public key prefix was found
    KeyNotFound,

    /// The SDK fingerprint isn't in the database
    SdkVersionNotFound(String),
}

impl FirmwareError {
    /// Only checksum failures are worth retrying against another variant.
    pub fn is_retriable(&self) -> bool { matches!(self, FirmwareError::ChecksumMismatch { .. }) }
}

impl fmt::Display for FirmwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use FirmwareError::*;
        match self {
            Io(e) => write!(f, "couldn't read from the image: {}", e),
            ChecksumMismatch { offset, expected, actual } => write!(
                f,
                "crc32 mismatch for region at {:08x}: expected {:08x}, calculated {:08x}",
                offset, expected, actual
            ),
            MalformedSettings(s) => write!(f, "malformed bootloader settings: {}", s),
            UnrecognizedVariant => write!(f, "image doesn't match any registered variant"),
            HeaderNotFound => write!(f, "mcu-boot: no image header found"),
            InvalidTlvMagic(m) => write!(f, "mcu-boot: invalid tlv info magic {:04x}", m),
            UnexpectedTlvType { offset, expected, actual } => write!(
                f,
                "mcu-boot: expected {:?} tlv at {:08x}, found type {:02x}",
                expected, offset, actual
            ),
            UnsignedFirmware => write!(f, "firmware is not signed"),
            MalformedEnvelope(s) => write!(f, "invalid init packet: {}", s),
            UnsupportedHashAlgorithm(s) => write!(f, "unsupported hash type {}", s),
            Protobuf(e) => write!(f, "couldn't process init packet: {}", e),
            InvalidSignatureSize(s) => write!(f, "invalid signature size {} (expected 64)", s),
            InvalidPublicKey(s) => write!(f, "invalid public key: {}", s),
            SignatureMismatch => write!(f, "firmware signature verification failed"),
            KeyNotFound => write!(f, "verifying key not found"),
            SdkVersionNotFound(h) => write!(f, "no SDK version matches fingerprint {}", h),
        }
    }
}

impl std::error::Error for FirmwareError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FirmwareError::Io(e) => Some(e),
            FirmwareError::Protobuf(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FirmwareError {
    fn from(e: io::Error) -> FirmwareError { FirmwareError::Io(e) }
}

impl From<protobuf::Error> for FirmwareError {
    fn from(e: protobuf::Error) -> FirmwareError { FirmwareError::Protobuf(e) }
}
