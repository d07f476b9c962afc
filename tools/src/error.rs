use std::fmt;
use std::io;

use nrf_fw::FirmwareError;

#[derive(Debug)]
pub enum ToolError {
    /// Generic IO Error
    Io(io::Error),

    /// The package or SDK archive couldn't be read
    Zip(zip::result::ZipError),

    /// A JSON document didn't match the expected shape
    Json(serde_json::Error),

    /// Intel HEX record couldn't be parsed
    Hex(ihex::ReaderError),

    /// Analysis of the firmware itself failed
    Firmware(FirmwareError),

    /// Init packets must come from a `.dat` file
    InvalidDatFile(String),

    /// The package manifest has no entry of the requested kind
    MissingManifestEntry(&'static str),

    /// Configuration was readable but made no sense
    Config(String),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::Io(e) => write!(f, "i/o error: {}", e),
            ToolError::Zip(e) => write!(f, "zip error: {}", e),
            ToolError::Json(e) => write!(f, "json error: {}", e),
            ToolError::Hex(e) => write!(f, "intel hex error: {}", e),
            ToolError::Firmware(e) => write!(f, "{}", e),
            ToolError::InvalidDatFile(name) => write!(f, "{} is not a .dat init packet", name),
            ToolError::MissingManifestEntry(kind) => write!(f, "manifest has no {} entry", kind),
            ToolError::Config(s) => write!(f, "invalid configuration: {}", s),
        }
    }
}

impl std::error::Error for ToolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ToolError::Io(e) => Some(e),
            ToolError::Zip(e) => Some(e),
            ToolError::Json(e) => Some(e),
            ToolError::Hex(e) => Some(e),
            ToolError::Firmware(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ToolError {
    fn from(e: io::Error) -> ToolError { ToolError::Io(e) }
}

impl From<zip::result::ZipError> for ToolError {
    fn from(e: zip::result::ZipError) -> ToolError { ToolError::Zip(e) }
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> ToolError { ToolError::Json(e) }
}

impl From<ihex::ReaderError> for ToolError {
    fn from(e: ihex::ReaderError) -> ToolError { ToolError::Hex(e) }
}

impl From<FirmwareError> for ToolError {
    fn from(e: FirmwareError) -> ToolError { ToolError::Firmware(e) }
}
