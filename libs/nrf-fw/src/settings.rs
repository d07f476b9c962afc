//! Bootloader settings page, as written by the nRF5 SDK secure bootloader.
//!
//! The record is 0x5C bytes of little-endian words. The first word is a CRC-32
//! over the remaining 0x58 bytes.

use std::io::Cursor;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use crc::crc32;

use crate::FirmwareError;

pub const SETTINGS_SIZE: usize = 0x5C;
const RESERVED_SIZE: usize = SETTINGS_SIZE - 14 * 4;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BankImage {
    pub size: u32,
    pub crc: u32,
    pub bank_code: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsRecord {
    pub crc: u32,
    pub version: u32,
    pub app_version: u32,
    pub bootloader_version: u32,
    pub bank_layout: u32,
    pub bank_current: u32,
    pub bank_0: BankImage,
    pub bank_1: BankImage,
    pub write_offset: u32,
    /// SoftDevice size
    pub sd_size: u32,
    pub reserved: [u8; RESERVED_SIZE],
}

/// An erased settings page reads back as all `0xFF`.
pub fn is_unformatted(b: &[u8]) -> bool { b.iter().all(|&x| x == 0xFF) }

fn read_bank(c: &mut Cursor<&[u8]>) -> std::io::Result<BankImage> {
    Ok(BankImage {
        size: c.read_u32::<LittleEndian>()?,
        crc: c.read_u32::<LittleEndian>()?,
        bank_code: c.read_u32::<LittleEndian>()?,
    })
}

impl SettingsRecord {
    /// Decode and validate a settings record. `b` must be exactly `SETTINGS_SIZE` bytes.
    pub fn parse(b: &[u8]) -> Result<SettingsRecord, FirmwareError> {
        if b.len() != SETTINGS_SIZE {
            return Err(FirmwareError::MalformedSettings(format!(
                "expected {} bytes, got {}",
                SETTINGS_SIZE,
                b.len()
            )));
        }
        let record = Self::decode(b)?;
        if record.version != 1 && record.version != 2 {
            return Err(FirmwareError::MalformedSettings(format!("invalid settings version {}", record.version)));
        }
        let crc = crc32::checksum_ieee(&b[4..]);
        if crc != record.crc {
            return Err(FirmwareError::ChecksumMismatch { offset: 0, expected: record.crc, actual: crc });
        }
        Ok(record)
    }

    fn decode(b: &[u8]) -> Result<SettingsRecord, FirmwareError> {
        let mut c = Cursor::new(b);
        let crc = c.read_u32::<LittleEndian>()?;
        let version = c.read_u32::<LittleEndian>()?;
        let app_version = c.read_u32::<LittleEndian>()?;
        let bootloader_version = c.read_u32::<LittleEndian>()?;
        let bank_layout = c.read_u32::<LittleEndian>()?;
        let bank_current = c.read_u32::<LittleEndian>()?;
        let bank_0 = read_bank(&mut c)?;
        let bank_1 = read_bank(&mut c)?;
        let write_offset = c.read_u32::<LittleEndian>()?;
        let sd_size = c.read_u32::<LittleEndian>()?;
        let mut reserved = [0u8; RESERVED_SIZE];
        std::io::Read::read_exact(&mut c, &mut reserved)?;
        Ok(SettingsRecord {
            crc,
            version,
            app_version,
            bootloader_version,
            bank_layout,
            bank_current,
            bank_0,
            bank_1,
            write_offset,
            sd_size,
            reserved,
        })
    }

    /// Encode the record, recomputing the leading CRC. `self.crc` is ignored.
    pub fn to_bytes(&self) -> [u8; SETTINGS_SIZE] {
        let words = [
            self.version,
            self.app_version,
            self.bootloader_version,
            self.bank_layout,
            self.bank_current,
            self.bank_0.size,
            self.bank_0.crc,
            self.bank_0.bank_code,
            self.bank_1.size,
            self.bank_1.crc,
            self.bank_1.bank_code,
            self.write_offset,
            self.sd_size,
        ];
        let mut out = [0u8; SETTINGS_SIZE];
        for (chunk, word) in out[4..].chunks_exact_mut(4).zip(words.iter()) {
            LittleEndian::write_u32(chunk, *word);
        }
        out[SETTINGS_SIZE - RESERVED_SIZE..].copy_from_slice(&self.reserved);
        let crc = crc32::checksum_ieee(&out[4..]);
        LittleEndian::write_u32(&mut out[..4], crc);
        out
    }

    /// CRC-check `data` against the first bank. `offset` is only used for error reporting.
    pub fn check_bank_0(&self, data: &[u8], offset: u64) -> Result<(), FirmwareError> {
        let crc = crc32::checksum_ieee(data);
        if crc != self.bank_0.crc {
            return Err(FirmwareError::ChecksumMismatch { offset, expected: self.bank_0.crc, actual: crc });
        }
        Ok(())
    }
}
