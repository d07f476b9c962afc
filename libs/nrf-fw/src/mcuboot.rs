//! MCUboot image header and TLV trailer.
//!
//! Layout of an MCUboot image in flash:
//!
//! ```text
//! base                     base + hdr_size           + img_size
//! | header (0x20) | 0xFF.. | image ................... | TLV info | TLV | TLV | TLV |
//! ```

use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};
use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::keys::KeySuite;
use crate::scan::find_all;
use crate::store::ReadAt;
use crate::FirmwareError;

pub const IMAGE_MAGIC: u32 = 0x96f3_b83d;
pub const HEADER_SIZE: usize = 0x20;
/// Padding that follows the header in every image produced by imgtool
const HEADER_PAD_SIZE: usize = 0x1E0;

pub const TLV_INFO_MAGIC: u16 = 0x6907;
pub const TLV_PROT_INFO_MAGIC: u16 = 0x6908;

bitflags! {
    pub struct ImageFlags: u32 {
        /// Not supported.
        const PIC = 0x0000_0001;
        const ENCRYPTED_AES128 = 0x0000_0004;
        const ENCRYPTED_AES256 = 0x0000_0008;
        /// Split image app.
        const NON_BOOTABLE = 0x0000_0010;
        const RAM_LOAD = 0x0000_0020;
        const ROM_FIXED = 0x0000_0100;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageVersion {
    pub major: u8,
    pub minor: u8,
    pub revision: u16,
    pub build_num: u32,
}

impl std::fmt::Display for ImageVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}+{}", self.major, self.minor, self.revision, self.build_num)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct McuBootHeader {
    pub magic: u32,
    pub load_addr: u32,
    pub hdr_size: u16,
    pub protected_tlv_size: u16,
    pub img_size: u32,
    pub flags: u32,
    pub version: ImageVersion,
    pub pad: u32,
}

impl McuBootHeader {
    pub fn decode(b: &[u8; HEADER_SIZE]) -> McuBootHeader {
        McuBootHeader {
            magic: LittleEndian::read_u32(&b[0x00..]),
            load_addr: LittleEndian::read_u32(&b[0x04..]),
            hdr_size: LittleEndian::read_u16(&b[0x08..]),
            protected_tlv_size: LittleEndian::read_u16(&b[0x0A..]),
            img_size: LittleEndian::read_u32(&b[0x0C..]),
            flags: LittleEndian::read_u32(&b[0x10..]),
            version: ImageVersion {
                major: b[0x14],
                minor: b[0x15],
                revision: LittleEndian::read_u16(&b[0x16..]),
                build_num: LittleEndian::read_u32(&b[0x18..]),
            },
            pad: LittleEndian::read_u32(&b[0x1C..]),
        }
    }

    pub fn flags(&self) -> ImageFlags { ImageFlags::from_bits_truncate(self.flags) }

    pub fn is_encrypted(&self) -> bool {
        self.flags().intersects(ImageFlags::ENCRYPTED_AES128 | ImageFlags::ENCRYPTED_AES256)
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlvType {
    /// Hash of the public key
    KeyHash = 0x01,
    /// SHA256 of image header and body
    Sha256 = 0x10,
    Rsa2048Pss = 0x20,
    /// Not supported anymore
    Ecdsa224 = 0x21,
    EcdsaSig = 0x22,
    Rsa3072Pss = 0x23,
    Ed25519 = 0x24,
    /// Key encrypted with RSA-OAEP-2048
    EncRsa2048 = 0x30,
    /// Key encrypted with AES-KW-128 or 256
    EncKw = 0x31,
    /// Key encrypted with ECIES-P256
    EncEc256 = 0x32,
    /// Key encrypted with ECIES-X25519
    EncX25519 = 0x33,
    /// Image depends on other image
    Dependency = 0x40,
    SecurityCounter = 0x50,
    /// Measured boot record
    BootRecord = 0x60,
}

impl TlvType {
    pub fn from_u8(t: u8) -> Option<TlvType> {
        use TlvType::*;
        Some(match t {
            0x01 => KeyHash,
            0x10 => Sha256,
            0x20 => Rsa2048Pss,
            0x21 => Ecdsa224,
            0x22 => EcdsaSig,
            0x23 => Rsa3072Pss,
            0x24 => Ed25519,
            0x30 => EncRsa2048,
            0x31 => EncKw,
            0x32 => EncEc256,
            0x33 => EncX25519,
            0x40 => Dependency,
            0x50 => SecurityCounter,
            0x60 => BootRecord,
            _ => return None,
        })
    }

    pub fn is_signature(&self) -> bool {
        matches!(
            self,
            TlvType::Rsa2048Pss | TlvType::Ecdsa224 | TlvType::EcdsaSig | TlvType::Rsa3072Pss | TlvType::Ed25519
        )
    }
}

/// The three TLVs this tool needs out of the unprotected trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlvArea {
    pub image_hash: Vec<u8>,
    pub key_hash: Vec<u8>,
    pub signature: Vec<u8>,
    pub signature_type: TlvType,
}

impl TlvArea {
    /// Check that `key` (a DER SubjectPublicKeyInfo) is the key whose hash the image carries.
    pub fn verify_public_key(&self, key: &[u8]) -> bool {
        if !KeySuite::ALL.iter().any(|s| s.key_len() == key.len()) {
            return false;
        }
        let h = Sha256::digest(key);
        h.as_slice().ct_eq(self.key_hash.as_slice()).into()
    }
}

/// The 0x1E0 bytes after a real header are erased padding; a stray magic inside code isn't.
fn is_header_at(b: &[u8], offset: usize) -> bool {
    let start = offset + HEADER_SIZE;
    match b.get(start..start + HEADER_PAD_SIZE) {
        Some(pad) => pad.iter().all(|&x| x == 0xFF),
        None => false,
    }
}

pub struct McuBoot<'a> {
    data: &'a [u8],
    base: u64,
    header: McuBootHeader,
}

impl<'a> McuBoot<'a> {
    /// Find the first MCUboot header in `data` followed by erased padding.
    pub fn detect(data: &'a [u8]) -> Result<McuBoot<'a>, FirmwareError> {
        let magic = IMAGE_MAGIC.to_le_bytes();
        for offset in find_all(data, &magic) {
            if !is_header_at(data, offset) {
                debug!("mcu-boot: magic at {:08x} is not followed by header padding", offset);
                continue;
            }
            let mut raw = [0u8; HEADER_SIZE];
            raw.copy_from_slice(&data[offset..offset + HEADER_SIZE]);
            let header = McuBootHeader::decode(&raw);
            info!("mcu-boot: image header at {:08x}, image size {:x}", offset, header.img_size);
            return Ok(McuBoot { data, base: offset as u64, header });
        }
        Err(FirmwareError::HeaderNotFound)
    }

    pub fn base(&self) -> u64 { self.base }

    pub fn header(&self) -> &McuBootHeader { &self.header }

    fn image_offset(&self) -> u64 { self.base + self.header.hdr_size as u64 }

    pub fn extract_image(&self) -> Result<Vec<u8>, FirmwareError> {
        Ok(self.data.read_vec_at(self.header.img_size as usize, self.image_offset())?)
    }

    /// Read the hash, key hash and signature TLVs that follow the image.
    pub fn read_tlv_area(&self) -> Result<TlvArea, FirmwareError> {
        let mut reader = TlvReader { data: self.data, offset: self.image_offset() + self.header.img_size as u64 };

        let mut info = [0u8; 4];
        self.data.read_exact_at(&mut info, reader.offset)?;
        let magic = u16::from_le_bytes([info[0], info[1]]);
        let total = u16::from_le_bytes([info[2], info[3]]);
        if magic != TLV_INFO_MAGIC && magic != TLV_PROT_INFO_MAGIC {
            return Err(FirmwareError::InvalidTlvMagic(magic));
        }
        if magic == TLV_PROT_INFO_MAGIC && self.header.protected_tlv_size != 0 {
            // TODO: walk the protected TLVs (security counter, dependencies) before the unprotected area
            warn!("mcu-boot: {} bytes of protected TLVs are not parsed", self.header.protected_tlv_size);
        }
        debug!("mcu-boot: tlv area at {:08x}, {} bytes", reader.offset, total);
        reader.offset += 4;

        let image_hash = reader.expect(|t| t == TlvType::Sha256, TlvType::Sha256)?.1;
        let key_hash = reader.expect(|t| t == TlvType::KeyHash, TlvType::KeyHash)?.1;
        let (signature_type, signature) = reader.expect(|t| t.is_signature(), TlvType::EcdsaSig)?;
        Ok(TlvArea { image_hash, key_hash, signature, signature_type })
    }
}

struct TlvReader<'a> {
    data: &'a [u8],
    offset: u64,
}

impl<'a> TlvReader<'a> {
    /// Consume one TLV, failing unless its type satisfies `accept`. `expected` is what gets reported.
    fn expect(
        &mut self,
        accept: impl Fn(TlvType) -> bool,
        expected: TlvType,
    ) -> Result<(TlvType, Vec<u8>), FirmwareError> {
        let at = self.offset;
        let mut hdr = [0u8; 4];
        self.data.read_exact_at(&mut hdr, at)?;
        let it_type = hdr[0];
        let size = u16::from_le_bytes([hdr[2], hdr[3]]);
        let t = match TlvType::from_u8(it_type) {
            Some(t) if accept(t) => t,
            _ => return Err(FirmwareError::UnexpectedTlvType { offset: at, expected, actual: it_type }),
        };
        let value = self.data.read_vec_at(size as usize, at + 4)?;
        self.offset = at + 4 + size as u64;
        Ok((t, value))
    }
}
