use log::{debug, info, warn};

use crate::settings::{is_unformatted, SettingsRecord, SETTINGS_SIZE};
use crate::store::ReadAt;
use crate::variant::{MemoryLayout, Variant, VariantRegistry};
use crate::FirmwareError;

/// The bootloader region carries no CRC of its own, so a fixed window is copied out.
pub const BOOTLOADER_SIZE: usize = 0x6000;

/// A full-flash image whose variant has been identified.
pub struct Firmware<'a, R: ReadAt + ?Sized> {
    store: &'a R,
    variant: Variant,
    layout: &'a MemoryLayout,
    settings: SettingsRecord,
}

impl<'a, R: ReadAt + ?Sized> std::fmt::Debug for Firmware<'a, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Firmware")
            .field("variant", &self.variant)
            .field("layout", self.layout)
            .field("settings", &self.settings)
            .finish()
    }
}

/// Read the settings page at each registered layout and return the first one that parses.
fn find_settings<'r, R: ReadAt + ?Sized>(
    store: &R,
    registry: &'r VariantRegistry,
) -> Result<(SettingsRecord, Variant, &'r MemoryLayout), FirmwareError> {
    let mut out = [0u8; SETTINGS_SIZE];
    for (variant, layout) in registry.iter() {
        store.read_exact_at(&mut out, layout.settings_addr as u64)?;
        if is_unformatted(&out) {
            debug!("{}: settings page at {:08x} is blank", variant, layout.settings_addr);
            continue;
        }
        match SettingsRecord::parse(&out) {
            Ok(settings) => return Ok((settings, variant, layout)),
            Err(e) => {
                debug!("{}: no settings at {:08x}: {}", variant, layout.settings_addr, e);
                continue;
            }
        }
    }
    Err(FirmwareError::UnrecognizedVariant)
}

/// Read `bank_0.size` bytes at `offset` and check them against the bank 0 CRC.
fn read_bank_0<R: ReadAt + ?Sized>(
    store: &R,
    settings: &SettingsRecord,
    offset: u64,
) -> Result<Vec<u8>, FirmwareError> {
    let data = store.read_vec_at(settings.bank_0.size as usize, offset)?;
    settings.check_bank_0(&data, offset)?;
    Ok(data)
}

impl<'a, R: ReadAt + ?Sized> Firmware<'a, R> {
    /// Identify which registered variant `store` was dumped from.
    ///
    /// The first layout with a valid settings record is the initial candidate. It is
    /// confirmed by checking bank 0 against the data at its settings address. If that
    /// check fails on the CRC, the other variants that share the same settings address
    /// are tried in registry order, and the first whose own check also fails on the
    /// CRC is taken instead.
    pub fn resolve(store: &'a R, registry: &'a VariantRegistry) -> Result<Firmware<'a, R>, FirmwareError> {
        let (settings, variant, layout) = find_settings(store, registry)?;
        debug!("settings record found for {}: {:?}", variant, settings);
        let addr = layout.settings_addr;

        match read_bank_0(store, &settings, addr as u64) {
            Ok(_) => {
                info!("resolved firmware variant {}", variant);
                return Ok(Firmware { store, variant, layout, settings });
            }
            Err(e) if e.is_retriable() => {
                warn!("{}: bank 0 check failed ({}), searching variants sharing {:08x}", variant, e, addr);
            }
            Err(e) => return Err(e),
        }

        for (alt, alt_layout) in registry.sharing_settings_addr(variant, addr) {
            match read_bank_0(store, &settings, alt_layout.settings_addr as u64) {
                Err(e) if e.is_retriable() => {
                    info!("resolved firmware variant {} (in place of {})", alt, variant);
                    return Ok(Firmware { store, variant: alt, layout: alt_layout, settings });
                }
                Err(e) => return Err(e),
                Ok(_) => debug!("{}: bank 0 check passed, not taking it", alt),
            }
        }
        Err(FirmwareError::UnrecognizedVariant)
    }

    pub fn variant(&self) -> Variant { self.variant }

    pub fn layout(&self) -> &MemoryLayout { self.layout }

    pub fn settings(&self) -> &SettingsRecord { &self.settings }

    /// Copy bank 0 out of the application area, verifying its CRC.
    pub fn extract_application(&self) -> Result<Vec<u8>, FirmwareError> {
        read_bank_0(self.store, &self.settings, self.layout.app_area_addr as u64)
    }

    pub fn extract_bootloader(&self) -> Result<Vec<u8>, FirmwareError> {
        Ok(self.store.read_vec_at(BOOTLOADER_SIZE, self.layout.bootloader_addr as u64)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::BankImage;
    use crate::test_util::forge_crc;

    const SETTINGS_52832: u32 = 0x7F000;
    const SETTINGS_52840: u32 = 0xFF000;

    fn registry() -> VariantRegistry {
        vec![
            (Variant::Nrf52832, MemoryLayout { bootloader_addr: 0x78000, settings_addr: SETTINGS_52832, app_area_addr: 0x26000 }),
            (Variant::Nrf52833, MemoryLayout { bootloader_addr: 0x78000, settings_addr: SETTINGS_52832, app_area_addr: 0x27000 }),
            (Variant::Nrf52840, MemoryLayout { bootloader_addr: 0xF8000, settings_addr: SETTINGS_52840, app_area_addr: 0x27000 }),
        ]
        .into_iter()
        .collect()
    }

    fn record(size: u32, crc: u32) -> SettingsRecord {
        SettingsRecord {
            crc: 0,
            version: 2,
            app_version: 1,
            bootloader_version: 1,
            bank_layout: 0,
            bank_current: 0,
            bank_0: BankImage { size, crc, bank_code: 1 },
            bank_1: BankImage::default(),
            write_offset: 0,
            sd_size: 0x26000 - 0x1000,
            reserved: [0u8; 36],
        }
    }

    /// Fill `image[offset..offset + len]` with a pattern whose CRC-32 is `target`.
    fn plant_region(image: &mut [u8], offset: usize, len: usize, target: u32) {
        for (i, b) in image[offset..offset + len - 4].iter_mut().enumerate() {
            *b = (i * 7) as u8;
        }
        let tail = forge_crc(&image[offset..offset + len - 4], target);
        image[offset + len - 4..offset + len].copy_from_slice(&tail);
    }

    /// A 1 MiB nRF52840 dump whose settings window and application both match bank 0.
    fn nrf52840_image() -> Vec<u8> {
        let size = 0x400;
        let target = 0x1234_5678;
        let mut image = vec![0xFFu8; 0x10_0000];
        let rec = record(size, target).to_bytes();
        let s = SETTINGS_52840 as usize;
        image[s..s + SETTINGS_SIZE].copy_from_slice(&rec);
        let tail = forge_crc(&image[s..s + size as usize - 4], target);
        image[s + size as usize - 4..s + size as usize].copy_from_slice(&tail);
        plant_region(&mut image, 0x27000, size as usize, target);
        image
    }

    #[test]
    fn resolves_known_good_image() {
        let image = nrf52840_image();
        let registry = registry();
        let fw = Firmware::resolve(&image, &registry).unwrap();
        assert_eq!(fw.variant(), Variant::Nrf52840);
        assert_eq!(fw.layout(), registry.lookup(Variant::Nrf52840).unwrap());

        let app = fw.extract_application().unwrap();
        assert_eq!(app.len(), 0x400);
        assert_eq!(&app[..], &image[0x27000..0x27400]);
        let bl = fw.extract_bootloader().unwrap();
        assert_eq!(bl.len(), BOOTLOADER_SIZE);
    }

    #[test]
    fn corrupt_application_is_reported_by_extractor() {
        let mut image = nrf52840_image();
        image[0x27010] ^= 0x01;
        let registry = registry();
        let fw = Firmware::resolve(&image, &registry).unwrap();
        match fw.extract_application() {
            Err(FirmwareError::ChecksumMismatch { offset, expected, .. }) => {
                assert_eq!(offset, 0x27000);
                assert_eq!(expected, 0x1234_5678);
            }
            other => panic!("expected checksum mismatch, got {:?}", other),
        }
    }

    #[test]
    fn corrupt_settings_window_without_alternatives_is_unrecognized() {
        let mut image = nrf52840_image();
        image[SETTINGS_52840 as usize + 0x200] ^= 0x01;
        let registry = registry();
        assert!(matches!(Firmware::resolve(&image, &registry), Err(FirmwareError::UnrecognizedVariant)));
    }

    #[test]
    fn blank_image_is_unrecognized() {
        let image = vec![0xFFu8; 0x10_0000];
        assert!(matches!(Firmware::resolve(&image, &registry()), Err(FirmwareError::UnrecognizedVariant)));
    }

    #[test]
    fn short_image_propagates_io_error() {
        // every layout reads past the end of a 64 KiB buffer
        let image = vec![0xFFu8; 0x1_0000];
        assert!(matches!(Firmware::resolve(&image, &registry()), Err(FirmwareError::Io(_))));
    }

    #[test]
    fn oversized_bank_propagates_io_error() {
        let mut image = vec![0xFFu8; 0x8_0000];
        let rec = record(0x2000, 0).to_bytes();
        let s = SETTINGS_52832 as usize;
        image[s..s + SETTINGS_SIZE].copy_from_slice(&rec);
        let image = &image[..];
        let registry: VariantRegistry = vec![(
            Variant::Nrf52832,
            MemoryLayout { bootloader_addr: 0x78000, settings_addr: SETTINGS_52832, app_area_addr: 0x26000 },
        )]
        .into_iter()
        .collect();
        assert!(matches!(Firmware::resolve(image, &registry), Err(FirmwareError::Io(_))));
    }

    // A failed bank 0 check at the shared settings address hands the image to the next
    // variant at that address. The recheck reads the same bytes, so it fails the same
    // way, and that failure is what selects the alternative.
    #[test]
    fn checksum_failure_selects_variant_sharing_settings_page() {
        let mut image = vec![0xFFu8; 0x8_0000];
        let rec = record(0x100, 0xCAFEF00D).to_bytes();
        let s = SETTINGS_52832 as usize;
        image[s..s + SETTINGS_SIZE].copy_from_slice(&rec);
        let registry = registry();
        let fw = Firmware::resolve(&image, &registry).unwrap();
        assert_eq!(fw.variant(), Variant::Nrf52833);
        assert_eq!(fw.layout().app_area_addr, 0x27000);
    }

    #[test]
    fn passing_check_keeps_first_candidate() {
        let mut image = vec![0xFFu8; 0x8_0000];
        let size = 0x100usize;
        let target = 0x0BAD_CAFE;
        let rec = record(size as u32, target).to_bytes();
        let s = SETTINGS_52832 as usize;
        image[s..s + SETTINGS_SIZE].copy_from_slice(&rec);
        let tail = forge_crc(&image[s..s + size - 4], target);
        image[s + size - 4..s + size].copy_from_slice(&tail);
        let registry = registry();
        let fw = Firmware::resolve(&image, &registry).unwrap();
        assert_eq!(fw.variant(), Variant::Nrf52832);
    }

    #[test]
    fn corrupt_settings_record_is_skipped() {
        let mut image = nrf52840_image();
        // a record with a bad CRC at the nRF52832 address is passed over, not fatal
        let mut rec = record(0x100, 0).to_bytes();
        rec[8] ^= 0xFF;
        let s = SETTINGS_52832 as usize;
        image[s..s + SETTINGS_SIZE].copy_from_slice(&rec);
        let registry = registry();
        assert_eq!(Firmware::resolve(&image, &registry).unwrap().variant(), Variant::Nrf52840);
    }
}
