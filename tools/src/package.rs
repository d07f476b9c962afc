//! nRF5 DFU packages: a ZIP holding `manifest.json` and a `.bin`/`.dat` pair per image.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use log::{debug, info};
use nrf_fw::dfu::dfu_cc::Packet;
use nrf_fw::{decode_packet, SignedEnvelope};
use serde::Deserialize;

use crate::ToolError;

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Application,
    Bootloader,
    SoftDevice,
    SoftDeviceBootloader,
}

impl ImageKind {
    pub const ALL: [ImageKind; 4] =
        [ImageKind::Application, ImageKind::Bootloader, ImageKind::SoftDevice, ImageKind::SoftDeviceBootloader];

    pub fn manifest_key(&self) -> &'static str {
        match self {
            ImageKind::Application => "application",
            ImageKind::Bootloader => "bootloader",
            ImageKind::SoftDevice => "softdevice",
            ImageKind::SoftDeviceBootloader => "softdevice_bootloader",
        }
    }
}

impl std::str::FromStr for ImageKind {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageKind::ALL
            .iter()
            .copied()
            .find(|k| k.manifest_key() == s)
            .ok_or_else(|| ToolError::Config(format!("unknown image kind {}", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageFiles {
    pub bin_file: String,
    pub dat_file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    pub application: Option<ImageFiles>,
    pub bootloader: Option<ImageFiles>,
    pub softdevice: Option<ImageFiles>,
    pub softdevice_bootloader: Option<ImageFiles>,
}

impl Manifest {
    pub fn entry(&self, kind: ImageKind) -> Option<&ImageFiles> {
        match kind {
            ImageKind::Application => self.application.as_ref(),
            ImageKind::Bootloader => self.bootloader.as_ref(),
            ImageKind::SoftDevice => self.softdevice.as_ref(),
            ImageKind::SoftDeviceBootloader => self.softdevice_bootloader.as_ref(),
        }
    }
}

#[derive(Deserialize)]
struct ManifestFile {
    manifest: Manifest,
}

/// A DFU package unpacked into memory.
pub struct DfuPackage {
    manifest: Manifest,
    files: HashMap<String, Vec<u8>>,
}

fn base_name(name: &str) -> &str { name.rsplit('/').next().unwrap_or(name) }

impl DfuPackage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<DfuPackage, ToolError> {
        let f = std::fs::File::open(path)?;
        DfuPackage::from_reader(f)
    }

    pub fn from_bytes(b: Vec<u8>) -> Result<DfuPackage, ToolError> { DfuPackage::from_reader(Cursor::new(b)) }

    pub fn from_reader<R: Read + Seek>(r: R) -> Result<DfuPackage, ToolError> {
        let mut archive = zip::ZipArchive::new(r)?;
        let mut files = HashMap::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = base_name(entry.name()).to_owned();
            if entry.is_dir() || name.starts_with('.') {
                continue;
            }
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents)?;
            debug!("dfu: {} ({} bytes)", name, contents.len());
            files.insert(name, contents);
        }
        let manifest = files
            .get(MANIFEST_FILE_NAME)
            .ok_or_else(|| ToolError::Config(format!("package has no {}", MANIFEST_FILE_NAME)))?;
        let manifest: ManifestFile = serde_json::from_slice(manifest)?;
        Ok(DfuPackage { manifest: manifest.manifest, files })
    }

    pub fn manifest(&self) -> &Manifest { &self.manifest }

    fn file(&self, name: &str) -> Result<&[u8], ToolError> {
        self.files
            .get(base_name(name))
            .map(|v| v.as_slice())
            .ok_or_else(|| ToolError::Config(format!("{} is named in the manifest but missing", name)))
    }

    fn files_for(&self, kind: ImageKind) -> Result<&ImageFiles, ToolError> {
        self.manifest.entry(kind).ok_or(ToolError::MissingManifestEntry(kind.manifest_key()))
    }

    /// The firmware image itself.
    pub fn firmware(&self, kind: ImageKind) -> Result<&[u8], ToolError> { self.file(&self.files_for(kind)?.bin_file) }

    pub fn init_packet(&self, kind: ImageKind) -> Result<Packet, ToolError> {
        Ok(decode_packet(self.file(&self.files_for(kind)?.dat_file)?)?)
    }

    pub fn envelope(&self, kind: ImageKind) -> Result<SignedEnvelope, ToolError> {
        let envelope = SignedEnvelope::from_packet(&self.init_packet(kind)?)?;
        info!("dfu: {} init packet is signed ({:?})", kind.manifest_key(), envelope.signature_type);
        Ok(envelope)
    }
}

/// Read and decode a standalone init packet.
pub fn load_dat_file<P: AsRef<Path>>(path: P) -> Result<Packet, ToolError> {
    let path = path.as_ref();
    if path.extension().and_then(|e| e.to_str()) != Some("dat") {
        return Err(ToolError::InvalidDatFile(path.display().to_string()));
    }
    Ok(decode_packet(&std::fs::read(path)?)?)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use nrf_fw::dfu::dfu_cc::{Command, FwType, Hash, HashType, InitCommand, OpCode, SignatureType, SignedCommand};
    use protobuf::{Message, MessageField};
    use zip::write::SimpleFileOptions;

    use super::*;

    fn dat_bytes() -> Vec<u8> {
        let mut init = InitCommand::new();
        init.set_fw_version(1);
        init.set_type(FwType::APPLICATION);
        let mut hash = Hash::new();
        hash.set_hash_type(HashType::SHA256);
        hash.set_hash(vec![1u8; 32]);
        init.hash = MessageField::some(hash);
        let mut cmd = Command::new();
        cmd.set_op_code(OpCode::INIT);
        cmd.init = MessageField::some(init);
        let mut sc = SignedCommand::new();
        sc.command = MessageField::some(cmd);
        sc.set_signature_type(SignatureType::ED25519);
        sc.set_signature(vec![2u8; 64]);
        let mut packet = Packet::new();
        packet.signed_command = MessageField::some(sc);
        packet.write_to_bytes().unwrap()
    }

    fn zip_of(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut w = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in files {
            w.start_file(*name, SimpleFileOptions::default()).unwrap();
            w.write_all(contents).unwrap();
        }
        w.finish().unwrap().into_inner()
    }

    const MANIFEST: &str = r#"{"manifest": {"application": {"bin_file": "app.bin", "dat_file": "app.dat"}}}"#;

    #[test]
    fn reads_application_envelope() {
        let dat = dat_bytes();
        let pkg = DfuPackage::from_bytes(zip_of(&[
            ("manifest.json", MANIFEST.as_bytes()),
            ("app.bin", b"\x01\x02\x03"),
            ("app.dat", &dat),
            ("__MACOSX/._app.dat", b"junk"),
        ]))
        .unwrap();
        assert_eq!(pkg.manifest().application.as_ref().unwrap().dat_file, "app.dat");
        assert_eq!(pkg.firmware(ImageKind::Application).unwrap(), b"\x01\x02\x03");
        let env = pkg.envelope(ImageKind::Application).unwrap();
        assert_eq!(env.hash, vec![1u8; 32]);
        assert_eq!(env.signature, vec![2u8; 64]);
        assert_eq!(env.signature_type, SignatureType::ED25519);
    }

    #[test]
    fn missing_entries() {
        let pkg = DfuPackage::from_bytes(zip_of(&[("manifest.json", MANIFEST.as_bytes())])).unwrap();
        assert!(matches!(
            pkg.init_packet(ImageKind::Bootloader),
            Err(ToolError::MissingManifestEntry("bootloader"))
        ));
        // listed in the manifest, absent from the archive
        assert!(matches!(pkg.init_packet(ImageKind::Application), Err(ToolError::Config(_))));
        assert!(matches!(DfuPackage::from_bytes(zip_of(&[("app.bin", b"")])), Err(ToolError::Config(_))));
        assert!(matches!(DfuPackage::from_bytes(b"not a zip".to_vec()), Err(ToolError::Zip(_))));
    }

    #[test]
    fn dat_extension_is_checked_first() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("app.bin");
        std::fs::write(&bin, dat_bytes()).unwrap();
        assert!(matches!(load_dat_file(&bin), Err(ToolError::InvalidDatFile(_))));

        let dat = dir.path().join("app.dat");
        std::fs::write(&dat, dat_bytes()).unwrap();
        let packet = load_dat_file(&dat).unwrap();
        assert!(packet.signed_command.is_some());

        // a missing file with the right extension gets as far as the read
        assert!(matches!(load_dat_file(dir.path().join("none.dat")), Err(ToolError::Io(_))));
    }

    #[test]
    fn image_kind_names() {
        assert_eq!("softdevice_bootloader".parse::<ImageKind>().unwrap(), ImageKind::SoftDeviceBootloader);
        assert!("firmware".parse::<ImageKind>().is_err());
    }
}
