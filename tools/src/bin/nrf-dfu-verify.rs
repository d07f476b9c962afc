use clap::{crate_version, App, Arg};
use nrf_fw::SignedEnvelope;
use nrf_fw_tools::package::{load_dat_file, DfuPackage, ImageKind};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let matches = App::new("nrf-dfu-verify")
        .version(crate_version!())
        .author("q0jt")
        .about("Check the signature on an nRF5 DFU package or init packet")
        .arg(
            Arg::with_name("package")
                .help("DFU package (.zip) or init packet (.dat)")
                .value_name("package")
                .required(true),
        )
        .arg(
            Arg::with_name("key")
                .long("key")
                .short("k")
                .help("public key: PEM, or raw Ed25519 / P-256 bytes")
                .value_name("key file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("image")
                .long("image")
                .help("which manifest entry to check")
                .value_name("kind")
                .takes_value(true)
                .possible_values(&["application", "bootloader", "softdevice", "softdevice_bootloader"])
                .default_value("application"),
        )
        .get_matches();

    let path = matches.value_of("package").ok_or("no package specified")?;
    let envelope = if path.ends_with(".zip") {
        let kind: ImageKind = matches.value_of("image").unwrap_or("application").parse()?;
        DfuPackage::open(path)?.envelope(kind)?
    } else {
        SignedEnvelope::from_packet(&load_dat_file(path)?)?
    };
    println!("{}", envelope);

    if let Some(key_file) = matches.value_of("key") {
        let key = std::fs::read(key_file)?;
        envelope.verify(&key)?;
        println!("Signature OK");
    }
    Ok(())
}
