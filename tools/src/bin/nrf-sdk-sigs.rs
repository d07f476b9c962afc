use std::fs::File;

use clap::{crate_version, App, Arg};
use nrf_fw_tools::sdk_db::{scan_sdk_archive, SdkSignatures};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let matches = App::new("nrf-sdk-sigs")
        .version(crate_version!())
        .author("q0jt")
        .about("Fingerprint the SoftDevices in an nRF5 SDK release")
        .arg(Arg::with_name("sdk").help("SDK release archive (.zip)").value_name("sdk zip").required(true))
        .arg(
            Arg::with_name("sdk-version")
                .long("sdk-version")
                .help("version to record the fingerprints under")
                .value_name("version")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("sdk-db")
                .long("sdk-db")
                .help("fingerprint database to append to")
                .value_name("signature.json")
                .takes_value(true)
                .default_value("signature.json"),
        )
        .arg(Arg::with_name("dry-run").long("dry-run").help("print the fingerprints without saving them"))
        .get_matches();

    let sdk = matches.value_of("sdk").ok_or("no SDK archive specified")?;
    let version = matches.value_of("sdk-version").ok_or("no SDK version specified")?;
    let hashes = scan_sdk_archive(File::open(sdk)?)?;
    if hashes.is_empty() {
        Err("no SoftDevice images found in the archive")?;
    }
    for h in &hashes {
        println!("{:<8} {}", h.soft_device, h.signature);
    }
    if matches.is_present("dry-run") {
        return Ok(());
    }

    let db_path = matches.value_of("sdk-db").ok_or("no database specified")?;
    let mut db = if std::path::Path::new(db_path).exists() { SdkSignatures::load(db_path)? } else { Default::default() };
    db.append(version, hashes);
    db.save(db_path)?;
    println!("Added SDK {} to {}", version, db_path);
    Ok(())
}
