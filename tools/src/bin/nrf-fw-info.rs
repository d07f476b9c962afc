use clap::{crate_version, App, Arg};
use nrf_fw::{detect_sdk_version, Firmware};
use nrf_fw_tools::registry::load_registry;
use nrf_fw_tools::sdk_db::SdkSignatures;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let matches = App::new("nrf-fw-info")
        .version(crate_version!())
        .author("q0jt")
        .about("Identify the nRF52 variant of a flash dump and extract its images")
        .arg(Arg::with_name("firmware").help("full flash image").value_name("firmware").required(true))
        .arg(
            Arg::with_name("layouts")
                .long("layouts")
                .help("variant layout table (JSON), instead of the built-in nRF52 table")
                .value_name("layouts.json")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("app-output")
                .long("app-output")
                .help("write the application (bank 0) to this file")
                .value_name("application image")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("bootloader-output")
                .long("bootloader-output")
                .help("write the bootloader region to this file")
                .value_name("bootloader image")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("sdk-db")
                .long("sdk-db")
                .help("SDK fingerprint database used to identify the SoftDevice")
                .value_name("signature.json")
                .takes_value(true),
        )
        .get_matches();

    let path = matches.value_of("firmware").ok_or("no firmware specified")?;
    let data = std::fs::read(path)?;
    let registry = load_registry(matches.value_of("layouts"))?;

    let fw = Firmware::resolve(&data, &registry)?;
    let layout = fw.layout();
    let settings = fw.settings();
    println!("Variant:           {}", fw.variant());
    println!("Bootloader:        {:08x}", layout.bootloader_addr);
    println!("Settings:          {:08x}", layout.settings_addr);
    println!("Application area:  {:08x}", layout.app_area_addr);
    println!("Settings version:  {}", settings.version);
    println!("App version:       {}", settings.app_version);
    println!("Bootloader version: {}", settings.bootloader_version);
    println!("SoftDevice size:   {:08x}", settings.sd_size);
    println!(
        "Bank 0:            {} bytes, crc {:08x}, code {:x}",
        settings.bank_0.size, settings.bank_0.crc, settings.bank_0.bank_code
    );

    if let Some(output) = matches.value_of("app-output") {
        let app = fw.extract_application()?;
        std::fs::write(output, &app)?;
        println!("Wrote {} bytes of application to {}", app.len(), output);
    }
    if let Some(output) = matches.value_of("bootloader-output") {
        let bl = fw.extract_bootloader()?;
        std::fs::write(output, &bl)?;
        println!("Wrote {} bytes of bootloader to {}", bl.len(), output);
    }
    if let Some(db) = matches.value_of("sdk-db") {
        let db = SdkSignatures::load(db)?;
        match detect_sdk_version(&data, &db) {
            Ok(version) => println!("SDK version:       {}", version),
            Err(e) => println!("SDK version:       unknown ({})", e),
        }
    }
    Ok(())
}
