use clap::{crate_version, App, Arg};
use nrf_fw::{find_verifying_key, McuBoot};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let matches = App::new("nrf-mcuboot")
        .version(crate_version!())
        .author("q0jt")
        .about("Inspect an MCUboot image and its TLV trailer")
        .arg(Arg::with_name("image").help("flash image or slot dump").value_name("image").required(true))
        .arg(
            Arg::with_name("key")
                .long("key")
                .short("k")
                .help("DER public key to check against the key hash")
                .value_name("key file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("bootloader")
                .long("bootloader")
                .help("search this bootloader image for the public key")
                .value_name("bootloader image")
                .takes_value(true)
                .conflicts_with("key"),
        )
        .arg(
            Arg::with_name("output")
                .long("output")
                .short("o")
                .help("write the image body to this file")
                .value_name("output")
                .takes_value(true),
        )
        .get_matches();

    let path = matches.value_of("image").ok_or("no image specified")?;
    let data = std::fs::read(path)?;
    let boot = McuBoot::detect(&data)?;
    let header = boot.header();
    println!("Header offset:  {:08x}", boot.base());
    println!("Load address:   {:08x}", header.load_addr);
    println!("Header size:    {:x}", header.hdr_size);
    println!("Image size:     {:x}", header.img_size);
    println!("Version:        {}", header.version);
    println!("Flags:          {:?}", header.flags());
    if header.is_encrypted() {
        println!("Image is encrypted");
    }

    let tlvs = boot.read_tlv_area()?;
    println!("Image hash:     {}", hex::encode(&tlvs.image_hash));
    println!("Key hash:       {}", hex::encode(&tlvs.key_hash));
    println!("Signature:      {:?}, {} bytes", tlvs.signature_type, tlvs.signature.len());

    let key = match (matches.value_of("key"), matches.value_of("bootloader")) {
        (Some(key_file), _) => Some(std::fs::read(key_file)?),
        (None, Some(bl)) => {
            let bl = std::fs::read(bl)?;
            let found = find_verifying_key(&bl)?;
            println!("Found {:?} key at {:08x}", found.suite, found.offset);
            Some(found.bytes.to_vec())
        }
        (None, None) => None,
    };
    if let Some(key) = key {
        if !tlvs.verify_public_key(&key) {
            Err("public key does not match the image key hash")?;
        }
        println!("Key hash OK");
    }

    if let Some(output) = matches.value_of("output") {
        let image = boot.extract_image()?;
        std::fs::write(output, &image)?;
        println!("Wrote {} bytes to {}", image.len(), output);
    }
    Ok(())
}
