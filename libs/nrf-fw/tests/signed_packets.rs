use ed25519_dalek::Signer as _;
use hex_literal::hex;
use nrf_fw::dfu::dfu_cc::{Command, FwType, Hash, HashType, InitCommand, OpCode, Packet, SignatureType, SignedCommand};
use nrf_fw::{decode_packet, verify_signature, FirmwareError, SignedEnvelope};
use p256::ecdsa::signature::Signer as _;
use protobuf::{Message, MessageField};

fn p256_key() -> p256::ecdsa::SigningKey {
    p256::ecdsa::SigningKey::from_slice(&hex!("c9afa9d845ba75166b5c215767b1d6934e50c3db36e89b127b8a622b120f6721"))
        .unwrap()
}

fn init_command() -> InitCommand {
    let mut init = InitCommand::new();
    init.set_fw_version(0xFFFF_FFFF);
    init.set_hw_version(52);
    init.sd_req = vec![0x0100];
    init.set_type(FwType::APPLICATION);
    init.set_app_size(0x2_4000);
    let mut hash = Hash::new();
    hash.set_hash_type(HashType::SHA256);
    hash.set_hash(vec![0x5A; 32]);
    init.hash = MessageField::some(hash);
    init
}

/// An init packet as the device stores it: r and s each little-endian.
fn dat_file(init: &InitCommand, sig_be: &[u8], sig_type: SignatureType) -> Vec<u8> {
    let mut stored = sig_be.to_vec();
    stored[..32].reverse();
    stored[32..].reverse();

    let mut cmd = Command::new();
    cmd.set_op_code(OpCode::INIT);
    cmd.init = MessageField::some(init.clone());
    let mut sc = SignedCommand::new();
    sc.command = MessageField::some(cmd);
    sc.set_signature_type(sig_type);
    sc.set_signature(stored);
    let mut packet = Packet::new();
    packet.signed_command = MessageField::some(sc);
    packet.write_to_bytes().unwrap()
}

#[test]
fn p256_signed_packet_verifies() {
    let sk = p256_key();
    let init = init_command();
    let msg = init.write_to_bytes().unwrap();
    let sig: p256::ecdsa::Signature = sk.sign(&msg);
    let sig_be = sig.to_bytes().to_vec();

    let env = SignedEnvelope::from_packet(&decode_packet(&dat_file(&init, &sig_be, SignatureType::ECDSA_P256_SHA256)).unwrap())
        .unwrap();
    assert_eq!(env.signature, sig_be);
    assert_eq!(env.command_bytes, msg);

    let point = sk.verifying_key().to_encoded_point(false);
    // both raw encodings of the public key
    env.verify(point.as_bytes()).unwrap();
    env.verify(&point.as_bytes()[1..]).unwrap();
}

#[test]
fn whole_block_reversal_is_not_per_half_reversal() {
    let sk = p256_key();
    let init = init_command();
    let msg = init.write_to_bytes().unwrap();
    let sig: p256::ecdsa::Signature = sk.sign(&msg);
    let sig_be = sig.to_bytes().to_vec();

    let mut whole = sig_be.clone();
    whole.reverse();
    let mut halves = sig_be.clone();
    halves[..32].reverse();
    halves[32..].reverse();
    assert_ne!(whole, halves);

    let key = sk.verifying_key().to_encoded_point(false);
    verify_signature(key.as_bytes(), &msg, &sig_be).unwrap();
    assert!(matches!(verify_signature(key.as_bytes(), &msg, &whole), Err(FirmwareError::SignatureMismatch)));
    assert!(matches!(verify_signature(key.as_bytes(), &msg, &halves), Err(FirmwareError::SignatureMismatch)));
}

#[test]
fn ed25519_pem_end_to_end() {
    let sk = ed25519_dalek::SigningKey::from_bytes(&[0x3Cu8; 32]);
    let init = init_command();
    let msg = init.write_to_bytes().unwrap();
    let sig_be = sk.sign(&msg).to_bytes().to_vec();

    let mut der = hex!("302a300506032b6570032100").to_vec();
    der.extend_from_slice(sk.verifying_key().as_bytes());
    let pem = pem::encode(&pem::Pem { tag: String::from("PUBLIC KEY"), contents: der });

    let packet = decode_packet(&dat_file(&init, &sig_be, SignatureType::ED25519)).unwrap();
    let env = SignedEnvelope::from_packet(&packet).unwrap();
    assert_eq!(env.signature_type, SignatureType::ED25519);
    env.verify(pem.as_bytes()).unwrap();

    let mut flipped = msg.clone();
    flipped[0] ^= 0x01;
    assert!(matches!(verify_signature(pem.as_bytes(), &flipped, &sig_be), Err(FirmwareError::SignatureMismatch)));
    let mut bad_sig = sig_be.clone();
    bad_sig[10] ^= 0x80;
    assert!(matches!(verify_signature(pem.as_bytes(), &msg, &bad_sig), Err(FirmwareError::SignatureMismatch)));
}

#[test]
fn wrong_key_is_rejected() {
    let init = init_command();
    let msg = init.write_to_bytes().unwrap();
    let sig: p256::ecdsa::Signature = p256_key().sign(&msg);
    let env = SignedEnvelope::from_packet(
        &decode_packet(&dat_file(&init, &sig.to_bytes(), SignatureType::ECDSA_P256_SHA256)).unwrap(),
    )
    .unwrap();

    let other = p256::ecdsa::SigningKey::from_slice(&[0x11u8; 32]).unwrap();
    let point = other.verifying_key().to_encoded_point(false);
    assert!(matches!(env.verify(point.as_bytes()), Err(FirmwareError::SignatureMismatch)));
}

#[test]
fn zero_p256_signature_is_a_mismatch() {
    let point = p256_key().verifying_key().to_encoded_point(false);
    assert!(matches!(verify_signature(point.as_bytes(), b"msg", &[0u8; 64]), Err(FirmwareError::SignatureMismatch)));
}
