use crc::crc32;

fn crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        let mut c = i as u32;
        for _ in 0..8 {
            c = if c & 1 != 0 { 0xEDB8_8320 ^ (c >> 1) } else { c >> 1 };
        }
        *entry = c;
    }
    table
}

/// Four bytes which, appended to `prefix`, make the CRC-32 of the whole buffer equal `target`.
pub fn forge_crc(prefix: &[u8], target: u32) -> [u8; 4] {
    let table = crc_table();
    let reg = !crc32::checksum_ieee(prefix);
    // walk the register backwards from the desired final state; the top byte of each
    // table entry is unique, which identifies the index consumed at every step
    let mut x = !target;
    for _ in 0..4 {
        let top = (x >> 24) as u8;
        let idx = table.iter().position(|t| (t >> 24) as u8 == top).unwrap_or(0);
        x = ((x ^ table[idx]) << 8) | idx as u32;
    }
    (x ^ reg).to_le_bytes()
}

#[test]
fn forged_tail_hits_target() {
    let mut data = b"settings window".to_vec();
    let tail = forge_crc(&data, 0xCAFE_BABE);
    data.extend_from_slice(&tail);
    assert_eq!(crc32::checksum_ieee(&data), 0xCAFE_BABE);
}
