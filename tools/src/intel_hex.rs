//! Intel HEX to flat binary.

use ihex::{Reader, Record};
use log::debug;

use crate::ToolError;

/// Flatten an Intel HEX file into an image starting at address 0.
///
/// Gaps between records read back as erased flash (`0xFF`). The image ends at the
/// highest address any data record reaches.
pub fn hex_to_binary(text: &str) -> Result<Vec<u8>, ToolError> {
    let mut image = Vec::new();
    let mut upper = 0u32;
    for record in Reader::new(text) {
        match record? {
            Record::Data { offset, value } => {
                let start = (upper + offset as u32) as usize;
                let end = start + value.len();
                if image.len() < end {
                    image.resize(end, 0xFF);
                }
                image[start..end].copy_from_slice(&value);
            }
            Record::ExtendedLinearAddress(hi) => upper = (hi as u32) << 16,
            Record::ExtendedSegmentAddress(seg) => upper = (seg as u32) << 4,
            Record::EndOfFile => break,
            other => debug!("ihex: ignoring {:?}", other),
        }
    }
    Ok(image)
}
