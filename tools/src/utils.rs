use crate::ToolError;

pub fn get_base(value: &str) -> (&str, u32) {
    if let Some(v) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        (v, 16)
    } else if let Some(v) = value.strip_prefix("0b").or_else(|| value.strip_prefix("0B")) {
        (v, 2)
    } else if value.starts_with('0') && value != "0" {
        (value.trim_start_matches('0'), 8)
    } else {
        (value, 10)
    }
}

/// Parse a number given as hex (`0x`), binary (`0b`), octal (leading `0`) or decimal.
pub fn parse_u32(value: &str) -> Result<u32, ToolError> {
    let (digits, base) = get_base(value.trim());
    u32::from_str_radix(digits, base).map_err(|e| ToolError::Config(format!("{}: {}", value, e)))
}
