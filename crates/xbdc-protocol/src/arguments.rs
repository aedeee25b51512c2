//! Decoded argument fields shared by the text and JSON decoders.
//!
//! Both decoders fill in an [`Arguments`] value and hand it to the request
//! builder together with the resolved command. Nothing here knows which
//! fields a command needs; a field that fails to parse is simply absent.

use crate::request::{BreakpointSpec, TransferPair};

/// Field names recognised by both decoders.
pub mod field
{
    pub const COMMAND: &str = "command";
    pub const TYPE: &str = "type";
    pub const IP: &str = "ip";
    pub const NAME: &str = "name";
    pub const LOCAL_PATH: &str = "localPath";
    pub const REMOTE_PATH: &str = "remotePath";
    pub const PDB_PATH: &str = "pdbPath";
    pub const FILE: &str = "file";
    pub const LINE: &str = "line";
    pub const ADDRESS: &str = "address";
    pub const IMAGE_BASE: &str = "imageBase";
    pub const TIMEOUT_MS: &str = "timeoutMs";
    pub const LENGTH: &str = "length";
    pub const THREAD_ID: &str = "threadId";
    pub const DATA: &str = "data";
    pub const AUTO_RECONNECT: &str = "autoReconnect";
    pub const BREAKPOINTS: &str = "breakpoints";
    pub const FILES: &str = "files";
}

/// The field set produced by a decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments
{
    pub ip: Option<String>,
    pub name: Option<String>,
    pub local_path: Option<String>,
    pub remote_path: Option<String>,
    pub pdb_path: Option<String>,
    pub file: Option<String>,
    pub address: Option<u32>,
    pub image_base: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub length: Option<i64>,
    pub thread_id: Option<u32>,
    pub data: Option<Vec<u8>>,
    pub auto_reconnect: Option<bool>,
    pub breakpoints: Vec<BreakpointSpec>,
    pub transfers: Vec<TransferPair>,
}

/// Parse an unsigned 32-bit value: `0x`-prefixed hex, otherwise decimal.
#[must_use]
pub fn parse_u32(value: &str) -> Option<u32>
{
    parse_u64(value).and_then(|parsed| u32::try_from(parsed).ok())
}

/// Parse an unsigned 64-bit value: `0x`-prefixed hex, otherwise decimal.
#[must_use]
pub fn parse_u64(value: &str) -> Option<u64>
{
    let trimmed = value.trim();
    match strip_hex_prefix(trimmed) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => trimmed.parse().ok(),
    }
}

/// Parse a signed integer: `0x`-prefixed hex, otherwise (possibly negative) decimal.
#[must_use]
pub fn parse_i64(value: &str) -> Option<i64>
{
    let trimmed = value.trim();
    match strip_hex_prefix(trimmed) {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => trimmed.parse().ok(),
    }
}

/// Parse `true`/`false` in any ASCII case.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool>
{
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parse a byte string such as `"90 90 CC"`, `"0x90,0x90"` or `"de;ad"`.
///
/// Tokens are separated by spaces, commas or semicolons and may carry a `0x`
/// prefix. Tokens that are not a hex byte are skipped. Returns `None` when no
/// byte survives.
#[must_use]
pub fn parse_hex_bytes(value: &str) -> Option<Vec<u8>>
{
    let bytes: Vec<u8> = value
        .split([' ', ',', ';'])
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            let digits = strip_hex_prefix(token).unwrap_or(token);
            u8::from_str_radix(digits, 16).ok()
        })
        .collect();

    if bytes.is_empty() {
        None
    } else {
        Some(bytes)
    }
}

/// Interpret a line number; negative lines are treated as absent.
#[must_use]
pub fn line_number(value: i64) -> Option<u32>
{
    u32::try_from(value).ok()
}

fn strip_hex_prefix(value: &str) -> Option<&str>
{
    value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"))
}
