//! # Command Decoders
//!
//! Two front ends, one back end. The text decoder reads
//! `<command> name=value ...`; the JSON decoder reads an object with a
//! `command` or `type` field. Each one resolves the command name and exposes
//! its fields through [`FieldSource`]; [`read_arguments`] then turns the fields
//! into an [`Arguments`] value using rules shared by both, and the request
//! builder decides whether the command has what it needs.
//!
//! Text values arrive as JSON strings, so every rule that accepts a string
//! (hex-prefixed numbers, `"true"`, hex byte lists) applies to both forms.

mod json;
mod text;

use std::path::PathBuf;

use serde_json::{Map, Value};

pub use self::json::decode_json;
pub use self::text::decode_text;
use crate::arguments::{field, line_number, parse_bool, parse_hex_bytes, parse_i64, parse_u64, Arguments};
use crate::request::{BreakpointSpec, TransferPair};

/// Named field lookup over decoded input.
pub(crate) trait FieldSource
{
    fn field(&self, name: &str) -> Option<&Value>;
}

impl FieldSource for Map<String, Value>
{
    fn field(&self, name: &str) -> Option<&Value>
    {
        self.get(name)
    }
}

/// Collect every recognised field. Unparseable values are dropped.
pub(crate) fn read_arguments(source: &impl FieldSource) -> Arguments
{
    Arguments {
        ip: string_field(source, field::IP),
        name: string_field(source, field::NAME),
        local_path: string_field(source, field::LOCAL_PATH),
        remote_path: string_field(source, field::REMOTE_PATH),
        pdb_path: string_field(source, field::PDB_PATH),
        file: string_field(source, field::FILE),
        address: u32_field(source, field::ADDRESS),
        image_base: u32_field(source, field::IMAGE_BASE),
        timeout_ms: source.field(field::TIMEOUT_MS).and_then(as_u64),
        length: source.field(field::LENGTH).and_then(as_i64),
        thread_id: u32_field(source, field::THREAD_ID),
        data: source.field(field::DATA).and_then(as_bytes),
        auto_reconnect: source.field(field::AUTO_RECONNECT).and_then(as_bool),
        breakpoints: read_breakpoints(source),
        transfers: read_transfers(source),
    }
}

/// `breakpoints` as one object or an array of objects, else the top-level fields.
fn read_breakpoints(source: &impl FieldSource) -> Vec<BreakpointSpec>
{
    let listed: Vec<BreakpointSpec> = objects(source.field(field::BREAKPOINTS))
        .into_iter()
        .map(breakpoint_spec_from)
        .collect();
    if !listed.is_empty() {
        return listed;
    }

    let spec = breakpoint_spec_from(source);
    if spec == BreakpointSpec::default() {
        Vec::new()
    } else {
        vec![spec]
    }
}

fn breakpoint_spec_from(source: &impl FieldSource) -> BreakpointSpec
{
    BreakpointSpec {
        address: u32_field(source, field::ADDRESS),
        file: string_field(source, field::FILE).unwrap_or_default(),
        line: source.field(field::LINE).and_then(as_i64).and_then(line_number),
    }
}

/// `files` as one object or an array of objects, else the top-level paths.
fn read_transfers(source: &impl FieldSource) -> Vec<TransferPair>
{
    let listed: Vec<TransferPair> = objects(source.field(field::FILES))
        .into_iter()
        .filter_map(transfer_pair_from)
        .collect();
    if !listed.is_empty() {
        return listed;
    }

    transfer_pair_from(source).into_iter().collect()
}

fn transfer_pair_from(source: &impl FieldSource) -> Option<TransferPair>
{
    let local_path = string_field(source, field::LOCAL_PATH).filter(|path| !path.is_empty())?;
    let remote_path = string_field(source, field::REMOTE_PATH).filter(|path| !path.is_empty())?;
    Some(TransferPair {
        local_path: PathBuf::from(local_path),
        remote_path,
    })
}

fn objects(value: Option<&Value>) -> Vec<&Map<String, Value>>
{
    match value {
        Some(Value::Object(object)) => vec![object],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        _ => Vec::new(),
    }
}

fn string_field(source: &impl FieldSource, name: &str) -> Option<String>
{
    source.field(name).and_then(Value::as_str).map(str::to_owned)
}

fn u32_field(source: &impl FieldSource, name: &str) -> Option<u32>
{
    source.field(name).and_then(as_u64).and_then(|value| u32::try_from(value).ok())
}

fn as_u64(value: &Value) -> Option<u64>
{
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => parse_u64(text),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64>
{
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => parse_i64(text),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool>
{
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => parse_bool(text),
        _ => None,
    }
}

/// Bytes from a hex string or an array of small integers.
fn as_bytes(value: &Value) -> Option<Vec<u8>>
{
    match value {
        Value::String(text) => parse_hex_bytes(text),
        Value::Array(items) => {
            let bytes: Vec<u8> = items
                .iter()
                .filter_map(|item| match item {
                    Value::Number(number) => number.as_u64().and_then(|byte| u8::try_from(byte).ok()),
                    Value::String(text) => text.trim().parse::<u8>().ok(),
                    _ => None,
                })
                .collect();
            if bytes.is_empty() {
                None
            } else {
                Some(bytes)
            }
        }
        _ => None,
    }
}
