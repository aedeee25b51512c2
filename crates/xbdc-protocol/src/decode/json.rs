//! Structured decoder: one JSON object per command.

use serde_json::Value;
use tracing::debug;

use super::read_arguments;
use crate::arguments::field;
use crate::builder::build_request;
use crate::command::CommandType;
use crate::error::{ProtocolError, ProtocolResult};
use crate::request::Request;

/// Decode one JSON command object.
///
/// The command is named by `command`, or by `type` when `command` is absent.
/// Field names must match exactly. Numbers may be JSON numbers or decimal or
/// `0x`-prefixed strings; booleans may be JSON booleans or strings.
///
/// ## Errors
///
/// Decode errors for blank input, text that is not a JSON object, a missing
/// command field or an unknown command; validation errors from the request
/// builder.
pub fn decode_json(input: &str) -> ProtocolResult<Request>
{
    if input.trim().is_empty() {
        return Err(ProtocolError::EmptyInput);
    }

    let value: Value = serde_json::from_str(input).map_err(|_| ProtocolError::InvalidJson)?;
    let Value::Object(fields) = value else {
        return Err(ProtocolError::InvalidJson);
    };

    let name = fields
        .get(field::COMMAND)
        .or_else(|| fields.get(field::TYPE))
        .ok_or(ProtocolError::MissingCommand)?;
    let command = name
        .as_str()
        .and_then(CommandType::from_name)
        .ok_or(ProtocolError::UnknownCommand)?;

    debug!(command = %command, fields = fields.len(), "decoded json input");
    build_request(command, read_arguments(&fields))
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::request::{BreakpointSpec, MemoryWriteArgs, RebootArgs};

    #[test]
    fn test_command_or_type_field()
    {
        assert_eq!(decode_json(r#"{"command":"pause"}"#).unwrap(), Request::Pause);
        assert_eq!(decode_json(r#"{"type":"Resume"}"#).unwrap(), Request::Resume);
        assert_eq!(decode_json(r#"{"command":"?"}"#).unwrap(), Request::Help);
    }

    #[test]
    fn test_decode_errors()
    {
        assert_eq!(decode_json(""), Err(ProtocolError::EmptyInput));
        assert_eq!(decode_json("scan"), Err(ProtocolError::InvalidJson));
        assert_eq!(decode_json("[1, 2]"), Err(ProtocolError::InvalidJson));
        assert_eq!(decode_json(r#"{"address":1}"#), Err(ProtocolError::MissingCommand));
        assert_eq!(decode_json(r#"{"command":"nope"}"#), Err(ProtocolError::UnknownCommand));
        assert_eq!(decode_json(r#"{"command":7}"#), Err(ProtocolError::UnknownCommand));
    }

    #[test]
    fn test_booleans_from_strings()
    {
        assert_eq!(
            decode_json(r#"{"command":"reboot","autoReconnect":"TRUE","timeoutMs":"0x3a98"}"#).unwrap(),
            Request::Reboot(RebootArgs {
                auto_reconnect: true,
                timeout_ms: 15_000
            })
        );
    }

    #[test]
    fn test_write_data_as_array_or_string()
    {
        let expected = Request::WriteMemory(MemoryWriteArgs {
            address: 0x2000,
            data: vec![0x90, 0x90, 0xCC],
        });
        assert_eq!(
            decode_json(r#"{"command":"write","address":8192,"data":[144,144,204]}"#).unwrap(),
            expected
        );
        assert_eq!(
            decode_json(r#"{"command":"write","address":"0x2000","data":"0x90;0x90,CC"}"#).unwrap(),
            expected
        );
    }

    #[test]
    fn test_field_names_are_exact()
    {
        let err = decode_json(r#"{"command":"launch","RemotePath":"E:\\a.xbe"}"#).unwrap_err();
        assert_eq!(err.command_type(), CommandType::Launch);
    }

    #[test]
    fn test_setbreak_array_with_malformed_element()
    {
        match decode_json(r#"{"command":"setbreak","breakpoints":[{"address":"0x1000"},{"line":7}]}"#).unwrap() {
            Request::SetBreakpoint(args) => {
                assert_eq!(args.breakpoints[0], BreakpointSpec::at_address(0x1000));
                assert_eq!(
                    args.breakpoints[1],
                    BreakpointSpec {
                        address: None,
                        file: String::new(),
                        line: Some(7)
                    }
                );
            }
            other => panic!("unexpected request {other:?}"),
        }
    }
}
