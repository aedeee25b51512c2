//! Line-oriented decoder: `<command> [name=value ...]`.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use super::{read_arguments, FieldSource};
use crate::builder::build_request;
use crate::command::CommandType;
use crate::error::{ProtocolError, ProtocolResult};
use crate::request::Request;

/// Fields keyed by lowercased name.
struct TextFields(HashMap<String, Value>);

impl FieldSource for TextFields
{
    fn field(&self, name: &str) -> Option<&Value>
    {
        self.0.get(&name.to_ascii_lowercase())
    }
}

/// Decode one text command line.
///
/// The command name and field names are matched ignoring case. Values may be
/// wrapped in double quotes to include spaces. Fields the command does not
/// use are ignored.
///
/// ## Errors
///
/// Decode errors for blank input, an unknown command or a token that is not
/// `name=value`; validation errors from the request builder.
pub fn decode_text(input: &str) -> ProtocolResult<Request>
{
    let tokens = tokenize(input);
    let (name, rest) = tokens.split_first().ok_or(ProtocolError::EmptyInput)?;
    let command = CommandType::from_name(name).ok_or(ProtocolError::UnknownCommand)?;

    let mut fields = HashMap::with_capacity(rest.len());
    for token in rest {
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| ProtocolError::MalformedArgument(token.clone()))?;
        fields
            .entry(key.to_ascii_lowercase())
            .or_insert_with(|| Value::String(unquote(value).to_owned()));
    }

    debug!(command = %command, fields = fields.len(), "decoded text input");
    build_request(command, read_arguments(&TextFields(fields)))
}

/// Split on whitespace outside double quotes. Quote characters are kept.
///
/// A quoted value opens only with a `"` right after the token's first `=`;
/// any other `"` is an ordinary character.
fn tokenize(input: &str) -> Vec<String>
{
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for ch in input.chars() {
        if ch == '"' && (quoted || opens_value(&current)) {
            quoted = !quoted;
            current.push(ch);
        } else if ch.is_whitespace() && !quoted {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn opens_value(token: &str) -> bool
{
    token.find('=').is_some_and(|index| index + 1 == token.len())
}

/// Strip one layer of surrounding double quotes.
fn unquote(value: &str) -> &str
{
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests
{
    use std::path::PathBuf;

    use super::*;
    use crate::request::{LoadSymbolsArgs, MemoryReadArgs, ScanArgs};

    #[test]
    fn test_tokenize_respects_quotes()
    {
        assert_eq!(
            tokenize(r#"upload localPath="C:\My Games\a.xbe" remotePath=E:\a.xbe"#),
            vec![
                "upload".to_string(),
                r#"localPath="C:\My Games\a.xbe""#.to_string(),
                r"remotePath=E:\a.xbe".to_string(),
            ]
        );
        assert!(tokenize("   \t ").is_empty());
    }

    #[test]
    fn test_stray_quote_does_not_swallow_later_tokens()
    {
        assert_eq!(
            tokenize(r#"launch remotePath=E:\say"hi.xbe timeoutMs=10"#),
            vec![
                "launch".to_string(),
                r#"remotePath=E:\say"hi.xbe"#.to_string(),
                "timeoutMs=10".to_string(),
            ]
        );
        assert_eq!(
            tokenize(r#"write a"b address=0x10"#),
            vec!["write".to_string(), r#"a"b"#.to_string(), "address=0x10".to_string()]
        );
    }

    #[test]
    fn test_repeated_field_keeps_first_value()
    {
        assert_eq!(
            decode_text("read address=0x10000 length=4 address=0x20000").unwrap(),
            Request::ReadMemory(MemoryReadArgs {
                address: 0x10000,
                length: 4
            })
        );
    }

    #[test]
    fn test_unquote_strips_one_layer()
    {
        assert_eq!(unquote(r#""a b""#), "a b");
        assert_eq!(unquote(r#"""x"""#), r#""x""#);
        assert_eq!(unquote(r#""open"#), r#""open"#);
        assert_eq!(unquote("plain"), "plain");
    }

    #[test]
    fn test_scan_with_timeout()
    {
        assert_eq!(
            decode_text("scan timeoutMs=2000").unwrap(),
            Request::Scan(ScanArgs { timeout_ms: 2000 })
        );
    }

    #[test]
    fn test_names_ignore_case()
    {
        assert_eq!(
            decode_text("READ ADDRESS=0x10000 Length=4").unwrap(),
            Request::ReadMemory(MemoryReadArgs {
                address: 0x10000,
                length: 4
            })
        );
    }

    #[test]
    fn test_quoted_path_keeps_spaces()
    {
        assert_eq!(
            decode_text(r#"loadsymbols pdbPath="C:\Build Output\game.pdb" imageBase=0x10000"#).unwrap(),
            Request::LoadSymbols(LoadSymbolsArgs {
                pdb_path: PathBuf::from(r"C:\Build Output\game.pdb"),
                image_base: Some(0x10000)
            })
        );
    }

    #[test]
    fn test_decode_errors()
    {
        assert_eq!(decode_text(""), Err(ProtocolError::EmptyInput));
        assert_eq!(decode_text("   "), Err(ProtocolError::EmptyInput));
        assert_eq!(decode_text("frobnicate"), Err(ProtocolError::UnknownCommand));
        assert_eq!(
            decode_text("read 0x1000"),
            Err(ProtocolError::MalformedArgument("0x1000".into()))
        );
    }

    #[test]
    fn test_unrecognised_fields_are_ignored()
    {
        assert_eq!(decode_text("threads verbose=true").unwrap(), Request::Threads);
    }
}
