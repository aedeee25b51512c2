//! Text and JSON inputs describing the same command decode to the same request.

use std::path::PathBuf;

use xbdc_protocol::request::{
    BreakpointArgs, ConnectArgs, FunctionArgs, LaunchArgs, MemoryDumpArgs, MemoryReadArgs, MemoryWriteArgs, ThreadArgs,
    UploadArgs,
};
use xbdc_protocol::{decode_json, decode_text, BreakpointSpec, CommandType, ProtocolError, Request, Response, TransferPair};

fn assert_parity(text: &str, json: &str) -> Request
{
    let from_text = decode_text(text);
    let from_json = decode_json(json);
    assert_eq!(from_text, from_json, "text `{text}` and json `{json}` disagree");
    from_text.unwrap_or_else(|err| panic!("`{text}` failed: {err}"))
}

fn assert_same_rejection(text: &str, json: &str) -> ProtocolError
{
    let from_text = decode_text(text).unwrap_err();
    let from_json = decode_json(json).unwrap_err();
    assert_eq!(from_text, from_json);
    from_text
}

#[test]
fn test_read_memory_parity()
{
    let request = assert_parity(
        "read address=0x10000 length=4",
        r#"{"type":"read","address":"0x10000","length":4}"#,
    );
    assert_eq!(
        request,
        Request::ReadMemory(MemoryReadArgs {
            address: 0x10000,
            length: 4
        })
    );
}

#[test]
fn test_decimal_and_hex_agree_across_forms()
{
    assert_parity("read address=65536 length=0x10", r#"{"command":"read","address":65536,"length":"0x10"}"#);
}

#[test]
fn test_connect_parity()
{
    let request = assert_parity(
        "connect name=\"Dev Kit\" timeoutMs=2500",
        r#"{"command":"connect","name":"Dev Kit","timeoutMs":2500}"#,
    );
    assert_eq!(
        request,
        Request::Connect(ConnectArgs {
            ip: None,
            name: Some("Dev Kit".into()),
            timeout_ms: 2500
        })
    );
}

#[test]
fn test_setbreak_by_line_parity()
{
    let request = assert_parity(
        "setbreak file=main.cpp line=42",
        r#"{"command":"setbreak","file":"main.cpp","line":42}"#,
    );
    assert_eq!(
        request,
        Request::SetBreakpoint(BreakpointArgs {
            breakpoints: vec![BreakpointSpec::at_line("main.cpp", 42)]
        })
    );
}

#[test]
fn test_breakpoint_with_address_and_line_keeps_both()
{
    let request = assert_parity(
        "deletebreak address=0x401000 file=main.cpp line=7",
        r#"{"command":"deletebreak","address":"0x401000","file":"main.cpp","line":"7"}"#,
    );
    assert_eq!(
        request,
        Request::DeleteBreakpoint(BreakpointArgs {
            breakpoints: vec![BreakpointSpec {
                address: Some(0x0040_1000),
                file: "main.cpp".into(),
                line: Some(7)
            }]
        })
    );
}

#[test]
fn test_write_parity()
{
    let request = assert_parity(
        "write address=0x2000 data=\"90 90 CC\"",
        r#"{"command":"write","address":"0x2000","data":"90 90 CC"}"#,
    );
    assert_eq!(
        request,
        Request::WriteMemory(MemoryWriteArgs {
            address: 0x2000,
            data: vec![0x90, 0x90, 0xCC]
        })
    );
}

#[test]
fn test_dump_upload_launch_parity()
{
    assert_eq!(
        assert_parity(
            "dump address=0x1000 length=256 localPath=out.bin",
            r#"{"command":"dump","address":"0x1000","length":256,"localPath":"out.bin"}"#,
        ),
        Request::DumpMemory(MemoryDumpArgs {
            address: 0x1000,
            length: 256,
            local_path: PathBuf::from("out.bin")
        })
    );
    assert_eq!(
        assert_parity(
            r"upload localPath=build remotePath=E:\Games\demo",
            r#"{"command":"upload","localPath":"build","remotePath":"E:\\Games\\demo"}"#,
        ),
        Request::Upload(UploadArgs {
            files: vec![TransferPair {
                local_path: PathBuf::from("build"),
                remote_path: r"E:\Games\demo".into()
            }]
        })
    );
    assert_eq!(
        assert_parity(
            r"launch remotePath=E:\Games\demo\default.xbe",
            r#"{"command":"launch","remotePath":"E:\\Games\\demo\\default.xbe"}"#,
        ),
        Request::Launch(LaunchArgs {
            remote_path: r"E:\Games\demo\default.xbe".into()
        })
    );
}

#[test]
fn test_optional_arguments_parity()
{
    assert_eq!(
        assert_parity("functions file=main.cpp", r#"{"command":"functions","file":"main.cpp"}"#),
        Request::Functions(FunctionArgs {
            file: Some("main.cpp".into())
        })
    );
    assert_eq!(
        assert_parity("locals threadId=0", r#"{"command":"locals","threadId":0}"#),
        Request::Locals(ThreadArgs { thread_id: None })
    );
    assert_eq!(
        assert_parity("registers threadId=0x1C", r#"{"command":"registers","threadId":28}"#),
        Request::Registers(ThreadArgs { thread_id: Some(28) })
    );
}

#[test]
fn test_validation_is_shared()
{
    let err = assert_same_rejection("read address=0x1000", r#"{"command":"read","address":"0x1000"}"#);
    assert_eq!(err.command_type(), CommandType::ReadMemory);

    let err = assert_same_rejection("loadsymbols imageBase=0x10000", r#"{"command":"loadsymbols","imageBase":65536}"#);
    assert_eq!(err.to_string(), "pdbPath is required for loadsymbols command.");

    let err = assert_same_rejection("write address=0x10 data=zz", r#"{"command":"write","address":16,"data":"zz"}"#);
    assert_eq!(err.to_string(), "address and data are required for write command.");
}

#[test]
fn test_failed_decode_becomes_failed_response()
{
    let response = Response::from(decode_text("launch").unwrap_err());
    assert_eq!(response.command(), CommandType::Launch);
    assert!(!response.is_success());
    assert!(response.payload().is_none());

    let response = Response::from(decode_json("{not json").unwrap_err());
    assert_eq!(response.command(), CommandType::Unknown);
    assert_eq!(response.message(), Some("Invalid JSON input."));
}
