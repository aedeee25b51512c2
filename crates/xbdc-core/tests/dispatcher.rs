//! End-to-end command tests against the simulated console

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use xbdc_core::device::{SimulatedConnector, SimulatedFault};
use xbdc_core::symbols::{
    DataKind, DataSymbol, DebugInfoLoader, DebugInfoSource, InMemorySource, LineEntry, LocationKind,
};
use xbdc_core::{Address, Dispatcher, Result};
use xbdc_protocol::request::{LoadSymbolsArgs, TransferPair, UploadArgs};
use xbdc_protocol::response::ResponsePayload;
use xbdc_protocol::{decode_json, decode_text, Request, Response};

/// Serves one fixed in-memory source for any path.
struct FixtureLoader;

impl DebugInfoLoader for FixtureLoader
{
    fn open(&self, _path: &Path) -> Result<Arc<dyn DebugInfoSource>>
    {
        let source = InMemorySource::new().with_function(
            "UpdatePlayer",
            0x1000,
            0x40,
            vec![
                LineEntry {
                    file: r"D:\dev\game\main.cpp".into(),
                    line: 42,
                    rva: 0x1000,
                },
                LineEntry {
                    file: r"D:\dev\game\main.cpp".into(),
                    line: 43,
                    rva: 0x1010,
                },
            ],
            vec![DataSymbol {
                name: "player".into(),
                type_name: "Player*".into(),
                size: 4,
                kind: DataKind::Parameter,
                location: LocationKind::RegisterRelative,
                register_id: Some(22),
                offset: 8,
                rva: 0,
            }],
        );
        Ok(Arc::new(source))
    }
}

fn run(dispatcher: &mut Dispatcher, line: &str) -> Response
{
    dispatcher.dispatch(decode_text(line).unwrap())
}

fn connected() -> (Dispatcher, SimulatedConnector)
{
    let connector = SimulatedConnector::demo();
    let mut dispatcher = Dispatcher::new(Box::new(connector.clone())).with_loader(Box::new(FixtureLoader));
    let response = run(&mut dispatcher, "connect ip=192.168.1.100");
    assert!(response.is_success(), "{response:?}");
    (dispatcher, connector)
}

fn breakpoints(response: &Response) -> Vec<(bool, Option<String>, Option<String>)>
{
    match response.payload() {
        Some(ResponsePayload::Breakpoints(entries)) => entries
            .iter()
            .map(|entry| (entry.success, entry.address.clone(), entry.message.clone()))
            .collect(),
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn test_scan_with_no_consoles()
{
    let mut dispatcher = Dispatcher::new(Box::new(SimulatedConnector::new()));
    let response = run(&mut dispatcher, "scan timeoutMs=2000");
    assert!(!response.is_success());
    assert_eq!(response.message(), Some("No Xbox consoles found on the network."));
}

#[test]
fn test_scan_lists_consoles()
{
    let mut dispatcher = Dispatcher::new(Box::new(SimulatedConnector::demo().with_console("Spare", "10.0.0.9")));
    let response = run(&mut dispatcher, "scan");
    match response.payload() {
        Some(ResponsePayload::Consoles(consoles)) => {
            assert_eq!(consoles.len(), 2);
            assert_eq!(consoles[0].name, "SimXbox");
            assert_eq!(consoles[1].ip, "10.0.0.9");
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn test_commands_need_a_connection()
{
    let connector = SimulatedConnector::demo();
    let mut dispatcher = Dispatcher::new(Box::new(connector.clone()));
    for line in ["read address=0x10000 length=4", "pause", "threads", "setbreak address=0x11000", "disconnect"] {
        let response = run(&mut dispatcher, line);
        assert!(!response.is_success());
        assert_eq!(response.message(), Some("Not connected to any Xbox console."), "{line}");
    }
    assert!(connector.state().lock().unwrap().commands.is_empty());
}

#[test]
fn test_connect_by_name_and_twice()
{
    let mut dispatcher = Dispatcher::new(Box::new(SimulatedConnector::demo()));
    let response = run(&mut dispatcher, "connect name=Nobody");
    assert_eq!(response.message(), Some("Xbox with name 'Nobody' not found on the network."));

    let response = run(&mut dispatcher, "connect name=simxbox");
    assert_eq!(response.message(), Some("Successfully connected to Xbox at 192.168.1.100."));
    assert!(dispatcher.is_connected());

    let response = run(&mut dispatcher, "connect");
    assert_eq!(response.message(), Some("Already connected to an Xbox. Please disconnect first."));
}

#[test]
fn test_structured_read_payload()
{
    let (mut dispatcher, _) = connected();
    let request = decode_json(r#"{"type":"read","address":"0x10000","length":4}"#).unwrap();
    let response = dispatcher.dispatch(request);
    match response.payload() {
        Some(ResponsePayload::Memory(block)) => {
            assert_eq!(block.address, "0x00010000");
            assert_eq!(block.length, 4);
            assert_eq!(block.data, "00 01 02 03");
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn test_write_then_read_back()
{
    let (mut dispatcher, _) = connected();
    let response = run(&mut dispatcher, r#"write address=0x10010 data="90 90 CC""#);
    assert_eq!(response.message(), Some("Wrote 3 bytes to 0x00010010"));

    let response = run(&mut dispatcher, "read address=0x1000F length=5");
    match response.payload() {
        Some(ResponsePayload::Memory(block)) => assert_eq!(block.data, "0F 90 90 CC 13"),
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn test_device_failure_message_is_forwarded()
{
    let (mut dispatcher, connector) = connected();
    connector.state().lock().unwrap().faults.insert(SimulatedFault::ReadMemory);
    let response = run(&mut dispatcher, "read address=0x10000 length=4");
    assert!(!response.is_success());
    assert_eq!(response.message(), Some("Memory not accessible."));
}

#[test]
fn test_dump_writes_local_file()
{
    let (mut dispatcher, _) = connected();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.bin");
    let request = decode_json(&format!(
        r#"{{"type":"dump","address":"0x10000","length":8,"localPath":{}}}"#,
        serde_json::to_string(&path.display().to_string()).unwrap()
    ))
    .unwrap();
    let response = dispatcher.dispatch(request);
    assert!(response.is_success(), "{response:?}");
    assert_eq!(
        response.message().unwrap(),
        format!("Dumped 8 bytes from 0x00010000 to {}", path.display())
    );
    assert_eq!(fs::read(&path).unwrap(), vec![0, 1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn test_setbreak_by_line_without_symbols()
{
    let (mut dispatcher, _) = connected();
    let response = run(&mut dispatcher, "setbreak file=main.cpp line=42");
    assert!(!response.is_success());
    assert_eq!(response.message(), Some("Address is required if symbols are not loaded."));
}

#[test]
fn test_setbreak_batch_survives_malformed_spec()
{
    let (mut dispatcher, connector) = connected();
    let request = decode_json(
        r#"{"type":"setbreak","breakpoints":[{"address":"0x11000"},{},{"address":"0x11010"}]}"#,
    )
    .unwrap();
    let response = dispatcher.dispatch(request);
    assert!(response.is_success());

    let entries = breakpoints(&response);
    assert_eq!(entries.len(), 3);
    assert!(entries[0].0);
    assert!(!entries[1].0);
    assert_eq!(entries[1].2.as_deref(), Some("Either address or file and line are required."));
    assert!(entries[2].0);
    assert_eq!(entries[2].1.as_deref(), Some("0x00011010"));

    let state = connector.state();
    let state = state.lock().unwrap();
    assert!(state.breakpoints.contains(&Address::new(0x11000)));
    assert!(state.breakpoints.contains(&Address::new(0x11010)));
    drop(state);
    assert_eq!(dispatcher.session().unwrap().breakpoints().len(), 2);
}

#[test]
fn test_setbreak_by_line_with_symbols()
{
    let (mut dispatcher, _) = connected();
    assert!(run(&mut dispatcher, "loadsymbols pdbPath=game.pdb imageBase=0x10000").is_success());
    let response = run(&mut dispatcher, r"setbreak file=C:\other\checkout\MAIN.cpp line=43");
    let entries = breakpoints(&response);
    assert_eq!(entries[0].1.as_deref(), Some("0x00011010"));

    let response = run(&mut dispatcher, "setbreak file=main.cpp line=7");
    assert_eq!(response.message(), Some("No code found at main.cpp:7."));
}

#[test]
fn test_setbreak_address_wins_over_line_with_symbols()
{
    let (mut dispatcher, connector) = connected();
    assert!(run(&mut dispatcher, "loadsymbols pdbPath=game.pdb imageBase=0x10000").is_success());
    let request = decode_json(
        r#"{"type":"setbreak","breakpoints":[{"address":"0x12000","file":"main.cpp","line":42}]}"#,
    )
    .unwrap();
    let response = dispatcher.dispatch(request);
    let entries = breakpoints(&response);
    assert_eq!(entries.len(), 1);
    assert!(entries[0].0);
    assert_eq!(entries[0].1.as_deref(), Some("0x00012000"));

    let state = connector.state();
    let state = state.lock().unwrap();
    assert!(state.breakpoints.contains(&Address::new(0x12000)));
    assert!(!state.breakpoints.contains(&Address::new(0x11000)));
}

#[test]
fn test_setbreak_all_failing_batch()
{
    let (mut dispatcher, _) = connected();
    let request = decode_json(r#"{"type":"setbreak","breakpoints":[{},{"file":"main.cpp","line":1}]}"#).unwrap();
    let response = dispatcher.dispatch(request);
    assert!(!response.is_success());
    assert_eq!(response.message(), Some("No valid breakpoints provided."));
}

#[test]
fn test_deletebreak_only_removes_tracked_addresses()
{
    let (mut dispatcher, connector) = connected();
    run(&mut dispatcher, "setbreak address=0x11000");

    let response = run(&mut dispatcher, "deletebreak address=0x12000");
    assert_eq!(response.message(), Some("No breakpoint set at 0x00012000."));

    connector.state().lock().unwrap().faults.insert(SimulatedFault::RemoveBreakpoint);
    let response = run(&mut dispatcher, "deletebreak address=0x11000");
    assert_eq!(response.message(), Some("Unable to remove breakpoint."));
    assert!(dispatcher.session().unwrap().breakpoints().contains(Address::new(0x11000)));

    connector.state().lock().unwrap().faults.clear();
    let response = run(&mut dispatcher, "deletebreak address=0x11000");
    assert!(response.is_success());
    assert!(dispatcher.session().unwrap().breakpoints().is_empty());
    assert!(connector.state().lock().unwrap().breakpoints.is_empty());
}

#[test]
fn test_symbols_commands()
{
    let (mut dispatcher, _) = connected();
    assert_eq!(run(&mut dispatcher, "functions").message(), Some("Symbols not loaded."));
    assert_eq!(run(&mut dispatcher, "locals").message(), Some("Symbols not loaded."));

    let response = run(&mut dispatcher, "loadsymbols pdbPath=game.pdb imageBase=0x10000");
    assert_eq!(response.message(), Some("Symbols loaded."));
    match response.payload() {
        Some(ResponsePayload::SymbolsLoaded(summary)) => {
            assert_eq!(summary.image_base, "0x00010000");
            assert_eq!(summary.functions, 1);
            assert_eq!(summary.lines, 2);
        }
        other => panic!("unexpected payload {other:?}"),
    }

    match run(&mut dispatcher, "functions file=main.cpp").payload() {
        Some(ResponsePayload::Functions(functions)) => {
            assert_eq!(functions[0].name, "UpdatePlayer");
            assert_eq!(functions[0].rva, "0x00001000");
            assert_eq!(functions[0].address, "0x00011000");
        }
        other => panic!("unexpected payload {other:?}"),
    }
    assert_eq!(
        run(&mut dispatcher, "functions file=render.cpp").message(),
        Some("No functions found in symbols.")
    );
}

#[test]
fn test_reload_without_image_base_resets_it()
{
    let (mut dispatcher, _) = connected();
    run(&mut dispatcher, "loadsymbols pdbPath=game.pdb imageBase=0x10000");
    let response = run(&mut dispatcher, "loadsymbols pdbPath=game.pdb");
    match response.payload() {
        Some(ResponsePayload::SymbolsLoaded(summary)) => assert_eq!(summary.image_base, "0x00000000"),
        other => panic!("unexpected payload {other:?}"),
    }
    assert_eq!(dispatcher.symbols().image_base(), 0);

    match run(&mut dispatcher, "functions").payload() {
        Some(ResponsePayload::Functions(functions)) => {
            assert_eq!(functions[0].rva, "0x00001000");
            assert_eq!(functions[0].address, "0x00001000");
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn test_locals_read_values_from_the_console()
{
    let (mut dispatcher, _) = connected();
    run(&mut dispatcher, "loadsymbols pdbPath=game.pdb imageBase=0x10000");
    let response = run(&mut dispatcher, "locals threadId=1");
    match response.payload() {
        Some(ResponsePayload::Locals(locals)) => {
            assert_eq!(locals.len(), 1);
            assert_eq!(locals[0].name, "player");
            assert!(locals[0].is_parameter);
            assert_eq!(locals[0].address.as_deref(), Some("0xD0000FE8"));
            assert_eq!(locals[0].location, "EBP+0x8");
            assert_eq!(locals[0].value.as_deref(), Some("00 00 00 00"));
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn test_failed_symbol_load_leaves_engine_unloaded()
{
    let mut dispatcher = Dispatcher::new(Box::new(SimulatedConnector::demo()));
    let response = run(&mut dispatcher, "loadsymbols pdbPath=/no/such/game.pdb");
    assert!(!response.is_success());
    assert!(response.message().unwrap().starts_with("Failed to load symbols: "));
    assert!(!dispatcher.symbols().is_loaded());
}

#[test]
fn test_unreadable_program_database_is_reported()
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("game.pdb");
    fs::write(&path, b"Microsoft C/C++ MSF 7.00\r\n").unwrap();

    let mut dispatcher = Dispatcher::new(Box::new(SimulatedConnector::demo()));
    let response = dispatcher.dispatch(Request::LoadSymbols(LoadSymbolsArgs {
        pdb_path: path,
        image_base: None,
    }));
    assert!(!response.is_success());
    assert!(response
        .message()
        .unwrap()
        .starts_with("Failed to load symbols: opening program database: "));
    assert!(!dispatcher.symbols().is_loaded());
}

#[test]
fn test_registers_and_thread_selection()
{
    let (mut dispatcher, _) = connected();
    run(&mut dispatcher, "loadsymbols pdbPath=game.pdb imageBase=0x10000");

    match run(&mut dispatcher, "registers threadId=0").payload() {
        Some(ResponsePayload::Registers(report)) => {
            assert_eq!(report.thread_id, 1);
            assert_eq!(report.registers.eip, "0x00011010");
            assert_eq!(report.registers.eflags, "0x00000246");
            let location = report.location.as_ref().unwrap();
            assert_eq!(location.line, 43);
            assert_eq!(location.function, "UpdatePlayer");
        }
        other => panic!("unexpected payload {other:?}"),
    }

    match run(&mut dispatcher, "registers threadId=2").payload() {
        Some(ResponsePayload::Registers(report)) => assert_eq!(report.thread_id, 2),
        other => panic!("unexpected payload {other:?}"),
    }

    let response = run(&mut dispatcher, "registers threadId=99");
    assert_eq!(response.message(), Some("Thread with ID 99 not found."));
}

#[test]
fn test_process_listings()
{
    let (mut dispatcher, _) = connected();
    match run(&mut dispatcher, "threads").payload() {
        Some(ResponsePayload::Threads(threads)) => {
            assert_eq!(threads.len(), 2);
            assert_eq!(threads[0].start, "0x00011000");
        }
        other => panic!("unexpected payload {other:?}"),
    }
    match run(&mut dispatcher, "modules").payload() {
        Some(ResponsePayload::Modules(modules)) => {
            assert_eq!(modules[0].name, "default.xbe");
            assert_eq!(modules[0].checksum, "0x1234ABCD");
            assert_eq!(modules[0].sections[0].flags, "0x00000006");
        }
        other => panic!("unexpected payload {other:?}"),
    }
    match run(&mut dispatcher, "regions").payload() {
        Some(ResponsePayload::Regions(regions)) => {
            assert_eq!(regions[0].protection, "ExecuteRead");
            assert_eq!(regions[1].protection, "ReadWrite");
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn test_empty_process_listings_fail()
{
    let connector = SimulatedConnector::new().with_console("Empty", "10.0.0.1");
    let mut dispatcher = Dispatcher::new(Box::new(connector));
    run(&mut dispatcher, "connect");
    assert_eq!(run(&mut dispatcher, "threads").message(), Some("No threads found in the process."));
    assert_eq!(run(&mut dispatcher, "registers").message(), Some("No threads found in the process."));
    assert_eq!(run(&mut dispatcher, "modules").message(), Some("No modules found in the process."));
    assert_eq!(run(&mut dispatcher, "regions").message(), Some("No memory regions found."));
}

#[test]
fn test_pause_and_resume_emit_notifications()
{
    let (mut dispatcher, _) = connected();
    assert_eq!(run(&mut dispatcher, "pause").message(), Some("Execution paused."));
    assert_eq!(run(&mut dispatcher, "resume").message(), Some("Execution continued."));
    let messages: Vec<String> = dispatcher
        .notifications()
        .drain()
        .iter()
        .map(|notification| notification.message().to_string())
        .collect();
    assert_eq!(messages, vec!["execution stopped", "execution started"]);

    run(&mut dispatcher, "mute");
    run(&mut dispatcher, "pause");
    assert!(dispatcher.notifications().drain().is_empty());
}

#[test]
fn test_upload_directory_tree()
{
    let (mut dispatcher, connector) = connected();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("default.xbe"), b"XBEH").unwrap();
    fs::create_dir(dir.path().join("media")).unwrap();
    fs::write(dir.path().join("media").join("title.png"), b"PNG").unwrap();

    let response = dispatcher.dispatch(Request::Upload(UploadArgs {
        files: vec![TransferPair {
            local_path: dir.path().to_path_buf(),
            remote_path: r"E:\Games\Demo".to_string(),
        }],
    }));
    match response.payload() {
        Some(ResponsePayload::Uploads(entries)) => {
            assert_eq!(entries.len(), 2);
            assert!(entries.iter().all(|entry| entry.success));
        }
        other => panic!("unexpected payload {other:?}"),
    }

    let state = connector.state();
    let state = state.lock().unwrap();
    assert_eq!(state.files.get(r"E:\Games\Demo\default.xbe").map(Vec::as_slice), Some(&b"XBEH"[..]));
    assert_eq!(state.files.get(r"E:\Games\Demo\media\title.png").map(Vec::as_slice), Some(&b"PNG"[..]));
    assert!(state.directories.contains(r"E:\Games"));
    assert!(state.directories.contains(r"E:\Games\Demo\media"));
}

#[test]
fn test_upload_missing_file()
{
    let (mut dispatcher, _) = connected();
    let response = dispatcher.dispatch(Request::Upload(UploadArgs {
        files: vec![TransferPair {
            local_path: PathBuf::from("/no/such/file.xbe"),
            remote_path: r"E:\file.xbe".to_string(),
        }],
    }));
    assert!(!response.is_success());
    assert_eq!(response.message(), Some("No files uploaded."));
}

#[test]
fn test_launch_and_launch_timeout()
{
    let (mut dispatcher, connector) = connected();
    let response = run(&mut dispatcher, r#"launch remotePath="E:\Games\Demo\default.xbe""#);
    assert_eq!(response.message(), Some(r"Launched E:\Games\Demo\default.xbe successfully."));
    assert_eq!(
        connector.state().lock().unwrap().commands.last().map(String::as_str),
        Some(r#"magicboot title="E:\Games\Demo\default.xbe""#)
    );

    connector.state().lock().unwrap().faults.insert(SimulatedFault::LaunchTimeout);
    let response = run(&mut dispatcher, r"launch remotePath=E:\default.xbe");
    assert_eq!(
        response.message(),
        Some(r"Failed to launch E:\default.xbe: Console rebooted, please reconnect and try again.")
    );
    assert!(!dispatcher.is_connected());
}

#[test]
fn test_reboot_with_and_without_reconnect()
{
    let (mut dispatcher, connector) = connected();
    let response = run(&mut dispatcher, "reboot");
    assert_eq!(response.message(), Some("Xbox rebooted. Please reconnect when it's back online."));
    assert!(!dispatcher.is_connected());

    run(&mut dispatcher, "connect");
    connector.state().lock().unwrap().reboot_discovery_delay = 2;
    let response = run(&mut dispatcher, "reboot autoReconnect=true timeoutMs=5000");
    assert_eq!(response.message(), Some("Xbox rebooted and reconnected successfully."));
    assert!(dispatcher.is_connected());

    connector.state().lock().unwrap().reboot_discovery_delay = 10;
    let response = run(&mut dispatcher, "reboot autoReconnect=true timeoutMs=3000");
    assert_eq!(
        response.message(),
        Some("Rebooted Xbox found but failed to reconnect within the timeout period.")
    );
    assert!(!dispatcher.is_connected());
}

#[test]
fn test_disconnect_drops_breakpoints()
{
    let (mut dispatcher, _) = connected();
    run(&mut dispatcher, "setbreak address=0x11000");
    assert_eq!(run(&mut dispatcher, "disconnect").message(), Some("Disconnected from Xbox."));
    assert!(dispatcher.session().is_none());
    run(&mut dispatcher, "connect");
    assert!(dispatcher.session().unwrap().breakpoints().is_empty());
}
