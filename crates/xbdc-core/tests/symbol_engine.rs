//! Tests for the symbol engine over an in-memory debug-info source

use std::collections::HashMap;
use std::sync::Arc;

use xbdc_core::symbols::{
    DataKind, DataSymbol, InMemorySource, LineEntry, LocationKind, RegisterNumbering, SymbolEngine,
};
use xbdc_core::Address;

const BASE: u32 = 0x0001_0000;
const EBP_CODEVIEW: u32 = 22;

fn line(file: &str, line: u32, rva: u32) -> LineEntry
{
    LineEntry {
        file: file.to_string(),
        line,
        rva,
    }
}

fn data(name: &str, kind: DataKind, location: LocationKind, register_id: Option<u32>, offset: i32) -> DataSymbol
{
    DataSymbol {
        name: name.to_string(),
        type_name: "int".to_string(),
        size: 4,
        kind,
        location,
        register_id,
        offset,
        rva: 0x5000,
    }
}

fn fixture() -> InMemorySource
{
    InMemorySource::new()
        .with_function(
            "UpdatePlayer",
            0x1000,
            0x40,
            vec![
                line(r"C:\src\game\main.cpp", 10, 0x1000),
                line(r"C:\src\game\main.cpp", 11, 0x1008),
                line(r"C:\src\game\main.cpp", 12, 0x1010),
            ],
            vec![
                data("player", DataKind::Parameter, LocationKind::RegisterRelative, Some(EBP_CODEVIEW), 8),
                data("speed", DataKind::Local, LocationKind::RegisterRelative, Some(EBP_CODEVIEW), -4),
                data("counter", DataKind::StaticLocal, LocationKind::Static, None, 0),
                data("frame", DataKind::Local, LocationKind::FrameRelative, None, -8),
                data("cached", DataKind::Local, LocationKind::Enregistered, Some(17), 0),
                data("table", DataKind::Local, LocationKind::Static, None, 0),
            ],
        )
        .with_function(
            "Render",
            0x2000,
            0x20,
            vec![line("render.cpp", 5, 0x2000), line("render.cpp", 6, 0x2010)],
            Vec::new(),
        )
}

fn loaded_engine() -> SymbolEngine
{
    let engine = SymbolEngine::new();
    engine.load(Arc::new(fixture()));
    engine.set_image_base(BASE);
    engine
}

#[test]
fn test_load_reports_counts()
{
    let engine = SymbolEngine::new();
    let summary = engine.load(Arc::new(fixture()));
    assert_eq!(summary.functions, 2);
    assert_eq!(summary.lines, 5);
    assert!(engine.is_loaded());
    assert_eq!(engine.register_numbering(), Some(RegisterNumbering::CodeView));
}

#[test]
fn test_line_to_address_round_trip()
{
    let engine = loaded_engine();
    let address = engine.address_for_line("MAIN.CPP", 11).unwrap();
    assert_eq!(address, Address::new(BASE + 0x1008));

    let location = engine.source_location(address).unwrap();
    assert_eq!(location.file, r"C:\src\game\main.cpp");
    assert_eq!(location.line, 11);
    assert_eq!(location.function, "UpdatePlayer");
}

#[test]
fn test_line_lookup_ignores_directories()
{
    let engine = loaded_engine();
    assert_eq!(
        engine.address_for_line("/home/dev/game/main.cpp", 10),
        Some(Address::new(BASE + 0x1000))
    );
    assert_eq!(engine.address_for_line("main.cpp", 99), None);
    assert_eq!(engine.address_for_line("other.cpp", 10), None);
}

#[test]
fn test_source_location_floor_match()
{
    let engine = loaded_engine();
    let between = engine.source_location(Address::new(BASE + 0x100C)).unwrap();
    assert_eq!(between.line, 11);

    assert_eq!(engine.source_location(Address::new(BASE + 0x0FFF)), None);
    assert_eq!(engine.source_location(Address::new(BASE - 1)), None);
}

#[test]
fn test_rva_round_trip_for_any_address()
{
    let engine = loaded_engine();
    for value in [0, 1, BASE - 1, BASE, BASE + 0x1234, 0x8000_0000, u32::MAX] {
        let address = Address::new(value);
        assert_eq!(engine.to_absolute(engine.to_rva(address)), address);
    }
}

#[test]
fn test_locals_resolve_against_registers()
{
    let engine = loaded_engine();
    let registers = HashMap::from([(EBP_CODEVIEW, 0xD000_1000)]);
    let locals = engine.locals(Address::new(BASE + 0x1010), Address::new(0xD000_0F00), Some(&registers));

    let names: Vec<&str> = locals.iter().map(|local| local.name.as_str()).collect();
    assert_eq!(names, vec!["player", "speed", "frame", "cached", "table"]);

    assert!(locals[0].is_parameter);
    assert_eq!(locals[0].address, Some(Address::new(0xD000_1008)));
    assert!(!locals[1].is_parameter);
    assert_eq!(locals[1].address, Some(Address::new(0xD000_0FFC)));
    assert_eq!(locals[2].address, Some(Address::new(0xD000_0EF8)));
    assert_eq!(locals[3].address, None);
}

#[test]
fn test_static_local_resolves_against_image_base()
{
    let engine = loaded_engine();
    let locals = engine.locals(Address::new(BASE + 0x1000), Address::ZERO, None);
    let table = locals.iter().find(|local| local.name == "table").unwrap();
    assert_eq!(table.address, Some(Address::new(BASE + 0x5000)));

    engine.set_image_base(0x0040_0000);
    let locals = engine.locals(Address::new(0x0040_1000), Address::ZERO, None);
    let table = locals.iter().find(|local| local.name == "table").unwrap();
    assert_eq!(table.address, Some(Address::new(0x0040_5000)));
}

#[test]
fn test_locals_fall_back_to_frame_base()
{
    let engine = loaded_engine();
    let locals = engine.locals(Address::new(BASE + 0x1000), Address::new(0xD000_0F00), None);
    assert_eq!(locals[0].address, Some(Address::new(0xD000_0F08)));
}

#[test]
fn test_locals_outside_any_function_are_empty()
{
    let engine = loaded_engine();
    assert!(engine.locals(Address::new(BASE + 0x3000), Address::ZERO, None).is_empty());
}

#[test]
fn test_functions_listing_and_filter()
{
    let engine = loaded_engine();
    let all = engine.functions(None);
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].name, "UpdatePlayer");
    assert_eq!(all[0].address, Address::new(BASE + 0x1000));
    assert_eq!(all[1].rva, 0x2000);

    let render = engine.functions(Some("Render.cpp"));
    assert_eq!(render.len(), 1);
    assert_eq!(render[0].name, "Render");
    assert!(engine.functions(Some("missing.cpp")).is_empty());
}

#[test]
fn test_reload_replaces_index_and_unload_clears()
{
    let engine = loaded_engine();
    engine.load(Arc::new(
        InMemorySource::new().with_function("Main", 0x100, 0x10, vec![line("boot.c", 1, 0x100)], Vec::new()),
    ));
    assert_eq!(engine.address_for_line("main.cpp", 10), None);
    assert_eq!(engine.address_for_line("boot.c", 1), Some(Address::new(BASE + 0x100)));

    engine.unload();
    assert!(!engine.is_loaded());
    assert!(engine.functions(None).is_empty());
}
