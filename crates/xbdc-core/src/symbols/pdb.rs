//! PDB debug-info loader.
//!
//! Reads an MSVC program database with the `pdb` crate. Procedures become
//! functions, each module's line program supplies their line tables, and
//! the frame, register and static symbols nested inside a procedure become
//! its data symbols. Register ids are CodeView numbers.
//!
//! MSVC does not flag frame-relative symbols as parameters. A positive
//! offset from EBP is one: the arguments sit above the saved frame pointer.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use pdb::{
    AddressMap, FallibleIterator, FileIndex, LineProgram, ModuleInfo, PdbInternalSectionOffset, StringTable,
    SymbolData, SymbolIndex, TypeData, TypeFinder, TypeIndex, TypeInformation, PDB,
};
use tracing::{debug, warn};

use super::demangle::{demangle_symbol, map_pdb_error};
use super::registers::{RegisterNumbering, X86Register};
use super::source::{
    DataKind, DataSymbol, DebugInfoLoader, DebugInfoSource, FunctionSymbol, InMemorySource, LineEntry, LocationKind,
};
use crate::error::Result;

const MAX_TYPE_DEPTH: usize = 16;

/// Type indices below this are CodeView primitives and have no TPI record.
const FIRST_RECORD_INDEX: u32 = 0x1000;

/// Line number MSVC assigns to compiler-generated code.
const HIDDEN_LINE: u32 = 0x00FE_EFEE;

/// Opens MSVC program databases.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdbLoader;

impl PdbLoader
{
    #[must_use]
    pub fn new() -> Self
    {
        Self
    }
}

impl DebugInfoLoader for PdbLoader
{
    fn open(&self, path: &Path) -> Result<Arc<dyn DebugInfoSource>>
    {
        let file = File::open(path)?;
        let mut pdb = PDB::open(file).map_err(|err| map_pdb_error("opening program database", err))?;

        let address_map = pdb
            .address_map()
            .map_err(|err| map_pdb_error("reading section map", err))?;
        // Without a string table the line rows keep no file names.
        let strings = match pdb.string_table() {
            Ok(strings) => Some(strings),
            Err(err) => {
                warn!(%err, "program database has no string table");
                None
            }
        };
        let type_information = pdb
            .type_information()
            .map_err(|err| map_pdb_error("reading type information", err))?;
        let types = TypeNames::new(&type_information)?;
        let debug_information = pdb
            .debug_information()
            .map_err(|err| map_pdb_error("reading debug information", err))?;

        let mut collector = Collector::new(&address_map, strings.as_ref(), &types);
        let mut modules = debug_information
            .modules()
            .map_err(|err| map_pdb_error("listing modules", err))?;
        while let Some(module) = modules.next().map_err(|err| map_pdb_error("reading module list", err))? {
            let info = match pdb.module_info(&module) {
                Ok(Some(info)) => info,
                Ok(None) => continue,
                Err(err) => {
                    warn!(module = %module.module_name(), %err, "skipping unreadable module");
                    continue;
                }
            };
            if let Err(err) = collector.collect_module(&info) {
                warn!(module = %module.module_name(), %err, "skipping module");
            }
        }

        let source = collector.finish();
        debug!(path = %path.display(), functions = source.functions().len(), "PDB symbols read");
        Ok(Arc::new(source))
    }
}

/// Resolves type indices to printable names and byte sizes.
struct TypeNames<'t>
{
    finder: TypeFinder<'t>,
}

impl<'t> TypeNames<'t>
{
    fn new(information: &'t TypeInformation<'_>) -> Result<Self>
    {
        let mut finder = information.finder();
        let mut types = information.iter();
        while types
            .next()
            .map_err(|err| map_pdb_error("indexing type records", err))?
            .is_some()
        {
            finder.update(&types);
        }
        Ok(Self { finder })
    }

    fn describe(&self, index: TypeIndex, depth: usize) -> (String, u64)
    {
        if depth > MAX_TYPE_DEPTH {
            return ("...".to_string(), 0);
        }
        if index.0 < FIRST_RECORD_INDEX {
            return primitive_type(index.0);
        }
        let Ok(data) = self.finder.find(index).and_then(|record| record.parse()) else {
            return (format!("<type 0x{:x}>", index.0), 0);
        };

        match data {
            TypeData::Class(class) => (class.name.to_string().into_owned(), u64::from(class.size)),
            TypeData::Union(union) => (union.name.to_string().into_owned(), u64::from(union.size)),
            TypeData::Enumeration(enumeration) => {
                let (_, size) = self.describe(enumeration.underlying_type, depth + 1);
                (enumeration.name.to_string().into_owned(), size)
            }
            TypeData::Pointer(pointer) => {
                let (name, _) = self.describe(pointer.underlying_type, depth + 1);
                let size = match pointer.attributes.size() {
                    0 => 4,
                    size => u64::from(size),
                };
                (format!("{name}*"), size)
            }
            TypeData::Modifier(modifier) => {
                let (name, size) = self.describe(modifier.underlying_type, depth + 1);
                if modifier.constant {
                    (format!("const {name}"), size)
                } else {
                    (name, size)
                }
            }
            TypeData::Array(array) => {
                let (name, _) = self.describe(array.element_type, depth + 1);
                let size = array.dimensions.iter().copied().max().map_or(0, u64::from);
                (format!("{name}[]"), size)
            }
            TypeData::Bitfield(bitfield) => self.describe(bitfield.underlying_type, depth + 1),
            _ => ("unknown".to_string(), 0),
        }
    }
}

/// Name and size of a primitive type index: the low byte is the type, the
/// next nibble the pointer mode.
fn primitive_type(index: u32) -> (String, u64)
{
    let (name, size) = match index & 0xFF {
        0x03 => ("void", 0),
        0x08 => ("HRESULT", 4),
        0x10 | 0x70 => ("char", 1),
        0x20 => ("unsigned char", 1),
        0x71 => ("wchar_t", 2),
        0x68 => ("int8_t", 1),
        0x69 => ("uint8_t", 1),
        0x11 | 0x72 => ("short", 2),
        0x21 | 0x73 => ("unsigned short", 2),
        0x12 => ("long", 4),
        0x22 => ("unsigned long", 4),
        0x74 => ("int", 4),
        0x75 => ("unsigned int", 4),
        0x13 | 0x76 => ("__int64", 8),
        0x23 | 0x77 => ("unsigned __int64", 8),
        0x30 => ("bool", 1),
        0x40 => ("float", 4),
        0x41 => ("double", 8),
        0x42 => ("long double", 10),
        _ => ("unknown", 0),
    };
    match (index >> 8) & 0xF {
        0 => (name.to_string(), size),
        // 64-bit near pointer
        6 => (format!("{name}*"), 8),
        _ => (format!("{name}*"), 4),
    }
}

/// Parameter or local, for a symbol at `offset` from CodeView register `register`.
fn frame_kind(register: u16, offset: i32) -> DataKind
{
    let ebp = RegisterNumbering::CodeView.id(X86Register::Ebp);
    if u32::from(register) == ebp && offset > 0 {
        DataKind::Parameter
    } else {
        DataKind::Local
    }
}

struct FunctionRecord
{
    symbol: FunctionSymbol,
    lines: Vec<LineEntry>,
    data: Vec<DataSymbol>,
}

/// Accumulates functions, line rows and variables across modules.
struct Collector<'a, 's, 't>
{
    address_map: &'a AddressMap<'s>,
    strings: Option<&'a StringTable<'s>>,
    types: &'a TypeNames<'t>,
    functions: Vec<FunctionRecord>,
}

impl<'a, 's, 't> Collector<'a, 's, 't>
{
    fn new(address_map: &'a AddressMap<'s>, strings: Option<&'a StringTable<'s>>, types: &'a TypeNames<'t>) -> Self
    {
        Self {
            address_map,
            strings,
            types,
            functions: Vec::new(),
        }
    }

    fn finish(self) -> InMemorySource
    {
        self.functions.into_iter().fold(
            InMemorySource::new().with_numbering(RegisterNumbering::CodeView),
            |source, record| {
                source.with_function(
                    record.symbol.name,
                    record.symbol.rva,
                    record.symbol.length,
                    record.lines,
                    record.data,
                )
            },
        )
    }

    fn collect_module(&mut self, info: &ModuleInfo<'_>) -> Result<()>
    {
        let program = info
            .line_program()
            .map_err(|err| map_pdb_error("reading line program", err))?;
        let mut symbols = info
            .symbols()
            .map_err(|err| map_pdb_error("reading module symbols", err))?;

        // (index into `functions`, index of the procedure's S_END)
        let mut scope: Option<(usize, SymbolIndex)> = None;

        while let Some(symbol) = symbols.next().map_err(|err| map_pdb_error("walking module symbols", err))? {
            if scope.is_some_and(|(_, end)| symbol.index().0 >= end.0) {
                scope = None;
            }
            // Symbol kinds the crate does not model are skipped.
            let Ok(data) = symbol.parse() else {
                continue;
            };

            match data {
                SymbolData::Procedure(procedure) => {
                    let Some(rva) = procedure.offset.to_rva(self.address_map) else {
                        continue;
                    };
                    let index = self.functions.len();
                    let lines = self.line_rows(&program, procedure.offset)?;
                    self.functions.push(FunctionRecord {
                        symbol: FunctionSymbol {
                            id: index,
                            name: demangle_symbol(&procedure.name.to_string()),
                            rva: rva.0,
                            length: procedure.len,
                        },
                        lines,
                        data: Vec::new(),
                    });
                    scope = Some((index, procedure.end));
                }
                other => {
                    let Some((index, _)) = scope else {
                        continue;
                    };
                    if let Some(local) = self.data_symbol(other) {
                        self.functions[index].data.push(local);
                    }
                }
            }
        }
        Ok(())
    }

    fn data_symbol(&self, data: SymbolData<'_>) -> Option<DataSymbol>
    {
        let mut symbol = match data {
            SymbolData::RegisterRelative(relative) => DataSymbol {
                kind: frame_kind(relative.register.0, relative.offset),
                location: LocationKind::RegisterRelative,
                register_id: Some(u32::from(relative.register.0)),
                offset: relative.offset,
                ..self.blank(&relative.name.to_string(), relative.type_index)
            },
            SymbolData::BasePointerRelative(relative) => {
                let ebp = RegisterNumbering::CodeView.id(X86Register::Ebp);
                DataSymbol {
                    kind: if relative.offset > 0 { DataKind::Parameter } else { DataKind::Local },
                    location: LocationKind::RegisterRelative,
                    register_id: Some(ebp),
                    offset: relative.offset,
                    ..self.blank(&relative.name.to_string(), relative.type_index)
                }
            }
            SymbolData::RegisterVariable(variable) => DataSymbol {
                location: LocationKind::Enregistered,
                register_id: Some(u32::from(variable.register.0)),
                ..self.blank(&variable.name.to_string(), variable.type_index)
            },
            SymbolData::Data(data) => DataSymbol {
                kind: DataKind::StaticLocal,
                location: LocationKind::Static,
                rva: data.offset.to_rva(self.address_map)?.0,
                ..self.blank(&data.name.to_string(), data.type_index)
            },
            SymbolData::ThreadStorage(storage) => DataSymbol {
                kind: DataKind::StaticLocal,
                location: LocationKind::Tls,
                ..self.blank(&storage.name.to_string(), storage.type_index)
            },
            SymbolData::Constant(constant) => DataSymbol {
                kind: DataKind::Constant,
                location: LocationKind::Constant,
                ..self.blank(&constant.name.to_string(), constant.type_index)
            },
            SymbolData::Local(local) => DataSymbol {
                kind: if local.flags.isparam { DataKind::Parameter } else { DataKind::Local },
                ..self.blank(&local.name.to_string(), local.type_index)
            },
            _ => return None,
        };
        if symbol.name.is_empty() {
            symbol.name = "<unnamed>".to_string();
        }
        Some(symbol)
    }

    /// A local with no location yet.
    fn blank(&self, name: &str, type_index: TypeIndex) -> DataSymbol
    {
        let (type_name, size) = self.types.describe(type_index, 0);
        DataSymbol {
            name: name.to_string(),
            type_name,
            size,
            kind: DataKind::Local,
            location: LocationKind::Null,
            register_id: None,
            offset: 0,
            rva: 0,
        }
    }

    fn line_rows(&self, program: &LineProgram<'_>, offset: PdbInternalSectionOffset) -> Result<Vec<LineEntry>>
    {
        let mut rows = Vec::new();
        let mut lines = program.lines_for_symbol(offset);
        while let Some(line) = lines.next().map_err(|err| map_pdb_error("reading line rows", err))? {
            if line.line_start == HIDDEN_LINE {
                continue;
            }
            let Some(rva) = line.offset.to_rva(self.address_map) else {
                continue;
            };
            rows.push(LineEntry {
                file: self.file_name(program, line.file_index)?,
                line: line.line_start,
                rva: rva.0,
            });
        }
        Ok(rows)
    }

    fn file_name(&self, program: &LineProgram<'_>, index: FileIndex) -> Result<String>
    {
        let Some(strings) = self.strings else {
            return Ok(String::new());
        };
        let info = program
            .get_file_info(index)
            .map_err(|err| map_pdb_error("reading file checksum entry", err))?;
        let name = info
            .name
            .to_string_lossy(strings)
            .map_err(|err| map_pdb_error("reading file name", err))?;
        Ok(name.into_owned())
    }
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use super::*;
    use crate::error::XbdcError;

    #[test]
    fn test_missing_file_is_an_error()
    {
        let result = PdbLoader::new().open(Path::new("/definitely/not/here/game.pdb"));
        assert!(matches!(result, Err(XbdcError::Io(_))));
    }

    #[test]
    fn test_text_file_is_a_pdb_error()
    {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.pdb");
        fs::write(&path, b"this is not a program database").unwrap();
        let result = PdbLoader::new().open(&path);
        assert!(matches!(result, Err(XbdcError::Pdb { .. })));
    }

    #[test]
    fn test_primitive_types()
    {
        assert_eq!(primitive_type(0x0075), ("unsigned int".to_string(), 4));
        assert_eq!(primitive_type(0x0040), ("float".to_string(), 4));
        assert_eq!(primitive_type(0x0030), ("bool".to_string(), 1));
        assert_eq!(primitive_type(0x0000), ("unknown".to_string(), 0));
        // near32 and near64 pointers
        assert_eq!(primitive_type(0x0470), ("char*".to_string(), 4));
        assert_eq!(primitive_type(0x0603), ("void*".to_string(), 8));
    }

    #[test]
    fn test_positive_ebp_offsets_are_parameters()
    {
        assert_eq!(frame_kind(22, 8), DataKind::Parameter);
        assert_eq!(frame_kind(22, -4), DataKind::Local);
        // ESP-relative data is never a parameter.
        assert_eq!(frame_kind(21, 8), DataKind::Local);
    }
}
