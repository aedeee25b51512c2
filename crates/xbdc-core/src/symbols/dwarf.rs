//! DWARF debug-info loader.
//!
//! Reads an object file with `object`, loads its DWARF sections into shared
//! buffers and walks every compilation unit with `gimli`, producing the same
//! function, line and data-symbol model a PDB would. Register ids use the
//! i386 DWARF numbering.
//!
//! Only the first operation of a location expression is interpreted. That
//! covers the frame-base, register-relative, register and static forms that
//! unoptimised console builds emit; anything else is reported with no
//! location.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use gimli::{
    constants, AttributeValue, DebuggingInformationEntry, Dwarf, EndianArcSlice, Operation, Reader, RunTimeEndian,
    SectionId, Unit, UnitOffset,
};
use object::{Object, ObjectSection};
use tracing::{debug, warn};

use super::demangle::{demangle_symbol, map_dwarf_error};
use super::registers::RegisterNumbering;
use super::source::{
    DataKind, DataSymbol, DebugInfoLoader, DebugInfoSource, FunctionSymbol, InMemorySource, LineEntry, LocationKind,
};
use crate::error::{Result, XbdcError};

type OwnedReader = EndianArcSlice<RunTimeEndian>;
type OwnedDwarf = Dwarf<OwnedReader>;
type Entry<'abbrev, 'unit> = DebuggingInformationEntry<'abbrev, 'unit, OwnedReader>;

const MAX_TYPE_REF_DEPTH: usize = 32;

const DWARF_SECTIONS: &[(SectionId, &[&str])] = &[
    (SectionId::DebugAbbrev, &[".debug_abbrev", "__debug_abbrev"]),
    (SectionId::DebugAddr, &[".debug_addr", "__debug_addr"]),
    (SectionId::DebugInfo, &[".debug_info", "__debug_info"]),
    (SectionId::DebugLine, &[".debug_line", "__debug_line"]),
    (SectionId::DebugLineStr, &[".debug_line_str", "__debug_line_str"]),
    (SectionId::DebugRanges, &[".debug_ranges", "__debug_ranges"]),
    (SectionId::DebugRngLists, &[".debug_rnglists", "__debug_rnglists"]),
    (SectionId::DebugStr, &[".debug_str", "__debug_str"]),
    (SectionId::DebugStrOffsets, &[".debug_str_offsets", "__debug_str_offsets"]),
    (SectionId::DebugTypes, &[".debug_types", "__debug_types"]),
    (SectionId::DebugLoc, &[".debug_loc", "__debug_loc"]),
    (SectionId::DebugLocLists, &[".debug_loclists", "__debug_loclists"]),
];

/// Opens DWARF debug information from ELF, PE/COFF or Mach-O files.
#[derive(Debug, Clone, Copy, Default)]
pub struct DwarfLoader;

impl DwarfLoader
{
    #[must_use]
    pub fn new() -> Self
    {
        Self
    }
}

impl DebugInfoLoader for DwarfLoader
{
    fn open(&self, path: &Path) -> Result<Arc<dyn DebugInfoSource>>
    {
        let bytes = fs::read(path)?;
        let file = object::File::parse(&*bytes)
            .map_err(|err| XbdcError::Symbols(format!("failed to parse {}: {err}", path.display())))?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        let mut sections = HashMap::new();
        for (id, aliases) in DWARF_SECTIONS {
            sections.insert(*id, load_section_bytes(&file, aliases)?);
        }
        let dwarf = Dwarf::load(|id| {
            let data = sections
                .get(&id)
                .cloned()
                .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
            Ok::<_, gimli::Error>(EndianArcSlice::new(data, endian))
        })
        .map_err(|err| map_dwarf_error("loading DWARF sections", err))?;

        let mut collector = Collector::new(&dwarf, file.relative_address_base());
        let mut headers = dwarf.units();
        while let Some(header) = headers
            .next()
            .map_err(|err| map_dwarf_error("reading .debug_info unit header", err))?
        {
            let offset = header.offset();
            let unit = match dwarf.unit(header) {
                Ok(unit) => unit,
                Err(err) => {
                    warn!(?offset, %err, "skipping unparseable compilation unit");
                    continue;
                }
            };
            if let Err(err) = collector.collect_unit(&unit) {
                warn!(?offset, %err, "skipping compilation unit");
            }
        }

        let source = collector.finish();
        debug!(path = %path.display(), functions = source.functions().len(), "DWARF symbols read");
        Ok(Arc::new(source))
    }
}

fn load_section_bytes(file: &object::File<'_>, names: &[&str]) -> Result<Arc<[u8]>>
{
    for name in names {
        if let Some(section) = file.section_by_name(name) {
            let data = section
                .uncompressed_data()
                .map_err(|err| XbdcError::Symbols(format!("failed to read {name}: {err}")))?;
            return Ok(match data {
                Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes.to_vec()),
                Cow::Owned(vec) => vec.into(),
            });
        }
    }

    Ok(Arc::<[u8]>::from(Vec::new()))
}

#[allow(clippy::cast_possible_truncation)]
const fn relative(address: u64, base: u64) -> u32
{
    address.wrapping_sub(base) as u32
}

struct FunctionRecord
{
    symbol: FunctionSymbol,
    lines: Vec<LineEntry>,
    data: Vec<DataSymbol>,
}

/// Accumulates functions, line rows and variables across units.
struct Collector<'a>
{
    dwarf: &'a OwnedDwarf,
    base: u64,
    functions: Vec<FunctionRecord>,
}

impl<'a> Collector<'a>
{
    fn new(dwarf: &'a OwnedDwarf, base: u64) -> Self
    {
        Self {
            dwarf,
            base,
            functions: Vec::new(),
        }
    }

    fn finish(self) -> InMemorySource
    {
        self.functions.into_iter().fold(
            InMemorySource::new().with_numbering(RegisterNumbering::DwarfX86),
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

    fn collect_unit(&mut self, unit: &Unit<OwnedReader>) -> Result<()>
    {
        let first = self.functions.len();
        self.collect_entries(unit)?;
        let rows = self.line_rows(unit)?;

        // (start, end, function index), sorted for lookup.
        let mut ranges: Vec<(u32, u32, usize)> = self.functions[first..]
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let start = record.symbol.rva;
                (start, start.saturating_add(record.symbol.length.max(1)), first + i)
            })
            .collect();
        ranges.sort_unstable();

        for row in rows {
            let slot = ranges.partition_point(|(start, _, _)| *start <= row.rva);
            let Some((_, end, index)) = slot.checked_sub(1).map(|i| ranges[i]) else {
                continue;
            };
            if row.rva < end {
                self.functions[index].lines.push(row);
            }
        }
        Ok(())
    }

    fn collect_entries(&mut self, unit: &Unit<OwnedReader>) -> Result<()>
    {
        let mut cursor = unit.entries();
        let mut depth: isize = 0;
        // (depth of the subprogram DIE, index into `functions`)
        let mut scopes: Vec<(isize, usize)> = Vec::new();

        while let Some((delta, entry)) = cursor.next_dfs().map_err(|err| map_dwarf_error("traversing DIE tree", err))? {
            depth += delta;
            while scopes.last().is_some_and(|(scope_depth, _)| *scope_depth >= depth) {
                scopes.pop();
            }

            match entry.tag() {
                constants::DW_TAG_subprogram => {
                    if let Some(symbol) = self.function(unit, entry)? {
                        scopes.push((depth, self.functions.len()));
                        self.functions.push(FunctionRecord {
                            symbol,
                            lines: Vec::new(),
                            data: Vec::new(),
                        });
                    }
                }
                constants::DW_TAG_variable | constants::DW_TAG_formal_parameter => {
                    let Some((_, index)) = scopes.last().copied() else {
                        continue;
                    };
                    if let Some(symbol) = self.data_symbol(unit, entry)? {
                        self.functions[index].data.push(symbol);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn function(&self, unit: &Unit<OwnedReader>, entry: &Entry<'_, '_>) -> Result<Option<FunctionSymbol>>
    {
        let Some(low) = entry
            .attr(constants::DW_AT_low_pc)
            .map_err(|err| map_dwarf_error("reading DW_AT_low_pc", err))?
        else {
            return Ok(None);
        };
        let Some(low) = self
            .dwarf
            .attr_address(unit, low.value())
            .map_err(|err| map_dwarf_error("resolving DW_AT_low_pc", err))?
        else {
            return Ok(None);
        };

        let length = match entry
            .attr(constants::DW_AT_high_pc)
            .map_err(|err| map_dwarf_error("reading DW_AT_high_pc", err))?
        {
            Some(attr) => match attr.value() {
                AttributeValue::Addr(high) => high.saturating_sub(low),
                other => other.udata_value().unwrap_or(0),
            },
            None => 0,
        };

        let name = self.function_name(unit, entry, 0)?.unwrap_or_else(|| "Unknown".to_string());
        Ok(Some(FunctionSymbol {
            id: 0,
            name,
            rva: relative(low, self.base),
            length: u32::try_from(length).unwrap_or(u32::MAX),
        }))
    }

    fn function_name(&self, unit: &Unit<OwnedReader>, entry: &Entry<'_, '_>, depth: usize) -> Result<Option<String>>
    {
        if let Some(attr) = entry
            .attr(constants::DW_AT_name)
            .map_err(|err| map_dwarf_error("reading DW_AT_name", err))?
        {
            return Ok(Some(self.attr_to_string(unit, attr.value())?));
        }
        if let Some(attr) = entry
            .attr(constants::DW_AT_linkage_name)
            .map_err(|err| map_dwarf_error("reading DW_AT_linkage_name", err))?
        {
            return Ok(Some(demangle_symbol(&self.attr_to_string(unit, attr.value())?)));
        }
        if depth >= MAX_TYPE_REF_DEPTH {
            return Ok(None);
        }
        for origin in [constants::DW_AT_specification, constants::DW_AT_abstract_origin] {
            let attr = entry
                .attr(origin)
                .map_err(|err| map_dwarf_error("reading declaration reference", err))?;
            if let Some(AttributeValue::UnitRef(offset)) = attr.map(|attr| attr.value()) {
                let target = unit
                    .entry(offset)
                    .map_err(|err| map_dwarf_error("resolving declaration", err))?;
                return self.function_name(unit, &target, depth + 1);
            }
        }
        Ok(None)
    }

    fn data_symbol(&self, unit: &Unit<OwnedReader>, entry: &Entry<'_, '_>) -> Result<Option<DataSymbol>>
    {
        let Some(name_attr) = entry
            .attr(constants::DW_AT_name)
            .map_err(|err| map_dwarf_error("reading variable name", err))?
        else {
            return Ok(None);
        };
        let name = self.attr_to_string(unit, name_attr.value())?;

        let (type_name, size) = match entry
            .attr(constants::DW_AT_type)
            .map_err(|err| map_dwarf_error("reading variable type", err))?
        {
            Some(attr) => match attr.value() {
                AttributeValue::UnitRef(offset) => self.describe_type(unit, offset, 0)?,
                _ => ("unknown".to_string(), 0),
            },
            None => ("void".to_string(), 0),
        };

        let mut symbol = DataSymbol {
            name,
            type_name,
            size,
            kind: DataKind::Local,
            location: LocationKind::Null,
            register_id: None,
            offset: 0,
            rva: 0,
        };

        if let Some(attr) = entry
            .attr(constants::DW_AT_location)
            .map_err(|err| map_dwarf_error("reading DW_AT_location", err))?
        {
            if let Some(expression) = attr.exprloc_value() {
                self.apply_location(unit, expression.0, &mut symbol)?;
            }
        } else if entry
            .attr(constants::DW_AT_const_value)
            .map_err(|err| map_dwarf_error("reading DW_AT_const_value", err))?
            .is_some()
        {
            symbol.location = LocationKind::Constant;
        }

        symbol.kind = match (entry.tag(), symbol.location) {
            (constants::DW_TAG_formal_parameter, _) => DataKind::Parameter,
            (_, LocationKind::Static) => DataKind::StaticLocal,
            (_, LocationKind::Constant) => DataKind::Constant,
            _ => DataKind::Local,
        };
        Ok(Some(symbol))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn apply_location(&self, unit: &Unit<OwnedReader>, mut bytes: OwnedReader, symbol: &mut DataSymbol) -> Result<()>
    {
        if bytes.is_empty() {
            return Ok(());
        }
        let operation =
            Operation::parse(&mut bytes, unit.encoding()).map_err(|err| map_dwarf_error("parsing location", err))?;

        match operation {
            Operation::FrameOffset { offset } => {
                symbol.location = LocationKind::FrameRelative;
                symbol.offset = offset as i32;
            }
            Operation::RegisterOffset { register, offset, .. } => {
                symbol.location = LocationKind::RegisterRelative;
                symbol.register_id = Some(u32::from(register.0));
                symbol.offset = offset as i32;
            }
            Operation::Register { register } => {
                symbol.location = LocationKind::Enregistered;
                symbol.register_id = Some(u32::from(register.0));
            }
            Operation::Address { address } => {
                symbol.location = LocationKind::Static;
                symbol.rva = relative(address, self.base);
            }
            Operation::AddressIndex { index } => {
                let address = self
                    .dwarf
                    .address(unit, index)
                    .map_err(|err| map_dwarf_error("resolving .debug_addr entry", err))?;
                symbol.location = LocationKind::Static;
                symbol.rva = relative(address, self.base);
            }
            _ => {}
        }
        Ok(())
    }

    /// Printable name and byte size of the type at `offset`.
    fn describe_type(
        &self,
        unit: &Unit<OwnedReader>,
        offset: UnitOffset<usize>,
        depth: usize,
    ) -> Result<(String, u64)>
    {
        if depth >= MAX_TYPE_REF_DEPTH {
            return Ok(("unknown".to_string(), 0));
        }
        let die = unit
            .entry(offset)
            .map_err(|err| map_dwarf_error("resolving type reference", err))?;

        let byte_size = die
            .attr(constants::DW_AT_byte_size)
            .map_err(|err| map_dwarf_error("reading DW_AT_byte_size", err))?
            .and_then(|attr| attr.udata_value());
        let inner = die
            .attr(constants::DW_AT_type)
            .map_err(|err| map_dwarf_error("reading nested type", err))?
            .and_then(|attr| match attr.value() {
                AttributeValue::UnitRef(inner) => Some(inner),
                _ => None,
            });
        let describe_inner = |fallback: &str| -> Result<(String, u64)> {
            match inner {
                Some(inner) => self.describe_type(unit, inner, depth + 1),
                None => Ok((fallback.to_string(), 0)),
            }
        };

        let (name, size) = match die.tag() {
            constants::DW_TAG_pointer_type | constants::DW_TAG_reference_type => {
                let (pointee, _) = describe_inner("void")?;
                let suffix = if die.tag() == constants::DW_TAG_pointer_type { "*" } else { "&" };
                (
                    format!("{pointee}{suffix}"),
                    byte_size.unwrap_or_else(|| u64::from(unit.encoding().address_size)),
                )
            }
            constants::DW_TAG_const_type | constants::DW_TAG_volatile_type => {
                let (name, size) = describe_inner("void")?;
                let qualifier = if die.tag() == constants::DW_TAG_const_type { "const" } else { "volatile" };
                (format!("{qualifier} {name}"), size)
            }
            constants::DW_TAG_array_type => {
                let (element, _) = describe_inner("unknown")?;
                (format!("{element}[]"), byte_size.unwrap_or(0))
            }
            _ => {
                let name = match die
                    .attr(constants::DW_AT_name)
                    .map_err(|err| map_dwarf_error("reading type name", err))?
                {
                    Some(attr) => Some(self.attr_to_string(unit, attr.value())?),
                    None => None,
                };
                match (name, byte_size) {
                    (Some(name), Some(size)) => (name, size),
                    (Some(name), None) => (name, describe_inner("unknown")?.1),
                    (None, _) => describe_inner("unknown")?,
                }
            }
        };
        Ok((name, size))
    }

    fn line_rows(&self, unit: &Unit<OwnedReader>) -> Result<Vec<LineEntry>>
    {
        let Some(program) = unit.line_program.clone() else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        let mut paths: HashMap<u64, String> = HashMap::new();
        let mut rows = program.rows();
        while let Some((header, row)) = rows.next_row().map_err(|err| map_dwarf_error("reading line program", err))? {
            if row.end_sequence() {
                continue;
            }
            let Some(line) = row.line() else {
                continue;
            };
            let file = match paths.get(&row.file_index()) {
                Some(path) => path.clone(),
                None => {
                    let Some(file) = row.file(header) else {
                        continue;
                    };
                    let mut path = self.attr_to_string(unit, file.path_name())?;
                    if let Some(directory) = file.directory(header) {
                        let directory = self.attr_to_string(unit, directory)?;
                        if !directory.is_empty() && !path.starts_with(['/', '\\']) {
                            path = format!("{directory}/{path}");
                        }
                    }
                    paths.insert(row.file_index(), path.clone());
                    path
                }
            };
            entries.push(LineEntry {
                file,
                line: u32::try_from(line.get()).unwrap_or(u32::MAX),
                rva: relative(row.address(), self.base),
            });
        }
        Ok(entries)
    }

    fn attr_to_string(&self, unit: &Unit<OwnedReader>, value: AttributeValue<OwnedReader>) -> Result<String>
    {
        let reader = self
            .dwarf
            .attr_string(unit, value)
            .map_err(|err| map_dwarf_error("resolving DWARF string", err))?;
        let owned = match reader.to_string() {
            Ok(cow) => cow.into_owned(),
            Err(_) => reader
                .to_string_lossy()
                .map_err(|err| map_dwarf_error("decoding DWARF string", err))?
                .into_owned(),
        };
        Ok(owned)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_missing_file_is_an_error()
    {
        let result = DwarfLoader::new().open(Path::new("/definitely/not/here/game.pdb"));
        assert!(matches!(result, Err(XbdcError::Io(_))));
    }

    #[test]
    fn test_non_object_file_is_a_symbols_error()
    {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"just some text").unwrap();
        let result = DwarfLoader::new().open(&path);
        assert!(matches!(result, Err(XbdcError::Symbols(_))));
    }

    #[test]
    fn test_opens_running_executable()
    {
        let exe = std::env::current_exe().unwrap();
        let source = DwarfLoader::new().open(&exe).unwrap();
        assert_eq!(source.register_numbering(), RegisterNumbering::DwarfX86);
    }

    #[test]
    fn test_relative_wraps()
    {
        assert_eq!(relative(0x1_0010, 0x1_0000), 0x10);
        assert_eq!(relative(0x10, 0x20), 0xFFFF_FFF0);
    }
}
