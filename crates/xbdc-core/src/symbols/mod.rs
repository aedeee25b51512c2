//! # Symbol Engine
//!
//! Indexes the function, line and address relationships of one loaded image
//! and answers the queries the console needs: file and line to address for
//! breakpoints, address to source line for the current instruction, the
//! function list, and the locals of the function containing an address.
//!
//! ## Addresses
//!
//! Everything the engine stores is module-relative (an RVA). The image base
//! converts between RVAs and absolute addresses; until it is set it is 0 and
//! the two are the same number.
//!
//! ## Loading
//!
//! A load builds a complete [`SymbolIndex`] off to the side and then
//! publishes it with a single swap. Queries hold an `Arc` to whichever index
//! was current when they started, so they never see a half-built one. A
//! failed load leaves the engine unloaded.

mod demangle;
mod dwarf;
mod file;
mod pdb;
mod registers;
mod source;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

pub use self::dwarf::DwarfLoader;
pub use self::file::SymbolFileLoader;
pub use self::pdb::PdbLoader;
pub use self::registers::{RegisterNumbering, X86Register};
pub use self::source::{
    DataKind, DataSymbol, DebugInfoLoader, DebugInfoSource, FunctionSymbol, InMemorySource, LineEntry, LocationKind,
};
use crate::types::Address;

/// A source line that some address belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation
{
    pub file: String,
    pub line: u32,
    pub function: String,
}

/// One `(line, rva)` pair from a function's line table.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LineMapping
{
    line: u32,
    rva: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo
{
    pub name: String,
    pub rva: u32,
    pub address: Address,
    pub length: u32,
}

/// A parameter or stack local of the function at some address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable
{
    pub name: String,
    pub type_name: String,
    pub size: u64,
    pub location: LocationKind,
    pub register_id: Option<u32>,
    pub offset: i32,
    /// Runtime address, for register-, frame-, this-relative and static data only.
    pub address: Option<Address>,
    pub is_parameter: bool,
}

impl LocalVariable
{
    /// Short storage description such as `EBP-0x8`, `frame+0x10` or `static`.
    #[must_use]
    pub fn describe_location(&self, numbering: RegisterNumbering) -> String
    {
        let register = || {
            self.register_id.map_or_else(
                || "frame".to_string(),
                |id| {
                    numbering
                        .register(id)
                        .map_or_else(|| format!("r{id}"), |register| register.name().to_string())
                },
            )
        };
        let displacement = if self.offset < 0 {
            format!("-0x{:X}", self.offset.unsigned_abs())
        } else {
            format!("+0x{:X}", self.offset)
        };

        match self.location {
            LocationKind::RegisterRelative | LocationKind::FrameRelative => format!("{}{displacement}", register()),
            LocationKind::ThisRelative => format!("this{displacement}"),
            LocationKind::Static => "static".to_string(),
            LocationKind::Enregistered => format!("register {}", register()),
            LocationKind::Tls => "tls".to_string(),
            LocationKind::BitField => "bitfield".to_string(),
            LocationKind::Constant => "constant".to_string(),
            LocationKind::Null
            | LocationKind::Slot
            | LocationKind::IlRelative
            | LocationKind::Metadata => "unknown".to_string(),
        }
    }
}

/// Counts reported after a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary
{
    pub functions: usize,
    pub lines: usize,
}

/// Fully built indexes for one image. Immutable once published.
pub struct SymbolIndex
{
    source: Arc<dyn DebugInfoSource>,
    functions: Vec<FunctionSymbol>,
    /// Normalised file keys touched by each function, parallel to `functions`.
    function_files: Vec<HashSet<String>>,
    lines_by_file: HashMap<String, Vec<LineMapping>>,
    source_by_rva: BTreeMap<u32, SourceLocation>,
    line_count: usize,
}

impl SymbolIndex
{
    fn build(source: Arc<dyn DebugInfoSource>) -> Self
    {
        let functions = source.functions();
        let mut function_files = Vec::with_capacity(functions.len());
        let mut lines_by_file: HashMap<String, Vec<LineMapping>> = HashMap::new();
        let mut source_by_rva = BTreeMap::new();
        let mut line_count = 0;

        for function in &functions {
            let mut files = HashSet::new();
            for entry in source.line_entries(function) {
                let key = file_key(&entry.file);
                lines_by_file.entry(key.clone()).or_default().push(LineMapping {
                    line: entry.line,
                    rva: entry.rva,
                });
                source_by_rva.insert(
                    entry.rva,
                    SourceLocation {
                        file: entry.file,
                        line: entry.line,
                        function: function.name.clone(),
                    },
                );
                files.insert(key);
                line_count += 1;
            }
            function_files.push(files);
        }

        Self {
            source,
            functions,
            function_files,
            lines_by_file,
            source_by_rva,
            line_count,
        }
    }

    fn enclosing_function(&self, rva: u32) -> Option<&FunctionSymbol>
    {
        self.functions.iter().find(|function| {
            rva.checked_sub(function.rva)
                .is_some_and(|delta| delta < function.length.max(1))
        })
    }
}

/// The symbol engine. Cheap to share behind an `Arc`.
#[derive(Default)]
pub struct SymbolEngine
{
    index: RwLock<Option<Arc<SymbolIndex>>>,
    image_base: AtomicU32,
}

impl SymbolEngine
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Index `source` and make it current, replacing any previous load.
    pub fn load(&self, source: Arc<dyn DebugInfoSource>) -> LoadSummary
    {
        let index = Arc::new(SymbolIndex::build(source));
        let summary = LoadSummary {
            functions: index.functions.len(),
            lines: index.line_count,
        };
        *self.index.write().unwrap_or_else(PoisonError::into_inner) = Some(index);
        info!(functions = summary.functions, lines = summary.lines, "symbols loaded");
        summary
    }

    /// Drop the current index, if any.
    pub fn unload(&self)
    {
        *self.index.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool
    {
        self.current().is_some()
    }

    pub fn set_image_base(&self, base: u32)
    {
        debug!(base = %Address::new(base), "image base set");
        self.image_base.store(base, Ordering::SeqCst);
    }

    #[must_use]
    pub fn image_base(&self) -> u32
    {
        self.image_base.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn to_rva(&self, address: Address) -> u32
    {
        (address - self.image_base()).value()
    }

    #[must_use]
    pub fn to_absolute(&self, rva: u32) -> Address
    {
        Address::new(rva) + self.image_base()
    }

    /// Numbering of register ids in the loaded symbols.
    #[must_use]
    pub fn register_numbering(&self) -> Option<RegisterNumbering>
    {
        self.current().map(|index| index.source.register_numbering())
    }

    /// First address mapped to `line` of `file`. The directory part of `file`
    /// and letter case are ignored.
    #[must_use]
    pub fn address_for_line(&self, file: &str, line: u32) -> Option<Address>
    {
        let index = self.current()?;
        let mapping = index
            .lines_by_file
            .get(&file_key(file))?
            .iter()
            .find(|mapping| mapping.line == line)?;
        Some(self.to_absolute(mapping.rva))
    }

    /// Source line of `address`: the exact entry, or the closest one below it.
    #[must_use]
    pub fn source_location(&self, address: Address) -> Option<SourceLocation>
    {
        let index = self.current()?;
        let base = self.image_base();
        if address.value() < base {
            return None;
        }
        let rva = self.to_rva(address);
        index
            .source_by_rva
            .range(..=rva)
            .next_back()
            .map(|(_, location)| location.clone())
    }

    /// Functions in enumeration order, optionally only those with a line in `file`.
    #[must_use]
    pub fn functions(&self, file: Option<&str>) -> Vec<FunctionInfo>
    {
        let Some(index) = self.current() else {
            return Vec::new();
        };
        let key = file.map(file_key);

        index
            .functions
            .iter()
            .zip(&index.function_files)
            .filter(|(_, files)| key.as_ref().is_none_or(|key| files.contains(key)))
            .map(|(function, _)| FunctionInfo {
                name: function.name.clone(),
                rva: function.rva,
                address: self.to_absolute(function.rva),
                length: function.length,
            })
            .collect()
    }

    /// Parameters and stack locals of the function containing `address`.
    ///
    /// Register-, frame- and this-relative data is resolved against the value
    /// of its base register in `registers`, falling back to `frame_base` when
    /// the register is absent. Static data resolves through the image base.
    /// Anything else gets no address.
    #[must_use]
    pub fn locals(
        &self,
        address: Address,
        frame_base: Address,
        registers: Option<&HashMap<u32, u32>>,
    ) -> Vec<LocalVariable>
    {
        let Some(index) = self.current() else {
            return Vec::new();
        };
        let Some(function) = index.enclosing_function(self.to_rva(address)) else {
            debug!(%address, "no function contains address");
            return Vec::new();
        };

        index
            .source
            .data_symbols(function)
            .into_iter()
            .filter(|symbol| matches!(symbol.kind, DataKind::Local | DataKind::Parameter))
            .map(|symbol| {
                let resolved = self.resolve_address(&symbol, frame_base, registers);
                LocalVariable {
                    is_parameter: symbol.kind == DataKind::Parameter,
                    name: symbol.name,
                    type_name: symbol.type_name,
                    size: symbol.size,
                    location: symbol.location,
                    register_id: symbol.register_id,
                    offset: symbol.offset,
                    address: resolved,
                }
            })
            .collect()
    }

    fn resolve_address(
        &self,
        symbol: &DataSymbol,
        frame_base: Address,
        registers: Option<&HashMap<u32, u32>>,
    ) -> Option<Address>
    {
        match symbol.location {
            LocationKind::RegisterRelative | LocationKind::FrameRelative | LocationKind::ThisRelative => {
                let base = symbol
                    .register_id
                    .and_then(|id| registers.and_then(|map| map.get(&id)))
                    .map_or(frame_base, |value| Address::new(*value));
                Some(base.offset(symbol.offset))
            }
            LocationKind::Static => Some(self.to_absolute(symbol.rva)),
            _ => None,
        }
    }

    fn current(&self) -> Option<Arc<SymbolIndex>>
    {
        self.index.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Bare, lowercased file name: `C:\src\Game\Main.cpp` becomes `main.cpp`.
fn file_key(path: &str) -> String
{
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let name = if name.trim().is_empty() { path } else { name };
    name.to_lowercase()
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn line(file: &str, line: u32, rva: u32) -> LineEntry
    {
        LineEntry {
            file: file.to_string(),
            line,
            rva,
        }
    }

    #[test]
    fn test_file_key_ignores_directories_and_case()
    {
        assert_eq!(file_key(r"C:\src\Game\Main.cpp"), "main.cpp");
        assert_eq!(file_key("/home/dev/game/main.cpp"), "main.cpp");
        assert_eq!(file_key("main.cpp"), "main.cpp");
        assert_eq!(file_key("src/"), "src/");
    }

    #[test]
    fn test_unloaded_engine_answers_not_found()
    {
        let engine = SymbolEngine::new();
        assert!(!engine.is_loaded());
        assert_eq!(engine.address_for_line("main.cpp", 1), None);
        assert_eq!(engine.source_location(Address::new(0x1000)), None);
        assert!(engine.functions(None).is_empty());
        assert!(engine.locals(Address::new(0x1000), Address::ZERO, None).is_empty());
        assert_eq!(engine.register_numbering(), None);
    }

    #[test]
    fn test_later_line_entries_overwrite_address_index()
    {
        let source = InMemorySource::new()
            .with_function("a", 0x100, 0x10, vec![line("a.c", 1, 0x100)], Vec::new())
            .with_function("b", 0x100, 0x10, vec![line("b.c", 9, 0x100)], Vec::new());
        let engine = SymbolEngine::new();
        engine.load(Arc::new(source));
        let location = engine.source_location(Address::new(0x100)).unwrap();
        assert_eq!(location.function, "b");
        assert_eq!(location.line, 9);
    }

    #[test]
    fn test_describe_location()
    {
        let mut local = LocalVariable {
            name: "x".into(),
            type_name: "int".into(),
            size: 4,
            location: LocationKind::RegisterRelative,
            register_id: Some(22),
            offset: -8,
            address: None,
            is_parameter: false,
        };
        assert_eq!(local.describe_location(RegisterNumbering::CodeView), "EBP-0x8");
        local.register_id = None;
        local.location = LocationKind::FrameRelative;
        local.offset = 16;
        assert_eq!(local.describe_location(RegisterNumbering::CodeView), "frame+0x10");
        local.location = LocationKind::Enregistered;
        local.register_id = Some(0);
        assert_eq!(local.describe_location(RegisterNumbering::DwarfX86), "register EAX");
    }
}
