//! Debug-info source abstraction.
//!
//! The symbol engine never parses a container format itself. It asks a
//! [`DebugInfoSource`] for three things: the function list, the line table
//! of a function, and the data symbols of a function. A
//! [`DebugInfoLoader`] opens a source from a path.
//!
//! The data model follows the PDB/DIA vocabulary (data kinds, location
//! kinds, register ids) because that is what console toolchains emit. Other
//! formats map onto it.

use std::path::Path;
use std::sync::Arc;

use super::registers::RegisterNumbering;
use crate::error::Result;

/// A function as enumerated by the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSymbol
{
    /// Source-assigned handle, passed back to the per-function queries.
    pub id: usize,
    pub name: String,
    pub rva: u32,
    pub length: u32,
}

/// One row of a function's line table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEntry
{
    /// File path as recorded at compile time.
    pub file: String,
    pub line: u32,
    pub rva: u32,
}

/// What a data symbol is, in DIA terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind
{
    Unknown,
    Local,
    StaticLocal,
    Parameter,
    ObjectPointer,
    FileStatic,
    Global,
    Member,
    StaticMember,
    Constant,
}

/// Where a data symbol lives, in DIA terms plus DWARF's frame-base form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationKind
{
    Null,
    Static,
    Tls,
    /// `register + offset`.
    RegisterRelative,
    /// `frame base + offset`.
    FrameRelative,
    /// `this + offset`.
    ThisRelative,
    /// Lives in a register, no memory address.
    Enregistered,
    BitField,
    Slot,
    IlRelative,
    Metadata,
    Constant,
}

/// A variable, parameter or other datum scoped to a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSymbol
{
    pub name: String,
    pub type_name: String,
    pub size: u64,
    pub kind: DataKind,
    pub location: LocationKind,
    /// Base register, in the source's [`RegisterNumbering`]. `None` for
    /// frame-relative data, which is addressed from the frame base.
    pub register_id: Option<u32>,
    pub offset: i32,
    /// Module-relative address of static data.
    pub rva: u32,
}

/// Enumerates the symbols of one loaded image.
pub trait DebugInfoSource: Send + Sync
{
    /// All functions, in the source's natural order.
    fn functions(&self) -> Vec<FunctionSymbol>;

    /// Line table rows covering `function`.
    fn line_entries(&self, function: &FunctionSymbol) -> Vec<LineEntry>;

    /// Data symbols scoped to `function`.
    fn data_symbols(&self, function: &FunctionSymbol) -> Vec<DataSymbol>;

    /// How `DataSymbol::register_id` values are numbered.
    fn register_numbering(&self) -> RegisterNumbering
    {
        RegisterNumbering::CodeView
    }
}

/// Opens debug-info sources from the file system.
pub trait DebugInfoLoader: Send + Sync
{
    /// Open and fully parse the debug information at `path`.
    ///
    /// ## Errors
    ///
    /// Any failure to read or parse the file. Nothing is cached on failure.
    fn open(&self, path: &Path) -> Result<Arc<dyn DebugInfoSource>>;
}

/// A source assembled in memory, one function at a time.
///
/// ## Example
///
/// ```rust
/// use xbdc_core::symbols::{InMemorySource, LineEntry};
///
/// let source = InMemorySource::new().with_function(
///     "main",
///     0x1000,
///     0x40,
///     vec![LineEntry { file: "src/main.c".into(), line: 10, rva: 0x1000 }],
///     Vec::new(),
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemorySource
{
    functions: Vec<FunctionSymbol>,
    lines: Vec<Vec<LineEntry>>,
    data: Vec<Vec<DataSymbol>>,
    numbering: RegisterNumbering,
}

impl InMemorySource
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    #[must_use]
    pub fn with_numbering(mut self, numbering: RegisterNumbering) -> Self
    {
        self.numbering = numbering;
        self
    }

    #[must_use]
    pub fn with_function(
        mut self,
        name: impl Into<String>,
        rva: u32,
        length: u32,
        lines: Vec<LineEntry>,
        data: Vec<DataSymbol>,
    ) -> Self
    {
        self.functions.push(FunctionSymbol {
            id: self.functions.len(),
            name: name.into(),
            rva,
            length,
        });
        self.lines.push(lines);
        self.data.push(data);
        self
    }
}

impl DebugInfoSource for InMemorySource
{
    fn functions(&self) -> Vec<FunctionSymbol>
    {
        self.functions.clone()
    }

    fn line_entries(&self, function: &FunctionSymbol) -> Vec<LineEntry>
    {
        self.lines.get(function.id).cloned().unwrap_or_default()
    }

    fn data_symbols(&self, function: &FunctionSymbol) -> Vec<DataSymbol>
    {
        self.data.get(function.id).cloned().unwrap_or_default()
    }

    fn register_numbering(&self) -> RegisterNumbering
    {
        self.numbering
    }
}
