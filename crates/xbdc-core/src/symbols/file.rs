//! Picks the debug-info loader for a symbol file.
//!
//! Program databases are recognised by the MSF 7.00 signature or a `.pdb`
//! extension. Everything else goes to the DWARF loader, which handles ELF,
//! PE/COFF and Mach-O images.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::dwarf::DwarfLoader;
use super::pdb::PdbLoader;
use super::source::{DebugInfoLoader, DebugInfoSource};
use crate::error::Result;

const MSF_SIGNATURE: &[u8] = b"Microsoft C/C++ MSF 7.00\r\n\x1aDS\0\0\0";

/// Default loader: PDB or DWARF by file contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolFileLoader
{
    pdb: PdbLoader,
    dwarf: DwarfLoader,
}

impl SymbolFileLoader
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }
}

impl DebugInfoLoader for SymbolFileLoader
{
    fn open(&self, path: &Path) -> Result<Arc<dyn DebugInfoSource>>
    {
        if is_program_database(path)? {
            debug!(path = %path.display(), "reading as a program database");
            self.pdb.open(path)
        } else {
            self.dwarf.open(path)
        }
    }
}

fn is_program_database(path: &Path) -> Result<bool>
{
    if path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("pdb"))
    {
        return Ok(true);
    }

    let mut header = Vec::with_capacity(MSF_SIGNATURE.len());
    File::open(path)?
        .take(MSF_SIGNATURE.len() as u64)
        .read_to_end(&mut header)?;
    Ok(header == MSF_SIGNATURE)
}
