//! Symbol name helpers shared by the debug-info loaders.

use rustc_demangle::try_demangle;

use crate::error::XbdcError;

/// Human-readable form of a linkage name.
///
/// Rust symbols are demangled. Anything `rustc_demangle` does not recognise
/// (C, MSVC and most C++ names) is returned as-is.
pub(crate) fn demangle_symbol(raw: &str) -> String
{
    try_demangle(raw).map_or_else(|_| raw.to_string(), |demangled| format!("{demangled:#}"))
}

/// Wrap a gimli error with the operation that was in progress.
pub(crate) fn map_dwarf_error(context: &str, err: gimli::Error) -> XbdcError
{
    XbdcError::Dwarf {
        context: context.to_string(),
        source: err,
    }
}

/// Wrap a pdb error with the operation that was in progress.
pub(crate) fn map_pdb_error(context: &str, err: pdb::Error) -> XbdcError
{
    XbdcError::Pdb {
        context: context.to_string(),
        source: err,
    }
}
