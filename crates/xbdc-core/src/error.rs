//! # Error Types
//!
//! Errors raised while executing a request against the console or the
//! symbol engine.
//!
//! The display string of every variant is the message the user sees: the
//! dispatcher turns any `Err` into a failed response carrying `to_string()`.

use thiserror::Error;

/// Main error type for console operations.
///
/// ## Error Categories
///
/// 1. **Session errors**: `NotConnected`, `AlreadyConnected`
/// 2. **Argument errors**: `InvalidArgument`, `ThreadNotFound`
/// 3. **Collaborator errors**: `Device`, `Symbols`, `Dwarf`, `Pdb`, `Io`
#[derive(Error, Debug)]
pub enum XbdcError
{
    /// The command needs a console connection and there is none.
    #[error("Not connected to any Xbox console.")]
    NotConnected,

    /// `connect` while a session is already open.
    #[error("Already connected to an Xbox. Please disconnect first.")]
    AlreadyConnected,

    /// A request argument was acceptable to the protocol but not to the operation.
    #[error("{0}")]
    InvalidArgument(String),

    /// The device collaborator failed. The message is forwarded verbatim.
    #[error("{0}")]
    Device(String),

    /// A debug-info source could not be opened or read.
    #[error("{0}")]
    Symbols(String),

    /// A symbol query was made before any symbols were loaded.
    #[error("Symbols not loaded.")]
    SymbolsNotLoaded,

    /// No thread with the requested id exists in the process.
    #[error("Thread with ID {0} not found.")]
    ThreadNotFound(u32),

    /// DWARF parsing failed.
    ///
    /// The string names the operation that was in progress.
    #[error("{context}: {source}")]
    Dwarf
    {
        context: String,
        #[source]
        source: gimli::Error,
    },

    /// PDB parsing failed.
    ///
    /// The string names the operation that was in progress.
    #[error("{context}: {source}")]
    Pdb
    {
        context: String,
        #[source]
        source: pdb::Error,
    },

    /// Local file system failure (dump, upload, symbol files).
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl XbdcError
{
    /// Shorthand for a device failure with a formatted message.
    #[must_use]
    pub fn device(message: impl Into<String>) -> Self
    {
        XbdcError::Device(message.into())
    }
}

/// Convenience type alias for `Result<T, XbdcError>`.
///
/// ```rust
/// use xbdc_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, XbdcError>;
