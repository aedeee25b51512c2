//! # Requests
//!
//! A [`Request`] is one validated command together with its arguments. Each
//! command owns exactly one argument shape, so the request is a plain enum:
//! a command that takes no arguments simply has no payload.
//!
//! Requests are produced by [`crate::builder::build_request`] and consumed
//! once by the dispatcher.

use std::path::PathBuf;

use crate::command::CommandType;

/// Default discovery/connect timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default time allowed for a rebooted console to come back, in milliseconds.
pub const DEFAULT_REBOOT_TIMEOUT_MS: u64 = 10_000;

/// A validated command ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request
{
    Scan(ScanArgs),
    Connect(ConnectArgs),
    Disconnect,
    Reboot(RebootArgs),
    Mute,
    Unmute,
    LoadSymbols(LoadSymbolsArgs),
    Functions(FunctionArgs),
    Locals(ThreadArgs),
    SetBreakpoint(BreakpointArgs),
    DeleteBreakpoint(BreakpointArgs),
    Pause,
    Resume,
    ReadMemory(MemoryReadArgs),
    DumpMemory(MemoryDumpArgs),
    WriteMemory(MemoryWriteArgs),
    Threads,
    Registers(ThreadArgs),
    Modules,
    Regions,
    Upload(UploadArgs),
    Launch(LaunchArgs),
    Quit,
    Help,
}

impl Request
{
    /// The command this request executes.
    #[must_use]
    pub fn command_type(&self) -> CommandType
    {
        match self {
            Request::Scan(_) => CommandType::Scan,
            Request::Connect(_) => CommandType::Connect,
            Request::Disconnect => CommandType::Disconnect,
            Request::Reboot(_) => CommandType::Reboot,
            Request::Mute => CommandType::Mute,
            Request::Unmute => CommandType::Unmute,
            Request::LoadSymbols(_) => CommandType::LoadSymbols,
            Request::Functions(_) => CommandType::Functions,
            Request::Locals(_) => CommandType::Locals,
            Request::SetBreakpoint(_) => CommandType::SetBreakpoint,
            Request::DeleteBreakpoint(_) => CommandType::DeleteBreakpoint,
            Request::Pause => CommandType::Pause,
            Request::Resume => CommandType::Resume,
            Request::ReadMemory(_) => CommandType::ReadMemory,
            Request::DumpMemory(_) => CommandType::DumpMemory,
            Request::WriteMemory(_) => CommandType::WriteMemory,
            Request::Threads => CommandType::Threads,
            Request::Registers(_) => CommandType::Registers,
            Request::Modules => CommandType::Modules,
            Request::Regions => CommandType::Regions,
            Request::Upload(_) => CommandType::Upload,
            Request::Launch(_) => CommandType::Launch,
            Request::Quit => CommandType::Quit,
            Request::Help => CommandType::Help,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanArgs
{
    pub timeout_ms: u64,
}

impl Default for ScanArgs
{
    fn default() -> Self
    {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Connect by IP, by console name, or to the first console discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectArgs
{
    pub ip: Option<String>,
    pub name: Option<String>,
    pub timeout_ms: u64,
}

impl Default for ConnectArgs
{
    fn default() -> Self
    {
        Self {
            ip: None,
            name: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebootArgs
{
    pub auto_reconnect: bool,
    pub timeout_ms: u64,
}

impl Default for RebootArgs
{
    fn default() -> Self
    {
        Self {
            auto_reconnect: false,
            timeout_ms: DEFAULT_REBOOT_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSymbolsArgs
{
    pub pdb_path: PathBuf,
    pub image_base: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionArgs
{
    /// Only list functions with at least one line in this file.
    pub file: Option<String>,
}

/// Thread selector for `registers` and `locals`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadArgs
{
    /// `None` selects the first available thread.
    pub thread_id: Option<u32>,
}

/// A user-supplied breakpoint location.
///
/// Either `address` is set, or `file` and `line` name a source line to
/// resolve through the loaded symbols. `address` always wins when both are
/// present. A spec with neither is kept as-is and fails when resolved, so
/// that one bad spec never sinks the rest of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreakpointSpec
{
    pub address: Option<u32>,
    pub file: String,
    pub line: Option<u32>,
}

impl BreakpointSpec
{
    #[must_use]
    pub fn at_address(address: u32) -> Self
    {
        Self {
            address: Some(address),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn at_line(file: impl Into<String>, line: u32) -> Self
    {
        Self {
            address: None,
            file: file.into(),
            line: Some(line),
        }
    }

    /// `true` when a file and line are both present.
    #[must_use]
    pub fn has_source_line(&self) -> bool
    {
        !self.file.is_empty() && self.line.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointArgs
{
    pub breakpoints: Vec<BreakpointSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryReadArgs
{
    pub address: u32,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDumpArgs
{
    pub address: u32,
    pub length: usize,
    pub local_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryWriteArgs
{
    pub address: u32,
    pub data: Vec<u8>,
}

/// A local file or directory and where it should land on the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPair
{
    pub local_path: PathBuf,
    pub remote_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadArgs
{
    pub files: Vec<TransferPair>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchArgs
{
    pub remote_path: String,
}
