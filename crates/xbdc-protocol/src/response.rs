//! # Responses
//!
//! Every request produces exactly one [`Response`]: the command it answers,
//! whether it succeeded, an optional human-readable message and an optional
//! payload.
//!
//! ## Payloads
//!
//! [`ResponsePayload`] is a closed set of per-command shapes. It serializes
//! untagged, so the JSON consumer sees the bare array or object under
//! `payload`. Field names are camelCase; addresses are `0x%08X` strings.
//!
//! ## Invariant
//!
//! A failed response never carries a payload. [`Response::failure`] has no
//! payload parameter, and [`Response::with_payload`] always succeeds.

use serde::Serialize;

use crate::command::CommandType;
use crate::error::ProtocolError;

/// The result envelope for one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response
{
    #[serde(rename = "type")]
    command: CommandType,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<ResponsePayload>,
}

impl Response
{
    /// A successful response with a message and no payload.
    #[must_use]
    pub fn success(command: CommandType, message: impl Into<String>) -> Self
    {
        Self {
            command,
            success: true,
            message: Some(message.into()),
            payload: None,
        }
    }

    /// A failed response carrying only a diagnostic message.
    #[must_use]
    pub fn failure(command: CommandType, message: impl Into<String>) -> Self
    {
        Self {
            command,
            success: false,
            message: Some(message.into()),
            payload: None,
        }
    }

    /// A successful response carrying data.
    #[must_use]
    pub fn with_payload(command: CommandType, message: Option<String>, payload: ResponsePayload) -> Self
    {
        Self {
            command,
            success: true,
            message,
            payload: Some(payload),
        }
    }

    #[must_use]
    pub fn command(&self) -> CommandType
    {
        self.command
    }

    #[must_use]
    pub fn is_success(&self) -> bool
    {
        self.success
    }

    #[must_use]
    pub fn message(&self) -> Option<&str>
    {
        self.message.as_deref()
    }

    #[must_use]
    pub fn payload(&self) -> Option<&ResponsePayload>
    {
        self.payload.as_ref()
    }
}

impl From<ProtocolError> for Response
{
    fn from(error: ProtocolError) -> Self
    {
        Response::failure(error.command_type(), error.to_string())
    }
}

/// Per-command payload shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResponsePayload
{
    Consoles(Vec<ConsoleEntry>),
    Functions(Vec<FunctionEntry>),
    Locals(Vec<LocalEntry>),
    Breakpoints(Vec<BreakpointEntry>),
    Memory(MemoryBlock),
    Registers(RegisterReport),
    Threads(Vec<ThreadEntry>),
    Modules(Vec<ModuleEntry>),
    Regions(Vec<RegionEntry>),
    Uploads(Vec<UploadEntry>),
    SymbolsLoaded(SymbolsSummary),
    Help(Vec<HelpEntry>),
}

/// A console found by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsoleEntry
{
    pub name: String,
    pub ip: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionEntry
{
    pub name: String,
    pub rva: String,
    pub address: String,
    pub length: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalEntry
{
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub is_parameter: bool,
    /// Storage description, e.g. `EBP-0x8` or `register 17`.
    pub location: String,
    /// Bytes read from the device; absent when nothing could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Outcome of one breakpoint spec within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakpointEntry
{
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryBlock
{
    pub address: String,
    pub length: usize,
    /// Space separated uppercase hex byte pairs.
    pub data: String,
}

impl MemoryBlock
{
    #[must_use]
    pub fn new(address: u32, bytes: &[u8]) -> Self
    {
        Self {
            address: format_address(address),
            length: bytes.len(),
            data: format_bytes(bytes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterReport
{
    pub thread_id: u32,
    pub registers: RegisterValues,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocationEntry>,
}

/// General purpose and segment registers as hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct RegisterValues
{
    pub eax: String,
    pub ebx: String,
    pub ecx: String,
    pub edx: String,
    pub esi: String,
    pub edi: String,
    pub ebp: String,
    pub esp: String,
    pub eip: String,
    #[serde(rename = "EFlags")]
    pub eflags: String,
    pub cs: String,
    pub ss: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocationEntry
{
    pub file: String,
    pub line: u32,
    pub function: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadEntry
{
    pub id: u32,
    pub suspend_count: u32,
    pub priority: i32,
    pub tls_base: String,
    pub start: String,
    pub stack_base: String,
    pub stack_limit: String,
    pub creation_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleEntry
{
    pub name: String,
    pub base_address: String,
    pub size: u32,
    pub checksum: String,
    pub timestamp: String,
    pub has_tls: bool,
    pub is_xbe: bool,
    pub sections: Vec<SectionEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionEntry
{
    pub name: String,
    pub base_address: String,
    pub size: u32,
    pub index: u32,
    pub flags: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionEntry
{
    pub base_address: String,
    pub size: u32,
    pub protection: String,
}

/// Outcome of one file within an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadEntry
{
    pub success: bool,
    pub local_path: String,
    pub remote_path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolsSummary
{
    pub pdb_path: String,
    pub image_base: String,
    pub functions: usize,
    pub lines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelpEntry
{
    pub command: String,
    pub description: String,
    pub args: Vec<HelpArgument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelpArgument
{
    pub name: String,
    pub description: String,
}

/// Format an address the way every payload does: `0x` and eight uppercase digits.
#[must_use]
pub fn format_address(address: u32) -> String
{
    format!("0x{address:08X}")
}

/// Format bytes as space separated uppercase hex pairs.
#[must_use]
pub fn format_bytes(bytes: &[u8]) -> String
{
    bytes.iter().map(|byte| format!("{byte:02X}")).collect::<Vec<_>>().join(" ")
}
