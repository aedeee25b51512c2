//! Values reported by a console: discovery results, threads, modules,
//! memory regions and thread contexts.

use std::fmt;

use chrono::{DateTime, Utc};

use super::Address;

/// A console answering discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleInfo
{
    pub name: String,
    pub ip: String,
}

impl ConsoleInfo
{
    #[must_use]
    pub fn new(name: impl Into<String>, ip: impl Into<String>) -> Self
    {
        Self {
            name: name.into(),
            ip: ip.into(),
        }
    }
}

/// Reply to a raw debug-monitor command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply
{
    pub success: bool,
    pub message: String,
}

impl CommandReply
{
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self
    {
        Self {
            success: true,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self
    {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInfo
{
    pub id: u32,
    pub suspend_count: u32,
    pub priority: i32,
    pub tls_base: Address,
    pub start: Address,
    pub stack_base: Address,
    pub stack_limit: Address,
    pub creation_time: DateTime<Utc>,
}

/// Full x86 integer context of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThreadContext
{
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
    pub esi: u32,
    pub edi: u32,
    pub ebp: u32,
    pub esp: u32,
    pub eip: u32,
    pub eflags: u32,
    pub seg_cs: u32,
    pub seg_ss: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionInfo
{
    pub name: String,
    pub base: Address,
    pub size: u32,
    pub index: u32,
    pub flags: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo
{
    pub name: String,
    pub base_address: Address,
    pub size: u32,
    pub checksum: u32,
    pub timestamp: DateTime<Utc>,
    pub has_tls: bool,
    pub is_xbe: bool,
    pub sections: Vec<SectionInfo>,
}

/// Page protection flags of a committed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MemoryProtection(u32);

impl MemoryProtection
{
    pub const NO_ACCESS: Self = Self(0x01);
    pub const READ_ONLY: Self = Self(0x02);
    pub const READ_WRITE: Self = Self(0x04);
    pub const WRITE_COPY: Self = Self(0x08);
    pub const EXECUTE: Self = Self(0x10);
    pub const EXECUTE_READ: Self = Self(0x20);
    pub const EXECUTE_READ_WRITE: Self = Self(0x40);
    pub const EXECUTE_WRITE_COPY: Self = Self(0x80);
    pub const GUARD: Self = Self(0x100);
    pub const NO_CACHE: Self = Self(0x200);
    pub const WRITE_COMBINE: Self = Self(0x400);

    const NAMES: [(u32, &'static str); 11] = [
        (0x01, "NoAccess"),
        (0x02, "ReadOnly"),
        (0x04, "ReadWrite"),
        (0x08, "WriteCopy"),
        (0x10, "Execute"),
        (0x20, "ExecuteRead"),
        (0x40, "ExecuteReadWrite"),
        (0x80, "ExecuteWriteCopy"),
        (0x100, "Guard"),
        (0x200, "NoCache"),
        (0x400, "WriteCombine"),
    ];

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self
    {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u32
    {
        self.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self
    {
        Self(self.0 | other.0)
    }
}

/// Flag names joined by `", "`; unnamed bits or an empty set print as hex.
impl fmt::Display for MemoryProtection
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let known = Self::NAMES.iter().fold(0u32, |acc, (bit, _)| acc | *bit);
        if self.0 == 0 || self.0 & !known != 0 {
            return write!(f, "0x{:08X}", self.0);
        }
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(bit, _)| self.0 & bit != 0)
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&names.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion
{
    pub base_address: Address,
    pub size: u32,
    pub protection: MemoryProtection,
}
