//! Register numbering schemes used by debug information.
//!
//! A data symbol names its base register by number, and the number depends
//! on who wrote the debug info: PDBs use CodeView ids, DWARF uses the
//! psABI numbering. The locals query needs a `register id -> value` map in
//! the same numbering as the symbols it resolves.

use std::collections::HashMap;

use crate::types::ThreadContext;

/// 32-bit x86 registers that can anchor a variable location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum X86Register
{
    Eax,
    Ecx,
    Edx,
    Ebx,
    Esp,
    Ebp,
    Esi,
    Edi,
    Eip,
}

impl X86Register
{
    pub const ALL: [X86Register; 9] = [
        X86Register::Eax,
        X86Register::Ecx,
        X86Register::Edx,
        X86Register::Ebx,
        X86Register::Esp,
        X86Register::Ebp,
        X86Register::Esi,
        X86Register::Edi,
        X86Register::Eip,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str
    {
        match self {
            X86Register::Eax => "EAX",
            X86Register::Ecx => "ECX",
            X86Register::Edx => "EDX",
            X86Register::Ebx => "EBX",
            X86Register::Esp => "ESP",
            X86Register::Ebp => "EBP",
            X86Register::Esi => "ESI",
            X86Register::Edi => "EDI",
            X86Register::Eip => "EIP",
        }
    }

    #[must_use]
    pub const fn value_in(self, context: &ThreadContext) -> u32
    {
        match self {
            X86Register::Eax => context.eax,
            X86Register::Ecx => context.ecx,
            X86Register::Edx => context.edx,
            X86Register::Ebx => context.ebx,
            X86Register::Esp => context.esp,
            X86Register::Ebp => context.ebp,
            X86Register::Esi => context.esi,
            X86Register::Edi => context.edi,
            X86Register::Eip => context.eip,
        }
    }
}

/// How register ids are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RegisterNumbering
{
    /// `CV_REG_*` ids, as found in PDBs.
    #[default]
    CodeView,
    /// i386 psABI DWARF register numbers.
    DwarfX86,
}

impl RegisterNumbering
{
    #[must_use]
    pub const fn id(self, register: X86Register) -> u32
    {
        match self {
            RegisterNumbering::CodeView => match register {
                X86Register::Eax => 17,
                X86Register::Ecx => 18,
                X86Register::Edx => 19,
                X86Register::Ebx => 20,
                X86Register::Esp => 21,
                X86Register::Ebp => 22,
                X86Register::Esi => 23,
                X86Register::Edi => 24,
                X86Register::Eip => 33,
            },
            RegisterNumbering::DwarfX86 => match register {
                X86Register::Eax => 0,
                X86Register::Ecx => 1,
                X86Register::Edx => 2,
                X86Register::Ebx => 3,
                X86Register::Esp => 4,
                X86Register::Ebp => 5,
                X86Register::Esi => 6,
                X86Register::Edi => 7,
                X86Register::Eip => 8,
            },
        }
    }

    /// Register with the given id, if it is one we track.
    #[must_use]
    pub fn register(self, id: u32) -> Option<X86Register>
    {
        X86Register::ALL.into_iter().find(|register| self.id(*register) == id)
    }

    /// Map every tracked register id to its value in `context`.
    #[must_use]
    pub fn register_map(self, context: &ThreadContext) -> HashMap<u32, u32>
    {
        X86Register::ALL
            .into_iter()
            .map(|register| (self.id(register), register.value_in(context)))
            .collect()
    }
}
