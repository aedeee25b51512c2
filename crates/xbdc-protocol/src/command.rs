//! # Command Types
//!
//! The closed set of commands the console understands and the table that maps
//! each one to its canonical name and accepted aliases.
//!
//! The table is the only place a command name is spelled out. Lookups by name
//! go through a map built once on first use; lookups by type go through an
//! exhaustive `match`, so adding a variant without naming it fails to compile.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};

/// Every command the console can execute.
///
/// `Unknown` is not a real command: responses to input that could not be
/// decoded at all are tagged with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType
{
    Unknown,
    Scan,
    Connect,
    Disconnect,
    Reboot,
    Mute,
    Unmute,
    LoadSymbols,
    Functions,
    Locals,
    SetBreakpoint,
    DeleteBreakpoint,
    Pause,
    Resume,
    ReadMemory,
    DumpMemory,
    WriteMemory,
    Threads,
    Registers,
    Modules,
    Regions,
    Upload,
    Launch,
    Quit,
    Help,
}

impl CommandType
{
    /// All executable commands, in help-listing order. `Unknown` is excluded.
    pub const ALL: [CommandType; 24] = [
        CommandType::Scan,
        CommandType::Connect,
        CommandType::Disconnect,
        CommandType::Mute,
        CommandType::Unmute,
        CommandType::LoadSymbols,
        CommandType::SetBreakpoint,
        CommandType::DeleteBreakpoint,
        CommandType::Upload,
        CommandType::Launch,
        CommandType::Reboot,
        CommandType::Threads,
        CommandType::Registers,
        CommandType::Modules,
        CommandType::Regions,
        CommandType::Pause,
        CommandType::Resume,
        CommandType::ReadMemory,
        CommandType::WriteMemory,
        CommandType::DumpMemory,
        CommandType::Quit,
        CommandType::Help,
        CommandType::Functions,
        CommandType::Locals,
    ];

    /// Canonical name used on the wire and in help output.
    #[must_use]
    pub fn name(self) -> &'static str
    {
        self.names()[0]
    }

    /// Canonical name followed by any aliases.
    #[must_use]
    pub const fn names(self) -> &'static [&'static str]
    {
        match self {
            CommandType::Unknown => &["unknown"],
            CommandType::Scan => &["scan"],
            CommandType::Connect => &["connect"],
            CommandType::Disconnect => &["disconnect"],
            CommandType::Reboot => &["reboot"],
            CommandType::Mute => &["mute"],
            CommandType::Unmute => &["unmute"],
            CommandType::LoadSymbols => &["loadsymbols"],
            CommandType::Functions => &["functions"],
            CommandType::Locals => &["locals"],
            CommandType::SetBreakpoint => &["setbreak"],
            CommandType::DeleteBreakpoint => &["deletebreak"],
            CommandType::Pause => &["pause"],
            CommandType::Resume => &["resume"],
            CommandType::ReadMemory => &["read"],
            CommandType::DumpMemory => &["dump"],
            CommandType::WriteMemory => &["write"],
            CommandType::Threads => &["threads"],
            CommandType::Registers => &["registers"],
            CommandType::Modules => &["modules"],
            CommandType::Regions => &["regions"],
            CommandType::Upload => &["upload"],
            CommandType::Launch => &["launch"],
            CommandType::Quit => &["quit", "exit"],
            CommandType::Help => &["help", "?"],
        }
    }

    /// Resolve a command name or alias, ignoring ASCII case.
    ///
    /// `"unknown"` does not resolve: it names the error pseudo-command, not
    /// something a user can run.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self>
    {
        COMMAND_NAMES.get(name.trim().to_ascii_lowercase().as_str()).copied()
    }
}

static COMMAND_NAMES: Lazy<HashMap<&'static str, CommandType>> = Lazy::new(|| {
    let mut table = HashMap::new();
    for command in CommandType::ALL {
        for name in command.names() {
            table.insert(*name, command);
        }
    }
    table
});

impl fmt::Display for CommandType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.name())
    }
}

impl Serialize for CommandType
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}
