//! # Device Collaborator
//!
//! The console transport (discovery, the debug-monitor connection, memory,
//! process and file-system access) sits behind two traits:
//!
//! - [`Connector`] discovers consoles and opens connections.
//! - [`Device`] is one open connection.
//!
//! The dispatcher only ever talks to these traits. A failure inside the
//! transport comes back as an `Err` whose message is shown to the user as-is.
//!
//! Two implementations ship with the crate: [`OfflineConnector`], which finds
//! nothing, and the in-memory [`SimulatedConnector`].

mod simulated;

use std::time::Duration;

pub use self::simulated::{SimulatedConnector, SimulatedFault, SimulatedState};
use crate::error::{Result, XbdcError};
use crate::notifications::NotificationSender;
use crate::types::{Address, CommandReply, ConsoleInfo, MemoryRegion, ModuleInfo, ThreadContext, ThreadInfo};

/// An open debug-monitor connection to one console.
///
/// ## Lifecycle
///
/// 1. Obtained from [`Connector::connect`].
/// 2. Used for any number of commands.
/// 3. Closed with [`Device::disconnect`], or dropped after a reboot.
pub trait Device: Send
{
    /// IP address the connection was opened to.
    fn address(&self) -> &str;

    /// Send a raw debug-monitor command line.
    fn send_command(&mut self, command: &str) -> Result<CommandReply>;

    fn read_memory(&mut self, address: Address, length: usize) -> Result<Vec<u8>>;

    fn write_memory(&mut self, address: Address, data: &[u8]) -> Result<()>;

    fn memory_regions(&mut self) -> Result<Vec<MemoryRegion>>;

    fn threads(&mut self) -> Result<Vec<ThreadInfo>>;

    fn modules(&mut self) -> Result<Vec<ModuleInfo>>;

    /// Install a breakpoint. Saving and restoring the patched bytes is the
    /// device's business.
    fn set_breakpoint(&mut self, address: Address) -> Result<()>;

    fn remove_breakpoint(&mut self, address: Address) -> Result<()>;

    /// Stop execution of the title.
    fn stop(&mut self) -> Result<CommandReply>;

    /// Resume execution of the title.
    fn go(&mut self) -> Result<CommandReply>;

    fn thread_context(&mut self, thread_id: u32) -> Result<ThreadContext>;

    fn write_file(&mut self, remote_path: &str, data: &[u8]) -> Result<()>;

    /// Create one remote directory. Succeeds if it already exists.
    fn create_directory(&mut self, remote_path: &str) -> Result<()>;

    fn disconnect(&mut self) -> Result<()>;
}

/// Finds consoles and opens connections to them.
pub trait Connector: Send
{
    /// Consoles answering discovery within `timeout`.
    fn discover(&mut self, timeout: Duration) -> Result<Vec<ConsoleInfo>>;

    /// Connect to the console at `ip`. Unsolicited messages from the console
    /// go to `notifications`.
    fn connect(&mut self, ip: &str, notifications: NotificationSender) -> Result<Box<dyn Device>>;
}

/// A connector with no transport: discovery finds nothing and every
/// connection attempt fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineConnector;

impl Connector for OfflineConnector
{
    fn discover(&mut self, _timeout: Duration) -> Result<Vec<ConsoleInfo>>
    {
        Ok(Vec::new())
    }

    fn connect(&mut self, ip: &str, _notifications: NotificationSender) -> Result<Box<dyn Device>>
    {
        Err(XbdcError::device(format!("Failed to connect to Xbox at {ip}: no transport available.")))
    }
}
