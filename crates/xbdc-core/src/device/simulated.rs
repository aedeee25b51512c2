//! In-memory console.
//!
//! [`SimulatedConnector`] hands out connections that all share one
//! [`SimulatedState`]. Tests reach into that state to seed memory, threads
//! and modules, to inject faults and to inspect what the dispatcher did.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tracing::debug;

use super::{Connector, Device};
use crate::error::{Result, XbdcError};
use crate::notifications::NotificationSender;
use crate::types::{
    Address, CommandReply, ConsoleInfo, MemoryProtection, MemoryRegion, ModuleInfo, SectionInfo, ThreadContext,
    ThreadInfo,
};

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulatedFault
{
    Discover,
    Connect,
    Command,
    ReadMemory,
    WriteMemory,
    SetBreakpoint,
    RemoveBreakpoint,
    ThreadContext,
    WriteFile,
    /// `magicboot` replies with a timeout, as a console does when the title reboots it.
    LaunchTimeout,
}

impl SimulatedFault
{
    fn message(self) -> &'static str
    {
        match self {
            SimulatedFault::Discover => "Discovery failed: network unreachable.",
            SimulatedFault::Connect => "Connection refused.",
            SimulatedFault::Command => "Command failed.",
            SimulatedFault::ReadMemory => "Memory not accessible.",
            SimulatedFault::WriteMemory => "Memory is read-only.",
            SimulatedFault::SetBreakpoint => "Unable to set breakpoint.",
            SimulatedFault::RemoveBreakpoint => "Unable to remove breakpoint.",
            SimulatedFault::ThreadContext => "Unable to read thread context.",
            SimulatedFault::WriteFile => "Access denied.",
            SimulatedFault::LaunchTimeout => "Command timed out.",
        }
    }
}

/// Everything the simulated console knows.
#[derive(Debug, Default)]
pub struct SimulatedState
{
    pub consoles: Vec<ConsoleInfo>,
    /// Sparse byte map; reads and writes must stay inside mapped bytes.
    pub memory: BTreeMap<u32, u8>,
    pub threads: Vec<ThreadInfo>,
    pub contexts: HashMap<u32, ThreadContext>,
    pub modules: Vec<ModuleInfo>,
    pub regions: Vec<MemoryRegion>,
    pub breakpoints: BTreeSet<Address>,
    pub files: BTreeMap<String, Vec<u8>>,
    pub directories: BTreeSet<String>,
    /// Raw commands received, oldest first.
    pub commands: Vec<String>,
    pub faults: HashSet<SimulatedFault>,
    /// Discovery calls that still miss the console after a reboot.
    pub reboot_discovery_delay: u32,
    offline_polls: u32,
    connected: Option<String>,
    notifications: Option<NotificationSender>,
}

impl SimulatedState
{
    /// Map `bytes` at `address`.
    pub fn map_memory(&mut self, address: u32, bytes: &[u8])
    {
        for (offset, byte) in (0u32..).zip(bytes) {
            self.memory.insert(address.wrapping_add(offset), *byte);
        }
    }

    pub fn add_thread(&mut self, info: ThreadInfo, context: ThreadContext)
    {
        self.contexts.insert(info.id, context);
        self.threads.push(info);
    }

    #[must_use]
    pub fn is_connected(&self) -> bool
    {
        self.connected.is_some()
    }

    /// Push a notification to the connected client, if any.
    pub fn notify(&self, message: impl Into<String>)
    {
        if let Some(sender) = &self.notifications {
            sender.notify(message);
        }
    }

    fn check(&self, fault: SimulatedFault) -> Result<()>
    {
        if self.faults.contains(&fault) {
            return Err(XbdcError::device(fault.message()));
        }
        Ok(())
    }
}

/// Connector for the in-memory console.
#[derive(Debug, Clone, Default)]
pub struct SimulatedConnector
{
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedConnector
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Add a console that answers discovery.
    #[must_use]
    pub fn with_console(self, name: &str, ip: &str) -> Self
    {
        self.lock().consoles.push(ConsoleInfo::new(name, ip));
        self
    }

    /// A console with one title loaded: code and data memory, two threads,
    /// the XBE module and its regions.
    #[must_use]
    pub fn demo() -> Self
    {
        let connector = Self::new().with_console("SimXbox", "192.168.1.100");
        {
            let mut state = connector.lock();
            let code: Vec<u8> = (0u8..=255).collect();
            state.map_memory(0x0001_0000, &code);
            state.map_memory(0xD000_0000, &[0; 0x1000]);

            let created = Utc.with_ymd_and_hms(2004, 11, 9, 8, 0, 0).single().unwrap_or_default();
            for (id, start, stack) in [(1u32, 0x0001_1000u32, 0xD000_1000u32), (2, 0x0001_2000, 0xD000_0800)] {
                state.add_thread(
                    ThreadInfo {
                        id,
                        suspend_count: 0,
                        priority: 8,
                        tls_base: Address::new(stack - 0x100),
                        start: Address::new(start),
                        stack_base: Address::new(stack),
                        stack_limit: Address::new(stack - 0x800),
                        creation_time: created,
                    },
                    ThreadContext {
                        eip: start + 0x10,
                        ebp: stack - 0x20,
                        esp: stack - 0x40,
                        eflags: 0x246,
                        seg_cs: 0x8,
                        seg_ss: 0x10,
                        ..ThreadContext::default()
                    },
                );
            }

            state.modules.push(ModuleInfo {
                name: "default.xbe".to_string(),
                base_address: Address::new(0x0001_0000),
                size: 0x0010_0000,
                checksum: 0x1234_ABCD,
                timestamp: created,
                has_tls: true,
                is_xbe: true,
                sections: vec![
                    SectionInfo {
                        name: ".text".to_string(),
                        base: Address::new(0x0001_1000),
                        size: 0x8_0000,
                        index: 0,
                        flags: 0x6,
                    },
                    SectionInfo {
                        name: ".data".to_string(),
                        base: Address::new(0x0009_1000),
                        size: 0x2_0000,
                        index: 1,
                        flags: 0x1,
                    },
                ],
            });
            state.regions.push(MemoryRegion {
                base_address: Address::new(0x0001_0000),
                size: 0x0010_0000,
                protection: MemoryProtection::EXECUTE_READ,
            });
            state.regions.push(MemoryRegion {
                base_address: Address::new(0xD000_0000),
                size: 0x1000,
                protection: MemoryProtection::READ_WRITE,
            });
        }
        connector
    }

    /// Shared state behind every connection from this connector.
    #[must_use]
    pub fn state(&self) -> Arc<Mutex<SimulatedState>>
    {
        Arc::clone(&self.state)
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedState>
    {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Connector for SimulatedConnector
{
    fn discover(&mut self, timeout: Duration) -> Result<Vec<ConsoleInfo>>
    {
        let mut state = self.lock();
        state.check(SimulatedFault::Discover)?;
        debug!(timeout_ms = timeout.as_millis(), "simulated discovery");
        if state.offline_polls > 0 {
            state.offline_polls -= 1;
            return Ok(Vec::new());
        }
        Ok(state.consoles.clone())
    }

    fn connect(&mut self, ip: &str, notifications: NotificationSender) -> Result<Box<dyn Device>>
    {
        let mut state = self.lock();
        state.check(SimulatedFault::Connect)?;
        if !state.consoles.iter().any(|console| console.ip == ip) {
            return Err(XbdcError::device(format!("Failed to connect to Xbox at {ip}.")));
        }
        state.connected = Some(ip.to_string());
        state.notifications = Some(notifications);
        Ok(Box::new(SimulatedConsole {
            ip: ip.to_string(),
            state: Arc::clone(&self.state),
        }))
    }
}

/// One connection to the simulated console.
struct SimulatedConsole
{
    ip: String,
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedConsole
{
    fn lock(&self) -> MutexGuard<'_, SimulatedState>
    {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Device for SimulatedConsole
{
    fn address(&self) -> &str
    {
        &self.ip
    }

    fn send_command(&mut self, command: &str) -> Result<CommandReply>
    {
        let mut state = self.lock();
        state.commands.push(command.to_string());
        state.check(SimulatedFault::Command)?;

        let verb = command.split_whitespace().next().unwrap_or_default().to_ascii_lowercase();
        match verb.as_str() {
            "reboot" => {
                state.connected = None;
                state.notifications = None;
                state.breakpoints.clear();
                state.offline_polls = state.reboot_discovery_delay;
                Ok(CommandReply::ok("200- OK"))
            }
            "magicboot" if state.faults.contains(&SimulatedFault::LaunchTimeout) => {
                Ok(CommandReply::error(SimulatedFault::LaunchTimeout.message()))
            }
            _ => Ok(CommandReply::ok("200- OK")),
        }
    }

    fn read_memory(&mut self, address: Address, length: usize) -> Result<Vec<u8>>
    {
        let state = self.lock();
        state.check(SimulatedFault::ReadMemory)?;
        (0..length)
            .map(|offset| {
                let at = address + u32::try_from(offset).unwrap_or(u32::MAX);
                state
                    .memory
                    .get(&at.value())
                    .copied()
                    .ok_or_else(|| XbdcError::device(format!("Memory at {at} is not mapped.")))
            })
            .collect()
    }

    fn write_memory(&mut self, address: Address, data: &[u8]) -> Result<()>
    {
        let mut state = self.lock();
        state.check(SimulatedFault::WriteMemory)?;
        for (offset, byte) in (0u32..).zip(data) {
            let at = address + offset;
            match state.memory.get_mut(&at.value()) {
                Some(slot) => *slot = *byte,
                None => return Err(XbdcError::device(format!("Memory at {at} is not mapped."))),
            }
        }
        Ok(())
    }

    fn memory_regions(&mut self) -> Result<Vec<MemoryRegion>>
    {
        Ok(self.lock().regions.clone())
    }

    fn threads(&mut self) -> Result<Vec<ThreadInfo>>
    {
        Ok(self.lock().threads.clone())
    }

    fn modules(&mut self) -> Result<Vec<ModuleInfo>>
    {
        Ok(self.lock().modules.clone())
    }

    fn set_breakpoint(&mut self, address: Address) -> Result<()>
    {
        let mut state = self.lock();
        state.check(SimulatedFault::SetBreakpoint)?;
        state.breakpoints.insert(address);
        Ok(())
    }

    fn remove_breakpoint(&mut self, address: Address) -> Result<()>
    {
        let mut state = self.lock();
        state.check(SimulatedFault::RemoveBreakpoint)?;
        state.breakpoints.remove(&address);
        Ok(())
    }

    fn stop(&mut self) -> Result<CommandReply>
    {
        let reply = self.send_command("stop")?;
        self.lock().notify("execution stopped");
        Ok(reply)
    }

    fn go(&mut self) -> Result<CommandReply>
    {
        let reply = self.send_command("go")?;
        self.lock().notify("execution started");
        Ok(reply)
    }

    fn thread_context(&mut self, thread_id: u32) -> Result<ThreadContext>
    {
        let state = self.lock();
        state.check(SimulatedFault::ThreadContext)?;
        state
            .contexts
            .get(&thread_id)
            .copied()
            .ok_or(XbdcError::ThreadNotFound(thread_id))
    }

    fn write_file(&mut self, remote_path: &str, data: &[u8]) -> Result<()>
    {
        let mut state = self.lock();
        state.check(SimulatedFault::WriteFile)?;
        state.files.insert(remote_path.to_string(), data.to_vec());
        Ok(())
    }

    fn create_directory(&mut self, remote_path: &str) -> Result<()>
    {
        let mut state = self.lock();
        state.check(SimulatedFault::WriteFile)?;
        state.directories.insert(remote_path.to_string());
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()>
    {
        let mut state = self.lock();
        state.connected = None;
        state.notifications = None;
        Ok(())
    }
}
