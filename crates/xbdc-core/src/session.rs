//! The live connection to one console.

use crate::breakpoints::BreakpointTable;
use crate::device::Device;

/// Created on connect and dropped on disconnect or reboot, taking its
/// breakpoint table with it.
pub struct Session
{
    device: Box<dyn Device>,
    breakpoints: BreakpointTable,
}

impl Session
{
    #[must_use]
    pub fn new(device: Box<dyn Device>) -> Self
    {
        Self {
            device,
            breakpoints: BreakpointTable::new(),
        }
    }

    /// IP address of the connected console.
    #[must_use]
    pub fn address(&self) -> &str
    {
        self.device.address()
    }

    pub fn device(&mut self) -> &mut dyn Device
    {
        self.device.as_mut()
    }

    #[must_use]
    pub fn breakpoints(&self) -> &BreakpointTable
    {
        &self.breakpoints
    }

    /// The device and the breakpoint table, borrowed together.
    pub fn parts(&mut self) -> (&mut dyn Device, &mut BreakpointTable)
    {
        (self.device.as_mut(), &mut self.breakpoints)
    }
}
