//! read, dump, write, regions

use std::fs;

use tracing::info;
use xbdc_protocol::request::{MemoryDumpArgs, MemoryReadArgs, MemoryWriteArgs};
use xbdc_protocol::response::{MemoryBlock, RegionEntry, ResponsePayload};
use xbdc_protocol::{CommandType, Response};

use super::Dispatcher;
use crate::error::Result;
use crate::types::Address;

impl Dispatcher
{
    pub(super) fn read_memory(&mut self, args: &MemoryReadArgs) -> Result<Response>
    {
        let session = self.session_mut()?;
        let data = session.device().read_memory(Address::new(args.address), args.length)?;
        Ok(Response::with_payload(
            CommandType::ReadMemory,
            None,
            ResponsePayload::Memory(MemoryBlock::new(args.address, &data)),
        ))
    }

    pub(super) fn dump_memory(&mut self, args: &MemoryDumpArgs) -> Result<Response>
    {
        let session = self.session_mut()?;
        let address = Address::new(args.address);
        let data = session.device().read_memory(address, args.length)?;
        fs::write(&args.local_path, &data)?;
        info!(%address, length = data.len(), path = %args.local_path.display(), "memory dumped");
        Ok(Response::success(
            CommandType::DumpMemory,
            format!("Dumped {} bytes from {address} to {}", args.length, args.local_path.display()),
        ))
    }

    pub(super) fn write_memory(&mut self, args: &MemoryWriteArgs) -> Result<Response>
    {
        let session = self.session_mut()?;
        let address = Address::new(args.address);
        session.device().write_memory(address, &args.data)?;
        Ok(Response::success(
            CommandType::WriteMemory,
            format!("Wrote {} bytes to {address}", args.data.len()),
        ))
    }

    pub(super) fn regions(&mut self) -> Result<Response>
    {
        let session = self.session_mut()?;
        let entries: Vec<RegionEntry> = session
            .device()
            .memory_regions()?
            .into_iter()
            .map(|region| RegionEntry {
                base_address: region.base_address.to_string(),
                size: region.size,
                protection: region.protection.to_string(),
            })
            .collect();

        if entries.is_empty() {
            return Ok(Response::failure(CommandType::Regions, "No memory regions found."));
        }
        Ok(Response::with_payload(CommandType::Regions, None, ResponsePayload::Regions(entries)))
    }
}
