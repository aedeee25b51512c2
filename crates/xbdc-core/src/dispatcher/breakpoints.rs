//! setbreak, deletebreak
//!
//! Both commands take a batch of specs and report one entry per spec. A spec
//! that cannot be resolved or that the device rejects fails on its own; the
//! rest of the batch still runs.

use tracing::debug;
use xbdc_protocol::request::{BreakpointArgs, BreakpointSpec};
use xbdc_protocol::response::{BreakpointEntry, ResponsePayload};
use xbdc_protocol::{CommandType, Response};

use super::Dispatcher;
use crate::error::{Result, XbdcError};
use crate::symbols::SymbolEngine;
use crate::types::Address;

impl Dispatcher
{
    pub(super) fn set_breakpoints(&mut self, args: &BreakpointArgs) -> Result<Response>
    {
        let session = self.session.as_mut().ok_or(XbdcError::NotConnected)?;
        let (device, table) = session.parts();

        let entries = args
            .breakpoints
            .iter()
            .map(|spec| {
                let address = match resolve(spec, &self.symbols) {
                    Ok(address) => address,
                    Err(message) => return entry(spec, None, Err(message)),
                };
                let outcome = device
                    .set_breakpoint(address)
                    .map(|()| {
                        let id = table.insert(address);
                        debug!(%address, id = id.raw(), "breakpoint set");
                        "Breakpoint set.".to_string()
                    })
                    .map_err(|err| err.to_string());
                entry(spec, Some(address), outcome)
            })
            .collect();

        Ok(aggregate(CommandType::SetBreakpoint, entries, "No valid breakpoints provided."))
    }

    pub(super) fn delete_breakpoints(&mut self, args: &BreakpointArgs) -> Result<Response>
    {
        let session = self.session.as_mut().ok_or(XbdcError::NotConnected)?;
        let (device, table) = session.parts();

        let entries = args
            .breakpoints
            .iter()
            .map(|spec| {
                let address = match resolve(spec, &self.symbols) {
                    Ok(address) => address,
                    Err(message) => return entry(spec, None, Err(message)),
                };
                if !table.contains(address) {
                    return entry(spec, Some(address), Err(format!("No breakpoint set at {address}.")));
                }
                let outcome = device
                    .remove_breakpoint(address)
                    .map(|()| {
                        let id = table.remove(address).map(|id| id.raw());
                        debug!(%address, ?id, "breakpoint removed");
                        "Breakpoint removed.".to_string()
                    })
                    .map_err(|err| err.to_string());
                entry(spec, Some(address), outcome)
            })
            .collect();

        Ok(aggregate(CommandType::DeleteBreakpoint, entries, "No breakpoints deleted."))
    }
}

/// Absolute address of a spec. An explicit address always wins and never
/// touches the symbol engine.
fn resolve(spec: &BreakpointSpec, symbols: &SymbolEngine) -> std::result::Result<Address, String>
{
    if let Some(address) = spec.address {
        return Ok(Address::new(address));
    }
    let Some(line) = spec.line.filter(|_| spec.has_source_line()) else {
        return Err("Either address or file and line are required.".to_string());
    };
    if !symbols.is_loaded() {
        return Err("Address is required if symbols are not loaded.".to_string());
    }
    symbols
        .address_for_line(&spec.file, line)
        .ok_or_else(|| format!("No code found at {}:{line}.", spec.file))
}

fn entry(spec: &BreakpointSpec, address: Option<Address>, outcome: std::result::Result<String, String>) -> BreakpointEntry
{
    let (success, message) = match outcome {
        Ok(message) => (true, message),
        Err(message) => (false, message),
    };
    BreakpointEntry {
        success,
        address: address.map(|address| address.to_string()),
        file: spec.file.clone(),
        line: spec.line,
        message: Some(message),
    }
}

/// Success with every entry if any spec succeeded. Otherwise a failure: the
/// lone spec's own message, or `none_message` for a batch.
fn aggregate(command: CommandType, entries: Vec<BreakpointEntry>, none_message: &str) -> Response
{
    if entries.iter().any(|entry| entry.success) {
        return Response::with_payload(command, None, ResponsePayload::Breakpoints(entries));
    }
    match entries.as_slice() {
        [only] => Response::failure(command, only.message.clone().unwrap_or_else(|| none_message.to_string())),
        _ => Response::failure(command, none_message),
    }
}
