//! loadsymbols, functions, locals

use tracing::{debug, warn};
use xbdc_protocol::request::{FunctionArgs, LoadSymbolsArgs, ThreadArgs};
use xbdc_protocol::response::{format_address, format_bytes, FunctionEntry, LocalEntry, ResponsePayload, SymbolsSummary};
use xbdc_protocol::{CommandType, Response};

use super::{select_thread, Dispatcher};
use crate::error::{Result, XbdcError};
use crate::types::Address;

impl Dispatcher
{
    /// Load failures are reported in the response, never as `Err`, so the
    /// message always carries the "Failed to load symbols" prefix.
    pub(super) fn load_symbols(&mut self, args: &LoadSymbolsArgs) -> Response
    {
        let source = match self.loader.open(&args.pdb_path) {
            Ok(source) => source,
            Err(err) => {
                warn!(path = %args.pdb_path.display(), %err, "symbol load failed");
                self.symbols.unload();
                return Response::failure(CommandType::LoadSymbols, format!("Failed to load symbols: {err}"));
            }
        };

        self.symbols.set_image_base(args.image_base.unwrap_or(0));
        let summary = self.symbols.load(source);

        Response::with_payload(
            CommandType::LoadSymbols,
            Some("Symbols loaded.".to_string()),
            ResponsePayload::SymbolsLoaded(SymbolsSummary {
                pdb_path: args.pdb_path.display().to_string(),
                image_base: format_address(self.symbols.image_base()),
                functions: summary.functions,
                lines: summary.lines,
            }),
        )
    }

    pub(super) fn functions(&mut self, args: &FunctionArgs) -> Result<Response>
    {
        if !self.symbols.is_loaded() {
            return Err(XbdcError::SymbolsNotLoaded);
        }

        let entries: Vec<FunctionEntry> = self
            .symbols
            .functions(args.file.as_deref())
            .into_iter()
            .map(|function| FunctionEntry {
                name: function.name,
                rva: format_address(function.rva),
                address: function.address.to_string(),
                length: function.length,
            })
            .collect();

        if entries.is_empty() {
            return Ok(Response::failure(CommandType::Functions, "No functions found in symbols."));
        }
        Ok(Response::with_payload(
            CommandType::Functions,
            None,
            ResponsePayload::Functions(entries),
        ))
    }

    pub(super) fn locals(&mut self, args: &ThreadArgs) -> Result<Response>
    {
        if !self.symbols.is_loaded() {
            return Err(XbdcError::SymbolsNotLoaded);
        }
        let numbering = self.symbols.register_numbering().unwrap_or_default();
        let session = self.session.as_mut().ok_or(XbdcError::NotConnected)?;
        let device = session.device();

        let threads = device.threads()?;
        let thread = select_thread(&threads, args.thread_id)?;
        let context = device.thread_context(thread.id)?;
        let registers = numbering.register_map(&context);

        let locals = self
            .symbols
            .locals(Address::new(context.eip), Address::new(context.ebp), Some(&registers));
        debug!(thread = thread.id, eip = %Address::new(context.eip), count = locals.len(), "locals resolved");

        let entries = locals
            .into_iter()
            .map(|local| {
                let value = local.address.and_then(|address| {
                    let length = usize::try_from(local.size).ok().filter(|length| *length > 0)?;
                    device.read_memory(address, length).ok().map(|bytes| format_bytes(&bytes))
                });
                LocalEntry {
                    location: local.describe_location(numbering),
                    address: local.address.map(|address| address.to_string()),
                    name: local.name,
                    type_name: local.type_name,
                    size: local.size,
                    is_parameter: local.is_parameter,
                    value,
                }
            })
            .collect();

        Ok(Response::with_payload(CommandType::Locals, None, ResponsePayload::Locals(entries)))
    }
}
