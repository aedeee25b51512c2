//! # Dispatcher
//!
//! Executes one [`Request`] against the current session and the symbol
//! engine and always produces a [`Response`].
//!
//! Handlers return `Result<Response>`. A handler reports an expected
//! negative outcome (no consoles found, no functions) as a failed
//! `Response`; anything that goes wrong along the way is an `Err`, which
//! [`Dispatcher::dispatch`] turns into a failed `Response` carrying the
//! error's message. Nothing escapes the dispatcher.
//!
//! ## Handler groups
//!
//! - `connection`: scan, connect, disconnect, reboot
//! - `symbols`: loadsymbols, functions, locals
//! - `breakpoints`: setbreak, deletebreak
//! - `memory`: read, dump, write, regions
//! - `process`: pause, resume, threads, registers, modules
//! - `files`: upload, launch

mod breakpoints;
mod connection;
mod files;
mod memory;
mod process;
mod symbols;

use tracing::{debug, warn};
use xbdc_protocol::help::help_entries;
use xbdc_protocol::response::ResponsePayload;
use xbdc_protocol::{CommandType, Request, Response};

use crate::device::Connector;
use crate::error::{Result, XbdcError};
use crate::notifications::NotificationQueue;
use crate::session::Session;
use crate::symbols::{DebugInfoLoader, SymbolEngine, SymbolFileLoader};
use crate::types::ThreadInfo;

/// Owns everything a command can touch: the connector, the optional live
/// session, the symbol engine and the notification queue.
pub struct Dispatcher
{
    connector: Box<dyn Connector>,
    loader: Box<dyn DebugInfoLoader>,
    session: Option<Session>,
    symbols: SymbolEngine,
    notifications: NotificationQueue,
    running: bool,
}

impl Dispatcher
{
    /// A dispatcher using `connector` for devices and PDB or DWARF files for symbols.
    #[must_use]
    pub fn new(connector: Box<dyn Connector>) -> Self
    {
        Self {
            connector,
            loader: Box::new(SymbolFileLoader::new()),
            session: None,
            symbols: SymbolEngine::new(),
            notifications: NotificationQueue::new(),
            running: true,
        }
    }

    #[must_use]
    pub fn with_loader(mut self, loader: Box<dyn DebugInfoLoader>) -> Self
    {
        self.loader = loader;
        self
    }

    #[must_use]
    pub fn symbols(&self) -> &SymbolEngine
    {
        &self.symbols
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationQueue
    {
        &self.notifications
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session>
    {
        self.session.as_ref()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool
    {
        self.session.is_some()
    }

    /// `false` once a quit command has been dispatched.
    #[must_use]
    pub fn is_running(&self) -> bool
    {
        self.running
    }

    /// Execute `request`. Never fails: errors become failed responses.
    pub fn dispatch(&mut self, request: Request) -> Response
    {
        let command = request.command_type();
        debug!(%command, "dispatching");
        match self.handle(request) {
            Ok(response) => response,
            Err(err) => {
                warn!(%command, %err, "command failed");
                Response::failure(command, err.to_string())
            }
        }
    }

    fn handle(&mut self, request: Request) -> Result<Response>
    {
        match request {
            Request::Scan(args) => self.scan(&args),
            Request::Connect(args) => self.connect(args),
            Request::Disconnect => self.disconnect(),
            Request::Reboot(args) => self.reboot(&args),
            Request::Mute => {
                self.notifications.set_muted(true);
                Ok(Response::success(CommandType::Mute, "Notifications muted."))
            }
            Request::Unmute => {
                self.notifications.set_muted(false);
                Ok(Response::success(CommandType::Unmute, "Notifications unmuted."))
            }
            Request::LoadSymbols(args) => Ok(self.load_symbols(&args)),
            Request::Functions(args) => self.functions(&args),
            Request::Locals(args) => self.locals(&args),
            Request::SetBreakpoint(args) => self.set_breakpoints(&args),
            Request::DeleteBreakpoint(args) => self.delete_breakpoints(&args),
            Request::Pause => self.pause(),
            Request::Resume => self.resume(),
            Request::ReadMemory(args) => self.read_memory(&args),
            Request::DumpMemory(args) => self.dump_memory(&args),
            Request::WriteMemory(args) => self.write_memory(&args),
            Request::Threads => self.threads(),
            Request::Registers(args) => self.registers(&args),
            Request::Modules => self.modules(),
            Request::Regions => self.regions(),
            Request::Upload(args) => self.upload(&args),
            Request::Launch(args) => self.launch(&args),
            Request::Quit => {
                self.running = false;
                Ok(Response::success(CommandType::Quit, "Goodbye."))
            }
            Request::Help => Ok(Response::with_payload(
                CommandType::Help,
                None,
                ResponsePayload::Help(help_entries()),
            )),
        }
    }

    fn session_mut(&mut self) -> Result<&mut Session>
    {
        self.session.as_mut().ok_or(XbdcError::NotConnected)
    }

    /// Close the session, ignoring a failing disconnect.
    fn drop_session(&mut self)
    {
        if let Some(mut session) = self.session.take() {
            if let Err(err) = session.device().disconnect() {
                debug!(%err, "disconnect failed while dropping session");
            }
        }
    }
}

/// The thread a `threadId` argument selects: `None` means the first one.
fn select_thread(threads: &[ThreadInfo], thread_id: Option<u32>) -> Result<&ThreadInfo>
{
    match thread_id {
        Some(id) => threads
            .iter()
            .find(|thread| thread.id == id)
            .ok_or(XbdcError::ThreadNotFound(id)),
        None => threads
            .first()
            .ok_or_else(|| XbdcError::device("No threads found in the process.")),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::device::OfflineConnector;

    #[test]
    fn test_quit_stops_the_loop()
    {
        let mut dispatcher = Dispatcher::new(Box::new(OfflineConnector));
        assert!(dispatcher.is_running());
        let response = dispatcher.dispatch(Request::Quit);
        assert!(response.is_success());
        assert_eq!(response.message(), Some("Goodbye."));
        assert!(!dispatcher.is_running());
    }

    #[test]
    fn test_mute_is_idempotent()
    {
        let mut dispatcher = Dispatcher::new(Box::new(OfflineConnector));
        dispatcher.dispatch(Request::Mute);
        let response = dispatcher.dispatch(Request::Mute);
        assert_eq!(response.message(), Some("Notifications muted."));
        assert!(dispatcher.notifications().is_muted());
        dispatcher.dispatch(Request::Unmute);
        assert!(!dispatcher.notifications().is_muted());
    }

    #[test]
    fn test_help_carries_every_command()
    {
        let mut dispatcher = Dispatcher::new(Box::new(OfflineConnector));
        let response = dispatcher.dispatch(Request::Help);
        match response.payload() {
            Some(ResponsePayload::Help(entries)) => assert_eq!(entries.len(), CommandType::ALL.len()),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_select_thread()
    {
        assert!(matches!(select_thread(&[], Some(3)), Err(XbdcError::ThreadNotFound(3))));
        let err = select_thread(&[], None).unwrap_err();
        assert_eq!(err.to_string(), "No threads found in the process.");
    }
}
