//! scan, connect, disconnect, reboot

use std::time::Duration;

use tracing::{debug, info};
use xbdc_protocol::request::{ConnectArgs, RebootArgs, ScanArgs};
use xbdc_protocol::response::{ConsoleEntry, ResponsePayload};
use xbdc_protocol::{CommandType, Response};

use super::Dispatcher;
use crate::error::{Result, XbdcError};
use crate::session::Session;

const NO_CONSOLES: &str = "No Xbox consoles found on the network.";

/// Discovery slice used while waiting for a rebooted console.
const REBOOT_POLL_MS: u64 = 1000;

impl Dispatcher
{
    pub(super) fn scan(&mut self, args: &ScanArgs) -> Result<Response>
    {
        let consoles = self.connector.discover(Duration::from_millis(args.timeout_ms))?;
        if consoles.is_empty() {
            return Ok(Response::failure(CommandType::Scan, NO_CONSOLES));
        }
        let entries = consoles
            .into_iter()
            .map(|console| ConsoleEntry {
                name: console.name,
                ip: console.ip,
            })
            .collect();
        Ok(Response::with_payload(CommandType::Scan, None, ResponsePayload::Consoles(entries)))
    }

    pub(super) fn connect(&mut self, args: ConnectArgs) -> Result<Response>
    {
        if self.session.is_some() {
            return Err(XbdcError::AlreadyConnected);
        }

        let ip = match args.ip {
            Some(ip) => ip,
            None => {
                let consoles = self.connector.discover(Duration::from_millis(args.timeout_ms))?;
                if consoles.is_empty() {
                    return Ok(Response::failure(CommandType::Connect, NO_CONSOLES));
                }
                match args.name {
                    Some(name) => match consoles.into_iter().find(|console| console.name.eq_ignore_ascii_case(&name)) {
                        Some(console) => console.ip,
                        None => {
                            return Ok(Response::failure(
                                CommandType::Connect,
                                format!("Xbox with name '{name}' not found on the network."),
                            ))
                        }
                    },
                    None => consoles.into_iter().next().map(|console| console.ip).unwrap_or_default(),
                }
            }
        };

        self.open_session(&ip)?;
        Ok(Response::success(
            CommandType::Connect,
            format!("Successfully connected to Xbox at {ip}."),
        ))
    }

    pub(super) fn disconnect(&mut self) -> Result<Response>
    {
        self.session_mut()?;
        self.drop_session();
        info!("disconnected");
        Ok(Response::success(CommandType::Disconnect, "Disconnected from Xbox."))
    }

    pub(super) fn reboot(&mut self, args: &RebootArgs) -> Result<Response>
    {
        let session = self.session_mut()?;
        let previous_ip = session.address().to_string();
        if let Err(err) = session.device().send_command("reboot") {
            debug!(%err, "reboot command failed; dropping session anyway");
        }
        self.drop_session();
        info!(ip = %previous_ip, "console rebooted");

        if !args.auto_reconnect {
            return Ok(Response::success(
                CommandType::Reboot,
                "Xbox rebooted. Please reconnect when it's back online.",
            ));
        }

        let mut remaining = args.timeout_ms;
        while remaining > 0 {
            remaining = remaining.saturating_sub(REBOOT_POLL_MS);
            let consoles = self.connector.discover(Duration::from_millis(REBOOT_POLL_MS))?;
            if consoles.iter().any(|console| console.ip == previous_ip) {
                return match self.open_session(&previous_ip) {
                    Ok(()) => Ok(Response::success(
                        CommandType::Reboot,
                        "Xbox rebooted and reconnected successfully.",
                    )),
                    Err(err) => Ok(Response::failure(CommandType::Reboot, err.to_string())),
                };
            }
        }

        Ok(Response::failure(
            CommandType::Reboot,
            "Rebooted Xbox found but failed to reconnect within the timeout period.",
        ))
    }

    fn open_session(&mut self, ip: &str) -> Result<()>
    {
        let device = self.connector.connect(ip, self.notifications.sender())?;
        self.session = Some(Session::new(device));
        info!(%ip, "connected");
        Ok(())
    }
}
