//! Request validation.
//!
//! [`build_request`] is the single place that decides which arguments a
//! command requires. Both decoders call it, so text and JSON input are
//! accepted or rejected by exactly the same rules.

use std::path::PathBuf;

use tracing::debug;

use crate::arguments::Arguments;
use crate::command::CommandType;
use crate::error::{ProtocolError, ProtocolResult};
use crate::request::{
    BreakpointArgs, ConnectArgs, FunctionArgs, LaunchArgs, LoadSymbolsArgs, MemoryDumpArgs, MemoryReadArgs,
    MemoryWriteArgs, RebootArgs, Request, ScanArgs, ThreadArgs, UploadArgs, DEFAULT_REBOOT_TIMEOUT_MS,
    DEFAULT_TIMEOUT_MS,
};

/// Validate decoded arguments for `command` and produce a typed request.
///
/// Fields the command does not use are ignored.
///
/// ## Errors
///
/// Returns [`ProtocolError::Validation`] naming the missing fields, or
/// [`ProtocolError::UnknownCommand`] for [`CommandType::Unknown`].
pub fn build_request(command: CommandType, args: Arguments) -> ProtocolResult<Request>
{
    let request = match command {
        CommandType::Unknown => return Err(ProtocolError::UnknownCommand),
        CommandType::Scan => Request::Scan(ScanArgs {
            timeout_ms: args.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
        }),
        CommandType::Connect => Request::Connect(ConnectArgs {
            ip: non_empty(args.ip),
            name: non_empty(args.name),
            timeout_ms: args.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
        }),
        CommandType::Reboot => Request::Reboot(RebootArgs {
            auto_reconnect: args.auto_reconnect.unwrap_or(false),
            timeout_ms: args.timeout_ms.unwrap_or(DEFAULT_REBOOT_TIMEOUT_MS),
        }),
        CommandType::LoadSymbols => {
            let pdb_path = non_empty(args.pdb_path)
                .ok_or_else(|| ProtocolError::validation(command, "pdbPath is required for loadsymbols command."))?;
            Request::LoadSymbols(LoadSymbolsArgs {
                pdb_path: PathBuf::from(pdb_path),
                image_base: args.image_base,
            })
        }
        CommandType::Functions => Request::Functions(FunctionArgs {
            file: non_empty(args.file),
        }),
        CommandType::Locals => Request::Locals(thread_args(args.thread_id)),
        CommandType::Registers => Request::Registers(thread_args(args.thread_id)),
        CommandType::SetBreakpoint | CommandType::DeleteBreakpoint => {
            if args.breakpoints.is_empty() {
                return Err(ProtocolError::validation(
                    command,
                    format!("address or file and line are required for {command} command."),
                ));
            }
            let breakpoints = BreakpointArgs {
                breakpoints: args.breakpoints,
            };
            if command == CommandType::SetBreakpoint {
                Request::SetBreakpoint(breakpoints)
            } else {
                Request::DeleteBreakpoint(breakpoints)
            }
        }
        CommandType::ReadMemory => match (args.address, positive_length(args.length)) {
            (Some(address), Some(length)) => Request::ReadMemory(MemoryReadArgs { address, length }),
            _ => {
                return Err(ProtocolError::validation(
                    command,
                    "address and length are required for read command.",
                ))
            }
        },
        CommandType::DumpMemory => match (args.address, positive_length(args.length), non_empty(args.local_path)) {
            (Some(address), Some(length), Some(local_path)) => Request::DumpMemory(MemoryDumpArgs {
                address,
                length,
                local_path: PathBuf::from(local_path),
            }),
            _ => {
                return Err(ProtocolError::validation(
                    command,
                    "address, length and localPath are required for dump command.",
                ))
            }
        },
        CommandType::WriteMemory => match (args.address, args.data.filter(|data| !data.is_empty())) {
            (Some(address), Some(data)) => Request::WriteMemory(MemoryWriteArgs { address, data }),
            _ => {
                return Err(ProtocolError::validation(
                    command,
                    "address and data are required for write command.",
                ))
            }
        },
        CommandType::Upload => {
            if args.transfers.is_empty() {
                return Err(ProtocolError::validation(
                    command,
                    "localPath and remotePath are required for upload command.",
                ));
            }
            Request::Upload(UploadArgs { files: args.transfers })
        }
        CommandType::Launch => {
            let remote_path = non_empty(args.remote_path)
                .ok_or_else(|| ProtocolError::validation(command, "remotePath is required for launch command."))?;
            Request::Launch(LaunchArgs { remote_path })
        }
        CommandType::Disconnect => Request::Disconnect,
        CommandType::Mute => Request::Mute,
        CommandType::Unmute => Request::Unmute,
        CommandType::Pause => Request::Pause,
        CommandType::Resume => Request::Resume,
        CommandType::Threads => Request::Threads,
        CommandType::Modules => Request::Modules,
        CommandType::Regions => Request::Regions,
        CommandType::Quit => Request::Quit,
        CommandType::Help => Request::Help,
    };

    debug!(command = %command, "built request");
    Ok(request)
}

fn non_empty(value: Option<String>) -> Option<String>
{
    value.filter(|text| !text.trim().is_empty())
}

fn positive_length(length: Option<i64>) -> Option<usize>
{
    length.filter(|value| *value > 0).and_then(|value| usize::try_from(value).ok())
}

/// Thread id 0 means "first available", the same as leaving it out.
fn thread_args(thread_id: Option<u32>) -> ThreadArgs
{
    ThreadArgs {
        thread_id: thread_id.filter(|id| *id != 0),
    }
}
