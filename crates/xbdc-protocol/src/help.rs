//! Help catalogue: one description per command plus its arguments.

use crate::arguments::field;
use crate::command::CommandType;
use crate::response::{HelpArgument, HelpEntry};

/// Static help text for one command.
#[derive(Debug, Clone, Copy)]
pub struct HelpTopic
{
    pub description: &'static str,
    pub args: &'static [(&'static str, &'static str)],
}

const BREAKPOINT_ARGS: &[(&str, &str)] = &[
    (field::ADDRESS, "Required if no symbols loaded. Address of the breakpoint."),
    (field::FILE, "Required if no address provided. Source file of the breakpoint."),
    (
        field::LINE,
        "Required if no address provided. Line number in the source file for the breakpoint.",
    ),
];

/// Help text for `command`.
#[must_use]
pub fn help_topic(command: CommandType) -> HelpTopic
{
    let (description, args): (&'static str, &'static [(&'static str, &'static str)]) = match command {
        CommandType::Unknown => ("Not a command.", &[]),
        CommandType::Scan => (
            "Scans the network for available Xbox consoles.",
            &[(
                field::TIMEOUT_MS,
                "Optional. Time in milliseconds to wait for responses. Default is 5000.",
            )],
        ),
        CommandType::Connect => (
            "Connects to an Xbox console by IP address, name, or first available.",
            &[
                (field::IP, "Optional. IP address of the console to connect to."),
                (field::NAME, "Optional. Name of the console to connect to."),
                (
                    field::TIMEOUT_MS,
                    "Optional. Time in milliseconds to wait for connection. Default is 5000.",
                ),
            ],
        ),
        CommandType::Disconnect => ("Disconnects from the currently connected Xbox console.", &[]),
        CommandType::Mute => ("Mutes the notifications from the Xbox.", &[]),
        CommandType::Unmute => ("Unmutes the notifications from the Xbox.", &[]),
        CommandType::LoadSymbols => (
            "Loads symbols from a debug information file for source-level debugging.",
            &[
                (field::PDB_PATH, "Required. Local path to the symbol file."),
                (field::IMAGE_BASE, "Optional. Image base address to load symbols at."),
            ],
        ),
        CommandType::SetBreakpoint => ("Sets breakpoints at specified addresses or source lines.", BREAKPOINT_ARGS),
        CommandType::DeleteBreakpoint => (
            "Deletes breakpoints at specified addresses or source lines.",
            BREAKPOINT_ARGS,
        ),
        CommandType::Upload => (
            "Uploads local files or directories to the Xbox.",
            &[
                (field::LOCAL_PATH, "Required. Local path of the file or directory to upload."),
                (field::REMOTE_PATH, "Required. Remote path on the Xbox to upload to."),
            ],
        ),
        CommandType::Launch => (
            "Launches an application on the Xbox.",
            &[(
                field::REMOTE_PATH,
                "Required. Remote path of the application on the Xbox to launch.",
            )],
        ),
        CommandType::Reboot => (
            "Reboots the Xbox console.",
            &[
                (
                    field::AUTO_RECONNECT,
                    "Optional. Whether to automatically reconnect after reboot. Default is false.",
                ),
                (
                    field::TIMEOUT_MS,
                    "Optional. Time in milliseconds to wait for the console to come back online. Default is 10000.",
                ),
            ],
        ),
        CommandType::Threads => ("Lists all active threads.", &[]),
        CommandType::Registers => (
            "Retrieves the register values for a specific thread.",
            &[(
                field::THREAD_ID,
                "Optional. ID of the thread to get registers for. Default is first available.",
            )],
        ),
        CommandType::Modules => ("Lists all loaded modules.", &[]),
        CommandType::Regions => ("Lists all committed memory regions.", &[]),
        CommandType::Pause => ("Pauses the execution of the program.", &[]),
        CommandType::Resume => ("Resumes the execution of the program.", &[]),
        CommandType::ReadMemory => (
            "Reads memory from the Xbox at a specified address.",
            &[
                (field::ADDRESS, "Required. Address to read memory from."),
                (field::LENGTH, "Required. Number of bytes to read."),
            ],
        ),
        CommandType::WriteMemory => (
            "Writes memory to the Xbox at a specified address.",
            &[
                (field::ADDRESS, "Required. Address to write memory to."),
                (field::DATA, "Required. Hex string of bytes to write."),
            ],
        ),
        CommandType::DumpMemory => (
            "Dumps memory from the Xbox at a specified address to a local file.",
            &[
                (field::ADDRESS, "Required. Address to dump memory from."),
                (field::LENGTH, "Required. Number of bytes to dump."),
                (field::LOCAL_PATH, "Required. Local path to save the dumped memory to."),
            ],
        ),
        CommandType::Quit => ("Quits the application.", &[]),
        CommandType::Help => ("Displays this help message.", &[]),
        CommandType::Functions => (
            "Lists all functions with optional source file filtering.",
            &[(field::FILE, "Optional. Source file to filter functions by.")],
        ),
        CommandType::Locals => (
            "Lists the local variables of the current function for a specific thread.",
            &[(
                field::THREAD_ID,
                "Optional. ID of the thread to get local variables for. Default is first available.",
            )],
        ),
    };
    HelpTopic { description, args }
}

/// The full catalogue in listing order. Aliases are shown as `quit or exit`.
#[must_use]
pub fn help_entries() -> Vec<HelpEntry>
{
    CommandType::ALL
        .iter()
        .map(|command| {
            let topic = help_topic(*command);
            HelpEntry {
                command: command.names().join(" or "),
                description: topic.description.to_owned(),
                args: topic
                    .args
                    .iter()
                    .map(|(name, description)| HelpArgument {
                        name: (*name).to_owned(),
                        description: (*description).to_owned(),
                    })
                    .collect(),
            }
        })
        .collect()
}
