//! # Error Types
//!
//! Errors raised while turning raw input into a [`crate::Request`].
//!
//! Two families exist. Decode errors mean the input could not be read as a
//! command at all; the response to them is tagged `unknown`. Validation errors
//! mean the command was recognised but its arguments were not acceptable; the
//! response carries the attempted command.

use thiserror::Error;

use crate::command::CommandType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError
{
    /// Blank input line.
    #[error("Input cannot be empty.")]
    EmptyInput,

    /// The leading token or `command`/`type` field named no known command.
    #[error("Unknown command.")]
    UnknownCommand,

    /// Structured input was not a JSON object.
    #[error("Invalid JSON input.")]
    InvalidJson,

    /// Structured input had no `command`/`type` field.
    #[error("Command field is required.")]
    MissingCommand,

    /// A text argument was not of the form `name=value`.
    #[error("Malformed argument '{0}'; expected name=value.")]
    MalformedArgument(String),

    /// The command was recognised but required arguments were missing or invalid.
    #[error("{message}")]
    Validation
    {
        command: CommandType,
        message: String,
    },
}

impl ProtocolError
{
    pub(crate) fn validation(command: CommandType, message: impl Into<String>) -> Self
    {
        Self::Validation {
            command,
            message: message.into(),
        }
    }

    /// Command the failure response should be tagged with.
    #[must_use]
    pub fn command_type(&self) -> CommandType
    {
        match self {
            Self::Validation { command, .. } => *command,
            _ => CommandType::Unknown,
        }
    }
}

pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;
