//! # xbdc-protocol
//!
//! The typed command protocol of the Xbox debug console.
//!
//! Input arrives either as a text line (`read address=0x10000 length=4`) or
//! as a JSON object (`{"type":"read","address":"0x10000","length":4}`). Both
//! decoders resolve the command name through one table, read fields through
//! one set of rules and validate through one builder, so the two forms accept
//! and reject exactly the same commands.
//!
//! ## Flow
//!
//! ```text
//! input -> decode_text / decode_json -> Arguments -> build_request -> Request
//! Request -> (dispatcher) -> Response
//! ```
//!
//! A decode or validation failure converts straight into a failed
//! [`Response`] via `From<ProtocolError>`.

pub mod arguments;
pub mod builder;
pub mod command;
pub mod decode;
pub mod error;
pub mod help;
pub mod request;
pub mod response;

pub use builder::build_request;
pub use command::CommandType;
pub use decode::{decode_json, decode_text};
pub use error::{ProtocolError, ProtocolResult};
pub use request::{BreakpointSpec, Request, TransferPair};
pub use response::{Response, ResponsePayload};
