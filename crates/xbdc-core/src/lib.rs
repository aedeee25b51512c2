//! # xbdc-core
//!
//! Everything behind the Xbox debug console's prompt:
//!
//! - The **symbol engine**: file/line to address, address to source line,
//!   function listing and locals of the current function, over any
//!   [`symbols::DebugInfoSource`]. PDB and DWARF loaders ship with the crate.
//! - The **device layer**: the [`device::Connector`] and [`device::Device`]
//!   traits the transport implements, plus an in-memory simulated console.
//! - The **dispatcher**: runs one decoded request against the session and
//!   the symbol engine and always answers with a response.
//!
//! ## Example
//!
//! ```rust
//! use xbdc_core::device::SimulatedConnector;
//! use xbdc_core::Dispatcher;
//! use xbdc_protocol::decode_text;
//!
//! let mut dispatcher = Dispatcher::new(Box::new(SimulatedConnector::demo()));
//! let response = dispatcher.dispatch(decode_text("connect").unwrap());
//! assert!(response.is_success());
//! let response = dispatcher.dispatch(decode_text("read address=0x10000 length=4").unwrap());
//! assert!(response.is_success());
//! ```

pub mod breakpoints;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod notifications;
pub mod session;
pub mod symbols;
pub mod types;

pub use dispatcher::Dispatcher;
pub use error::{Result, XbdcError};
pub use notifications::{Notification, NotificationQueue, NotificationSender};
pub use symbols::SymbolEngine;
pub use types::Address;
