//! # xbdc Utilities
//!
//! Logging setup shared by the Xbox debug console binaries.

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel, LoggingError, LoggingGuard};
pub use tracing::{debug, error, info, trace, warn};
