//! Platform-agnostic value types shared by the device layer, the symbol
//! engine and the dispatcher.

mod address;
mod device;

pub use address::Address;
pub use device::{
    CommandReply, ConsoleInfo, MemoryProtection, MemoryRegion, ModuleInfo, SectionInfo, ThreadContext, ThreadInfo,
};
