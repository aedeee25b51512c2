//! Breakpoint bookkeeping for one session.
//!
//! The device patches and restores code. This table only remembers which
//! absolute addresses currently carry a breakpoint: an entry exists from the
//! moment the device accepts `set_breakpoint` until it accepts
//! `remove_breakpoint`.

use std::collections::BTreeMap;

use crate::types::Address;

/// Session-unique breakpoint number, assigned in set order starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BreakpointId(u64);

impl BreakpointId
{
    #[must_use]
    pub const fn raw(self) -> u64
    {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct BreakpointTable
{
    next_id: u64,
    by_address: BTreeMap<Address, BreakpointId>,
}

impl BreakpointTable
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Track a breakpoint the device has accepted. Setting the same address
    /// twice keeps the original id.
    pub fn insert(&mut self, address: Address) -> BreakpointId
    {
        let next_id = &mut self.next_id;
        *self.by_address.entry(address).or_insert_with(|| {
            *next_id = next_id.wrapping_add(1);
            BreakpointId(*next_id)
        })
    }

    #[must_use]
    pub fn contains(&self, address: Address) -> bool
    {
        self.by_address.contains_key(&address)
    }

    pub fn remove(&mut self, address: Address) -> Option<BreakpointId>
    {
        self.by_address.remove(&address)
    }

    #[must_use]
    pub fn len(&self) -> usize
    {
        self.by_address.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.by_address.is_empty()
    }
}
