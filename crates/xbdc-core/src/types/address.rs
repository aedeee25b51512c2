//! Console address type.

use std::fmt;
use std::ops::{Add, Sub};

/// A 32-bit address in the console's address space.
///
/// The console is a 32-bit machine, so every absolute address and every
/// module-relative address fits in a `u32`. Arithmetic wraps, which keeps
/// `(a - base) + base == a` true for every `a` and `base`.
///
/// ## Example
///
/// ```rust
/// use xbdc_core::types::Address;
///
/// let addr = Address::new(0x0001_0000);
/// assert_eq!((addr + 0x10).value(), 0x0001_0010);
/// assert_eq!(addr.to_string(), "0x00010000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u32);

impl Address
{
    pub const ZERO: Self = Address(0);

    #[must_use]
    pub const fn new(value: u32) -> Self
    {
        Address(value)
    }

    #[must_use]
    pub const fn value(self) -> u32
    {
        self.0
    }

    /// Offset by a signed displacement, wrapping on overflow.
    #[must_use]
    pub const fn offset(self, displacement: i32) -> Self
    {
        Address(self.0.wrapping_add_signed(displacement))
    }

    #[must_use]
    pub fn checked_add(self, offset: u32) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }
}

impl From<u32> for Address
{
    fn from(value: u32) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u32
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:08X}", self.0)
    }
}

impl Add<u32> for Address
{
    type Output = Address;

    fn add(self, rhs: u32) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u32> for Address
{
    type Output = Address;

    fn sub(self, rhs: u32) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}
