use crate::{PAGE_FRAME, PAGE_SHIFT, PAGE_SIZE, PageOffset, PhysicalAddress};
use core::fmt;

/// Physical frame base.
///
/// A `PhysicalPage` is the **frame-aligned base** of a [`PAGE_SIZE`] physical
/// frame. Frames are what the frame allocator hands out and what page-table
/// entries point at.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let pa = PhysicalAddress::new(0x0003_0042);
/// let pp = pa.page();
/// assert_eq!(pp.base().as_u64(), 0x0003_0000);
/// assert_eq!(pp.join(pa.offset()), pa);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage(u64);

impl PhysicalPage {
    #[inline]
    #[must_use]
    pub const fn containing_address(addr: PhysicalAddress) -> Self {
        Self(addr.as_u64() & PAGE_FRAME)
    }

    /// Frame with physical frame number `pfn`.
    #[inline]
    #[must_use]
    pub const fn from_number(pfn: u64) -> Self {
        Self(pfn << PAGE_SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress(self.0)
    }

    /// Physical frame number (base >> [`PAGE_SHIFT`]).
    #[inline]
    #[must_use]
    pub const fn number(self) -> u64 {
        self.0 >> PAGE_SHIFT
    }

    #[inline]
    #[must_use]
    pub const fn join(self, off: PageOffset) -> PhysicalAddress {
        PhysicalAddress(self.0 | off.as_u64())
    }
}

impl fmt::Display for PhysicalPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.base(), f)
    }
}

impl fmt::Debug for PhysicalPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalPage({:#010X})", self.0)
    }
}

impl TryFrom<PhysicalAddress> for PhysicalPage {
    type Error = PhysicalAddress;

    #[inline]
    fn try_from(pa: PhysicalAddress) -> Result<Self, PhysicalAddress> {
        if pa.as_u64() & (PAGE_SIZE - 1) == 0 {
            Ok(pa.page())
        } else {
            Err(pa)
        }
    }
}
