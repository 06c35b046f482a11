use crate::{PAGE_FRAME, PAGE_SHIFT, PAGE_SIZE, PageOffset, VirtualAddress};
use core::fmt;

/// Virtual memory page base.
///
/// A `VirtualPage` represents the **page-aligned base** of a virtual page of
/// [`PAGE_SIZE`] bytes.
///
/// ### Invariants
/// - The low [`PAGE_SHIFT`] bits of the base are always zero.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let va = VirtualAddress::new(0x0040_1234);
/// let vp = va.page();
/// assert_eq!(vp.base().as_u64(), 0x0040_1000);
/// assert_eq!(vp.join(va.offset()), va);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualPage(u64);

impl VirtualPage {
    /// Page that contains `addr` (aligns down to page boundary).
    #[inline]
    #[must_use]
    pub const fn containing_address(addr: VirtualAddress) -> Self {
        Self(addr.as_u64() & PAGE_FRAME)
    }

    /// Page with virtual page number `vpn`.
    #[inline]
    #[must_use]
    pub const fn from_number(vpn: u64) -> Self {
        Self(vpn << PAGE_SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> VirtualAddress {
        VirtualAddress(self.0)
    }

    /// Virtual page number (base >> [`PAGE_SHIFT`]).
    #[inline]
    #[must_use]
    pub const fn number(self) -> u64 {
        self.0 >> PAGE_SHIFT
    }

    #[inline]
    #[must_use]
    pub const fn join(self, off: PageOffset) -> VirtualAddress {
        VirtualAddress(self.0 | off.as_u64())
    }

    /// The page directly above this one, if it exists.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(PAGE_SIZE) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Byte distance from `other` up to this page, if `other` lies below.
    #[inline]
    #[must_use]
    pub const fn distance_from(self, other: VirtualAddress) -> Option<u64> {
        self.0.checked_sub(other.as_u64())
    }
}

impl fmt::Display for VirtualPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.base(), f)
    }
}

impl fmt::Debug for VirtualPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtualPage({:#010X})", self.0)
    }
}

impl TryFrom<VirtualAddress> for VirtualPage {
    type Error = VirtualAddress;

    /// Succeeds only for page-aligned addresses; hands the address back otherwise.
    #[inline]
    fn try_from(va: VirtualAddress) -> Result<Self, VirtualAddress> {
        if va.as_u64() & (PAGE_SIZE - 1) == 0 {
            Ok(va.page())
        } else {
            Err(va)
        }
    }
}
