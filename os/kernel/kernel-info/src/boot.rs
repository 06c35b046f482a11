//! # Kernel Boot Information

use kernel_memory_addresses::{PhysicalAddress, align_down, align_up};

/// Usable physical memory reported at boot: `[first_free, last)`.
///
/// `first_free` is the first byte above the kernel image and anything the
/// early boot path already claimed; `last` is one past the highest installed
/// byte of RAM.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RamExtent {
    pub first_free: PhysicalAddress,
    pub last: PhysicalAddress,
}

impl RamExtent {
    #[must_use]
    pub const fn new(first_free: PhysicalAddress, last: PhysicalAddress) -> Self {
        Self { first_free, last }
    }

    /// The extent shrunk to whole frames: start rounded up, end rounded down.
    ///
    /// Returns `None` if not a single whole frame remains.
    #[must_use]
    pub const fn frame_aligned(self) -> Option<Self> {
        let Some(start) = align_up(self.first_free.as_u64()) else {
            return None;
        };
        let end = align_down(self.last.as_u64());
        if start >= end {
            return None;
        }
        Some(Self::new(PhysicalAddress::new(start), PhysicalAddress::new(end)))
    }

    /// Size of the extent in bytes.
    #[must_use]
    pub const fn len(self) -> u64 {
        self.last.as_u64().saturating_sub(self.first_free.as_u64())
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }
}

/// Reports the installed RAM once, at boot.
pub trait RamProbe {
    fn ram_extent(&self) -> RamExtent;
}

/// An extent probed earlier, replayed as-is.
impl RamProbe for RamExtent {
    fn ram_extent(&self) -> RamExtent {
        *self
    }
}
