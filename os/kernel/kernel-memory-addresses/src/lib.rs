//! # Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for raw memory addresses and page bases used by the
//! frame allocator, the per-region page tables and the fault resolver.
//!
//! ## Overview
//!
//! The VM core only ever deals with one page size: a virtual page and a
//! physical frame are both [`PAGE_SIZE`] bytes. The types here keep the two
//! address kinds apart at compile time while remaining zero-cost wrappers
//! around `u64` values.
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`VirtualAddress`] / [`VirtualPage`] | A user or kernel virtual address, and the page containing it. |
//! | [`PhysicalAddress`] / [`PhysicalPage`] | A physical address, and the frame containing it. |
//! | [`PageOffset`] | The in-page byte offset shared by both. |
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0x0040_0010);
//!
//! // Split into the containing page and the in-page offset
//! let (page, off) = va.split();
//! assert_eq!(page.base().as_u64(), 0x0040_0000);
//! assert_eq!(off.as_u64(), 0x10);
//!
//! // The same offset applied to a physical frame gives the translated address
//! let frame = PhysicalPage::containing_address(PhysicalAddress::new(0x0002_3000));
//! assert_eq!(frame.join(off).as_u64(), 0x0002_3010);
//! ```
//!
//! ## Design Notes
//!
//! - The types are `#[repr(transparent)]` and implement `Copy`, `Eq`, `Ord` and
//!   `Hash`, so pages can be used directly as ordered map keys.
//! - All alignment and offset calculations are `const fn`.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(clippy::inline_always)]

mod page_offset;
mod physical_address;
mod physical_page;
mod virtual_address;
mod virtual_page;

pub use page_offset::PageOffset;
pub use physical_address::PhysicalAddress;
pub use physical_page::PhysicalPage;
pub use virtual_address::VirtualAddress;
pub use virtual_page::VirtualPage;

/// Size of a virtual page and of a physical frame, in bytes.
pub const PAGE_SIZE: u64 = 4096;

/// `log2(PAGE_SIZE)`, i.e. the number of low bits used for the in-page offset.
pub const PAGE_SHIFT: u32 = 12;

/// Mask selecting the page-frame bits of an address.
pub const PAGE_FRAME: u64 = !(PAGE_SIZE - 1);

const _: () = assert!(1 << PAGE_SHIFT == PAGE_SIZE);

/// Align `x` down to the nearest page boundary.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::align_down;
/// assert_eq!(align_down(0), 0);
/// assert_eq!(align_down(4095), 0);
/// assert_eq!(align_down(4096), 4096);
/// assert_eq!(align_down(8191), 4096);
/// ```
#[inline(always)]
#[must_use]
pub const fn align_down(x: u64) -> u64 {
    x & PAGE_FRAME
}

/// Align `x` up to the nearest page boundary.
///
/// Returns `None` if rounding up would overflow `u64`.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::align_up;
/// assert_eq!(align_up(0), Some(0));
/// assert_eq!(align_up(1), Some(4096));
/// assert_eq!(align_up(4096), Some(4096));
/// assert_eq!(align_up(u64::MAX), None);
/// ```
#[inline(always)]
#[must_use]
pub const fn align_up(x: u64) -> Option<u64> {
    match x.checked_add(PAGE_SIZE - 1) {
        Some(v) => Some(v & PAGE_FRAME),
        None => None,
    }
}

/// Whether `x` lies on a page boundary.
#[inline(always)]
#[must_use]
pub const fn is_page_aligned(x: u64) -> bool {
    x & (PAGE_SIZE - 1) == 0
}

/// Number of whole pages needed to hold `bytes` bytes.
#[inline(always)]
#[must_use]
pub const fn pages_for(bytes: u64) -> u64 {
    bytes.div_ceil(PAGE_SIZE)
}
