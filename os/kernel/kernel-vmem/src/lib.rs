//! # Virtual Memory Support
//!
//! Demand-paged virtual memory for a small uniprocessor kernel with a
//! software-managed translation cache.
//!
//! ## What you get
//! - A per-region [`PageTable`] mapping virtual pages to physical frames,
//!   populated lazily by the fault path.
//! - [`Region`]s (two loader-defined segments, heap, stack) aggregated into an
//!   [`AddressSpace`] that can be created, duplicated for fork, activated and
//!   destroyed.
//! - A 64-slot software [`Tlb`] with MIPS-style `EntryHi`/`EntryLo` words.
//! - The page-fault resolver, [`Pager::resolve_fault`].
//! - The segment loader contract, [`SegmentFile`] / [`load_page`].
//! - A tiny allocator/mapper interface ([`FrameAlloc`], [`PhysMapper`]).
//!
//! ## Fault resolution
//!
//! ```text
//!  user access ──► TLB hit? ──yes──► done
//!                     │ no
//!                     ▼
//!              resolve_fault(kind, va)
//!                     │
//!   classify va:  segment A │ segment B │ heap │ stack │ none → InvalidAddress
//!                     │
//!          region page table hit? ──yes──┐
//!                     │ no               │
//!      physical cap (heap/stack) reached? → PhysicalLimit
//!                     │                  │
//!        allocate + zero frame           │
//!        load file bytes (segments)      │
//!                     │                  │
//!                     └──► install TLB entry (or TlbExhausted)
//! ```
//!
//! ## Concurrency
//!
//! Nothing in this crate locks. Callers hold the frame allocator and the TLB
//! behind one critical-section guard (interrupts masked) for the duration of
//! every call that takes them by `&mut`.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code, clippy::inline_always)]

extern crate alloc;

mod address_space;
mod error;
mod fault;
mod page_table;
mod region;
mod segment;
mod tlb;

pub use crate::address_space::AddressSpace;
pub use crate::error::{LoadError, VmError};
pub use crate::fault::{FaultKind, Pager};
pub use crate::page_table::PageTable;
pub use crate::region::{Region, RegionKind, SegmentBacking, SegmentPermissions};
pub use crate::segment::{SegmentFile, load_page};
pub use crate::tlb::{EntryHi, EntryLo, Tlb};

/// Re-export constants as info module.
pub use kernel_info::memory as info;

use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, PhysicalPage};

/// [`PAGE_SIZE`] as a buffer length.
#[allow(clippy::cast_possible_truncation)]
pub const FRAME_BYTES: usize = PAGE_SIZE as usize;

/// One physical frame viewed as bytes.
pub type Frame = [u8; FRAME_BYTES];

/// Source of **physical** 4 KiB frames.
///
/// The implementation decides where frames come from (the frame table in the
/// kernel, a bump cursor in tests). Returned frames **must** be page-aligned.
/// All methods return `None` on out-of-memory rather than panicking.
pub trait FrameAlloc {
    /// Allocate `n` physically contiguous frames and return the first one.
    fn alloc_frames(&mut self, n: usize) -> Option<PhysicalPage>;

    /// Release the span that starts at `first`.
    fn free_frames(&mut self, first: PhysicalPage);

    /// Allocate a single frame.
    #[inline]
    fn alloc_4k(&mut self) -> Option<PhysicalPage> {
        self.alloc_frames(1)
    }
}

/// Converts physical frames to usable references in the current address space.
///
/// Typical patterns:
/// - **Kernel**: the `KSEG0` direct map; adds a constant offset.
/// - **Hosted tests**: a vector of aligned frames standing in for RAM.
///
/// The provided methods are the safe surface the VM core uses. They assume
/// the frames they touch belong to the caller, which holds for every frame
/// reachable from a page table while the VM critical section is held.
pub trait PhysMapper {
    /// Borrow the bytes of `frame`.
    ///
    /// # Safety
    /// - `frame` must be installed RAM that the caller exclusively owns for `'a`.
    /// - No other reference to the same frame may be live for `'a`.
    unsafe fn frame_mut<'a>(&self, frame: PhysicalPage) -> &'a mut Frame;

    /// Fill `frame` with zeros.
    fn zero_frame(&self, frame: PhysicalPage) {
        // SAFETY: see trait docs; the borrow ends before returning.
        unsafe { self.frame_mut(frame) }.fill(0);
    }

    /// Copy all bytes of `src` into `dst`. The frames must differ.
    fn copy_frame(&self, src: PhysicalPage, dst: PhysicalPage) {
        debug_assert_ne!(src, dst, "copy_frame onto itself");
        // SAFETY: distinct frames, both owned by the caller; borrows end here.
        let (s, d) = unsafe { (self.frame_mut(src), self.frame_mut(dst)) };
        d.copy_from_slice(&s[..]);
    }

    /// Read bytes starting at `pa`. The range must not cross a frame boundary.
    fn read(&self, pa: PhysicalAddress, buf: &mut [u8]) {
        let (frame, off) = pa.split();
        let off = off.as_usize();
        // SAFETY: see trait docs; shared use only within this call.
        let bytes = unsafe { self.frame_mut(frame) };
        buf.copy_from_slice(&bytes[off..off + buf.len()]);
    }

    /// Write bytes starting at `pa`. The range must not cross a frame boundary.
    fn write(&self, pa: PhysicalAddress, buf: &[u8]) {
        let (frame, off) = pa.split();
        let off = off.as_usize();
        // SAFETY: see trait docs; the borrow ends before returning.
        let bytes = unsafe { self.frame_mut(frame) };
        bytes[off..off + buf.len()].copy_from_slice(buf);
    }
}
