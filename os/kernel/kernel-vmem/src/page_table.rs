//! # Per-region page table
//!
//! A key-ordered map from virtual page to physical frame. Each region owns
//! exactly one table and with it every frame the table references: frames
//! enter through [`PageTable::populate`] and leave through
//! [`PageTable::release_from`] / [`PageTable::release_all`].

use crate::{FrameAlloc, PhysMapper, VmError};
use alloc::collections::BTreeMap;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, VirtualAddress, VirtualPage};

#[derive(Debug, Default)]
pub struct PageTable {
    entries: BTreeMap<VirtualPage, PhysicalPage>,
}

impl PageTable {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Translate `va` to its physical address, or `None` on a miss.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        let (page, off) = va.split();
        self.entries.get(&page).map(|frame| frame.join(off))
    }

    /// Map the page containing `va` to a fresh, zeroed frame.
    ///
    /// The page must not be mapped yet.
    ///
    /// # Errors
    /// [`VmError::OutOfMemory`] if the allocator has no free frame.
    pub fn populate<A, M>(
        &mut self,
        va: VirtualAddress,
        frames: &mut A,
        phys: &M,
    ) -> Result<PhysicalAddress, VmError>
    where
        A: FrameAlloc + ?Sized,
        M: PhysMapper + ?Sized,
    {
        let (page, off) = va.split();
        debug_assert!(!self.entries.contains_key(&page), "{page} already mapped");

        let frame = frames.alloc_4k().ok_or(VmError::OutOfMemory)?;
        phys.zero_frame(frame);
        self.entries.insert(page, frame);
        Ok(frame.join(off))
    }

    /// Record an existing mapping. Used when copying tables.
    pub(crate) fn insert(&mut self, page: VirtualPage, frame: PhysicalPage) {
        let prev = self.entries.insert(page, frame);
        debug_assert!(prev.is_none(), "{page} mapped twice");
    }

    /// Unmap `page` and hand its frame back to the allocator.
    pub fn release<A: FrameAlloc + ?Sized>(&mut self, page: VirtualPage, frames: &mut A) -> bool {
        match self.entries.remove(&page) {
            Some(frame) => {
                frames.free_frames(frame);
                true
            }
            None => false,
        }
    }

    /// Unmap every page at or above `end` and release its frame. Returns how
    /// many frames were released.
    pub fn release_from<A: FrameAlloc + ?Sized>(
        &mut self,
        end: VirtualAddress,
        frames: &mut A,
    ) -> usize {
        let mut released = 0;
        self.entries.retain(|page, frame| {
            if page.base() >= end {
                frames.free_frames(*frame);
                released += 1;
                false
            } else {
                true
            }
        });
        released
    }

    /// Unmap everything and release every frame.
    pub fn release_all<A: FrameAlloc + ?Sized>(&mut self, frames: &mut A) -> usize {
        let released = self.entries.len();
        for frame in core::mem::take(&mut self.entries).into_values() {
            frames.free_frames(frame);
        }
        released
    }

    /// Number of resident pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resident mappings in ascending virtual order.
    pub fn iter(&self) -> impl Iterator<Item = (VirtualPage, PhysicalPage)> + '_ {
        self.entries.iter().map(|(&v, &p)| (v, p))
    }
}
