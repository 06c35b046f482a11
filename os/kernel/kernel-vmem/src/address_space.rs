//! # Address Space
//!
//! The four regions of one user process and the operations the process layer
//! needs on them as a whole.
//!
//! ## Highlights
//!
//! - [`AddressSpace::define_region`] places the loader's segments;
//!   [`AddressSpace::complete_load`] then positions heap and stack.
//! - [`AddressSpace::classify`] is the fault path's region lookup, including
//!   the implicit stack growth window.
//! - [`AddressSpace::grow_heap`] implements `sbrk`.
//! - [`AddressSpace::duplicate`] deep-copies for fork and never leaks on failure.
//! - [`AddressSpace::destroy`] returns every frame to the allocator.
//!
//! ## Translation cache
//!
//! The cache carries no address-space id. [`AddressSpace::activate`] therefore
//! invalidates every slot, so nothing cached for the previous space survives a
//! switch.

use crate::region::{Region, RegionKind, SegmentPermissions};
use crate::{FrameAlloc, PhysMapper, Tlb, VmError};
use kernel_info::config::VmLimits;
use kernel_info::memory::{USER_STACK, USERSPACE_TOP};
use kernel_memory_addresses::{
    PAGE_SIZE, PhysicalAddress, VirtualAddress, align_down, align_up, is_page_aligned,
};

#[derive(Debug)]
pub struct AddressSpace {
    regions: [Region; 4],
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressSpace {
    /// An address space whose four regions all have zero extent.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            regions: [
                Region::empty(RegionKind::SegmentA),
                Region::empty(RegionKind::SegmentB),
                Region::empty(RegionKind::Heap),
                Region::empty(RegionKind::Stack),
            ],
        }
    }

    #[inline]
    #[must_use]
    pub const fn region(&self, kind: RegionKind) -> &Region {
        &self.regions[kind.index()]
    }

    #[inline]
    pub const fn region_mut(&mut self, kind: RegionKind) -> &mut Region {
        &mut self.regions[kind.index()]
    }

    /// All four regions in classification order.
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// Pages backed by a frame, over all regions.
    #[must_use]
    pub fn resident_pages(&self) -> usize {
        self.regions.iter().map(Region::resident_pages).sum()
    }

    /// Place a loader segment covering `[vaddr, vaddr + size)`, widened to
    /// page boundaries, in the first free segment slot.
    ///
    /// # Errors
    /// [`VmError::TooManyRegions`] if both segment slots are taken, or
    /// [`VmError::InvalidArgument`] if the range leaves user space.
    pub fn define_region(
        &mut self,
        vaddr: VirtualAddress,
        size: u64,
        perms: SegmentPermissions,
    ) -> Result<&mut Region, VmError> {
        let base = align_down(vaddr.as_u64());
        let end = vaddr
            .as_u64()
            .checked_add(size)
            .and_then(align_up)
            .filter(|&end| end <= USERSPACE_TOP)
            .ok_or(VmError::InvalidArgument)?;

        let kind = [RegionKind::SegmentA, RegionKind::SegmentB]
            .into_iter()
            .find(|&k| self.region(k).end().is_null())
            .ok_or(VmError::TooManyRegions)?;

        let region = self.region_mut(kind);
        region.set_extent(VirtualAddress::new(base), VirtualAddress::new(end));
        region.set_permissions(perms);
        log::trace!("vm: {kind:?} defined at [{base:#x}, {end:#x})");
        Ok(region)
    }

    /// Position heap and stack once the segments are defined: the stack at
    /// the top of user space and the heap right after the higher segment,
    /// both with zero extent.
    pub fn complete_load(&mut self) {
        let heap_base = self.region(RegionKind::SegmentA)
            .end()
            .max(self.region(RegionKind::SegmentB).end());
        self.region_mut(RegionKind::Heap).set_extent(heap_base, heap_base);

        let top = VirtualAddress::new(USER_STACK);
        self.region_mut(RegionKind::Stack).set_extent(top, top);
    }

    /// The initial user stack pointer.
    pub fn define_stack(&mut self) -> VirtualAddress {
        let top = VirtualAddress::new(USER_STACK);
        let stack = self.region_mut(RegionKind::Stack);
        if stack.end() != top {
            stack.set_extent(top, top);
        }
        top
    }

    /// Which region `va` belongs to, testing segment A, segment B, heap and
    /// stack in that order.
    ///
    /// The stack matches anywhere in `[end - stack_limit, end)` regardless of
    /// how far it has grown so far.
    #[must_use]
    pub fn classify(&self, va: VirtualAddress, limits: &VmLimits) -> Option<RegionKind> {
        RegionKind::ALL.into_iter().find(|&kind| {
            let region = self.region(kind);
            match kind {
                RegionKind::Stack => {
                    let low = region.end().as_u64().saturating_sub(limits.stack_limit);
                    low <= va.as_u64() && va < region.end()
                }
                _ => region.contains(va),
            }
        })
    }

    /// Translate `va` through the owning region's page table.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress, limits: &VmLimits) -> Option<PhysicalAddress> {
        let kind = self.classify(va, limits)?;
        self.region(kind).translate(va)
    }

    /// Move the heap end by `delta` bytes and return the previous end.
    ///
    /// Shrinking releases every frame at or above the new end.
    ///
    /// # Errors
    /// - [`VmError::InvalidArgument`] if `delta` is not a multiple of the page
    ///   size or the end would drop below the heap base.
    /// - [`VmError::HeapLimit`] unless the grown heap stays strictly below
    ///   `limits.heap_limit`.
    pub fn grow_heap<A: FrameAlloc + ?Sized>(
        &mut self,
        delta: i64,
        limits: &VmLimits,
        frames: &mut A,
    ) -> Result<VirtualAddress, VmError> {
        let heap = self.region_mut(RegionKind::Heap);
        let (base, old_end) = (heap.base(), heap.end());
        if delta == 0 {
            return Ok(old_end);
        }
        if !is_page_aligned(delta.unsigned_abs()) {
            return Err(VmError::InvalidArgument);
        }

        if delta < 0 {
            let new_end = old_end
                .checked_offset(delta)
                .filter(|&end| end >= base)
                .ok_or(VmError::InvalidArgument)?;
            let released = heap.release_from(new_end, frames);
            heap.set_extent(base, new_end);
            log::trace!("vm: heap shrunk to {new_end}, {released} frames released");
        } else {
            let new_end = old_end
                .checked_offset(delta)
                .filter(|end| end.as_u64() - base.as_u64() < limits.heap_limit)
                .ok_or(VmError::HeapLimit)?;
            heap.set_extent(base, new_end);
        }
        Ok(old_end)
    }

    /// Lower the stack base to include the page at `va` after a fault there.
    pub(crate) fn note_stack_growth(&mut self, va: VirtualAddress) {
        self.region_mut(RegionKind::Stack).extend_down_to(va.page());
    }

    /// Deep copy for fork: identical extents, fresh frames, same bytes.
    ///
    /// The source is not modified. If the allocator runs dry part-way, every
    /// frame taken for the copy so far is released before the error returns.
    ///
    /// # Errors
    /// [`VmError::OutOfMemory`].
    pub fn duplicate<A, M>(&self, frames: &mut A, phys: &M) -> Result<Self, VmError>
    where
        A: FrameAlloc + ?Sized,
        M: PhysMapper + ?Sized,
    {
        let mut copy = Self::new();
        for kind in RegionKind::ALL {
            match self.region(kind).duplicate(frames, phys) {
                Ok(region) => *copy.region_mut(kind) = region,
                Err(e) => {
                    let released = copy.destroy(frames);
                    log::warn!("vm: duplicate failed in {kind:?}, {released} frames rolled back");
                    return Err(e);
                }
            }
        }
        Ok(copy)
    }

    /// Release every frame and the address space itself. Returns the number
    /// of frames released.
    pub fn destroy<A: FrameAlloc + ?Sized>(mut self, frames: &mut A) -> usize {
        self.regions.iter_mut().map(|r| r.destroy(frames)).sum()
    }

    /// Make this the active address space: drop every cached translation.
    pub fn activate(&self, tlb: &mut Tlb) {
        tlb.invalidate_all();
    }

    /// Number of virtual pages in the heap's current extent.
    #[must_use]
    pub const fn heap_pages(&self) -> u64 {
        let heap = self.region(RegionKind::Heap);
        (heap.end().as_u64() - heap.base().as_u64()) / PAGE_SIZE
    }
}

impl Drop for AddressSpace {
    fn drop(&mut self) {
        let resident = self.resident_pages();
        if resident != 0 {
            log::warn!("vm: address space dropped with {resident} resident pages, frames leaked");
        }
    }
}
