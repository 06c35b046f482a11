//! # Page-fault resolution
//!
//! Runs once per access the translation cache could not satisfy. The caller
//! holds the VM critical section (interrupts masked) for the whole call, so
//! the steps below are atomic with respect to every other VM operation.
//!
//! 1. Read-only violations fail: every mapping is created writable, so a
//!    write to a read-only page can only be a stale or corrupt translation.
//! 2. Without an address space (a kernel thread) the fault fails.
//! 3. The page is classified against segment A, segment B, heap and stack.
//! 4. A page-table hit goes straight to step 6.
//! 5. On a miss, heap and stack pages are subject to a resident-frame cap.
//!    A fresh frame is zeroed and, for file-backed segments, loaded.
//! 6. The translation is installed in the cache.

use crate::region::RegionKind;
use crate::{AddressSpace, FrameAlloc, PhysMapper, Tlb, VmError};
use kernel_info::config::VmLimits;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// The access that missed the translation cache.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FaultKind {
    Read,
    Write,
    /// A write to a page whose cached translation is not dirty.
    ReadOnly,
}

/// Everything the fault path mutates besides the address space itself.
pub struct Pager<'a, A: FrameAlloc + ?Sized, M: PhysMapper + ?Sized> {
    pub frames: &'a mut A,
    pub phys: &'a M,
    pub tlb: &'a mut Tlb,
    pub limits: &'a VmLimits,
}

impl<A: FrameAlloc + ?Sized, M: PhysMapper + ?Sized> Pager<'_, A, M> {
    /// Resolve a fault at `va` and return the physical address it now maps to.
    ///
    /// # Errors
    /// A [`VmError`] for which [`VmError::is_fault`] holds; running out of
    /// frames is [`VmError::NoFrame`].
    pub fn resolve_fault(
        &mut self,
        aspace: Option<&mut AddressSpace>,
        kind: FaultKind,
        va: VirtualAddress,
    ) -> Result<PhysicalAddress, VmError> {
        let result = self.resolve(aspace, kind, va);
        match &result {
            Ok(pa) => log::trace!("vm: fault {va} ({kind:?}) -> {pa}"),
            Err(VmError::TlbExhausted(_)) => log::error!("vm: ran out of TLB entries at {va}"),
            Err(e) => log::warn!("vm: fault {va} ({kind:?}) failed: {e}"),
        }
        result
    }

    fn resolve(
        &mut self,
        aspace: Option<&mut AddressSpace>,
        kind: FaultKind,
        va: VirtualAddress,
    ) -> Result<PhysicalAddress, VmError> {
        let page = va.page();
        if kind == FaultKind::ReadOnly {
            return Err(VmError::ReadOnly(page.base()));
        }

        let aspace = aspace.ok_or(VmError::NoAddressSpace)?;
        let region_kind = aspace
            .classify(page.base(), self.limits)
            .ok_or(VmError::InvalidAddress(va))?;

        let pa = if let Some(pa) = aspace.region(region_kind).translate(page.base()) {
            pa
        } else {
            let cap = match region_kind {
                RegionKind::Heap => Some(self.limits.heap_physical_pages),
                RegionKind::Stack => Some(self.limits.stack_physical_pages),
                RegionKind::SegmentA | RegionKind::SegmentB => None,
            };
            if let Some(cap) = cap
                && aspace.region(region_kind).resident_pages() >= cap
            {
                return Err(VmError::PhysicalLimit {
                    region: region_kind,
                    address: page.base(),
                });
            }

            let pa = aspace
                .region_mut(region_kind)
                .populate(page.base(), &mut *self.frames, self.phys)
                .map_err(|e| match e {
                    VmError::OutOfMemory => VmError::NoFrame(page.base()),
                    other => other,
                })?;
            if region_kind == RegionKind::Stack {
                aspace.note_stack_growth(page.base());
            }
            pa
        };

        self.tlb.install(page, pa.page())?;
        Ok(pa.page().join(va.offset()))
    }
}
