//! Kernel page allocation through the `KSEG0` direct map.
//!
//! Kernel virtual address `KSEG0_BASE + pa` aliases physical address `pa`, so
//! a run of frames from the frame table is usable by the kernel without any
//! page-table work.

use crate::CoreMap;
use kernel_info::memory::KSEG0_BASE;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// The direct-mapped kernel address of `pa`.
#[inline]
#[must_use]
pub const fn paddr_to_kvaddr(pa: PhysicalAddress) -> VirtualAddress {
    VirtualAddress::new(pa.as_u64() + KSEG0_BASE)
}

/// The physical address behind direct-mapped kernel address `va`, if `va`
/// lies in the direct map.
#[inline]
#[must_use]
pub const fn kvaddr_to_paddr(va: VirtualAddress) -> Option<PhysicalAddress> {
    match va.as_u64().checked_sub(KSEG0_BASE) {
        Some(pa) => Some(PhysicalAddress::new(pa)),
        None => None,
    }
}

/// Allocate `n` contiguous kernel pages.
pub fn alloc_kpages(map: &mut CoreMap, n: usize) -> Option<VirtualAddress> {
    map.acquire(n).map(|first| paddr_to_kvaddr(first.base()))
}

/// Free the kernel pages starting at `va`. Returns the number of pages freed.
pub fn free_kpages(map: &mut CoreMap, va: VirtualAddress) -> usize {
    match kvaddr_to_paddr(va) {
        Some(pa) => map.release(pa.page()),
        None => {
            log::warn!("vm: free_kpages({va}) outside the direct map");
            0
        }
    }
}
