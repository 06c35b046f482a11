//! # Software-managed translation cache
//!
//! A fixed array of [`TLB_ENTRIES`] slots, each a pair of 32-bit words in the
//! MIPS R3000 layout. The CPU consults it on every user access; a miss traps
//! into [`Pager::resolve_fault`](crate::Pager::resolve_fault), which writes a slot.
//!
//! ### `EntryHi`
//!
//! | Bits  | Field  | Meaning |
//! |-------|--------|---------|
//! | 31–12 | `vpn`  | Virtual page number |
//! | 11–6  | `asid` | Address-space id (unused, always 0) |
//! | 5–0   |        | Reserved |
//!
//! ### `EntryLo`
//!
//! | Bits  | Field     | Meaning |
//! |-------|-----------|---------|
//! | 31–12 | `pfn`     | Physical frame number |
//! | 11    | `nocache` | Uncached access |
//! | 10    | `dirty`   | Writes permitted |
//! | 9     | `valid`   | Slot holds a live translation |
//! | 8     | `global`  | Ignore ASID on match |
//! | 7–0   |           | Reserved |
//!
//! There is no replacement policy: once every slot is valid, installing a new
//! translation fails.

use crate::VmError;
use crate::info::TLB_ENTRIES;
use bitfield_struct::bitfield;
use kernel_memory_addresses::{
    PhysicalAddress, PhysicalPage, VirtualAddress, VirtualPage, is_page_aligned,
};

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct EntryHi {
    #[bits(6)]
    __: u8,
    #[bits(6)]
    pub asid: u8,
    #[bits(20)]
    pub vpn: u32,
}

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct EntryLo {
    #[bits(8)]
    __: u8,
    pub global: bool,
    pub valid: bool,
    pub dirty: bool,
    pub nocache: bool,
    #[bits(20)]
    pub pfn: u32,
}

/// Largest page/frame number a 20-bit field holds.
const MAX_NUMBER: u64 = (1 << 20) - 1;

/// The translation cache.
#[derive(Debug)]
pub struct Tlb {
    slots: [(EntryHi, EntryLo); TLB_ENTRIES],
}

impl Default for Tlb {
    fn default() -> Self {
        Self::new()
    }
}

impl Tlb {
    /// A cache with every slot invalid.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [(EntryHi::new(), EntryLo::new()); TLB_ENTRIES],
        }
    }

    /// Slot index holding a valid translation for `page`.
    #[must_use]
    pub fn probe(&self, page: VirtualPage) -> Option<usize> {
        let vpn = u32::try_from(page.number()).ok()?;
        self.slots
            .iter()
            .position(|(hi, lo)| lo.valid() && hi.vpn() == vpn)
    }

    /// Translate `va` through the cache, as the CPU would.
    #[must_use]
    pub fn lookup(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        let (page, off) = va.split();
        let slot = self.probe(page)?;
        let frame = PhysicalPage::from_number(u64::from(self.slots[slot].1.pfn()));
        Some(frame.join(off))
    }

    /// Install a valid, writable translation `page → frame`.
    ///
    /// Reuses the slot already mapping `page`, otherwise takes the first
    /// invalid slot.
    ///
    /// # Errors
    /// [`VmError::TlbExhausted`] if every slot is valid, or
    /// [`VmError::InvalidAddress`] if either number does not fit a 20-bit field.
    pub fn install(&mut self, page: VirtualPage, frame: PhysicalPage) -> Result<usize, VmError> {
        if page.number() > MAX_NUMBER || frame.number() > MAX_NUMBER {
            return Err(VmError::InvalidAddress(page.base()));
        }

        let slot = match self.probe(page) {
            Some(slot) => slot,
            None => self
                .slots
                .iter()
                .position(|(_, lo)| !lo.valid())
                .ok_or(VmError::TlbExhausted(page.base()))?,
        };

        #[allow(clippy::cast_possible_truncation)]
        let (vpn, pfn) = (page.number() as u32, frame.number() as u32);
        self.slots[slot] = (
            EntryHi::new().with_vpn(vpn),
            EntryLo::new().with_pfn(pfn).with_dirty(true).with_valid(true),
        );
        Ok(slot)
    }

    /// Invalidate the translation for `page`, if cached.
    pub fn invalidate_page(&mut self, page: VirtualPage) -> bool {
        match self.probe(page) {
            Some(slot) => {
                self.slots[slot] = (EntryHi::new(), EntryLo::new());
                true
            }
            None => false,
        }
    }

    /// Invalidate every cached page in `[start, end)`.
    pub fn invalidate_range(&mut self, start: VirtualAddress, end: VirtualAddress) -> usize {
        let (Ok(first), Ok(last)) = (
            u32::try_from(start.page().number()),
            u32::try_from(end.page().number() + u64::from(!is_page_aligned(end.as_u64()))),
        ) else {
            return 0;
        };

        let mut count = 0;
        for (hi, lo) in &mut self.slots {
            if lo.valid() && (first..last).contains(&hi.vpn()) {
                *hi = EntryHi::new();
                *lo = EntryLo::new();
                count += 1;
            }
        }
        count
    }

    /// Invalidate every slot.
    pub fn invalidate_all(&mut self) {
        self.slots = [(EntryHi::new(), EntryLo::new()); TLB_ENTRIES];
    }

    /// Number of valid slots.
    #[must_use]
    pub fn valid_entries(&self) -> usize {
        self.slots.iter().filter(|(_, lo)| lo.valid()).count()
    }

    /// Raw view of slot `index`.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<(EntryHi, EntryLo)> {
        self.slots.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: u64) -> VirtualPage {
        VirtualPage::from_number(n)
    }

    fn frame(n: u64) -> PhysicalPage {
        PhysicalPage::from_number(n)
    }

    #[test]
    fn install_sets_valid_and_dirty() {
        let mut tlb = Tlb::new();
        let slot = tlb.install(page(0x400), frame(0x23)).unwrap();
        let (hi, lo) = tlb.slot(slot).unwrap();
        assert_eq!(hi.vpn(), 0x400);
        assert_eq!(lo.pfn(), 0x23);
        assert!(lo.valid());
        assert!(lo.dirty());
        assert!(!lo.global());
        assert_eq!(lo.into_bits(), 0x23 << 12 | 1 << 10 | 1 << 9);
    }

    #[test]
    fn lookup_keeps_offset() {
        let mut tlb = Tlb::new();
        tlb.install(page(0x400), frame(0x23)).unwrap();
        assert_eq!(
            tlb.lookup(VirtualAddress::new(0x0040_0010)),
            Some(PhysicalAddress::new(0x0002_3010))
        );
        assert_eq!(tlb.lookup(VirtualAddress::new(0x0040_1000)), None);
    }

    #[test]
    fn reinstall_reuses_slot() {
        let mut tlb = Tlb::new();
        let a = tlb.install(page(1), frame(1)).unwrap();
        let b = tlb.install(page(1), frame(2)).unwrap();
        assert_eq!(a, b);
        assert_eq!(tlb.valid_entries(), 1);
    }

    #[test]
    fn full_cache_reports_exhaustion() {
        let mut tlb = Tlb::new();
        for n in 0..TLB_ENTRIES as u64 {
            tlb.install(page(n), frame(n)).unwrap();
        }
        assert_eq!(
            tlb.install(page(999), frame(1)),
            Err(VmError::TlbExhausted(page(999).base()))
        );

        tlb.invalidate_page(page(3));
        assert_eq!(tlb.install(page(999), frame(1)), Ok(3));
    }

    #[test]
    fn invalidate_range_and_all() {
        let mut tlb = Tlb::new();
        for n in 10..20 {
            tlb.install(page(n), frame(n)).unwrap();
        }
        let removed = tlb.invalidate_range(page(12).base(), page(15).base());
        assert_eq!(removed, 3);
        assert!(tlb.probe(page(12)).is_none());
        assert!(tlb.probe(page(15)).is_some());

        tlb.invalidate_all();
        assert_eq!(tlb.valid_entries(), 0);
    }
}
