//! # Frame table ("coremap")
//!
//! One [`FrameEntry`] per frame of usable RAM, in physical order, starting at
//! the first free frame reported at boot.
//!
//! ## Allocation
//!
//! [`CoreMap::acquire`] scans the table once, counting consecutive free
//! frames. The first run of `n` wins: every frame of it gets its occupancy
//! bumped and the leading frame records the span length `n`. There is no free
//! list and no best fit; a linear scan is cheap at this size.
//!
//! ## Release
//!
//! [`CoreMap::release`] reads the span length from the leading frame and walks
//! forward that many frames, dropping each occupancy. Releasing an address
//! that does not lead a live span changes nothing.

use alloc::vec::Vec;
use bitfield_struct::bitfield;
use kernel_info::boot::{RamExtent, RamProbe};
use kernel_memory_addresses::PhysicalPage;
use kernel_vmem::FrameAlloc;

/// Frame table entry.
///
/// | Bits  | Field       | Meaning |
/// |-------|-------------|---------|
/// | 0–11  | `occupancy` | 0 = free, otherwise the number of live spans covering the frame |
/// | 12–31 | `span`      | On the leading frame of a span: its length in frames, else 0 |
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct FrameEntry {
    #[bits(12)]
    pub occupancy: u16,
    #[bits(20)]
    pub span: u32,
}

impl FrameEntry {
    #[inline]
    #[must_use]
    pub const fn is_free(self) -> bool {
        self.occupancy() == 0
    }
}

/// Largest span the entry can describe, and so the largest table.
const MAX_FRAMES: usize = (1 << 20) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CoreMapError {
    /// Not a single whole frame of RAM remains after the kernel image.
    #[error("no usable memory")]
    NoUsableMemory,
    /// More frames than a frame-table entry can index.
    #[error("{0} frames exceed the frame table capacity")]
    TooManyFrames(u64),
}

/// Occupancy snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreMapStats {
    pub total: usize,
    pub free: usize,
    pub used: usize,
    /// Longest run of consecutive free frames, i.e. the largest `n` that
    /// [`CoreMap::acquire`] can currently satisfy.
    pub largest_free_run: usize,
}

pub struct CoreMap {
    first: PhysicalPage,
    entries: Vec<FrameEntry>,
}

impl CoreMap {
    /// A table covering the whole frames of `extent`, all free.
    ///
    /// # Errors
    /// See [`CoreMapError`].
    pub fn new(extent: RamExtent) -> Result<Self, CoreMapError> {
        let extent = extent.frame_aligned().ok_or(CoreMapError::NoUsableMemory)?;
        let frames = extent.len() / kernel_memory_addresses::PAGE_SIZE;
        let count = usize::try_from(frames)
            .ok()
            .filter(|&n| n <= MAX_FRAMES)
            .ok_or(CoreMapError::TooManyFrames(frames))?;

        Ok(Self {
            first: extent.first_free.page(),
            entries: alloc::vec![FrameEntry::new(); count],
        })
    }

    /// Probe RAM once and build the table over what is left after the kernel.
    ///
    /// # Errors
    /// See [`CoreMapError`].
    pub fn bootstrap<P: RamProbe + ?Sized>(probe: &P) -> Result<Self, CoreMapError> {
        let extent = probe.ram_extent();
        let map = Self::new(extent)?;
        log::info!(
            "vm: frame table covers {} frames at {} (RAM {} - {})",
            map.entries.len(),
            map.first,
            extent.first_free,
            extent.last
        );
        Ok(map)
    }

    /// First frame the table manages.
    #[must_use]
    pub const fn first_frame(&self) -> PhysicalPage {
        self.first
    }

    #[must_use]
    pub fn entry(&self, frame: PhysicalPage) -> Option<FrameEntry> {
        self.index_of(frame).map(|i| self.entries[i])
    }

    /// Whether `frame` is managed by this table and currently free.
    #[must_use]
    pub fn is_free(&self, frame: PhysicalPage) -> bool {
        self.entry(frame).is_some_and(FrameEntry::is_free)
    }

    fn index_of(&self, frame: PhysicalPage) -> Option<usize> {
        let idx = frame.number().checked_sub(self.first.number())?;
        usize::try_from(idx).ok().filter(|&i| i < self.entries.len())
    }

    fn frame_at(&self, idx: usize) -> PhysicalPage {
        PhysicalPage::from_number(self.first.number() + idx as u64)
    }

    /// Acquire `n` contiguous free frames and return the first.
    ///
    /// Returns `None` for `n == 0` or if no free run of length `n` exists.
    pub fn acquire(&mut self, n: usize) -> Option<PhysicalPage> {
        if n == 0 || n > MAX_FRAMES {
            return None;
        }

        let mut run = 0;
        for i in 0..self.entries.len() {
            if !self.entries[i].is_free() {
                run = 0;
                continue;
            }

            run += 1;
            if run == n {
                let start = i + 1 - n;
                for e in &mut self.entries[start..=i] {
                    e.set_occupancy(e.occupancy() + 1);
                }
                #[allow(clippy::cast_possible_truncation)]
                self.entries[start].set_span(n as u32);
                return Some(self.frame_at(start));
            }
        }

        log::debug!("vm: no run of {n} free frames");
        None
    }

    /// Release the span led by `first`. Returns the number of frames freed.
    pub fn release(&mut self, first: PhysicalPage) -> usize {
        let Some(start) = self.index_of(first) else {
            log::warn!("vm: release of unmanaged frame {first}");
            return 0;
        };

        let span = self.entries[start].span() as usize;
        if span == 0 {
            log::warn!("vm: release of {first}, which leads no allocation");
            return 0;
        }

        self.entries[start].set_span(0);
        for e in &mut self.entries[start..start + span] {
            debug_assert!(!e.is_free(), "frame in a live span is free");
            e.set_occupancy(e.occupancy().saturating_sub(1));
        }
        span
    }

    #[must_use]
    pub fn stats(&self) -> CoreMapStats {
        let mut free = 0;
        let mut run = 0;
        let mut largest = 0;
        for e in &self.entries {
            if e.is_free() {
                free += 1;
                run += 1;
                largest = largest.max(run);
            } else {
                run = 0;
            }
        }
        CoreMapStats {
            total: self.entries.len(),
            free,
            used: self.entries.len() - free,
            largest_free_run: largest,
        }
    }
}

impl FrameAlloc for CoreMap {
    fn alloc_frames(&mut self, n: usize) -> Option<PhysicalPage> {
        self.acquire(n)
    }

    fn free_frames(&mut self, first: PhysicalPage) {
        self.release(first);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_memory_addresses::PhysicalAddress;

    fn map(frames: u64) -> CoreMap {
        CoreMap::new(RamExtent::new(
            PhysicalAddress::new(0x1_0000),
            PhysicalAddress::new(0x1_0000 + frames * 4096),
        ))
        .unwrap()
    }

    fn occupancy(map: &CoreMap) -> Vec<FrameEntry> {
        map.entries.clone()
    }

    #[test]
    fn acquire_release_restores_state_for_every_size() {
        let mut m = map(12);
        // A held frame in the middle so runs are not trivially at index 0.
        let pin = m.acquire(1).unwrap();
        let before = occupancy(&m);

        for n in 1..=11 {
            let run = m.acquire(n).unwrap();
            assert_eq!(m.stats().used, 1 + n);
            assert_eq!(m.release(run), n);
            assert_eq!(occupancy(&m), before, "n = {n}");
        }
        m.release(pin);
        assert_eq!(m.stats().free, 12);
    }

    #[test]
    fn too_large_requests_fail_deterministically() {
        let mut m = map(8);
        assert!(m.acquire(9).is_none());
        assert!(m.acquire(0).is_none());

        let a = m.acquire(3).unwrap();
        let _b = m.acquire(2).unwrap();
        m.release(a);
        // 3 free at the front and 3 at the back, but never 4 in a row.
        assert_eq!(m.stats().largest_free_run, 3);
        assert!(m.acquire(4).is_none());
        assert!(m.acquire(4).is_none());
        assert_eq!(m.acquire(3), Some(a));
    }

    #[test]
    fn first_fit_returns_lowest_run() {
        let mut m = map(6);
        let a = m.acquire(2).unwrap();
        let b = m.acquire(2).unwrap();
        assert_eq!(a, m.first_frame());
        assert_eq!(b.number(), a.number() + 2);
        m.release(a);
        assert_eq!(m.acquire(1), Some(a));
    }

    #[test]
    fn span_is_recorded_on_leading_frame_only() {
        let mut m = map(4);
        let first = m.acquire(3).unwrap();
        assert_eq!(m.entry(first).unwrap().span(), 3);
        let second = PhysicalPage::from_number(first.number() + 1);
        assert_eq!(m.entry(second).unwrap().span(), 0);
        assert_eq!(m.entry(second).unwrap().occupancy(), 1);

        // Interior frames do not lead a span.
        assert_eq!(m.release(second), 0);
        assert_eq!(m.stats().used, 3);
        assert_eq!(m.release(first), 3);
        assert_eq!(m.release(first), 0);
    }

    #[test]
    fn unmanaged_frames_are_ignored() {
        let mut m = map(2);
        assert_eq!(m.release(PhysicalPage::from_number(0)), 0);
        assert!(m.entry(PhysicalPage::from_number(0x1000)).is_none());
        assert!(!m.is_free(PhysicalPage::from_number(0)));
    }

    #[test]
    fn table_is_sized_from_aligned_extent() {
        let m = CoreMap::new(RamExtent::new(
            PhysicalAddress::new(0x2_0001),
            PhysicalAddress::new(0x2_8000),
        ))
        .unwrap();
        assert_eq!(m.first_frame().base().as_u64(), 0x2_1000);
        assert_eq!(m.stats().total, 7);

        let none = CoreMap::new(RamExtent::new(
            PhysicalAddress::new(0x2_0001),
            PhysicalAddress::new(0x2_1000),
        ));
        assert_eq!(none.err(), Some(CoreMapError::NoUsableMemory));
    }
}
