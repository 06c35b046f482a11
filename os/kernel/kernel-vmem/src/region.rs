//! # Regions
//!
//! A region is a contiguous virtual range with uniform backing. Every address
//! space has exactly four: two loader-defined segments, the heap and the
//! stack. Each region owns its [`PageTable`].

use crate::page_table::PageTable;
use crate::{FRAME_BYTES, FrameAlloc, PhysMapper, SegmentFile, VmError, load_page};
use alloc::sync::Arc;
use bitfield_struct::bitfield;
use core::fmt;
use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, VirtualAddress, VirtualPage};

/// Which of the four regions of an address space.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RegionKind {
    SegmentA,
    SegmentB,
    Heap,
    Stack,
}

impl RegionKind {
    /// Classification order of the fault path.
    pub const ALL: [Self; 4] = [Self::SegmentA, Self::SegmentB, Self::Heap, Self::Stack];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Segments are defined by the loader and may be file-backed.
    #[inline]
    #[must_use]
    pub const fn is_segment(self) -> bool {
        matches!(self, Self::SegmentA | Self::SegmentB)
    }
}

/// Access permissions the loader requested for a segment.
///
/// Recorded for diagnostics only. Every mapping is created read-write.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct SegmentPermissions {
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
    #[bits(5)]
    __: u8,
}

impl SegmentPermissions {
    #[must_use]
    pub const fn rwx(readable: bool, writable: bool, executable: bool) -> Self {
        Self::new()
            .with_readable(readable)
            .with_writable(writable)
            .with_executable(executable)
    }
}

/// The file bytes a segment is initialized from.
///
/// `file_len` bytes of `file`, starting at `offset`, appear at virtual address
/// `vaddr`; the rest of the segment is zero.
#[derive(Clone)]
pub struct SegmentBacking {
    pub file: Arc<dyn SegmentFile>,
    pub offset: u64,
    pub vaddr: VirtualAddress,
    pub file_len: u64,
}

impl fmt::Debug for SegmentBacking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentBacking")
            .field("offset", &self.offset)
            .field("vaddr", &self.vaddr)
            .field("file_len", &self.file_len)
            .finish_non_exhaustive()
    }
}

/// One region of an address space.
#[derive(Debug)]
pub struct Region {
    kind: RegionKind,
    base: VirtualAddress,
    end: VirtualAddress,
    perms: SegmentPermissions,
    backing: Option<SegmentBacking>,
    pages: PageTable,
}

impl Region {
    /// A zero-extent region at address zero.
    #[must_use]
    pub const fn empty(kind: RegionKind) -> Self {
        Self {
            kind,
            base: VirtualAddress::zero(),
            end: VirtualAddress::zero(),
            perms: SegmentPermissions::new(),
            backing: None,
            pages: PageTable::new(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> RegionKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub const fn base(&self) -> VirtualAddress {
        self.base
    }

    /// Exclusive end.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> VirtualAddress {
        self.end
    }

    #[inline]
    #[must_use]
    pub const fn permissions(&self) -> SegmentPermissions {
        self.perms
    }

    #[must_use]
    pub const fn backing(&self) -> Option<&SegmentBacking> {
        self.backing.as_ref()
    }

    /// Attach the file the segment is loaded from on first touch.
    pub fn set_backing(&mut self, backing: SegmentBacking) {
        self.backing = Some(backing);
    }

    #[must_use]
    pub const fn page_table(&self) -> &PageTable {
        &self.pages
    }

    /// Number of pages backed by a frame.
    #[must_use]
    pub fn resident_pages(&self) -> usize {
        self.pages.len()
    }

    /// Half-open containment test against the current extent.
    #[inline]
    #[must_use]
    pub fn contains(&self, va: VirtualAddress) -> bool {
        self.base <= va && va < self.end
    }

    pub(crate) fn set_extent(&mut self, base: VirtualAddress, end: VirtualAddress) {
        debug_assert!(base <= end);
        self.base = base;
        self.end = end;
    }

    pub(crate) const fn set_permissions(&mut self, perms: SegmentPermissions) {
        self.perms = perms;
    }

    /// Lower the base to include `page`. The stack grows this way.
    pub(crate) fn extend_down_to(&mut self, page: VirtualPage) {
        if page.base() < self.base {
            self.base = page.base();
        }
    }

    /// Translate through this region's page table.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        self.pages.translate(va)
    }

    /// Map the page containing `va` to a fresh frame and, for a file-backed
    /// segment, load its bytes.
    ///
    /// On a load failure the frame is released again, leaving the table as it
    /// was.
    ///
    /// # Errors
    /// [`VmError::OutOfMemory`] or [`VmError::SegmentLoad`].
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
        let pa = self.pages.populate(va, frames, phys)?;
        if let Some(backing) = &self.backing
            && let Err(e) = Self::load(backing, va.page(), pa, phys)
        {
            self.pages.release(va.page(), frames);
            return Err(e);
        }
        Ok(pa)
    }

    /// Fill the freshly zeroed frame at `pa` with the file bytes that fall into `page`.
    fn load<M: PhysMapper + ?Sized>(
        backing: &SegmentBacking,
        page: VirtualPage,
        pa: PhysicalAddress,
        phys: &M,
    ) -> Result<(), VmError> {
        let page_start = page.base().as_u64();
        let page_end = page_start + PAGE_SIZE;
        let data_start = backing.vaddr.as_u64();
        let data_end = data_start + backing.file_len;

        let start = page_start.max(data_start);
        let end = page_end.min(data_end);
        if start >= end {
            return Ok(());
        }

        #[allow(clippy::cast_possible_truncation)]
        let (dst_off, len) = ((start - page_start) as usize, (end - start) as usize);
        let file_off = backing.offset + (start - data_start);

        let mut buf = [0_u8; FRAME_BYTES];
        load_page(&*backing.file, file_off, &mut buf[..len], len)?;
        phys.write(pa.page().base() + dst_off as u64, &buf[..len]);
        Ok(())
    }

    /// Unmap pages at or above `end` and release their frames.
    pub(crate) fn release_from<A: FrameAlloc + ?Sized>(
        &mut self,
        end: VirtualAddress,
        frames: &mut A,
    ) -> usize {
        self.pages.release_from(end, frames)
    }

    /// Release every frame and collapse to zero extent.
    pub(crate) fn destroy<A: FrameAlloc + ?Sized>(&mut self, frames: &mut A) -> usize {
        let released = self.pages.release_all(frames);
        self.end = self.base;
        self.backing = None;
        released
    }

    /// Deep copy: same extent and backing, fresh frames with identical bytes.
    ///
    /// On allocator failure every frame acquired for the copy is released
    /// before returning.
    pub(crate) fn duplicate<A, M>(&self, frames: &mut A, phys: &M) -> Result<Self, VmError>
    where
        A: FrameAlloc + ?Sized,
        M: PhysMapper + ?Sized,
    {
        let mut copy = Self {
            kind: self.kind,
            base: self.base,
            end: self.end,
            perms: self.perms,
            backing: self.backing.clone(),
            pages: PageTable::new(),
        };

        for (page, src) in self.pages.iter() {
            let Some(dst) = frames.alloc_4k() else {
                copy.pages.release_all(frames);
                return Err(VmError::OutOfMemory);
            };
            phys.copy_frame(src, dst);
            copy.pages.insert(page, dst);
        }
        Ok(copy)
    }
}
