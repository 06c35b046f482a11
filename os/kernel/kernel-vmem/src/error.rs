use crate::RegionKind;
use kernel_memory_addresses::VirtualAddress;

/// Errors from the VM core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    /// The frame allocator could not satisfy a request.
    #[error("out of memory")]
    OutOfMemory,
    /// The address lies outside every region of the address space.
    #[error("invalid address {0}")]
    InvalidAddress(VirtualAddress),
    /// A write hit a page that is mapped read-only.
    #[error("write to read-only page at {0}")]
    ReadOnly(VirtualAddress),
    /// The faulting context has no address space (kernel thread).
    #[error("no address space")]
    NoAddressSpace,
    /// A heap or stack region already holds its maximum number of frames.
    #[error("{region:?} physical page limit reached at {address}")]
    PhysicalLimit {
        region: RegionKind,
        address: VirtualAddress,
    },
    /// The fault path needed a frame and the allocator had none.
    #[error("no free frame for page {0}")]
    NoFrame(VirtualAddress),
    /// Every translation-cache slot is valid and there is no eviction.
    #[error("ran out of TLB entries mapping {0}")]
    TlbExhausted(VirtualAddress),
    /// Loading a file-backed page failed.
    #[error("segment load failed: {0}")]
    SegmentLoad(#[from] LoadError),
    /// Both segment slots are already defined.
    #[error("too many regions")]
    TooManyRegions,
    #[error("invalid argument")]
    InvalidArgument,
    /// Heap growth past the heap's virtual limit.
    #[error("heap limit exceeded")]
    HeapLimit,
}

impl VmError {
    /// Whether the error belongs to the fault family, i.e. must terminate the
    /// faulting process rather than be returned to it.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(
            self,
            Self::InvalidAddress(_)
                | Self::ReadOnly(_)
                | Self::NoAddressSpace
                | Self::PhysicalLimit { .. }
                | Self::NoFrame(_)
                | Self::TlbExhausted(_)
                | Self::SegmentLoad(_)
        )
    }
}

/// Errors from reading a segment's backing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The file ended before the segment's file-resident length.
    #[error("short read: expected {expected} bytes, got {read}")]
    ShortRead { expected: usize, read: usize },
    /// The underlying device reported an error.
    #[error("I/O error")]
    Io,
}
