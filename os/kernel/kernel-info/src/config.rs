//! # Runtime Limits
//!
//! The layout constants in [`memory`](crate::memory) as a value, so a kernel
//! instance can be brought up with tighter bounds than the compiled defaults.

use crate::memory::{
    HEAP_LIMIT, HEAP_PHYSICAL_PAGES, PROCESS_TABLE_SIZE, STACK_LIMIT, STACK_PHYSICAL_PAGES,
};

/// Per-address-space growth limits.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VmLimits {
    /// Maximal virtual stack size in bytes, measured down from the top of user space.
    pub stack_limit: u64,
    /// Maximal virtual heap size in bytes, measured up from the heap base.
    pub heap_limit: u64,
    /// Cap on resident stack frames.
    pub stack_physical_pages: usize,
    /// Cap on resident heap frames.
    pub heap_physical_pages: usize,
}

impl VmLimits {
    /// The compiled-in limits.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stack_limit: STACK_LIMIT,
            heap_limit: HEAP_LIMIT,
            stack_physical_pages: STACK_PHYSICAL_PAGES,
            heap_physical_pages: HEAP_PHYSICAL_PAGES,
        }
    }

    /// Same limits with a different heap frame cap.
    #[must_use]
    pub const fn with_heap_physical_pages(mut self, pages: usize) -> Self {
        self.heap_physical_pages = pages;
        self
    }

    /// Same limits with a different stack frame cap.
    #[must_use]
    pub const fn with_stack_physical_pages(mut self, pages: usize) -> Self {
        self.stack_physical_pages = pages;
        self
    }
}

impl Default for VmLimits {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a kernel context needs to know at boot besides the RAM extent.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct KernelConfig {
    pub limits: VmLimits,
    /// Number of process-table slots, including the reserved slot 0.
    pub process_slots: usize,
}

impl KernelConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            limits: VmLimits::new(),
            process_slots: PROCESS_TABLE_SIZE,
        }
    }

    #[must_use]
    pub const fn with_limits(mut self, limits: VmLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub const fn with_process_slots(mut self, slots: usize) -> Self {
        self.process_slots = slots;
        self
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new()
    }
}
