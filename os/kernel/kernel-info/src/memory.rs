//! # Memory Layout

use kernel_memory_addresses::PAGE_SIZE;

/// First address above user space. The user stack starts here and grows down.
pub const USERSPACE_TOP: u64 = 0x8000_0000;

/// Initial user stack pointer handed to a freshly loaded program.
pub const USER_STACK: u64 = USERSPACE_TOP;

/// Base of the kernel's direct-mapped window onto physical memory.
///
/// Kernel virtual address `KSEG0_BASE + pa` aliases physical address `pa`.
pub const KSEG0_BASE: u64 = 0x8000_0000;

/// Maximal virtual size of the user stack. Faults in
/// `[USERSPACE_TOP - STACK_LIMIT, USERSPACE_TOP)` belong to the stack.
pub const STACK_LIMIT: u64 = 0x0040_0000; // 4 MiB

/// Maximal virtual size of the user heap.
pub const HEAP_LIMIT: u64 = 0x0100_0000; // 16 MiB

/// Number of physical frames the stack region may hold.
pub const STACK_PHYSICAL_PAGES: usize = 16;

/// Number of physical frames the heap region may hold.
pub const HEAP_PHYSICAL_PAGES: usize = 32;

/// Slots in the software-visible translation cache.
pub const TLB_ENTRIES: usize = 64;

/// Number of process-table slots. Slot 0 is never handed out, so at most
/// `PROCESS_TABLE_SIZE - 1` processes exist at a time.
pub const PROCESS_TABLE_SIZE: usize = 100;

const _: () = {
    assert!(USERSPACE_TOP.is_multiple_of(PAGE_SIZE));
    assert!(STACK_LIMIT.is_multiple_of(PAGE_SIZE));
    assert!(HEAP_LIMIT.is_multiple_of(PAGE_SIZE));
    assert!(STACK_LIMIT < USERSPACE_TOP);
    assert!(STACK_PHYSICAL_PAGES as u64 * PAGE_SIZE <= STACK_LIMIT);
    assert!(HEAP_PHYSICAL_PAGES as u64 * PAGE_SIZE <= HEAP_LIMIT);
    assert!(PROCESS_TABLE_SIZE > 1);
};
