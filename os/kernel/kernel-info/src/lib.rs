//! # Kernel Configuration and Boot Interface
//!
//! This crate defines the memory layout constants, runtime limits and boot
//! handoff contracts shared by the frame allocator, the virtual-memory core and
//! the process layer. It is the single source of truth for numbers that more
//! than one subsystem has to agree on.
//!
//! ## Architecture
//!
//! ### Memory Layout ([`memory`])
//! Compile-time constants describing the user/kernel split:
//! * **User space** ends at [`memory::USERSPACE_TOP`], which is also where the
//!   user stack starts growing down.
//! * **Kernel direct map** (`KSEG0`) at [`memory::KSEG0_BASE`] maps physical
//!   memory one-to-one, so a kernel virtual address is `KSEG0_BASE + pa`.
//! * **Region limits**: maximal virtual stack and heap extents and the caps on
//!   how many physical frames either may hold.
//!
//! ```text
//! Virtual Address Space Layout (32-bit user view):
//!
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │  Segment A / Segment B          │  (defined by the loader)
//!             ├─────────────────────────────────┤
//!             │  Heap  (grows up, sbrk)         │  ≤ HEAP_LIMIT bytes
//!             │                                 │
//!             │  Stack (grows down on fault)    │  ≤ STACK_LIMIT bytes
//! USERSPACE_TOP├────────────────────────────────┤ 0x8000_0000
//!             │  KSEG0 direct map of RAM        │
//!             └─────────────────────────────────┘
//! ```
//!
//! ### Runtime Configuration ([`config`])
//! [`VmLimits`](config::VmLimits) and [`KernelConfig`](config::KernelConfig)
//! carry the same limits as values, so a kernel context can be booted with
//! tighter caps than the defaults (tests do this to exercise the limit paths).
//!
//! ### Boot Information ([`boot`])
//! The RAM-extent handoff: a [`RamProbe`](boot::RamProbe) reports the usable
//! physical range once, at boot, and the frame table is sized from it.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod boot;
pub mod config;
pub mod memory;
