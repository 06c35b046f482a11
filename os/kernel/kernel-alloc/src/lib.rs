//! # Kernel Memory Allocation
//!
//! Physical memory for the VM core: the frame table that hands out frames,
//! kernel-page allocation through the direct map, and the simulated RAM that
//! turns a frame into bytes in hosted runs.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │        Kernel pages (alloc_kpages / free_kpages)    │
//! │    • n contiguous frames seen through KSEG0         │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │              Frame table (coremap)                  │
//! │    • one entry per frame of usable RAM              │
//! │    • first-fit linear scan for contiguous runs      │
//! │    • span length recorded on the leading frame      │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │              Physical mapper                        │
//! │    • KSEG0 direct map on the target port            │
//! │    • simulated RAM for hosted runs                  │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! The frame table has no lock of its own. The kernel keeps it behind the VM
//! critical-section guard, which masks interrupts; that is the only mutual
//! exclusion physical memory gets, and on a single execution context it is
//! sufficient.
//!
//! ## Usage
//! ```rust
//! use kernel_alloc::frame_alloc::CoreMap;
//! use kernel_alloc::phys_mapper::SimulatedRam;
//!
//! let ram = SimulatedRam::new(16).with_kernel_image(2 * 4096);
//! let mut coremap = CoreMap::bootstrap(&ram).unwrap();
//! assert_eq!(coremap.stats().total, 14);
//!
//! let run = coremap.acquire(3).unwrap();
//! assert_eq!(coremap.stats().used, 3);
//! coremap.release(run);
//! assert_eq!(coremap.stats().used, 0);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

pub mod frame_alloc;
pub mod kpages;
pub mod phys_mapper;

pub use frame_alloc::{CoreMap, CoreMapError, CoreMapStats};
pub use phys_mapper::SimulatedRam;
