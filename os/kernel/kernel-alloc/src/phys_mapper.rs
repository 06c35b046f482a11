//! # Simulated physical memory
//!
//! [`SimulatedRam`] is the [`PhysMapper`] for hosted runs. Physical memory is
//! a vector of 4 KiB aligned frames and a physical address is a byte offset
//! into it. It also answers the boot-time [`RamProbe`], so a whole kernel
//! context can be brought up in a unit test. The target port supplies its own
//! mapper over the `KSEG0` direct map.

use alloc::vec::Vec;
use core::cell::UnsafeCell;
use kernel_info::boot::{RamExtent, RamProbe};
use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, PhysicalPage};
use kernel_vmem::{FRAME_BYTES, Frame, PhysMapper};

/// A 4 KiB-aligned raw frame.
#[repr(align(4096))]
struct Aligned4K(Frame);

/// Physical memory simulated by a vector of frames.
pub struct SimulatedRam {
    frames: Vec<UnsafeCell<Aligned4K>>,
    first_free: PhysicalAddress,
}

// SAFETY: frames are only touched through `PhysMapper`, whose contract gives
// the caller exclusive ownership of the frame for the borrow. The kernel
// upholds that by accessing frames only under the VM critical section.
unsafe impl Sync for SimulatedRam {}

impl SimulatedRam {
    /// `frames` zeroed frames at physical addresses `0..frames * 4096`, all usable.
    #[must_use]
    pub fn new(frames: usize) -> Self {
        Self {
            frames: (0..frames)
                .map(|_| UnsafeCell::new(Aligned4K([0; FRAME_BYTES])))
                .collect(),
            first_free: PhysicalAddress::zero(),
        }
    }

    /// Pretend the first `bytes` bytes hold the kernel image. The value need
    /// not be page-aligned.
    #[must_use]
    pub const fn with_kernel_image(mut self, bytes: u64) -> Self {
        self.first_free = PhysicalAddress::new(bytes);
        self
    }

    /// Installed size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.frames.len() as u64 * PAGE_SIZE
    }
}

impl RamProbe for SimulatedRam {
    fn ram_extent(&self) -> RamExtent {
        RamExtent::new(self.first_free, PhysicalAddress::new(self.size()))
    }
}

impl PhysMapper for SimulatedRam {
    unsafe fn frame_mut<'a>(&self, frame: PhysicalPage) -> &'a mut Frame {
        let idx = usize::try_from(frame.number()).unwrap_or(usize::MAX);
        let Some(cell) = self.frames.get(idx) else {
            panic!("{frame} is beyond simulated RAM ({} bytes)", self.size());
        };
        // SAFETY: the caller owns the frame exclusively for 'a (trait contract),
        // and the vector is never resized.
        unsafe { &mut (*cell.get()).0 }
    }
}
