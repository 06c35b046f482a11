//! # Kernel
//!
//! The kernel context: one owned object holding the frame table, the
//! translation cache, the process table and the configuration, handed to
//! every kernel entry instead of living in globals.
//!
//! ## Entry points
//!
//! | Trap path                    | Method                                   |
//! |------------------------------|------------------------------------------|
//! | TLB miss / protection fault  | [`Kernel::vm_fault`]                     |
//! | `syscall` instruction        | [`Kernel::syscall`]                      |
//! | first run of a forked child  | [`Kernel::enter_forked_child`]           |
//! | thread exit                  | [`Kernel::exit`]                         |
//!
//! ## Locking
//!
//! There are two locks, both taken through `lock_irq` so that holding one
//! means interrupts are masked. They are never nested:
//!
//! - the VM core ([`VmCore`]): frame table and translation cache, and with
//!   them every page-table mutation of the calling thread's address space,
//! - the process table.
//!
//! A waiter blocks on its exit signal with neither lock held.
//!
//! ## Example
//! ```rust
//! use kernel::Kernel;
//! use kernel_alloc::SimulatedRam;
//! use kernel_info::boot::RamProbe;
//! use kernel_info::config::KernelConfig;
//! use kernel_memory_addresses::VirtualAddress;
//! use kernel_sync::SoftInterrupts;
//! use kernel_vmem::SegmentPermissions;
//!
//! let ram = SimulatedRam::new(64);
//! let extent = ram.ram_extent();
//! let kernel = Kernel::boot(&extent, ram, SoftInterrupts::new(), KernelConfig::default())?;
//!
//! let mut init = kernel.create_process()?;
//! let aspace = kernel.replace_address_space(&mut init);
//! aspace.define_region(VirtualAddress::new(0x0040_0000), 0x2000, SegmentPermissions::rwx(true, false, true))?;
//! aspace.complete_load();
//! let sp = aspace.define_stack();
//! assert_eq!(sp, VirtualAddress::new(kernel_info::memory::USER_STACK));
//!
//! let heap = kernel.sbrk(&mut init, 4096)?;
//! kernel.copy_out(&mut init, heap, b"hello")?;
//!
//! let mut back = [0_u8; 5];
//! kernel.copy_in(&mut init, heap, &mut back)?;
//! assert_eq!(&back, b"hello");
//! kernel.exit(init, 0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod error;
mod page_fault;
mod process;
mod syscall;
mod task;
mod tracing;
mod usercopy;
mod vm;

pub use error::ProcessError;
pub use process::{Pid, ProcessTable};
pub use syscall::SyscallOutcome;
pub use task::{ForkedChild, Scheduler, Thread};
pub use vm::VmCore;

use kernel_alloc::{CoreMap, CoreMapError, CoreMapStats, kpages};
use kernel_info::boot::RamProbe;
use kernel_info::config::KernelConfig;
use kernel_memory_addresses::VirtualAddress;
use kernel_sync::{InterruptMask, IrqMutex, RawSpin, SpinMutex};
use kernel_vmem::{AddressSpace, PhysMapper};

pub struct Kernel<M, I> {
    vm: SpinMutex<VmCore>,
    procs: SpinMutex<ProcessTable>,
    phys: M,
    irq: I,
    config: KernelConfig,
}

impl<M: PhysMapper, I: InterruptMask> Kernel<M, I> {
    /// Bring up the VM and process layers over the RAM reported by `probe`.
    ///
    /// # Errors
    /// If the probed RAM cannot back a frame table.
    pub fn boot<P: RamProbe + ?Sized>(
        probe: &P,
        phys: M,
        irq: I,
        config: KernelConfig,
    ) -> Result<Self, CoreMapError> {
        let coremap = CoreMap::bootstrap(probe)?;
        let kernel = Self {
            vm: SpinMutex::new(VmCore::new(coremap)),
            procs: SpinMutex::new(ProcessTable::new(config.process_slots)),
            phys,
            irq,
            config,
        };
        tracing::trace_boot(&kernel.frame_stats(), &kernel.config);
        Ok(kernel)
    }

    #[must_use]
    pub const fn config(&self) -> &KernelConfig {
        &self.config
    }

    #[must_use]
    pub const fn phys(&self) -> &M {
        &self.phys
    }

    #[must_use]
    pub const fn interrupts(&self) -> &I {
        &self.irq
    }

    /// Enter the VM critical section.
    pub(crate) fn vm(&self) -> IrqMutex<'_, VmCore, RawSpin, I> {
        self.vm.lock_irq(&self.irq)
    }

    /// Enter the VM critical section on behalf of `thread`, switching the
    /// translation cache over to it if needed.
    pub(crate) fn vm_for(&self, thread: &Thread) -> IrqMutex<'_, VmCore, RawSpin, I> {
        let mut vm = self.vm();
        vm.switch_to(thread.pid(), thread.address_space());
        vm
    }

    pub(crate) fn procs(&self) -> IrqMutex<'_, ProcessTable, RawSpin, I> {
        self.procs.lock_irq(&self.irq)
    }

    #[must_use]
    pub fn frame_stats(&self) -> CoreMapStats {
        self.vm().coremap.stats()
    }

    /// Valid translation-cache slots.
    #[must_use]
    pub fn tlb_entries(&self) -> usize {
        self.vm().tlb.valid_entries()
    }

    #[must_use]
    pub fn live_processes(&self) -> usize {
        self.procs().live_count()
    }

    /// Allocate `n` contiguous frames for kernel use and return their
    /// direct-mapped address.
    #[must_use]
    pub fn alloc_kpages(&self, n: usize) -> Option<VirtualAddress> {
        kpages::alloc_kpages(&mut self.vm().coremap, n)
    }

    /// Release a span from [`Kernel::alloc_kpages`]. Returns the number of
    /// frames freed.
    pub fn free_kpages(&self, va: VirtualAddress) -> usize {
        kpages::free_kpages(&mut self.vm().coremap, va)
    }

    /// Register a new process with no address space, e.g. the first user
    /// program before it is loaded.
    ///
    /// # Errors
    /// [`ProcessError::NoProcessSlots`].
    pub fn create_process(&self) -> Result<Thread, ProcessError> {
        let pid = self.procs().allocate()?;
        log::debug!("proc: created {pid}");
        Ok(Thread::new(pid, None))
    }

    /// Exec-style replacement: destroy the thread's address space, if any,
    /// and install and activate an empty one for the loader to fill.
    pub fn replace_address_space<'t>(&self, thread: &'t mut Thread) -> &'t mut AddressSpace {
        let mut vm = self.vm();
        if let Some(old) = thread.aspace.take() {
            let released = old.destroy(&mut vm.coremap);
            log::debug!("vm: {} replaced its address space, {released} frames released", thread.pid());
        }
        let pid = thread.pid();
        let aspace = thread.aspace.insert(AddressSpace::new());
        vm.activate(Some(pid), Some(&*aspace));
        aspace
    }
}
