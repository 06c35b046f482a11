//! # Kernel Tracing helpers

use crate::{Kernel, Thread};
use kernel_alloc::CoreMapStats;
use kernel_console::{ConsoleSink, kprintf};
use kernel_info::config::KernelConfig;
use kernel_sync::InterruptMask;
use kernel_vmem::{PhysMapper, RegionKind};
use log::info;

pub fn trace_boot(stats: &CoreMapStats, config: &KernelConfig) {
    info!(
        concat!(
            "Kernel up:\n",
            "  frames   = {total} ({free} free)\n",
            "  heap     = {heap_limit:#x} bytes virtual, {heap_pages} frames\n",
            "  stack    = {stack_limit:#x} bytes virtual, {stack_pages} frames\n",
            "  procs    = {slots} slots"
        ),
        total = stats.total,
        free = stats.free,
        heap_limit = config.limits.heap_limit,
        heap_pages = config.limits.heap_physical_pages,
        stack_limit = config.limits.stack_limit,
        stack_pages = config.limits.stack_physical_pages,
        slots = config.process_slots,
    );
}

impl<M: PhysMapper, I: InterruptMask> Kernel<M, I> {
    /// Print the frame table summary and the live process count.
    pub fn dump_vm<S: ConsoleSink + ?Sized>(&self, sink: &S) {
        let stats = self.frame_stats();
        kprintf!(
            sink,
            "coremap: {} frames, {} used, {} free, largest free run {}\n",
            stats.total,
            stats.used,
            stats.free,
            stats.largest_free_run
        );
        kprintf!(sink, "tlb: {} valid entries\n", self.tlb_entries());
        kprintf!(sink, "procs: {} live\n", self.live_processes());
    }
}

impl Thread {
    /// Print the extent and resident pages of each region.
    pub fn dump<S: ConsoleSink + ?Sized>(&self, sink: &S) {
        let Some(aspace) = self.address_space() else {
            kprintf!(sink, "pid {}: no address space\n", self.pid());
            return;
        };
        kprintf!(sink, "pid {}:\n", self.pid());
        for kind in RegionKind::ALL {
            let region = aspace.region(kind);
            kprintf!(
                sink,
                "  {kind:?}: [{}, {}) {} resident\n",
                region.base(),
                region.end(),
                region.resident_pages()
            );
        }
    }
}
