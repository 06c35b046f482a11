use crate::process::Pid;
use kernel_alloc::CoreMap;
use kernel_vmem::{AddressSpace, Tlb};

/// Everything the VM critical section protects: the frame table and the
/// translation cache.
///
/// Lives in a [`SpinMutex`](kernel_sync::SpinMutex) that is only ever taken
/// through `lock_irq`, so holding it also means interrupts are masked.
pub struct VmCore {
    pub coremap: CoreMap,
    pub tlb: Tlb,
    /// Process whose translations the cache currently holds.
    active: Option<Pid>,
}

impl VmCore {
    #[must_use]
    pub const fn new(coremap: CoreMap) -> Self {
        Self {
            coremap,
            tlb: Tlb::new(),
            active: None,
        }
    }

    #[must_use]
    pub const fn active(&self) -> Option<Pid> {
        self.active
    }

    /// Switch the cache over to `pid`, dropping every slot if another
    /// process was active.
    pub fn switch_to(&mut self, pid: Pid, aspace: Option<&AddressSpace>) {
        if self.active != Some(pid) {
            self.activate(Some(pid), aspace);
        }
    }

    /// Make `aspace` current and record `pid` as the owner. With no address
    /// space the cache is still emptied.
    pub fn activate(&mut self, pid: Option<Pid>, aspace: Option<&AddressSpace>) {
        match aspace {
            Some(aspace) => aspace.activate(&mut self.tlb),
            None => self.tlb.invalidate_all(),
        }
        self.active = pid;
    }
}
