use crate::{Kernel, Thread, VmCore};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_sync::InterruptMask;
use kernel_vmem::{AddressSpace, FaultKind, Pager, PhysMapper, VmError};

impl<M: PhysMapper, I: InterruptMask> Kernel<M, I> {
    /// Fault entry point: resolve an access by `thread` at `va` that the
    /// translation cache could not satisfy.
    ///
    /// Runs as one critical section. On error the faulting process must be
    /// terminated; nothing here retries.
    ///
    /// # Errors
    /// A [`VmError`] in the fault family.
    pub fn vm_fault(
        &self,
        thread: &mut Thread,
        kind: FaultKind,
        va: VirtualAddress,
    ) -> Result<PhysicalAddress, VmError> {
        let mut vm = self.vm_for(thread);
        self.resolve_locked(&mut vm, thread.aspace.as_mut(), kind, va)
    }

    pub(crate) fn resolve_locked(
        &self,
        vm: &mut VmCore,
        aspace: Option<&mut AddressSpace>,
        kind: FaultKind,
        va: VirtualAddress,
    ) -> Result<PhysicalAddress, VmError> {
        let VmCore { coremap, tlb, .. } = vm;
        Pager {
            frames: coremap,
            phys: &self.phys,
            tlb,
            limits: &self.config.limits,
        }
        .resolve_fault(aspace, kind, va)
    }
}
