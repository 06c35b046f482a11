//! # User memory copy
//!
//! The kernel touches user memory the way the processor would: each page is
//! looked up in the translation cache first and a miss goes through the fault
//! resolver. A bad user address surfaces as a fault-family [`VmError`]
//! (`EFAULT` at the system-call boundary) instead of a kernel crash.

use crate::{Kernel, Thread};
use core::ops::Range;
use kernel_info::memory::USERSPACE_TOP;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_sync::InterruptMask;
use kernel_vmem::{FRAME_BYTES, FaultKind, PhysMapper, VmError};

impl<M: PhysMapper, I: InterruptMask> Kernel<M, I> {
    /// Copy `src` to user address `dst` in `thread`'s address space.
    ///
    /// # Errors
    /// [`VmError::InvalidAddress`] for a range outside user space, or whatever
    /// the fault resolver reports for a page it cannot map.
    pub fn copy_out(
        &self,
        thread: &mut Thread,
        dst: VirtualAddress,
        src: &[u8],
    ) -> Result<(), VmError> {
        self.walk_user(thread, dst, src.len(), FaultKind::Write, |phys, pa, range| {
            phys.write(pa, &src[range]);
        })
    }

    /// Copy `dst.len()` bytes from user address `src` into `dst`.
    ///
    /// # Errors
    /// As for [`Kernel::copy_out`].
    pub fn copy_in(
        &self,
        thread: &mut Thread,
        src: VirtualAddress,
        dst: &mut [u8],
    ) -> Result<(), VmError> {
        let len = dst.len();
        self.walk_user(thread, src, len, FaultKind::Read, |phys, pa, range| {
            phys.read(pa, &mut dst[range]);
        })
    }

    /// Visit `[start, start + len)` page by page with the physical address
    /// of each chunk, all inside one VM critical section.
    fn walk_user(
        &self,
        thread: &mut Thread,
        start: VirtualAddress,
        len: usize,
        kind: FaultKind,
        mut visit: impl FnMut(&M, PhysicalAddress, Range<usize>),
    ) -> Result<(), VmError> {
        check_user_range(start, len)?;

        let mut vm = self.vm_for(thread);
        let mut done = 0;
        while done < len {
            let va = start + done as u64;
            let chunk = (len - done).min(FRAME_BYTES - va.offset().as_usize());
            let pa = match vm.tlb.lookup(va) {
                Some(pa) => pa,
                None => self.resolve_locked(&mut vm, thread.aspace.as_mut(), kind, va)?,
            };
            visit(&self.phys, pa, done..done + chunk);
            done += chunk;
        }
        Ok(())
    }
}

/// Reject null pointers and ranges that leave user space or wrap.
fn check_user_range(start: VirtualAddress, len: usize) -> Result<(), VmError> {
    let end = start.as_u64().checked_add(len as u64);
    if start.is_null() || end.is_none_or(|end| end > USERSPACE_TOP) {
        return Err(VmError::InvalidAddress(start));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_range_checks() {
        assert!(check_user_range(VirtualAddress::new(0x1000), 16).is_ok());
        assert!(check_user_range(VirtualAddress::new(USERSPACE_TOP - 4), 4).is_ok());
        assert!(check_user_range(VirtualAddress::zero(), 4).is_err());
        assert!(check_user_range(VirtualAddress::new(USERSPACE_TOP - 4), 5).is_err());
        assert!(check_user_range(VirtualAddress::new(u64::MAX), 2).is_err());
    }
}
