//! # Process system calls
//!
//! `fork`, `waitpid`, `_exit` and `sbrk` on top of the VM core and
//! the process table, plus [`Kernel::syscall`], which decodes a trap frame,
//! runs the call and writes the result back.
//!
//! ## Exit rendezvous
//! ```text
//!   waiter                               exiting process
//!   ------                               ---------------
//!   claim_waiter(pid)  [procs lock]
//!   signal.wait_with(yield)              destroy address space  [vm lock]
//!        ...                             mark_exited(pid)       [procs lock]
//!        <──────────── publish(code) ────
//!   reap(pid)          [procs lock]
//!   copy status out                      (thread ends)
//! ```

use crate::process::Pid;
use crate::{ForkedChild, Kernel, ProcessError, Scheduler, Thread, VmCore};
use kernel_info::memory::USERSPACE_TOP;
use kernel_memory_addresses::VirtualAddress;
use kernel_sync::InterruptMask;
use kernel_syscall::{Errno, Sysno, SyscallResult, TrapFrame};
use kernel_vmem::{AddressSpace, PhysMapper, RegionKind, VmError};

/// What the trap path does after [`Kernel::syscall`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SyscallOutcome {
    /// The frame holds the result; return to user mode.
    Return,
    /// The thread asked to exit with this code; call [`Kernel::exit`].
    Exit(i32),
}

impl<M: PhysMapper, I: InterruptMask> Kernel<M, I> {
    /// Duplicate `parent` into a new process that resumes from `tf` with a
    /// return value of 0. Returns the child's pid.
    ///
    /// The parent's address space is only read. If anything fails after the
    /// copy was made, the copy and the pid are released again.
    ///
    /// # Errors
    /// - [`ProcessError::Vm`] with [`VmError::OutOfMemory`] if the copy ran out of frames.
    /// - [`ProcessError::NoProcessSlots`] if the process table is full.
    /// - [`ProcessError::Spawn`] if the scheduler refused the thread.
    pub fn fork<S: Scheduler + ?Sized>(
        &self,
        parent: &Thread,
        tf: &TrapFrame,
        sched: &S,
    ) -> Result<Pid, ProcessError> {
        let copy = {
            let mut vm = self.vm_for(parent);
            match parent.address_space() {
                Some(aspace) => Some(aspace.duplicate(&mut vm.coremap, &self.phys)?),
                None => None,
            }
        };

        let allocated = self.procs().allocate();
        let pid = match allocated {
            Ok(pid) => pid,
            Err(e) => {
                self.discard(copy);
                return Err(e);
            }
        };

        let mut trap_frame = *tf;
        trap_frame.fork_child_return();
        let child = ForkedChild {
            thread: Thread::new(pid, copy),
            trap_frame,
        };

        if let Err(child) = sched.spawn(child) {
            self.procs().abandon(pid);
            self.discard(child.thread.aspace);
            log::warn!("proc: could not start child of {}", parent.pid());
            return Err(ProcessError::Spawn);
        }

        log::debug!("proc: {} forked {pid}", parent.pid());
        Ok(pid)
    }

    /// First code a forked child runs: take over its thread and activate its
    /// address space. Returns the frame to resume user mode with.
    pub fn enter_forked_child(&self, child: ForkedChild) -> (Thread, TrapFrame) {
        let ForkedChild { thread, trap_frame } = child;
        let mut vm = self.vm();
        vm.activate(Some(thread.pid()), thread.address_space());
        (thread, trap_frame)
    }

    /// Wait for `pid` to exit and store its exit code at user address `status`.
    ///
    /// Blocks, with no lock held, until the target exits. An exit that
    /// happened before the call is picked up immediately.
    ///
    /// # Errors
    /// - [`ProcessError::InvalidPid`] for an out-of-range or unused pid.
    /// - [`ProcessError::BadStatusPointer`] for a null, misaligned, kernel or
    ///   unmapped `status`. Nothing is consumed in that case.
    /// - [`ProcessError::InvalidOptions`] unless `options` is 0.
    /// - [`ProcessError::AlreadyWaited`] if another wait got there first.
    /// - [`ProcessError::Vm`] if the status could not be written.
    pub fn waitpid<S: Scheduler + ?Sized>(
        &self,
        caller: &mut Thread,
        pid: i32,
        status: VirtualAddress,
        options: i32,
        sched: &S,
    ) -> Result<Pid, ProcessError> {
        let target = {
            let procs = self.procs();
            let target = procs.pid(pid)?;
            procs.waitable(target)?;
            target
        };
        if status.is_null()
            || !status.is_aligned_to(align_of::<i32>() as u64)
            || status.as_u64() >= USERSPACE_TOP
        {
            return Err(ProcessError::BadStatusPointer);
        }
        if options != 0 {
            return Err(ProcessError::InvalidOptions);
        }
        // The status word must be reachable before the exit code is consumed.
        let mut current = [0_u8; size_of::<i32>()];
        self.copy_in(caller, status, &mut current)
            .map_err(|_| ProcessError::BadStatusPointer)?;

        let claimed = self.procs().claim_waiter(target);
        let signal = claimed?;
        let code = signal
            .wait_with(|| sched.yield_now())
            .ok_or(ProcessError::AlreadyWaited)?;
        self.procs().reap(target, &signal);

        log::debug!("proc: {} reaped {target} (status {code})", caller.pid());
        self.copy_out(caller, status, &code.to_ne_bytes())?;
        Ok(target)
    }

    /// Terminate `thread` with `code`: release its address space, invalidate
    /// the translation cache and wake the waiter, if any.
    pub fn exit(&self, mut thread: Thread, code: i32) {
        let pid = thread.pid();
        {
            let mut vm = self.vm();
            if let Some(aspace) = thread.aspace.take() {
                let released = aspace.destroy(&mut vm.coremap);
                log::trace!("vm: {pid} released {released} frames");
            }
            vm.activate(None, None);
        }

        let exited = self.procs().mark_exited(pid);
        match exited {
            Some(signal) => {
                if signal.publish(code).is_err() {
                    log::warn!("proc: {pid} published its exit code twice");
                }
            }
            None => log::warn!("proc: exit of unregistered {pid}"),
        }
        log::debug!("proc: {pid} exited with {code}");
    }

    /// Move the heap break by `amount` bytes and return the previous break.
    ///
    /// A shrink releases the frames above the new break and drops their
    /// cached translations.
    ///
    /// # Errors
    /// - [`VmError::InvalidArgument`] for a delta that is not page-aligned or
    ///   would move the break below the heap base.
    /// - [`VmError::HeapLimit`] for growth past the heap limit.
    /// - [`VmError::NoAddressSpace`] for a kernel thread.
    pub fn sbrk(&self, thread: &mut Thread, amount: i32) -> Result<VirtualAddress, VmError> {
        let mut vm = self.vm_for(thread);
        let aspace = thread.aspace.as_mut().ok_or(VmError::NoAddressSpace)?;
        let VmCore { coremap, tlb, .. } = &mut *vm;

        let old_end = aspace.grow_heap(i64::from(amount), &self.config.limits, coremap)?;
        if amount < 0 {
            let new_end = aspace.region(RegionKind::Heap).end();
            let dropped = tlb.invalidate_range(new_end, old_end);
            log::trace!("vm: sbrk({amount}) dropped {dropped} cached translations");
        }
        Ok(old_end)
    }

    /// Decode and run the system call in `tf`, writing the result back.
    pub fn syscall<S: Scheduler + ?Sized>(
        &self,
        thread: &mut Thread,
        tf: &mut TrapFrame,
        sched: &S,
    ) -> SyscallOutcome {
        let [a0, a1, a2, _] = tf.args();
        let result: SyscallResult = match Sysno::from_raw(tf.call_number()) {
            Some(Sysno::Exit) => return SyscallOutcome::Exit(a0.cast_signed()),
            Some(Sysno::Fork) => self
                .fork(thread, tf, sched)
                .map(Pid::as_i32)
                .map_err(Errno::from),
            Some(Sysno::Waitpid) => self
                .waitpid(
                    thread,
                    a0.cast_signed(),
                    VirtualAddress::new(u64::from(a1)),
                    a2.cast_signed(),
                    sched,
                )
                .map(Pid::as_i32)
                .map_err(Errno::from),
            Some(Sysno::Getpid) => Ok(thread.pid().as_i32()),
            Some(Sysno::Sbrk) => self
                .sbrk(thread, a0.cast_signed())
                .map_err(Errno::from)
                .and_then(|brk| i32::try_from(brk.as_u64()).map_err(|_| Errno::EFAULT)),
            Some(other) => {
                log::debug!("syscall: {other:?} is served elsewhere");
                Err(Errno::EUNIMP)
            }
            None => {
                log::debug!("syscall: unknown call {}", tf.call_number());
                Err(Errno::EUNIMP)
            }
        };
        tf.complete(result);
        SyscallOutcome::Return
    }

    /// Release an address space that never ran.
    fn discard(&self, aspace: Option<AddressSpace>) {
        if let Some(aspace) = aspace {
            let released = aspace.destroy(&mut self.vm().coremap);
            log::trace!("vm: discarded unused copy, {released} frames released");
        }
    }
}
