use crate::process::Pid;
use kernel_syscall::TrapFrame;
use kernel_vmem::AddressSpace;

/// The per-thread state the VM and process layers care about.
///
/// The scheduler owns one of these per runnable thread and passes it by
/// mutable reference into every kernel entry made on that thread's behalf.
#[derive(Debug)]
pub struct Thread {
    pid: Pid,
    pub(crate) aspace: Option<AddressSpace>,
}

impl Thread {
    pub(crate) const fn new(pid: Pid, aspace: Option<AddressSpace>) -> Self {
        Self { pid, aspace }
    }

    #[inline]
    #[must_use]
    pub const fn pid(&self) -> Pid {
        self.pid
    }

    /// The thread's address space; `None` for kernel-only threads.
    #[inline]
    #[must_use]
    pub const fn address_space(&self) -> Option<&AddressSpace> {
        self.aspace.as_ref()
    }

    #[inline]
    pub const fn address_space_mut(&mut self) -> Option<&mut AddressSpace> {
        self.aspace.as_mut()
    }
}

/// A forked child waiting for its first run.
#[derive(Debug)]
pub struct ForkedChild {
    pub thread: Thread,
    /// The parent's frame at the fork, already set up to return 0.
    pub trap_frame: TrapFrame,
}

/// The thread-switch primitive, seen from the process layer.
pub trait Scheduler {
    /// Make `child` runnable. Its first act must be
    /// [`Kernel::enter_forked_child`](crate::Kernel::enter_forked_child).
    ///
    /// # Errors
    /// Hands the child back if no thread could be created for it.
    fn spawn(&self, child: ForkedChild) -> Result<(), ForkedChild>;

    /// Give up the processor while blocked.
    fn yield_now(&self);
}
