use kernel_syscall::Errno;
use kernel_vmem::VmError;

/// Errors from the process layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProcessError {
    /// The pid is out of range or names a free slot.
    #[error("no such process")]
    InvalidPid,
    /// Someone is already waiting for (or has reaped) that process.
    #[error("process already waited for")]
    AlreadyWaited,
    #[error("unsupported wait options")]
    InvalidOptions,
    /// The status pointer is null, misaligned or outside user space.
    #[error("bad status pointer")]
    BadStatusPointer,
    #[error("process table full")]
    NoProcessSlots,
    /// The scheduler refused the new thread.
    #[error("could not start thread")]
    Spawn,
    #[error(transparent)]
    Vm(#[from] VmError),
}

impl From<&ProcessError> for Errno {
    fn from(err: &ProcessError) -> Self {
        match err {
            ProcessError::InvalidPid
            | ProcessError::AlreadyWaited
            | ProcessError::InvalidOptions => Self::EINVAL,
            ProcessError::BadStatusPointer => Self::EFAULT,
            ProcessError::NoProcessSlots => Self::ENPROC,
            ProcessError::Spawn => Self::ENOMEM,
            ProcessError::Vm(e) => Self::from(e),
        }
    }
}

impl From<ProcessError> for Errno {
    fn from(err: ProcessError) -> Self {
        Self::from(&err)
    }
}
