use kernel_vmem::VmError;

/// Error numbers handed back to user programs.
#[allow(clippy::upper_case_acronyms)]
#[repr(u32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Errno {
    #[error("invalid argument")]
    EINVAL = 1,
    #[error("bad memory reference")]
    EFAULT = 2,
    #[error("out of memory")]
    ENOMEM = 4,
    #[error("unimplemented feature")]
    EUNIMP = 13,
    #[error("exec format error")]
    ENOEXEC = 29,
    #[error("too many processes")]
    ENPROC = 30,
}

impl Errno {
    #[inline]
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            1 => Self::EINVAL,
            2 => Self::EFAULT,
            4 => Self::ENOMEM,
            13 => Self::EUNIMP,
            29 => Self::ENOEXEC,
            30 => Self::ENPROC,
            _ => return None,
        })
    }
}

impl From<&VmError> for Errno {
    fn from(err: &VmError) -> Self {
        match err {
            VmError::OutOfMemory | VmError::HeapLimit => Self::ENOMEM,
            VmError::InvalidArgument => Self::EINVAL,
            VmError::TooManyRegions => Self::EUNIMP,
            _ => Self::EFAULT,
        }
    }
}

impl From<VmError> for Errno {
    fn from(err: VmError) -> Self {
        Self::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_memory_addresses::VirtualAddress;

    #[test]
    fn vm_errors_map_to_errno() {
        assert_eq!(Errno::from(VmError::OutOfMemory), Errno::ENOMEM);
        assert_eq!(Errno::from(VmError::HeapLimit), Errno::ENOMEM);
        assert_eq!(Errno::from(VmError::InvalidArgument), Errno::EINVAL);
        assert_eq!(Errno::from(VmError::TooManyRegions), Errno::EUNIMP);
        assert_eq!(
            Errno::from(&VmError::InvalidAddress(VirtualAddress::new(4))),
            Errno::EFAULT
        );
        assert_eq!(Errno::from(VmError::NoAddressSpace), Errno::EFAULT);
        assert_eq!(
            Errno::from(VmError::NoFrame(VirtualAddress::new(0x0040_0000))),
            Errno::EFAULT
        );
    }
}
