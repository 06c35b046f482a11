/// System-call numbers, as passed in `v0`.
#[repr(u32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Sysno {
    Exit = 0,
    Execv = 1,
    Fork = 2,
    Waitpid = 3,
    Read = 5,
    Write = 6,
    Reboot = 8,
    Sbrk = 10,
    Getpid = 11,
    Time = 12,
}

impl Sysno {
    /// Decode a raw call number.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Exit,
            1 => Self::Execv,
            2 => Self::Fork,
            3 => Self::Waitpid,
            5 => Self::Read,
            6 => Self::Write,
            8 => Self::Reboot,
            10 => Self::Sbrk,
            11 => Self::Getpid,
            12 => Self::Time,
            _ => return None,
        })
    }

    #[inline]
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Sysno {
    type Error = u32;

    fn try_from(raw: u32) -> Result<Self, u32> {
        Self::from_raw(raw).ok_or(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_numbers() {
        assert_eq!(Sysno::from_raw(2), Some(Sysno::Fork));
        assert_eq!(Sysno::try_from(10), Ok(Sysno::Sbrk));
        assert_eq!(Sysno::Getpid.as_raw(), 11);
    }

    #[test]
    fn rejects_gaps() {
        assert_eq!(Sysno::from_raw(4), None);
        assert_eq!(Sysno::try_from(999), Err(999));
    }
}
