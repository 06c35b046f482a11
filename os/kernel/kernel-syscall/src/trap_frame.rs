use crate::{Errno, SyscallResult};

/// Size of the `syscall` instruction; `epc` is advanced by this on return.
const SYSCALL_INSN_BYTES: u32 = 4;

/// Register image saved by the trap path (MIPS r3000 layout).
///
/// Fork copies this wholesale into the child, so it is plain `Copy` data.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[repr(C)]
pub struct TrapFrame {
    /// Coprocessor 0 `vaddr` register (faulting address).
    pub vaddr: u32,
    pub status: u32,
    pub cause: u32,
    pub lo: u32,
    pub hi: u32,
    pub ra: u32,
    pub at: u32,
    pub v0: u32,
    pub v1: u32,
    pub a0: u32,
    pub a1: u32,
    pub a2: u32,
    pub a3: u32,
    pub t: [u32; 10],
    pub s: [u32; 9],
    pub k0: u32,
    pub k1: u32,
    pub gp: u32,
    pub sp: u32,
    pub epc: u32,
}

impl TrapFrame {
    /// Raw call number (`v0` on entry).
    #[inline]
    #[must_use]
    pub const fn call_number(&self) -> u32 {
        self.v0
    }

    /// The four register arguments `a0..a3`.
    #[inline]
    #[must_use]
    pub const fn args(&self) -> [u32; 4] {
        [self.a0, self.a1, self.a2, self.a3]
    }

    /// Write a call's outcome back and step past the `syscall` instruction.
    ///
    /// Success stores the value in `v0` and clears `a3`; failure stores the
    /// errno in `v0` and sets `a3 = 1`.
    #[allow(clippy::cast_sign_loss)]
    pub const fn complete(&mut self, result: SyscallResult) {
        match result {
            Ok(value) => {
                self.v0 = value as u32;
                self.a3 = 0;
            }
            Err(errno) => {
                self.v0 = errno.as_raw();
                self.a3 = 1;
            }
        }
        self.epc = self.epc.wrapping_add(SYSCALL_INSN_BYTES);
    }

    /// Prepare a forked child's copy of the parent frame: fork returns 0.
    pub const fn fork_child_return(&mut self) {
        self.complete(Ok(0));
    }

    /// Decoded error, if the frame carries one.
    #[must_use]
    pub const fn error(&self) -> Option<Errno> {
        if self.a3 == 0 {
            None
        } else {
            Errno::from_raw(self.v0)
        }
    }
}
