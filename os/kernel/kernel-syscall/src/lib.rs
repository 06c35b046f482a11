//! # System-call ABI
//!
//! The register-level contract between user programs and the kernel:
//!
//! - [`Sysno`]: call numbers carried in `v0` on entry,
//! - [`TrapFrame`]: the register image saved by the trap path,
//! - [`Errno`]: error numbers returned in `v0` with `a3` set.
//!
//! A call completes by writing either its return value (with `a3 = 0`) or an
//! errno (with `a3 = 1`) into the frame and stepping `epc` past the `syscall`
//! instruction; see [`TrapFrame::complete`].

#![cfg_attr(not(any(test, doctest)), no_std)]

mod errno;
mod sysno;
mod trap_frame;

pub use errno::Errno;
pub use sysno::Sysno;
pub use trap_frame::TrapFrame;

/// Result of a system call as seen by the dispatcher.
pub type SyscallResult = Result<i32, Errno>;
