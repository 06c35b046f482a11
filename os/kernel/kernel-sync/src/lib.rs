//! # Kernel synchronization primitives
//!
//! The VM core runs on a single execution context and serializes every
//! mutation of shared allocator and page-table state by masking interrupts.
//! This crate provides that discipline as scoped guards:
//!
//! * [`InterruptMask`] abstracts "mask interrupts / restore the prior mask".
//!   [`SoftInterrupts`] is the hosted implementation used by tests; the
//!   target port supplies one over its status register.
//! * [`IrqGuard`] masks on creation and restores the prior state on drop, on
//!   every exit path including early `?` returns.
//! * [`Mutex::lock_irq`] pairs an [`IrqGuard`] with a spin lock, giving the
//!   critical-section guard the allocator and fault resolver run under.
//! * [`OneShot`] is a single-value completion signal; [`ExitSignal`] is the
//!   exit-code rendezvous between an exiting process and its waiter.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;
mod mutex;
mod oneshot;
mod raw_spin;

pub use irq::{InterruptMask, IrqGuard, IrqMutex, SoftInterrupts};
pub use mutex::{Mutex, MutexGuard};
pub use oneshot::{ExitSignal, OneShot};
pub use raw_spin::RawSpin;

pub type SpinMutex<T> = Mutex<T, RawSpin>;

impl<T> SpinMutex<T> {
    pub const fn new(value: T) -> Self {
        Self::from_raw(RawSpin::new(), value)
    }
}

/// The lock word behind a [`Mutex`].
pub trait RawLock {
    /// Block until the lock is held by the caller.
    fn acquire(&self);

    /// # Safety
    /// The caller must hold the lock.
    unsafe fn release(&self);
}
