use crate::RawLock;
use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};

/// A value guarded by a raw lock `R`.
///
/// Shared VM and process state is reached through
/// [`lock_irq`](Mutex::lock_irq); plain [`lock`](Mutex::lock) leaves
/// interrupts as they are.
pub struct Mutex<T, R> {
    raw: R,
    value: UnsafeCell<T>,
}

// SAFETY: `value` is only reachable through a guard, and at most one guard
// exists while `raw` is held.
unsafe impl<T: Send, R: Sync> Sync for Mutex<T, R> {}

impl<T, R> Mutex<T, R> {
    pub const fn from_raw(raw: R, value: T) -> Self {
        Self {
            raw,
            value: UnsafeCell::new(value),
        }
    }
}

impl<T, R: RawLock> Mutex<T, R> {
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, T, R> {
        self.raw.acquire();
        MutexGuard { owner: self }
    }
}

/// Exclusive access to a [`Mutex`]'s value; releases the lock on drop.
pub struct MutexGuard<'a, T, R: RawLock> {
    owner: &'a Mutex<T, R>,
}

impl<T, R: RawLock> Deref for MutexGuard<'_, T, R> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard holds the lock.
        unsafe { &*self.owner.value.get() }
    }
}

impl<T, R: RawLock> DerefMut for MutexGuard<'_, T, R> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard holds the lock and is borrowed mutably.
        unsafe { &mut *self.owner.value.get() }
    }
}

impl<T, R: RawLock> Drop for MutexGuard<'_, T, R> {
    fn drop(&mut self) {
        // SAFETY: taken in `lock`, released exactly once here.
        unsafe { self.owner.raw.release() }
    }
}
