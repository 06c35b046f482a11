use crate::{Mutex, MutexGuard, RawLock};
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicUsize, Ordering};

/// Masks and restores interrupt delivery for the current execution context.
///
/// Implementations must make [`save_and_disable`](Self::save_and_disable) /
/// [`restore`](Self::restore) pairs nest: restoring with the state returned by
/// the matching `save_and_disable` leaves the mask exactly as it was before.
pub trait InterruptMask: Sync {
    /// Masks interrupts and returns whether they were enabled beforehand.
    fn save_and_disable(&self) -> bool;

    /// Undoes the matching [`save_and_disable`](Self::save_and_disable).
    fn restore(&self, were_enabled: bool);

    /// Whether interrupts are currently deliverable.
    fn are_enabled(&self) -> bool;
}

/// Interrupt mask for hosted runs: a nesting depth, enabled at depth zero.
///
/// Every [`IrqGuard`] increments the depth on creation and decrements it on
/// drop, so the mask returns to its prior state even when guards from several
/// host threads interleave.
#[derive(Debug, Default)]
pub struct SoftInterrupts {
    depth: AtomicUsize,
    sections: AtomicUsize,
}

impl SoftInterrupts {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            depth: AtomicUsize::new(0),
            sections: AtomicUsize::new(0),
        }
    }

    /// Current nesting depth of masked sections.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    /// Total number of masked sections entered so far.
    #[must_use]
    pub fn sections_entered(&self) -> usize {
        self.sections.load(Ordering::Relaxed)
    }
}

impl InterruptMask for SoftInterrupts {
    fn save_and_disable(&self) -> bool {
        self.sections.fetch_add(1, Ordering::Relaxed);
        self.depth.fetch_add(1, Ordering::AcqRel) == 0
    }

    fn restore(&self, _were_enabled: bool) {
        let prev = self.depth.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "interrupt mask restored more often than disabled");
    }

    fn are_enabled(&self) -> bool {
        self.depth() == 0
    }
}

/// RAII guard that masks interrupts on creation and restores them on drop.
///
/// # Examples
///
/// ```
/// use kernel_sync::{InterruptMask, IrqGuard, SoftInterrupts};
///
/// let irq = SoftInterrupts::new();
/// {
///     let _g = IrqGuard::new(&irq);
///     assert!(!irq.are_enabled());
/// }
/// assert!(irq.are_enabled());
/// ```
pub struct IrqGuard<'a, I: InterruptMask + ?Sized> {
    mask: &'a I,
    /// Whether interrupts were enabled when the guard was created.
    were_enabled: bool,
}

impl<'a, I: InterruptMask + ?Sized> IrqGuard<'a, I> {
    #[inline]
    #[must_use]
    pub fn new(mask: &'a I) -> Self {
        let were_enabled = mask.save_and_disable();
        Self { mask, were_enabled }
    }

    /// Whether interrupts were enabled before this guard masked them.
    #[inline]
    #[must_use]
    pub const fn were_enabled(&self) -> bool {
        self.were_enabled
    }
}

impl<I: InterruptMask + ?Sized> Drop for IrqGuard<'_, I> {
    fn drop(&mut self) {
        self.mask.restore(self.were_enabled);
    }
}

/// A mutex guard that also masks interrupts while held.
///
/// When created via [`Mutex::lock_irq`], it:
///
/// 1. saves the current interrupt state and masks interrupts, and
/// 2. acquires the underlying mutex,
///
/// releasing them in reverse order on drop.
///
/// # Examples
///
/// ```
/// use kernel_sync::{InterruptMask, SoftInterrupts, SpinMutex};
///
/// let irq = SoftInterrupts::new();
/// let m = SpinMutex::new(0_u64);
/// {
///     let mut g = m.lock_irq(&irq);
///     *g += 1;
///     assert!(!irq.are_enabled());
/// }
/// assert!(irq.are_enabled());
/// assert_eq!(*m.lock(), 1);
/// ```
pub struct IrqMutex<'a, T, R: RawLock, I: InterruptMask + ?Sized> {
    // Field order is drop order: unlock first, then unmask.
    guard: MutexGuard<'a, T, R>,
    _irq: IrqGuard<'a, I>,
}

impl<T, R: RawLock> Mutex<T, R> {
    /// Acquires the mutex with interrupts masked for the guard's lifetime.
    #[inline]
    pub fn lock_irq<'a, I: InterruptMask + ?Sized>(
        &'a self,
        mask: &'a I,
    ) -> IrqMutex<'a, T, R, I> {
        let irq = IrqGuard::new(mask);
        let guard = self.lock();
        IrqMutex { guard, _irq: irq }
    }
}

impl<T, R: RawLock, I: InterruptMask + ?Sized> Deref for IrqMutex<'_, T, R, I> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T, R: RawLock, I: InterruptMask + ?Sized> DerefMut for IrqMutex<'_, T, R, I> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_guards_restore_in_order() {
        let irq = SoftInterrupts::new();
        let outer = IrqGuard::new(&irq);
        assert!(outer.were_enabled());
        {
            let inner = IrqGuard::new(&irq);
            assert!(!inner.were_enabled());
            assert_eq!(irq.depth(), 2);
        }
        assert!(!irq.are_enabled());
        drop(outer);
        assert!(irq.are_enabled());
        assert_eq!(irq.sections_entered(), 2);
    }

    #[test]
    fn early_return_restores_mask() {
        fn step(irq: &SoftInterrupts, fail: bool) -> Result<u32, &'static str> {
            let _g = IrqGuard::new(irq);
            if fail {
                return Err("failed");
            }
            Ok(1)
        }

        let irq = SoftInterrupts::new();
        assert_eq!(step(&irq, true), Err("failed"));
        assert!(irq.are_enabled());
        assert_eq!(step(&irq, false), Ok(1));
        assert!(irq.are_enabled());
    }
}
