use core::{
    cell::UnsafeCell,
    fmt,
    hint::spin_loop,
    mem::MaybeUninit,
    sync::atomic::{AtomicU8, Ordering},
};

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const READY: u8 = 2;
const TAKING: u8 = 3;
const TAKEN: u8 = 4;

/// A single-value completion signal.
///
/// One side [`publish`](Self::publish)es a value exactly once; the other side
/// blocks in [`wait`](Self::wait) until the value is there and consumes it.
/// The value stays stored until consumed, so a late waiter still receives it.
///
/// ```
/// use kernel_sync::OneShot;
///
/// let sig = OneShot::new();
/// assert!(sig.publish(7).is_ok());
/// assert_eq!(sig.publish(8), Err(8));
/// assert_eq!(sig.wait(), 7);
/// assert_eq!(sig.try_take(), None);
/// ```
pub struct OneShot<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// The exit-code rendezvous between an exiting process and its waiter.
pub type ExitSignal = OneShot<i32>;

impl<T> Default for OneShot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OneShot<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Stores `value` and wakes the waiter. Hands the value back if the
    /// signal already fired.
    pub fn publish(&self, value: T) -> Result<(), T> {
        if self
            .state
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(value);
        }

        unsafe {
            (*self.value.get()).write(value);
        }
        self.state.store(READY, Ordering::Release);
        Ok(())
    }

    /// Whether a value has been published (consumed or not).
    #[inline]
    pub fn is_published(&self) -> bool {
        self.state.load(Ordering::Acquire) >= READY
    }

    /// Takes the value if it is ready and not yet consumed.
    pub fn try_take(&self) -> Option<T> {
        if self
            .state
            .compare_exchange(READY, TAKING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return None;
        }

        // SAFETY: READY guarantees the write is done; TAKING excludes other readers.
        let value = unsafe { (*self.value.get()).assume_init_read() };
        self.state.store(TAKEN, Ordering::Release);
        Some(value)
    }

    /// Blocks until the value is published, calling `relax` between polls,
    /// and consumes it.
    ///
    /// Returns `None` if another waiter consumed the value first.
    pub fn wait_with(&self, mut relax: impl FnMut()) -> Option<T> {
        loop {
            match self.state.load(Ordering::Acquire) {
                READY => {
                    if let Some(v) = self.try_take() {
                        return Some(v);
                    }
                }
                TAKING | TAKEN => return None,
                _ => relax(),
            }
        }
    }

    /// Spins until the value is published and consumes it.
    ///
    /// # Panics
    /// Panics if the value was already consumed.
    pub fn wait(&self) -> T {
        match self.wait_with(spin_loop) {
            Some(v) => v,
            None => panic!("one-shot value consumed twice"),
        }
    }
}

impl<T> fmt::Debug for OneShot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state.load(Ordering::Acquire) {
            EMPTY => "empty",
            WRITING => "writing",
            READY => "ready",
            TAKING => "taking",
            _ => "taken",
        };
        f.debug_struct("OneShot")
            .field("state", &state)
            .finish_non_exhaustive()
    }
}

impl<T> Drop for OneShot<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == READY {
            unsafe { self.value.get_mut().assume_init_drop() }
        }
    }
}

// Safety: the value moves from the publisher to exactly one taker.
unsafe impl<T: Send> Sync for OneShot<T> {}
unsafe impl<T: Send> Send for OneShot<T> {}
