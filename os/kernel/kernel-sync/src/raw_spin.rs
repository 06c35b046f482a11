use crate::RawLock;
use core::hint::spin_loop;
use core::sync::atomic::{AtomicBool, Ordering};

/// Test-and-test-and-set spin lock.
#[derive(Debug, Default)]
pub struct RawSpin(AtomicBool);

impl RawSpin {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }
}

impl RawLock for RawSpin {
    fn acquire(&self) {
        while self.0.swap(true, Ordering::Acquire) {
            while self.0.load(Ordering::Relaxed) {
                spin_loop();
            }
        }
    }

    unsafe fn release(&self) {
        self.0.store(false, Ordering::Release);
    }
}
