//! # Kernel Console
//!
//! Formatted kernel output (`kprintf`) and a [`log`] backend on top of it.
//!
//! ## Output path
//! ```text
//! log::info!(..) / kprintf!(..)
//!     ↓
//! ConsoleLogger::log  (level filter, "[LEVEL] target: message\n")
//!     ↓
//! ConsoleWriter (fmt::Write)
//!     ↓
//! ConsoleSink::put_bytes → console device / capture buffer
//! ```
//!
//! Nothing here allocates; records are formatted straight into the sink, so the
//! logger can be installed before the frame allocator exists.
//!
//! ## Usage
//! ```rust
//! use kernel_console::{ConsoleLogger, ConsoleSink};
//! use log::LevelFilter;
//!
//! struct Discard;
//! impl ConsoleSink for Discard {
//!     fn put_bytes(&self, _bytes: &[u8]) {}
//! }
//!
//! static LOGGER: ConsoleLogger<Discard> = ConsoleLogger::new(Discard, LevelFilter::Info);
//! LOGGER.init().expect("logger installed once");
//! log::info!("vm: ready");
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod logger;

pub use logger::ConsoleLogger;

use core::fmt::{self, Write};

/// A byte-oriented output device.
///
/// Implementations must tolerate being called from any context the kernel
/// logs from, including with interrupts masked.
pub trait ConsoleSink: Send + Sync {
    fn put_bytes(&self, bytes: &[u8]);
}

impl<S: ConsoleSink + ?Sized> ConsoleSink for &S {
    #[inline]
    fn put_bytes(&self, bytes: &[u8]) {
        (**self).put_bytes(bytes);
    }
}

/// `fmt::Write` adapter over a [`ConsoleSink`].
pub struct ConsoleWriter<'a, S: ?Sized>(pub &'a S);

impl<S: ConsoleSink + ?Sized> Write for ConsoleWriter<'_, S> {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.put_bytes(s.as_bytes());
        Ok(())
    }
}

#[doc(hidden)]
#[inline]
pub fn console_write<S: ConsoleSink + ?Sized>(sink: &S, args: fmt::Arguments) {
    // Best effort; a sink cannot fail.
    let _ = fmt::write(&mut ConsoleWriter(sink), args);
}

/// Formatted output to a console sink, without allocation.
///
/// ```rust
/// # use kernel_console::{ConsoleSink, kprintf};
/// # struct Discard;
/// # impl ConsoleSink for Discard { fn put_bytes(&self, _: &[u8]) {} }
/// kprintf!(Discard, "{} frames free\n", 42);
/// ```
#[macro_export]
macro_rules! kprintf {
    ($sink:expr, $($arg:tt)*) => {{
        $crate::console_write(&$sink, core::format_args!($($arg)*));
    }};
}
