//! # Process table
//!
//! A fixed number of slots indexed by pid. Slot 0 is never handed out.
//!
//! Each incarnation of a pid owns a fresh [`ExitSignal`]. Exit publishes the
//! code into it; a waiter claims the signal under the table lock and then
//! blocks on it with the lock released. An exited process that nobody waited
//! for keeps its signal (and with it the exit code) until a wait consumes it
//! or the slot is reused. Allocation prefers free slots over exited ones so
//! that an unclaimed exit code survives as long as possible.

use crate::ProcessError;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use kernel_sync::ExitSignal;

/// A process id. Never zero.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Pid(u32);

impl Pid {
    #[must_use]
    pub const fn new(raw: u32) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// The pid as a system-call return value.
    #[inline]
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0.cast_signed()
    }

    const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pid({})", self.0)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Default)]
enum Slot {
    #[default]
    Free,
    Live {
        exit: Arc<ExitSignal>,
        waited: bool,
    },
    Exited {
        exit: Arc<ExitSignal>,
        waited: bool,
    },
}

#[derive(Debug)]
pub struct ProcessTable {
    slots: Vec<Slot>,
}

impl ProcessTable {
    /// A table with pids `1..slots`.
    #[must_use]
    pub fn new(slots: usize) -> Self {
        let mut table = Vec::with_capacity(slots);
        table.resize_with(slots, Slot::default);
        Self { slots: table }
    }

    /// Number of slots, including the reserved slot 0.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Claim a slot for a new process.
    ///
    /// # Errors
    /// [`ProcessError::NoProcessSlots`] if every slot is live.
    pub fn allocate(&mut self) -> Result<Pid, ProcessError> {
        let free = (1..self.slots.len()).find(|&i| matches!(self.slots[i], Slot::Free));
        let index = free
            .or_else(|| (1..self.slots.len()).find(|&i| matches!(self.slots[i], Slot::Exited { .. })))
            .ok_or(ProcessError::NoProcessSlots)?;

        self.slots[index] = Slot::Live {
            exit: Arc::new(ExitSignal::new()),
            waited: false,
        };
        let raw = u32::try_from(index).map_err(|_| ProcessError::NoProcessSlots)?;
        Pid::new(raw).ok_or(ProcessError::NoProcessSlots)
    }

    /// Give back a slot whose process never ran.
    pub fn abandon(&mut self, pid: Pid) {
        if let Some(slot) = self.slots.get_mut(pid.index()) {
            *slot = Slot::Free;
        }
    }

    /// Validate a pid passed in from user space against the table bounds.
    ///
    /// # Errors
    /// [`ProcessError::InvalidPid`] for zero, negative or out-of-range values.
    pub fn pid(&self, raw: i32) -> Result<Pid, ProcessError> {
        u32::try_from(raw)
            .ok()
            .and_then(Pid::new)
            .filter(|pid| pid.index() < self.slots.len())
            .ok_or(ProcessError::InvalidPid)
    }

    fn lookup(&mut self, pid: Pid) -> Result<&mut Slot, ProcessError> {
        self.slots.get_mut(pid.index()).ok_or(ProcessError::InvalidPid)
    }

    /// Whether a wait on `pid` could be claimed right now.
    ///
    /// # Errors
    /// - [`ProcessError::InvalidPid`] if `pid` is out of range or free.
    /// - [`ProcessError::AlreadyWaited`] if another wait claimed it first.
    pub fn waitable(&self, pid: Pid) -> Result<(), ProcessError> {
        match self.slots.get(pid.index()) {
            None | Some(Slot::Free) => Err(ProcessError::InvalidPid),
            Some(Slot::Live { waited: true, .. } | Slot::Exited { waited: true, .. }) => {
                Err(ProcessError::AlreadyWaited)
            }
            Some(_) => Ok(()),
        }
    }

    /// Register the caller as the one waiter for `pid` and hand out the
    /// signal to block on.
    ///
    /// # Errors
    /// As for [`ProcessTable::waitable`].
    pub fn claim_waiter(&mut self, pid: Pid) -> Result<Arc<ExitSignal>, ProcessError> {
        self.waitable(pid)?;
        match self.lookup(pid)? {
            Slot::Live { exit, waited } | Slot::Exited { exit, waited } => {
                *waited = true;
                Ok(Arc::clone(exit))
            }
            Slot::Free => Err(ProcessError::InvalidPid),
        }
    }

    /// Mark `pid` exited and return the signal to publish the code into.
    pub fn mark_exited(&mut self, pid: Pid) -> Option<Arc<ExitSignal>> {
        let slot = self.slots.get_mut(pid.index())?;
        match core::mem::take(slot) {
            Slot::Live { exit, waited } => {
                *slot = Slot::Exited {
                    exit: Arc::clone(&exit),
                    waited,
                };
                Some(exit)
            }
            other => {
                *slot = other;
                None
            }
        }
    }

    /// Free `pid` after a waiter consumed `signal`, unless the slot has since
    /// been reused by another incarnation.
    pub fn reap(&mut self, pid: Pid, signal: &Arc<ExitSignal>) {
        let Ok(slot) = self.lookup(pid) else {
            return;
        };
        if matches!(slot, Slot::Exited { exit, .. } if Arc::ptr_eq(exit, signal)) {
            *slot = Slot::Free;
        }
    }

    /// Whether `pid` names a process that has not exited.
    #[must_use]
    pub fn is_live(&self, pid: Pid) -> bool {
        matches!(self.slots.get(pid.index()), Some(Slot::Live { .. }))
    }

    /// Whether `pid` has exited and still holds its code.
    #[must_use]
    pub fn is_exited(&self, pid: Pid) -> bool {
        matches!(self.slots.get(pid.index()), Some(Slot::Exited { .. }))
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Live { .. }))
            .count()
    }
}
