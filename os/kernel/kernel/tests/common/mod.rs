#![allow(dead_code)]

use kernel::{ForkedChild, Kernel, Scheduler, Thread};
use kernel_alloc::SimulatedRam;
use kernel_info::boot::RamProbe;
use kernel_info::config::KernelConfig;
use kernel_memory_addresses::VirtualAddress;
use kernel_sync::SoftInterrupts;
use kernel_syscall::{Sysno, TrapFrame};
use kernel_vmem::SegmentPermissions;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

pub type TestKernel = Kernel<SimulatedRam, SoftInterrupts>;

pub const TEXT: u64 = 0x0040_0000;

pub fn boot(frames: usize, config: KernelConfig) -> Arc<TestKernel> {
    let ram = SimulatedRam::new(frames);
    let extent = ram.ram_extent();
    Arc::new(Kernel::boot(&extent, ram, SoftInterrupts::new(), config).unwrap())
}

/// A process with one text page and zero-extent heap and stack.
pub fn process(kernel: &TestKernel) -> Thread {
    let mut thread = kernel.create_process().unwrap();
    let aspace = kernel.replace_address_space(&mut thread);
    aspace
        .define_region(
            VirtualAddress::new(TEXT),
            0x1000,
            SegmentPermissions::rwx(true, false, true),
        )
        .unwrap();
    aspace.complete_load();
    aspace.define_stack();
    thread
}

pub fn syscall_frame(no: Sysno, a0: u32, a1: u32, a2: u32) -> TrapFrame {
    TrapFrame {
        v0: no.as_raw(),
        a0,
        a1,
        a2,
        epc: 0x0040_0200,
        sp: 0x7fff_fff0,
        ..TrapFrame::default()
    }
}

type ChildBody = dyn Fn(&TestKernel, Thread, TrapFrame) + Send + Sync;

/// Runs every forked child on its own host thread.
pub struct HostScheduler {
    kernel: Arc<TestKernel>,
    body: Arc<ChildBody>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    /// Set once any caller had to yield, i.e. blocked in `waitpid`.
    yielded: Arc<AtomicBool>,
}

impl HostScheduler {
    pub fn new(
        kernel: &Arc<TestKernel>,
        yielded: &Arc<AtomicBool>,
        body: impl Fn(&TestKernel, Thread, TrapFrame) + Send + Sync + 'static,
    ) -> Self {
        Self {
            kernel: Arc::clone(kernel),
            body: Arc::new(body),
            handles: Mutex::new(Vec::new()),
            yielded: Arc::clone(yielded),
        }
    }

    pub fn join_all(&self) {
        let handles: Vec<_> = self.handles.lock().unwrap().drain(..).collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}

impl Scheduler for HostScheduler {
    fn spawn(&self, child: ForkedChild) -> Result<(), ForkedChild> {
        let kernel = Arc::clone(&self.kernel);
        let body = Arc::clone(&self.body);
        let handle = std::thread::spawn(move || {
            let (thread, tf) = kernel.enter_forked_child(child);
            body(&kernel, thread, tf);
        });
        self.handles.lock().unwrap().push(handle);
        Ok(())
    }

    fn yield_now(&self) {
        self.yielded.store(true, Ordering::SeqCst);
        std::thread::yield_now();
    }
}

/// Spin until `flag` is set.
pub fn await_flag(flag: &AtomicBool) {
    while !flag.load(Ordering::SeqCst) {
        std::thread::yield_now();
    }
}
