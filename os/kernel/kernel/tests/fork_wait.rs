mod common;

use common::{HostScheduler, TEXT, await_flag, boot, syscall_frame};
use kernel::{ProcessError, SyscallOutcome};
use kernel_info::config::KernelConfig;
use kernel_memory_addresses::VirtualAddress;
use kernel_syscall::{Errno, Sysno, TrapFrame};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};

const STATUS: u64 = TEXT + 0x800;

fn status_word(kernel: &common::TestKernel, thread: &mut kernel::Thread) -> i32 {
    let mut word = [0_u8; 4];
    kernel
        .copy_in(thread, VirtualAddress::new(STATUS), &mut word)
        .unwrap();
    i32::from_ne_bytes(word)
}

#[test]
fn waiter_blocks_until_the_child_exits() {
    let kernel = boot(64, KernelConfig::default());
    let yielded = Arc::new(AtomicBool::new(false));
    let child_exited = Arc::new(AtomicBool::new(false));
    let child_frame = Arc::new(Mutex::new(None::<TrapFrame>));

    let sched = {
        let (yielded, exited, frame) = (
            Arc::clone(&yielded),
            Arc::clone(&child_exited),
            Arc::clone(&child_frame),
        );
        HostScheduler::new(&kernel, &Arc::clone(&yielded), move |kernel, thread, tf| {
            *frame.lock().unwrap() = Some(tf);
            await_flag(&yielded);
            exited.store(true, Ordering::SeqCst);
            kernel.exit(thread, 42);
        })
    };

    let mut parent = common::process(&kernel);
    let mut tf = syscall_frame(Sysno::Fork, 0, 0, 0);
    assert_eq!(kernel.syscall(&mut parent, &mut tf, &sched), SyscallOutcome::Return);
    assert_eq!(tf.error(), None);
    let child = tf.v0;
    assert_ne!(child, parent.pid().as_u32());

    let status = u32::try_from(STATUS).unwrap();
    let mut wait = syscall_frame(Sysno::Waitpid, child, status, 0);
    kernel.syscall(&mut parent, &mut wait, &sched);
    assert!(child_exited.load(Ordering::SeqCst));
    assert_eq!(wait.error(), None);
    assert_eq!(wait.v0, child);
    assert_eq!(status_word(&kernel, &mut parent), 42);

    let seen = child_frame.lock().unwrap().unwrap();
    assert_eq!((seen.v0, seen.a3), (0, 0));
    assert_eq!(seen.epc, tf.epc);

    sched.join_all();
    assert_eq!(kernel.live_processes(), 1);
    assert_eq!(kernel.frame_stats().used, parent.address_space().unwrap().resident_pages());

    kernel.exit(parent, 0);
    assert_eq!(kernel.frame_stats().used, 0);
    assert_eq!(kernel.interrupts().depth(), 0);
}

#[test]
fn second_waiter_is_turned_away() {
    let kernel = boot(64, KernelConfig::default());
    let yielded = Arc::new(AtomicBool::new(false));
    let release = Arc::new(AtomicBool::new(false));

    let sched = {
        let release = Arc::clone(&release);
        Arc::new(HostScheduler::new(&kernel, &yielded, move |kernel, thread, _| {
            await_flag(&release);
            kernel.exit(thread, 5);
        }))
    };

    let mut parent = common::process(&kernel);
    let mut other = common::process(&kernel);
    let child = kernel
        .fork(&parent, &syscall_frame(Sysno::Fork, 0, 0, 0), &*sched)
        .unwrap();

    let first = {
        let (kernel, sched) = (Arc::clone(&kernel), Arc::clone(&sched));
        std::thread::spawn(move || {
            let got = kernel.waitpid(
                &mut parent,
                child.as_i32(),
                VirtualAddress::new(STATUS),
                0,
                &*sched,
            );
            (got, status_word(&kernel, &mut parent), parent)
        })
    };

    await_flag(&yielded);
    let second = kernel.waitpid(&mut other, child.as_i32(), VirtualAddress::new(STATUS), 0, &*sched);
    assert_eq!(second, Err(ProcessError::AlreadyWaited));
    assert_eq!(Errno::from(ProcessError::AlreadyWaited), Errno::EINVAL);

    release.store(true, Ordering::SeqCst);
    let (got, code, parent) = first.join().unwrap();
    assert_eq!(got, Ok(child));
    assert_eq!(code, 5);

    sched.join_all();
    kernel.exit(parent, 0);
    kernel.exit(other, 0);
    assert_eq!(kernel.live_processes(), 0);
    assert_eq!(kernel.frame_stats().used, 0);
}

#[test]
fn child_gets_a_private_copy() {
    let kernel = boot(64, KernelConfig::default());
    let yielded = Arc::new(AtomicBool::new(false));
    let (report, reports) = mpsc::channel();
    let report = Mutex::new(report);

    let sched = HostScheduler::new(&kernel, &yielded, move |kernel, mut thread, _| {
        let text = VirtualAddress::new(TEXT);
        let mut seen = [0_u8; 6];
        kernel.copy_in(&mut thread, text, &mut seen).unwrap();
        kernel.copy_out(&mut thread, text, b"child!").unwrap();
        let frame = thread
            .address_space()
            .unwrap()
            .translate(text, &kernel.config().limits)
            .unwrap();
        report.lock().unwrap().send((seen, frame)).unwrap();
        kernel.exit(thread, 0);
    });

    let text = VirtualAddress::new(TEXT);
    let mut parent = common::process(&kernel);
    kernel.copy_out(&mut parent, text, b"parent").unwrap();
    let heap = kernel.sbrk(&mut parent, 4096).unwrap();
    kernel.copy_out(&mut parent, heap, &[7; 16]).unwrap();
    let used_before = kernel.frame_stats().used;

    let child = kernel
        .fork(&parent, &syscall_frame(Sysno::Fork, 0, 0, 0), &sched)
        .unwrap();
    kernel
        .waitpid(&mut parent, child.as_i32(), VirtualAddress::new(STATUS), 0, &sched)
        .unwrap();
    sched.join_all();

    let (seen, child_frame) = reports.recv().unwrap();
    assert_eq!(&seen, b"parent");
    let parent_frame = parent
        .address_space()
        .unwrap()
        .translate(text, &kernel.config().limits)
        .unwrap();
    assert_ne!(parent_frame.page(), child_frame.page());

    let mut mine = [0_u8; 6];
    kernel.copy_in(&mut parent, text, &mut mine).unwrap();
    assert_eq!(&mine, b"parent");
    assert_eq!(kernel.frame_stats().used, used_before);
    kernel.exit(parent, 0);
}

#[test]
fn exit_before_wait_keeps_the_code() {
    let kernel = boot(32, KernelConfig::default());
    let yielded = Arc::new(AtomicBool::new(false));
    let sched = HostScheduler::new(&kernel, &yielded, |kernel, thread, _| kernel.exit(thread, -3));

    let mut parent = common::process(&kernel);
    let child = kernel
        .fork(&parent, &syscall_frame(Sysno::Fork, 0, 0, 0), &sched)
        .unwrap();
    sched.join_all();
    assert_eq!(kernel.live_processes(), 1);

    let got = kernel.waitpid(&mut parent, child.as_i32(), VirtualAddress::new(STATUS), 0, &sched);
    assert_eq!(got, Ok(child));
    assert!(!yielded.load(Ordering::SeqCst));
    assert_eq!(status_word(&kernel, &mut parent), -3);

    // Reaped: the pid no longer names anything.
    let again = kernel.waitpid(&mut parent, child.as_i32(), VirtualAddress::new(STATUS), 0, &sched);
    assert_eq!(again, Err(ProcessError::InvalidPid));
    kernel.exit(parent, 0);
}

#[test]
fn many_children_run_concurrently() {
    let kernel = boot(256, KernelConfig::default());
    let yielded = Arc::new(AtomicBool::new(false));
    let sched = HostScheduler::new(&kernel, &yielded, |kernel, mut thread, _| {
        let code = thread.pid().as_i32();
        kernel
            .copy_out(&mut thread, VirtualAddress::new(TEXT), &code.to_ne_bytes())
            .unwrap();
        kernel.exit(thread, code * 10);
    });

    let mut parent = common::process(&kernel);
    kernel.copy_out(&mut parent, VirtualAddress::new(TEXT), &[0; 4]).unwrap();
    let children: Vec<_> = (0..8)
        .map(|_| {
            kernel
                .fork(&parent, &syscall_frame(Sysno::Fork, 0, 0, 0), &sched)
                .unwrap()
        })
        .collect();

    for child in children.iter().rev() {
        kernel
            .waitpid(&mut parent, child.as_i32(), VirtualAddress::new(STATUS), 0, &sched)
            .unwrap();
        assert_eq!(status_word(&kernel, &mut parent), child.as_i32() * 10);
    }
    sched.join_all();

    let mut word = [0_u8; 4];
    kernel.copy_in(&mut parent, VirtualAddress::new(TEXT), &mut word).unwrap();
    assert_eq!(word, [0; 4]);
    assert_eq!(kernel.live_processes(), 1);
    kernel.exit(parent, 0);
    assert_eq!(kernel.frame_stats().used, 0);
    assert_eq!(kernel.interrupts().depth(), 0);
}
