mod common;

use common::{TEXT, boot};
use kernel_info::config::{KernelConfig, VmLimits};
use kernel_info::memory::USER_STACK;
use kernel_memory_addresses::VirtualAddress;
use kernel_vmem::{FaultKind, RegionKind, SegmentBacking, SegmentPermissions, VmError};
use std::sync::Arc;

fn va(x: u64) -> VirtualAddress {
    VirtualAddress::new(x)
}

#[test]
fn file_backed_segment_is_loaded_on_first_touch() {
    let kernel = boot(32, KernelConfig::default());
    let image: Vec<u8> = (0..0x800_u32).map(|i| u8::try_from(i % 251).unwrap() + 1).collect();

    let mut thread = kernel.create_process().unwrap();
    let aspace = kernel.replace_address_space(&mut thread);
    aspace
        .define_region(va(TEXT), 0x1000, SegmentPermissions::rwx(true, false, true))
        .unwrap()
        .set_backing(SegmentBacking {
            file: Arc::new(image.clone()),
            offset: 0,
            vaddr: va(TEXT),
            file_len: 0x800,
        });
    aspace.complete_load();

    let pa = kernel.vm_fault(&mut thread, FaultKind::Read, va(TEXT + 0x10)).unwrap();
    assert_eq!(pa.offset().as_usize(), 0x10);
    assert_eq!(kernel.frame_stats().used, 1);

    let mut page = vec![0xAA_u8; 0x1000];
    kernel.copy_in(&mut thread, va(TEXT), &mut page).unwrap();
    assert_eq!(&page[..0x800], image.as_slice());
    assert!(page[0x800..].iter().all(|&b| b == 0));

    // Cached now: a write costs no new frame.
    kernel.copy_out(&mut thread, va(TEXT + 0x10), &[9, 9]).unwrap();
    assert_eq!(kernel.frame_stats().used, 1);

    kernel.exit(thread, 0);
    assert_eq!(kernel.frame_stats().used, 0);
}

#[test]
fn repeated_fault_maps_the_same_frame() {
    let kernel = boot(16, KernelConfig::default());
    let mut thread = common::process(&kernel);

    let first = kernel.vm_fault(&mut thread, FaultKind::Write, va(TEXT)).unwrap();
    let again = kernel.vm_fault(&mut thread, FaultKind::Read, va(TEXT + 8)).unwrap();
    assert_eq!(first.page(), again.page());
    assert_eq!(kernel.frame_stats().used, 1);
    assert_eq!(kernel.tlb_entries(), 1);
    kernel.exit(thread, 0);
}

#[test]
fn heap_pages_are_capped() {
    let limits = VmLimits::new().with_heap_physical_pages(4);
    let kernel = boot(32, KernelConfig::default().with_limits(limits));
    let mut thread = common::process(&kernel);

    let base = kernel.sbrk(&mut thread, 8 * 4096).unwrap();
    for i in 0..4 {
        kernel
            .vm_fault(&mut thread, FaultKind::Write, base + i * 4096)
            .unwrap();
    }
    let fifth = base + 4 * 4096;
    let err = kernel.vm_fault(&mut thread, FaultKind::Write, fifth).unwrap_err();
    assert_eq!(
        err,
        VmError::PhysicalLimit {
            region: RegionKind::Heap,
            address: fifth,
        }
    );
    assert!(err.is_fault());
    assert_eq!(kernel.interrupts().depth(), 0);
    assert_eq!(kernel.frame_stats().used, 4);
    kernel.exit(thread, 1);
}

#[test]
fn stack_grows_down_on_demand() {
    let kernel = boot(16, KernelConfig::default());
    let mut thread = common::process(&kernel);

    kernel.copy_out(&mut thread, va(USER_STACK - 4), &7_i32.to_ne_bytes()).unwrap();
    kernel
        .vm_fault(&mut thread, FaultKind::Write, va(USER_STACK - 3 * 4096))
        .unwrap();

    let stack = thread.address_space().unwrap().region(RegionKind::Stack);
    assert_eq!(stack.resident_pages(), 2);
    assert_eq!(stack.end(), va(USER_STACK));
    assert!(stack.base() <= va(USER_STACK - 3 * 4096));
    kernel.exit(thread, 0);
}

#[test]
fn fault_family_errors() {
    let kernel = boot(16, KernelConfig::default());
    let mut thread = common::process(&kernel);

    assert_eq!(
        kernel.vm_fault(&mut thread, FaultKind::ReadOnly, va(TEXT + 4)),
        Err(VmError::ReadOnly(va(TEXT)))
    );
    assert_eq!(
        kernel.vm_fault(&mut thread, FaultKind::Read, va(0x1000)),
        Err(VmError::InvalidAddress(va(0x1000)))
    );
    // Beyond the current break.
    assert!(matches!(
        kernel.vm_fault(&mut thread, FaultKind::Read, va(TEXT + 0x1000)),
        Err(VmError::InvalidAddress(_))
    ));

    let mut bare = kernel.create_process().unwrap();
    assert_eq!(
        kernel.vm_fault(&mut bare, FaultKind::Read, va(TEXT)),
        Err(VmError::NoAddressSpace)
    );
    assert_eq!(kernel.interrupts().depth(), 0);
    assert_eq!(kernel.frame_stats().used, 0);
    kernel.exit(bare, 0);
    kernel.exit(thread, 0);
}

#[test]
fn full_translation_cache_is_an_error() {
    let kernel = boot(96, KernelConfig::default());
    let mut thread = kernel.create_process().unwrap();
    let aspace = kernel.replace_address_space(&mut thread);
    aspace
        .define_region(va(TEXT), 65 * 4096, SegmentPermissions::rwx(true, true, false))
        .unwrap();
    aspace.complete_load();

    for i in 0..64 {
        kernel
            .vm_fault(&mut thread, FaultKind::Read, va(TEXT + i * 4096))
            .unwrap();
    }
    assert_eq!(kernel.tlb_entries(), 64);
    let last = va(TEXT + 64 * 4096);
    assert_eq!(
        kernel.vm_fault(&mut thread, FaultKind::Read, last),
        Err(VmError::TlbExhausted(last))
    );
    assert_eq!(kernel.interrupts().depth(), 0);
    kernel.exit(thread, 0);
    assert_eq!(kernel.tlb_entries(), 0);
}

#[test]
fn out_of_frames_is_a_fault() {
    let kernel = boot(2, KernelConfig::default());
    let mut thread = common::process(&kernel);
    let base = kernel.sbrk(&mut thread, 3 * 4096).unwrap();

    kernel.vm_fault(&mut thread, FaultKind::Write, base).unwrap();
    kernel.vm_fault(&mut thread, FaultKind::Write, base + 4096).unwrap();
    let third = base + 2 * 4096;
    let err = kernel.vm_fault(&mut thread, FaultKind::Write, third).unwrap_err();
    assert_eq!(err, VmError::NoFrame(third));
    assert!(err.is_fault());
    assert_eq!(kernel.interrupts().depth(), 0);
    kernel.exit(thread, 0);
}

#[test]
fn copy_out_rejects_kernel_addresses() {
    let kernel = boot(8, KernelConfig::default());
    let mut thread = common::process(&kernel);
    let target = va(USER_STACK - 2);
    assert_eq!(
        kernel.copy_out(&mut thread, target, &[1, 2, 3, 4]),
        Err(VmError::InvalidAddress(target))
    );
    assert_eq!(
        kernel.copy_in(&mut thread, VirtualAddress::zero(), &mut [0; 4]),
        Err(VmError::InvalidAddress(VirtualAddress::zero()))
    );
    kernel.exit(thread, 0);
}
