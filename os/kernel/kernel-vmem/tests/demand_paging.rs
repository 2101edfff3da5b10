mod common;

use common::{
    KERNEL_FREE, Machine, PROCESS_FREE, SimHardware, TestPhys, USER_WRITE_NOT_PRESENT,
    WRITE_PROTECTION,
};
use kernel_alloc::FrameAllocError;
use kernel_memory_addresses::{FrameNumber, PhysicalAddress, VirtualAddress};
use kernel_vmem::{
    AddressSpace, DirectoryIndex, FaultContext, FaultResolution, PageFaultError, PagingError,
    PdEntry,
};

fn f(n: u32) -> FrameNumber {
    FrameNumber::new(n)
}

fn va(v: u32) -> VirtualAddress {
    VirtualAddress::new(v)
}

/// A new address space, loaded. The first one built on a machine uses
/// directory frame 17 and shared table frame 18.
fn loaded_space(m: &Machine) -> AddressSpace<'_, TestPhys, SimHardware> {
    let space = AddressSpace::new(&m.paging).expect("kernel pool has room");
    unsafe { space.load() };
    space
}

#[test]
fn first_fault_creates_the_table_second_reuses_it() {
    let m = Machine::with_shared_pages(2);
    let space = loaded_space(&m);

    assert_eq!(
        m.fault(0x0040_0123, USER_WRITE_NOT_PRESENT),
        Ok(FaultResolution::Mapped {
            address: va(0x0040_0123),
            frame: f(65),
            new_table: Some(f(19)),
        })
    );
    assert_eq!(m.kernel.free_frame_count(), KERNEL_FREE - 3);
    assert_eq!(m.process.free_frame_count(), PROCESS_FREE - 1);

    let pde = space.directory_entry(DirectoryIndex::new(1));
    assert_eq!(pde, PdEntry::make_table(f(19)));

    assert_eq!(
        m.fault(0x0040_5000, USER_WRITE_NOT_PRESENT),
        Ok(FaultResolution::Mapped {
            address: va(0x0040_5000),
            frame: f(66),
            new_table: None,
        })
    );
    assert_eq!(m.kernel.free_frame_count(), KERNEL_FREE - 3);
    assert_eq!(m.process.free_frame_count(), PROCESS_FREE - 2);
}

#[test]
fn faulted_pages_are_user_writable() {
    let m = Machine::with_shared_pages(2);
    let space = loaded_space(&m);
    m.fault(0x0040_0123, USER_WRITE_NOT_PRESENT)
        .expect("demand fault");

    let pte = space.table_entry(va(0x0040_0000)).expect("table exists");
    assert!(pte.is_present());
    assert!(pte.writable());
    assert!(pte.user());
    assert_eq!(
        space.translate(va(0x0040_0123)),
        Some(PhysicalAddress::new(65 * 4096 + 0x123))
    );
    // The rest of the new table stays unmapped.
    assert_eq!(space.translate(va(0x0040_1000)), None);
}

#[test]
fn fault_above_the_shared_pages_uses_the_shared_table() {
    let m = Machine::with_shared_pages(2);
    let space = loaded_space(&m);

    assert_eq!(
        m.fault(0x0000_3000, 0),
        Ok(FaultResolution::Mapped {
            address: va(0x0000_3000),
            frame: f(65),
            new_table: None,
        })
    );
    assert_eq!(space.translate(va(0x0000_3000)), Some(f(65).base()));
    assert_eq!(m.kernel.free_frame_count(), KERNEL_FREE - 2);
}

#[test]
fn repeated_fault_allocates_nothing() {
    let m = Machine::with_shared_pages(2);
    let _space = loaded_space(&m);
    m.fault(0x0080_0000, USER_WRITE_NOT_PRESENT)
        .expect("demand fault");
    let process_free = m.process.free_frame_count();

    assert_eq!(
        m.fault(0x0080_0004, USER_WRITE_NOT_PRESENT),
        Ok(FaultResolution::Spurious {
            address: va(0x0080_0004)
        })
    );
    assert_eq!(m.process.free_frame_count(), process_free);
}

#[test]
fn protection_faults_are_not_handled() {
    let m = Machine::with_shared_pages(2);
    let _space = loaded_space(&m);

    assert_eq!(
        m.fault(0x0000_1000, WRITE_PROTECTION),
        Err(PagingError::UnhandledFault {
            address: va(0x0000_1000),
            error_code: PageFaultError::from_bits(WRITE_PROTECTION),
        })
    );
    assert_eq!(m.kernel.free_frame_count(), KERNEL_FREE - 2);
    assert_eq!(m.process.free_frame_count(), PROCESS_FREE);
}

#[test]
fn reserved_bit_faults_are_not_handled() {
    let m = Machine::with_shared_pages(2);
    let _space = loaded_space(&m);
    assert!(matches!(
        m.fault(0x0040_0000, 0b1000),
        Err(PagingError::UnhandledFault { .. })
    ));
}

#[test]
fn fault_without_a_loaded_directory() {
    let m = Machine::with_shared_pages(2);
    let _space = AddressSpace::new(&m.paging).expect("kernel pool has room");
    assert_eq!(
        m.fault(0x0040_0000, USER_WRITE_NOT_PRESENT),
        Err(PagingError::NoActiveTable)
    );
}

#[test]
fn fault_before_initialization() {
    let m = Machine::bare();
    assert_eq!(
        m.fault(0x0040_0000, USER_WRITE_NOT_PRESENT),
        Err(PagingError::NotInitialized)
    );
}

#[test]
fn failed_leaf_allocation_unlinks_the_new_table() {
    let m = Machine::with_shared_pages(2);
    let space = loaded_space(&m);
    m.process
        .get_frames(PROCESS_FREE)
        .expect("process pool has room");

    assert_eq!(
        m.fault(0x0040_0000, USER_WRITE_NOT_PRESENT),
        Err(PagingError::OutOfFrames(FrameAllocError::Exhausted {
            requested: 1,
            free: 0
        }))
    );
    assert_eq!(
        space.directory_entry(DirectoryIndex::new(1)),
        PdEntry::not_present_writable()
    );
    assert_eq!(m.kernel.free_frame_count(), KERNEL_FREE - 2);
}

#[test]
fn faults_resolve_in_the_loaded_space() {
    let m = Machine::with_shared_pages(2);
    let first = loaded_space(&m);
    let second = loaded_space(&m);
    assert!(second.is_active());

    m.fault(0x0040_0000, USER_WRITE_NOT_PRESENT)
        .expect("demand fault");
    assert!(second.translate(va(0x0040_0000)).is_some());
    assert!(first.translate(va(0x0040_0000)).is_none());
}

#[test]
#[should_panic(expected = "cannot handle page fault")]
fn handle_fault_is_fatal_on_protection_faults() {
    let m = Machine::with_shared_pages(2);
    let _space = loaded_space(&m);
    m.paging.hardware().cr2.set(0x1000);
    m.paging.handle_fault(FaultContext::new(WRITE_PROTECTION));
}

#[test]
fn handle_fault_returns_the_resolution() {
    let m = Machine::with_shared_pages(2);
    let _space = loaded_space(&m);
    m.paging.hardware().cr2.set(0x00C0_0010);
    let resolution = m
        .paging
        .handle_fault(FaultContext::new(USER_WRITE_NOT_PRESENT));
    assert_eq!(resolution.address(), va(0x00C0_0010));
}
