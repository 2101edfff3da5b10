mod common;

use common::{KERNEL_FREE, Machine};
use kernel_alloc::FrameAllocError;
use kernel_memory_addresses::{FrameNumber, PhysicalAddress, VirtualAddress};
use kernel_vmem::{AddressSpace, DirectoryIndex, PagingError, PdEntry, PtEntry};

fn f(n: u32) -> FrameNumber {
    FrameNumber::new(n)
}

fn va(v: u32) -> VirtualAddress {
    VirtualAddress::new(v)
}

#[test]
fn shared_region_of_two_pages() {
    let m = Machine::with_shared_pages(2);
    let space = AddressSpace::new(&m.paging).expect("kernel pool has room");

    assert_eq!(space.directory_frame(), f(17));
    assert_eq!(m.kernel.free_frame_count(), KERNEL_FREE - 2);

    let pde = space.directory_entry(DirectoryIndex::new(0));
    assert!(pde.is_present());
    assert!(pde.writable());
    assert_eq!(pde.table(), Some(f(18)));

    assert_eq!(
        space.table_entry(va(0x0000_0000)),
        Some(PtEntry::make_page(f(0), true, false))
    );
    assert_eq!(
        space.table_entry(va(0x0000_1000)),
        Some(PtEntry::make_page(f(1), true, false))
    );
    let present = (0..1024)
        .filter_map(|page| space.table_entry(va(page * 4096)))
        .filter(|e| e.is_present())
        .count();
    assert_eq!(present, 2);

    for i in 1..1024 {
        assert_eq!(
            space.directory_entry(DirectoryIndex::new(i)),
            PdEntry::not_present_writable()
        );
    }
}

#[test]
fn shared_region_is_identity_mapped() {
    let m = Machine::with_shared_pages(2);
    let space = AddressSpace::new(&m.paging).expect("kernel pool has room");

    assert_eq!(space.translate(va(0x0000_1234)), Some(PhysicalAddress::new(0x1234)));
    assert_eq!(space.translate(va(0x0000_2000)), None);
    assert_eq!(space.table_entry(va(0x0040_0000)), None);
    assert_eq!(space.translate(va(0xC000_0000)), None);
}

#[test]
fn partial_pages_are_not_shared() {
    let m = Machine::bare();
    m.paging
        .init_paging(m.kernel, m.process, 0x1800)
        .expect("first initialization");
    let space = AddressSpace::new(&m.paging).expect("kernel pool has room");

    assert!(space.translate(va(0x0FFF)).is_some());
    assert!(space.translate(va(0x1000)).is_none());
}

#[test]
fn full_table_can_be_shared() {
    let m = Machine::with_shared_pages(1024);
    let space = AddressSpace::new(&m.paging).expect("kernel pool has room");

    assert_eq!(
        space.translate(va(0x003F_FFFF)),
        Some(PhysicalAddress::new(0x003F_FFFF))
    );
    assert_eq!(space.table_entry(va(0x0040_0000)), None);
}

#[test]
fn address_spaces_are_independent() {
    let m = Machine::with_shared_pages(2);
    let first = AddressSpace::new(&m.paging).expect("kernel pool has room");
    let second = AddressSpace::new(&m.paging).expect("kernel pool has room");

    assert_eq!(first.directory_frame(), f(17));
    assert_eq!(second.directory_frame(), f(19));
    assert_eq!(
        second.directory_entry(DirectoryIndex::new(0)).table(),
        Some(f(20))
    );
    assert_eq!(m.kernel.free_frame_count(), KERNEL_FREE - 4);
}

#[test]
fn load_switches_the_active_space() {
    let m = Machine::with_shared_pages(2);
    let first = AddressSpace::new(&m.paging).expect("kernel pool has room");
    let second = AddressSpace::new(&m.paging).expect("kernel pool has room");
    assert!(!first.is_active());

    unsafe { first.load() };
    assert!(first.is_active());
    assert_eq!(m.paging.current_directory(), Some(f(17)));
    assert_eq!(m.paging.hardware().cr3.get(), 17 * 4096);

    unsafe { second.load() };
    assert!(!first.is_active());
    assert!(second.is_active());
    assert_eq!(m.paging.hardware().cr3.get(), 19 * 4096);
}

#[test]
fn construction_requires_initialization() {
    let m = Machine::bare();
    assert_eq!(
        AddressSpace::new(&m.paging).map(|_| ()),
        Err(PagingError::NotInitialized)
    );
    assert_eq!(m.kernel.free_frame_count(), KERNEL_FREE);
}

#[test]
fn failed_construction_returns_the_directory_frame() {
    let m = Machine::with_shared_pages(2);
    m.kernel
        .get_frames(KERNEL_FREE - 1)
        .expect("kernel pool has room");

    assert_eq!(
        AddressSpace::new(&m.paging).map(|_| ()),
        Err(PagingError::OutOfFrames(FrameAllocError::Exhausted {
            requested: 1,
            free: 0
        }))
    );
    assert_eq!(m.kernel.free_frame_count(), 1);
}
