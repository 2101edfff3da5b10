mod common;

use common::Machine;
use kernel_vmem::{AddressSpace, PagingError};

#[test]
fn initialization_happens_once() {
    let m = Machine::bare();
    assert!(!m.paging.is_initialized());
    assert_eq!(m.paging.config().map(|_| ()), Err(PagingError::NotInitialized));

    assert_eq!(m.paging.init_paging(m.kernel, m.process, 0x2000), Ok(()));
    assert!(m.paging.is_initialized());

    assert_eq!(
        m.paging.init_paging(m.kernel, m.process, 0x4000),
        Err(PagingError::AlreadyInitialized)
    );
    let config = m.paging.config().expect("initialized");
    assert_eq!(config.shared_size, 0x2000);
    assert_eq!(config.shared_pages(), 2);
    assert!(core::ptr::eq(config.kernel_pool, m.kernel));
    assert!(core::ptr::eq(config.process_pool, m.process));
}

#[test]
fn shared_region_must_fit_one_table() {
    let m = Machine::bare();
    assert_eq!(
        m.paging.init_paging(m.kernel, m.process, 0x0040_1000),
        Err(PagingError::SharedRegionTooLarge {
            size: 0x0040_1000,
            max: 0x0040_0000
        })
    );
    assert!(!m.paging.is_initialized());
    assert_eq!(m.paging.init_paging(m.kernel, m.process, 0x0040_0000), Ok(()));
}

#[test]
fn enable_paging_requires_a_loaded_directory() {
    let m = Machine::with_shared_pages(2);
    let _space = AddressSpace::new(&m.paging).expect("kernel pool has room");

    assert_eq!(unsafe { m.paging.enable_paging() }, Err(PagingError::NoActiveTable));
    assert!(!m.paging.is_paging_enabled());
    assert!(!m.paging.hardware().paging.get());
}

#[test]
fn enable_paging_is_idempotent() {
    let m = Machine::with_shared_pages(2);
    let space = AddressSpace::new(&m.paging).expect("kernel pool has room");
    unsafe { space.load() };

    assert_eq!(unsafe { m.paging.enable_paging() }, Ok(()));
    assert!(m.paging.is_paging_enabled());
    assert!(m.paging.hardware().paging.get());

    assert_eq!(unsafe { m.paging.enable_paging() }, Ok(()));
    assert_eq!(m.paging.hardware().enable_calls.get(), 1);
}

#[test]
fn paging_already_on_in_hardware_is_adopted() {
    let m = Machine::with_shared_pages(2);
    let space = AddressSpace::new(&m.paging).expect("kernel pool has room");
    unsafe { space.load() };
    m.paging.hardware().paging.set(true);

    assert_eq!(unsafe { m.paging.enable_paging() }, Ok(()));
    assert!(m.paging.is_paging_enabled());
    assert_eq!(m.paging.hardware().enable_calls.get(), 0);
}

#[test]
fn errors_render_readably() {
    let unhandled = PagingError::UnhandledFault {
        address: kernel_memory_addresses::VirtualAddress::new(0x1000),
        error_code: kernel_vmem::PageFaultError::from_bits(0b011),
    };
    assert!(unhandled.to_string().ends_with("Write access to protected page"));
    assert_eq!(
        PagingError::NoActiveTable.to_string(),
        "no page directory is loaded"
    );
}
