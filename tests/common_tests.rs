//! Integration tests for shared address and identity types.

use memsim_console::common::{AddressWidth, ProcessId, ProcessKind, SystemRole, VirtAddr};

/// Tests that each width masks to its bit count.
#[test]
fn test_width_masks() {
    assert_eq!(AddressWidth::Bits16.mask(), 0xFFFF);
    assert_eq!(AddressWidth::Bits32.mask(), 0xFFFF_FFFF);
    assert_eq!(AddressWidth::Bits64.mask(), u64::MAX);
}

/// Tests width fit checks at the boundary.
#[test]
fn test_width_fits() {
    assert!(AddressWidth::Bits16.fits(0xFFFF));
    assert!(!AddressWidth::Bits16.fits(0x1_0000));
    assert!(AddressWidth::Bits32.fits(0xFFFF_FFFF));
    assert!(AddressWidth::Bits64.fits(u64::MAX));
}

/// Tests address rendering with zero padding per width.
#[test]
fn test_address_format() {
    let addr = VirtAddr::new(0xABC);
    assert_eq!(addr.format(AddressWidth::Bits16), "0x0abc");
    assert_eq!(addr.format(AddressWidth::Bits32), "0x00000abc");
    assert_eq!(VirtAddr::new(0).format(AddressWidth::Bits64), "0x0000000000000000");
}

/// Tests parsing rendered addresses back.
#[test]
fn test_address_parse() {
    assert_eq!(VirtAddr::parse("0x00001234"), Some(VirtAddr::new(0x1234)));
    assert_eq!(VirtAddr::parse("1234"), Some(VirtAddr::new(0x1234)));
    assert_eq!(VirtAddr::parse("0xZZ"), None);
}

/// Tests width labels on the wire.
#[test]
fn test_width_serde_labels() {
    let json = serde_json::to_string(&AddressWidth::Bits32).unwrap();
    assert_eq!(json, "\"32-bit\"");
    let back: AddressWidth = serde_json::from_str("\"64-bit\"").unwrap();
    assert_eq!(back, AddressWidth::Bits64);
}

/// Tests that identifiers start at 1001 and increase.
#[test]
fn test_process_id_sequence() {
    assert_eq!(ProcessId::FIRST.val(), 1001);
    assert_eq!(ProcessId::FIRST.next(), ProcessId::new(1002));
    assert_eq!("1005".parse::<ProcessId>().unwrap(), ProcessId::new(1005));
}

/// Tests system role names and parsing.
#[test]
fn test_system_roles() {
    assert_eq!(SystemRole::ALL.len(), 5);
    for role in SystemRole::ALL {
        assert_eq!(role.name().parse::<SystemRole>(), Ok(role));
    }
    assert!("init".parse::<SystemRole>().is_err());
}

/// Tests process kind names and type labels.
#[test]
fn test_process_kind() {
    let user = ProcessKind::user("editor");
    assert_eq!(user.name(), "editor");
    assert_eq!(user.type_label(), "User");

    let system = ProcessKind::system(SystemRole::MemoryManager);
    assert_eq!(system.name(), "memory_manager");
    assert_eq!(system.type_label(), "System");
}
