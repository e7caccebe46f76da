//! Integration tests for address-width migration.

use memsim_console::common::{AddressWidth, ProcessId, ProcessKind, VirtAddr};
use memsim_console::process::{AddressWidthMigrator, Process};

fn process(id: u32, addr: u64) -> Process {
    Process {
        id: ProcessId::new(id),
        kind: ProcessKind::user(format!("p{}", id)),
        size_gb: 1.0,
        has_priority: false,
        is_stopped: false,
        virtual_address: VirtAddr::new(addr),
        created: u64::from(id),
    }
}

/// Tests narrowing 32-bit to 16-bit keeps fitting addresses and dooms the rest.
#[test]
fn test_narrow_32_to_16() {
    let procs = vec![process(1001, 0x0000_1234), process(1002, 0x0005_0000)];
    let plan = AddressWidthMigrator::migrate(AddressWidth::Bits32, AddressWidth::Bits16, &procs);

    assert_eq!(plan.kept, vec![ProcessId::new(1001)]);
    assert_eq!(plan.doomed_ids(), vec![ProcessId::new(1002)]);
    assert!(plan.is_destructive());
    assert_eq!(procs[0].virtual_address.format(plan.to), "0x1234");
}

/// Tests that widening never changes or drops an address.
#[test]
fn test_widen_preserves_values() {
    let procs = vec![process(1001, 0xFFFF), process(1002, 0)];
    let plan = AddressWidthMigrator::migrate(AddressWidth::Bits16, AddressWidth::Bits64, &procs);

    assert!(!plan.is_destructive());
    assert_eq!(plan.kept.len(), 2);
    assert_eq!(procs[0].virtual_address.format(plan.to), "0x000000000000ffff");
}

/// Tests narrowing 64-bit to 32-bit checks bits 32 through 63.
#[test]
fn test_narrow_64_to_32() {
    let procs = vec![
        process(1001, 0xFFFF_FFFF),
        process(1002, 0x1_0000_0000),
        process(1003, 0x8000_0000_0000_0000),
    ];
    let plan = AddressWidthMigrator::migrate(AddressWidth::Bits64, AddressWidth::Bits32, &procs);

    assert_eq!(plan.kept, vec![ProcessId::new(1001)]);
    assert_eq!(
        plan.doomed_ids(),
        vec![ProcessId::new(1002), ProcessId::new(1003)]
    );
}

/// Tests the truncated bit mask for each direction.
#[test]
fn test_truncated_bits() {
    assert_eq!(
        AddressWidthMigrator::truncated_bits(AddressWidth::Bits32, AddressWidth::Bits16),
        0xFFFF_0000
    );
    assert_eq!(
        AddressWidthMigrator::truncated_bits(AddressWidth::Bits16, AddressWidth::Bits32),
        0
    );
    assert_eq!(
        AddressWidthMigrator::truncated_bits(AddressWidth::Bits64, AddressWidth::Bits16),
        !0xFFFF
    );
}

/// Tests that an empty process list produces an empty plan.
#[test]
fn test_empty_plan() {
    let plan = AddressWidthMigrator::migrate(AddressWidth::Bits64, AddressWidth::Bits16, &[]);
    assert!(plan.kept.is_empty());
    assert!(!plan.is_destructive());
}
