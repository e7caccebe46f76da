//! Integration tests for settings validation and the settings store.

use memsim_console::common::{AddressWidth, ConsoleError, ProcessId, ProcessKind, VirtAddr};
use memsim_console::process::{MigrationPlan, Process, ProcessRegistry};
use memsim_console::settings::{
    AllocationType, ConfigStore, RomSize, Settings, SettingsOptions, RAM_SIZES_GB,
};

fn settings_32bit() -> Settings {
    Settings {
        address_width: AddressWidth::Bits32,
        tlb_size: 32,
        ..Settings::for_ram(32)
    }
}

fn never(_: &MigrationPlan) -> bool {
    panic!("confirmation must not be requested")
}

fn registry_with(addrs: &[u64]) -> ProcessRegistry {
    let mut registry = ProcessRegistry::default();
    let processes = addrs
        .iter()
        .enumerate()
        .map(|(i, &addr)| Process {
            id: ProcessId::new(1001 + i as u32),
            kind: ProcessKind::user(format!("p{}", i)),
            size_gb: 1.0,
            has_priority: false,
            is_stopped: false,
            virtual_address: VirtAddr::new(addr),
            created: 0,
        })
        .collect();
    registry.restore(processes).unwrap();
    registry
}

/// Tests the RAM-dependent option tables.
#[test]
fn test_option_tables() {
    let small = SettingsOptions::for_ram(8);
    assert_eq!(small.tlb_sizes, vec![16]);
    assert_eq!(small.widths, vec![AddressWidth::Bits16]);

    let mid = SettingsOptions::for_ram(16);
    assert_eq!(mid.tlb_sizes, vec![16]);
    assert_eq!(mid.widths, vec![AddressWidth::Bits16, AddressWidth::Bits32]);

    let large = SettingsOptions::for_ram(32);
    assert_eq!(large.tlb_sizes, vec![16, 32]);
    assert_eq!(large.widths, AddressWidth::ALL.to_vec());

    let max = SettingsOptions::for_ram(64);
    assert_eq!(max.tlb_sizes, vec![16, 32, 64]);
}

/// Tests that every offered RAM size yields valid defaults.
#[test]
fn test_defaults_validate() {
    for ram in RAM_SIZES_GB {
        Settings::for_ram(ram).validate().unwrap();
    }
}

/// Tests rejection of values outside the option tables.
#[test]
fn test_validate_rejects() {
    let bad = [
        Settings {
            ram_size_gb: 3,
            ..Settings::default()
        },
        Settings {
            page_size_kb: 3,
            ..Settings::default()
        },
        Settings {
            tlb_size: 64,
            ..Settings::for_ram(32)
        },
        Settings {
            address_width: AddressWidth::Bits64,
            ..Settings::for_ram(16)
        },
        Settings {
            swap_percent: 21,
            ..Settings::default()
        },
    ];
    for settings in bad {
        assert!(matches!(
            settings.validate(),
            Err(ConsoleError::ValidationFailed(_))
        ));
    }
}

/// Tests wire labels of ROM sizes and allocation types.
#[test]
fn test_labels() {
    assert_eq!("1TB".parse::<RomSize>(), Ok(RomSize::Tb1));
    assert_eq!("128 gb".parse::<RomSize>(), Ok(RomSize::Gb128));
    assert_eq!(
        "non-contiguous".parse::<AllocationType>(),
        Ok(AllocationType::NonContiguous)
    );

    let json = serde_json::to_value(settings_32bit()).unwrap();
    assert_eq!(json["virtual_address_size"], "32-bit");
    assert_eq!(json["rom_size"], "32 GB");
    assert_eq!(json["allocation_type"], "Contiguous");
}

/// Tests first apply, no-change detection and a plain update.
#[test]
fn test_apply_and_no_change() {
    let mut store = ConfigStore::new();
    let mut registry = ProcessRegistry::default();

    let report = store
        .apply(settings_32bit(), &mut registry, &mut never)
        .unwrap();
    assert!(report.is_first());
    assert!(store.is_configured());

    let again = store.apply(settings_32bit(), &mut registry, &mut never);
    assert!(matches!(again, Err(ConsoleError::NoChange)));

    let updated = Settings {
        tlb_enabled: true,
        ..settings_32bit()
    };
    let report = store.apply(updated.clone(), &mut registry, &mut never).unwrap();
    assert_eq!(report.previous, Some(settings_32bit()));
    assert!(report.migration.is_none());
    assert_eq!(store.committed(), Some(&updated));
}

/// Tests that invalid candidates leave the committed settings alone.
#[test]
fn test_invalid_candidate_not_committed() {
    let mut store = ConfigStore::new();
    let mut registry = ProcessRegistry::default();
    store
        .apply(settings_32bit(), &mut registry, &mut never)
        .unwrap();

    let bad = Settings {
        page_size_kb: 5,
        ..settings_32bit()
    };
    assert!(store.apply(bad, &mut registry, &mut never).is_err());
    assert_eq!(store.committed(), Some(&settings_32bit()));
}

/// Tests that a declined narrowing changes nothing.
#[test]
fn test_declined_narrowing_rolls_back() {
    let mut store = ConfigStore::new();
    let mut registry = registry_with(&[0x1234, 0x5_0000]);
    store
        .apply(settings_32bit(), &mut registry, &mut never)
        .unwrap();

    let narrow = Settings {
        address_width: AddressWidth::Bits16,
        ..settings_32bit()
    };
    let mut asked = 0;
    let result = store.apply(narrow, &mut registry, &mut |plan: &MigrationPlan| {
        asked += 1;
        assert_eq!(plan.doomed_ids(), vec![ProcessId::new(1002)]);
        false
    });

    assert_eq!(asked, 1);
    match result {
        Err(ConsoleError::DestructiveMigration { doomed }) => {
            assert_eq!(doomed, vec![ProcessId::new(1002)])
        }
        other => panic!("expected DestructiveMigration, got {:?}", other),
    }
    assert_eq!(store.committed(), Some(&settings_32bit()));
    assert_eq!(registry.len(), 2);
}

/// Tests that a confirmed narrowing deletes only the doomed processes.
#[test]
fn test_confirmed_narrowing_deletes() {
    let mut store = ConfigStore::new();
    let mut registry = registry_with(&[0x1234, 0x5_0000]);
    store
        .apply(settings_32bit(), &mut registry, &mut never)
        .unwrap();

    let narrow = Settings {
        address_width: AddressWidth::Bits16,
        ..settings_32bit()
    };
    let report = store
        .apply(narrow, &mut registry, &mut |_: &MigrationPlan| true)
        .unwrap();

    assert_eq!(report.deleted.len(), 1);
    assert_eq!(report.deleted[0].id, ProcessId::new(1002));
    assert_eq!(registry.len(), 1);
    assert_eq!(
        registry.processes()[0]
            .virtual_address
            .format(AddressWidth::Bits16),
        "0x1234"
    );
    assert_eq!(
        store.committed().map(|s| s.address_width),
        Some(AddressWidth::Bits16)
    );
}

/// Tests that a lossless narrowing never prompts.
#[test]
fn test_lossless_narrowing_does_not_prompt() {
    let mut store = ConfigStore::new();
    let mut registry = registry_with(&[0x10, 0x20]);
    store
        .apply(settings_32bit(), &mut registry, &mut never)
        .unwrap();

    let narrow = Settings {
        address_width: AddressWidth::Bits16,
        ..settings_32bit()
    };
    let report = store.apply(narrow, &mut registry, &mut never).unwrap();
    assert!(report.deleted.is_empty());
    assert_eq!(report.migration.map(|p| p.kept.len()), Some(2));
}
