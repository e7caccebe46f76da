//! Memory-System Settings.
//!
//! `Settings` is the canonical record of the simulated machine: RAM and ROM
//! size, page size, TLB configuration, virtual address width, swap share and
//! allocation policy. The option tables here decide which page sizes, TLB
//! sizes and address widths a given RAM size unlocks; `Settings::validate`
//! enforces them.

/// Settings store with commit, no-change detection and width migration.
pub mod store;

pub use store::{ApplyReport, ConfigStore, ConfirmMigration};

use crate::common::{AddressWidth, ConsoleError, GIB};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// RAM sizes offered to the operator, in GB.
pub const RAM_SIZES_GB: [u32; 18] = [
    1, 2, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 44, 48, 52, 56, 60, 64,
];

/// Smallest and largest page size exponents (4 KB through 2 MB).
const PAGE_SHIFT_MIN: u32 = 12;
const PAGE_SHIFT_MAX: u32 = 21;

/// Upper bound of the swap share, in percent.
pub const MAX_SWAP_PERCENT: u8 = 20;

/// ROM size label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RomSize {
    #[serde(rename = "32 GB")]
    Gb32,
    #[serde(rename = "64 GB")]
    Gb64,
    #[serde(rename = "128 GB")]
    Gb128,
    #[serde(rename = "256 GB")]
    Gb256,
    #[serde(rename = "512 GB")]
    Gb512,
    #[serde(rename = "1 TB")]
    Tb1,
    #[serde(rename = "2 TB")]
    Tb2,
    #[serde(rename = "4 TB")]
    Tb4,
}

impl RomSize {
    /// Every ROM size, smallest first.
    pub const ALL: [RomSize; 8] = [
        Self::Gb32,
        Self::Gb64,
        Self::Gb128,
        Self::Gb256,
        Self::Gb512,
        Self::Tb1,
        Self::Tb2,
        Self::Tb4,
    ];

    /// Returns the display label, e.g. `"1 TB"`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Gb32 => "32 GB",
            Self::Gb64 => "64 GB",
            Self::Gb128 => "128 GB",
            Self::Gb256 => "256 GB",
            Self::Gb512 => "512 GB",
            Self::Tb1 => "1 TB",
            Self::Tb2 => "2 TB",
            Self::Tb4 => "4 TB",
        }
    }
}

impl fmt::Display for RomSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RomSize {
    type Err = String;

    /// Accepts labels with or without the inner space (`"1 TB"` or `"1TB"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        Self::ALL
            .iter()
            .copied()
            .find(|rom| rom.label().replace(' ', "").eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| format!("unknown ROM size '{}'", s))
    }
}

/// Memory allocation policy used by the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllocationType {
    #[default]
    Contiguous,
    #[serde(rename = "Non-Contiguous")]
    NonContiguous,
}

impl AllocationType {
    /// Returns the wire label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Contiguous => "Contiguous",
            Self::NonContiguous => "Non-Contiguous",
        }
    }
}

impl fmt::Display for AllocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AllocationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contiguous" => Ok(Self::Contiguous),
            "non-contiguous" | "noncontiguous" => Ok(Self::NonContiguous),
            _ => Err(format!("unknown allocation type '{}'", s)),
        }
    }
}

/// Option sets unlocked by a RAM size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettingsOptions {
    /// Allowed page sizes in KB, ascending.
    pub page_sizes_kb: Vec<u32>,
    /// Allowed TLB entry counts, ascending.
    pub tlb_sizes: Vec<u32>,
    /// Allowed virtual address widths, narrowest first.
    pub widths: Vec<AddressWidth>,
}

impl SettingsOptions {
    /// Computes the option sets for `ram_size_gb`.
    pub fn for_ram(ram_size_gb: u32) -> Self {
        let ram_kb = u64::from(ram_size_gb) * GIB / 1024;
        let page_sizes_kb = (PAGE_SHIFT_MIN..=PAGE_SHIFT_MAX)
            .map(|shift| 1u64 << shift)
            .filter(|&bytes| bytes <= ram_kb)
            .map(|bytes| (bytes / 1024) as u32)
            .collect();

        let tlb_sizes = match ram_size_gb {
            0..=16 => vec![16],
            17..=32 => vec![16, 32],
            _ => vec![16, 32, 64],
        };

        let widths = match ram_size_gb {
            0..=15 => vec![AddressWidth::Bits16],
            16..=31 => vec![AddressWidth::Bits16, AddressWidth::Bits32],
            _ => AddressWidth::ALL.to_vec(),
        };

        Self {
            page_sizes_kb,
            tlb_sizes,
            widths,
        }
    }
}

/// The memory-system settings document.
///
/// Field names and value encodings match the settings document exchanged
/// with the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub ram_size_gb: u32,
    pub page_size_kb: u32,
    pub tlb_size: u32,
    pub tlb_enabled: bool,
    #[serde(rename = "virtual_address_size")]
    pub address_width: AddressWidth,
    pub rom_size: RomSize,
    #[serde(default)]
    pub swap_percent: u8,
    #[serde(default)]
    pub allocation_type: AllocationType,
}

impl Default for Settings {
    /// Returns the session-start defaults: 1 GB RAM with its first options.
    fn default() -> Self {
        Self::for_ram(1)
    }
}

impl Settings {
    /// Returns settings for `ram_size_gb` with the first option of every set.
    pub fn for_ram(ram_size_gb: u32) -> Self {
        let options = SettingsOptions::for_ram(ram_size_gb);
        Self {
            ram_size_gb,
            page_size_kb: options.page_sizes_kb.first().copied().unwrap_or(4),
            tlb_size: options.tlb_sizes[0],
            tlb_enabled: false,
            address_width: options.widths[0],
            rom_size: RomSize::Gb32,
            swap_percent: 0,
            allocation_type: AllocationType::Contiguous,
        }
    }

    /// Returns the RAM size in bytes.
    pub fn ram_size_bytes(&self) -> u64 {
        u64::from(self.ram_size_gb) * GIB
    }

    /// Returns the option sets implied by the current RAM size.
    pub fn options(&self) -> SettingsOptions {
        SettingsOptions::for_ram(self.ram_size_gb)
    }

    /// Checks every field against the option sets of the current RAM size.
    pub fn validate(&self) -> Result<(), ConsoleError> {
        if !RAM_SIZES_GB.contains(&self.ram_size_gb) {
            return Err(ConsoleError::ValidationFailed(format!(
                "RAM size {} GB is not offered",
                self.ram_size_gb
            )));
        }

        let options = self.options();
        if !options.page_sizes_kb.contains(&self.page_size_kb) {
            return Err(ConsoleError::ValidationFailed(format!(
                "page size {} KB is not available with {} GB RAM",
                self.page_size_kb, self.ram_size_gb
            )));
        }
        if !options.tlb_sizes.contains(&self.tlb_size) {
            return Err(ConsoleError::ValidationFailed(format!(
                "TLB size {} is not available with {} GB RAM",
                self.tlb_size, self.ram_size_gb
            )));
        }
        if !options.widths.contains(&self.address_width) {
            return Err(ConsoleError::ValidationFailed(format!(
                "{} addresses require more RAM than {} GB",
                self.address_width, self.ram_size_gb
            )));
        }
        if self.swap_percent > MAX_SWAP_PERCENT {
            return Err(ConsoleError::ValidationFailed(format!(
                "swap share {}% exceeds {}%",
                self.swap_percent, MAX_SWAP_PERCENT
            )));
        }
        Ok(())
    }

    /// Prints the settings block in the console's report layout.
    pub fn print(&self) {
        println!("Environment Settings");
        println!("--------------------");
        println!("  RAM Size:           {} GB", self.ram_size_gb);
        println!("  Page Size:          {} KB", self.page_size_kb);
        println!("  TLB Size:           {}", self.tlb_size);
        println!(
            "  TLB:                {}",
            if self.tlb_enabled {
                "Enabled"
            } else {
                "Disabled"
            }
        );
        println!("  Virtual Addresses:  {}", self.address_width);
        println!("  ROM Size:           {}", self.rom_size);
        println!("  Swap:               {}%", self.swap_percent);
        println!("  Allocation:         {}", self.allocation_type);
        println!("--------------------");
    }
}
