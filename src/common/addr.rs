//! Virtual Address Widths.
//!
//! The console supports three virtual address widths. An address is stored as
//! a plain `u64`; the width only matters when an address is generated, checked
//! or rendered as hex for the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Configured width of a virtual address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AddressWidth {
    /// 16-bit addresses, rendered with 4 hex digits.
    #[serde(rename = "16-bit")]
    Bits16,

    /// 32-bit addresses, rendered with 8 hex digits.
    #[serde(rename = "32-bit")]
    Bits32,

    /// 64-bit addresses, rendered with 16 hex digits.
    #[serde(rename = "64-bit")]
    Bits64,
}

impl AddressWidth {
    /// All supported widths, narrowest first.
    pub const ALL: [AddressWidth; 3] = [Self::Bits16, Self::Bits32, Self::Bits64];

    /// Returns the number of address bits.
    pub fn bits(self) -> u32 {
        match self {
            Self::Bits16 => 16,
            Self::Bits32 => 32,
            Self::Bits64 => 64,
        }
    }

    /// Converts a bit count into a width, if supported.
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            16 => Some(Self::Bits16),
            32 => Some(Self::Bits32),
            64 => Some(Self::Bits64),
            _ => None,
        }
    }

    /// Returns the number of hex digits used when formatting an address.
    pub fn hex_digits(self) -> usize {
        (self.bits() / 4) as usize
    }

    /// Returns a mask with the low `bits()` bits set.
    pub fn mask(self) -> u64 {
        match self {
            Self::Bits64 => u64::MAX,
            w => (1u64 << w.bits()) - 1,
        }
    }

    /// Returns `true` if `value` is representable in this width.
    pub fn fits(self, value: u64) -> bool {
        value & !self.mask() == 0
    }

    /// Returns the wire label, e.g. `"32-bit"`.
    pub fn label(self) -> &'static str {
        match self {
            Self::Bits16 => "16-bit",
            Self::Bits32 => "32-bit",
            Self::Bits64 => "64-bit",
        }
    }
}

impl fmt::Display for AddressWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AddressWidth {
    type Err = String;

    /// Accepts `"16-bit"`, `"16bit"` or a bare `"16"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .trim()
            .trim_end_matches("-bit")
            .trim_end_matches("bit");
        digits
            .parse::<u32>()
            .ok()
            .and_then(Self::from_bits)
            .ok_or_else(|| format!("unsupported address width '{}'", s))
    }
}

/// A virtual address assigned to a simulated process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtAddr(u64);

impl VirtAddr {
    /// Creates a new virtual address.
    pub fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw address value.
    pub fn val(&self) -> u64 {
        self.0
    }

    /// Renders the address as `0x` followed by zero-padded hex digits for `width`.
    pub fn format(&self, width: AddressWidth) -> String {
        format!("{:#0w$x}", self.0, w = width.hex_digits() + 2)
    }

    /// Parses an address rendered with or without a `0x` prefix.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let hex = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        u64::from_str_radix(hex, 16).ok().map(Self)
    }
}

impl fmt::LowerHex for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}
