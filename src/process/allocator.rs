//! Virtual Address Allocator.
//!
//! Addresses are derived from a SHA-256 digest of a time-varying seed, masked to
//! the configured width and folded into the RAM span. Collisions are resolved
//! by re-hashing with an attempt counter appended to the seed. When the
//! attempt budget runs out, the allocator scans linearly from a deterministic
//! offset, so the returned address is always unique or the call fails with
//! `AddressSpaceExhausted`.

use crate::common::{AddressWidth, ConsoleError, VirtAddr};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default number of hashed attempts before falling back to a linear scan.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

/// Generates unique virtual addresses for new processes.
#[derive(Clone, Debug)]
pub struct VirtualAddressAllocator {
    max_attempts: u32,
}

impl Default for VirtualAddressAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl VirtualAddressAllocator {
    /// Creates an allocator that re-hashes at most `max_attempts` times.
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Allocates an address seeded from the current wall-clock time.
    ///
    /// # Arguments
    ///
    /// * `width` - Address width in effect
    /// * `ram_size_bytes` - RAM span the address must fall inside
    /// * `existing` - Addresses already held by live processes
    pub fn allocate(
        &self,
        width: AddressWidth,
        ram_size_bytes: u64,
        existing: &HashSet<u64>,
    ) -> Result<VirtAddr, ConsoleError> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        self.allocate_seeded(&nanos.to_string(), width, ram_size_bytes, existing)
    }

    /// Allocates an address from an explicit seed.
    ///
    /// The result is strictly below both `2^width` and `ram_size_bytes` and is
    /// never a member of `existing`.
    pub fn allocate_seeded(
        &self,
        seed: &str,
        width: AddressWidth,
        ram_size_bytes: u64,
        existing: &HashSet<u64>,
    ) -> Result<VirtAddr, ConsoleError> {
        if ram_size_bytes == 0 {
            return Err(ConsoleError::ValidationFailed(
                "RAM size must be positive".to_string(),
            ));
        }

        let fold = |hash: u64| (hash & width.mask()) % ram_size_bytes;

        let original = fold(hash_seed(seed));
        let mut candidate = original;
        let mut attempt = 0;
        while existing.contains(&candidate) && attempt < self.max_attempts {
            attempt += 1;
            candidate = fold(hash_seed(&format!("{}{}", seed, attempt)));
        }

        if !existing.contains(&candidate) {
            return Ok(VirtAddr::new(candidate));
        }

        log::warn!(
            "address hashing exhausted {} attempts; scanning from fallback offset",
            self.max_attempts
        );
        let offset = original.wrapping_add(existing.len() as u64 + 1);
        scan_from(fold(offset), width, ram_size_bytes, existing)
    }
}

/// Number of addresses that are both representable and inside RAM.
pub fn address_span(width: AddressWidth, ram_size_bytes: u64) -> u64 {
    match width {
        AddressWidth::Bits64 => ram_size_bytes,
        w => ram_size_bytes.min(1u64 << w.bits()),
    }
}

fn scan_from(
    start: u64,
    width: AddressWidth,
    ram_size_bytes: u64,
    existing: &HashSet<u64>,
) -> Result<VirtAddr, ConsoleError> {
    let span = address_span(width, ram_size_bytes);
    let occupied = existing.iter().filter(|&&a| a < span).count() as u64;
    if occupied >= span {
        return Err(ConsoleError::AddressSpaceExhausted { width, span });
    }

    // At most `occupied` consecutive slots can be taken, so this terminates.
    let steps = span.min(occupied + 1);
    (0..steps)
        .map(|step| ((u128::from(start) + u128::from(step)) % u128::from(span)) as u64)
        .find(|addr| !existing.contains(addr))
        .map(VirtAddr::new)
        .ok_or(ConsoleError::AddressSpaceExhausted { width, span })
}

/// Hashes `seed` and returns the low-order 64 bits of the digest, read as
/// one big-endian integer.
fn hash_seed(seed: &str) -> u64 {
    let digest = Sha256::digest(seed.as_bytes());
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&digest[digest.len() - 8..]);
    u64::from_be_bytes(tail)
}
