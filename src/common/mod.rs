//! Common types shared across the console.
//!
//! This module provides the address-width model, process identity types and
//! the error taxonomy used by the settings store, the process registry and
//! both engine transports.

/// Address widths and fixed-width virtual address formatting.
pub mod addr;

/// Process identity and classification types.
pub mod data;

/// Error types for console operations and engine transports.
pub mod error;

pub use addr::{AddressWidth, VirtAddr};
pub use data::{ProcessId, ProcessKind, SystemRole};
pub use error::{ConsoleError, TransportError};

/// Number of bytes in one gigabyte.
pub const GIB: u64 = 1024 * 1024 * 1024;
