//! Process Identity Types.
//!
//! Defines how simulated processes are identified and classified. A process is
//! either a user process with a free-form name or a system process whose name
//! comes from a fixed roster of system roles.

use std::fmt;
use std::str::FromStr;

/// Unique identifier of a simulated process.
///
/// Identifiers are assigned monotonically by the process registry, starting
/// at [`ProcessId::FIRST`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(u32);

impl ProcessId {
    /// The first identifier handed out in a session.
    pub const FIRST: ProcessId = ProcessId(1001);

    /// Creates an identifier from its numeric value.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the numeric value.
    pub fn val(&self) -> u32 {
        self.0
    }

    /// Returns the identifier that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProcessId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Role of a system process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SystemRole {
    /// Operating system kernel.
    Kernel,
    /// Process scheduler.
    Scheduler,
    /// Memory manager.
    MemoryManager,
    /// File system service.
    FileSystem,
    /// Network stack.
    NetworkStack,
}

impl SystemRole {
    /// The full roster of system roles.
    pub const ALL: [SystemRole; 5] = [
        Self::Kernel,
        Self::Scheduler,
        Self::MemoryManager,
        Self::FileSystem,
        Self::NetworkStack,
    ];

    /// Returns the process name used for this role.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Kernel => "kernel",
            Self::Scheduler => "scheduler",
            Self::MemoryManager => "memory_manager",
            Self::FileSystem => "file_system",
            Self::NetworkStack => "network_stack",
        }
    }
}

impl fmt::Display for SystemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SystemRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|role| role.name() == s.trim())
            .ok_or_else(|| format!("unknown system process '{}'", s))
    }
}

/// Classification of a simulated process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessKind {
    /// A user process with an operator-chosen name.
    User {
        /// Display name.
        name: String,
    },

    /// A system process drawn from the fixed roster.
    System {
        /// The system role, which also provides the name.
        role: SystemRole,
    },
}

impl ProcessKind {
    /// Creates a user process kind.
    pub fn user(name: impl Into<String>) -> Self {
        Self::User { name: name.into() }
    }

    /// Creates a system process kind.
    pub fn system(role: SystemRole) -> Self {
        Self::System { role }
    }

    /// Returns the process name.
    pub fn name(&self) -> &str {
        match self {
            Self::User { name } => name,
            Self::System { role } => role.name(),
        }
    }

    /// Returns the wire label for the process type.
    pub fn type_label(&self) -> &'static str {
        match self {
            Self::User { .. } => "User",
            Self::System { .. } => "System",
        }
    }
}
