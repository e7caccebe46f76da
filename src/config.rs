//! Console Configuration.
//!
//! The console reads an optional TOML file describing where the engine lives,
//! how to reach it and how patient to be with it. Every field has a default,
//! so an empty file (or no file at all) yields a working configuration.

use crate::common::ConsoleError;
use crate::transport::RetryPolicy;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "127.0.0.1:12345";
const DEFAULT_WORK_DIR: &str = "bin";
const DEFAULT_EXECUTABLE: &str = "virtual_memory_simulator";

/// Which engine transport the session uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Persistent TCP connection with request/response exchanges.
    #[default]
    Socket,
    /// Documents dropped on disk and a polled results file.
    File,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Socket => f.write_str("socket"),
            Self::File => f.write_str("file"),
        }
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "socket" => Ok(Self::Socket),
            "file" | "file-drop" => Ok(Self::File),
            _ => Err(format!("unknown transport '{}'", s)),
        }
    }
}

/// Top-level console configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub socket: SocketConfig,
    #[serde(default)]
    pub file_drop: FileDropConfig,
    #[serde(default)]
    pub allocator: AllocatorConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl ConsoleConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConsoleError> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| ConsoleError::persistence(path, e))?;
        Self::parse(&content)
    }

    /// Parses and validates configuration text.
    pub fn parse(content: &str) -> Result<Self, ConsoleError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConsoleError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would make a retry loop meaningless.
    pub fn validate(&self) -> Result<(), ConsoleError> {
        let budgets = [
            ("socket.connect_attempts", self.socket.connect_attempts),
            ("socket.reconnect_attempts", self.socket.reconnect_attempts),
            ("file_drop.poll_attempts", self.file_drop.poll_attempts),
            ("allocator.max_attempts", self.allocator.max_attempts),
        ];
        if let Some((name, _)) = budgets.iter().find(|(_, v)| *v == 0) {
            return Err(ConsoleError::Config(format!("{} must be at least 1", name)));
        }
        if self.socket.poll_interval_ms == 0 {
            return Err(ConsoleError::Config(
                "socket.poll_interval_ms must be at least 1".to_string(),
            ));
        }
        if !(self.retry.backoff_factor.is_finite() && self.retry.backoff_factor >= 1.0) {
            return Err(ConsoleError::Config(
                "retry.backoff_factor must be a finite number >= 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

/// General console behavior.
#[derive(Clone, Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub transport: TransportKind,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            log_level: default_log_level(),
        }
    }
}

/// Location and lifecycle of the engine process.
#[derive(Clone, Debug, Deserialize)]
pub struct EngineConfig {
    /// Whether the console launches and owns the engine process.
    #[serde(default = "default_true")]
    pub launch: bool,

    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Engine executable, relative to `work_dir` unless absolute.
    #[serde(default = "default_executable")]
    pub executable: PathBuf,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default = "default_startup_grace")]
    pub startup_grace_ms: u64,

    #[serde(default = "default_terminate_timeout")]
    pub terminate_timeout_ms: u64,
}

impl EngineConfig {
    /// Returns the executable path resolved against `work_dir`.
    pub fn executable_path(&self) -> PathBuf {
        if self.executable.is_absolute() {
            self.executable.clone()
        } else {
            self.work_dir.join(&self.executable)
        }
    }

    /// Wait after launching the engine before it is used.
    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    /// Time the engine gets to exit after SIGTERM.
    pub fn terminate_timeout(&self) -> Duration {
        Duration::from_millis(self.terminate_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            launch: true,
            work_dir: default_work_dir(),
            executable: default_executable(),
            args: Vec::new(),
            startup_grace_ms: default_startup_grace(),
            terminate_timeout_ms: default_terminate_timeout(),
        }
    }
}

/// Socket transport parameters.
#[derive(Clone, Debug, Deserialize)]
pub struct SocketConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    #[serde(default = "default_connect_delay")]
    pub connect_delay_ms: u64,

    #[serde(default = "default_response_deadline")]
    pub response_deadline_ms: u64,

    #[serde(default = "default_socket_poll")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,

    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    /// Failed reconnects before the engine is restarted; 0 disables restarts.
    #[serde(default = "default_restart_after")]
    pub restart_after_failures: u32,
}

impl SocketConfig {
    /// Retry policy for the initial connection.
    pub fn connect_policy(&self, retry: &RetryConfig) -> RetryPolicy {
        retry.policy(
            self.connect_attempts,
            Duration::from_millis(self.connect_delay_ms),
        )
    }

    /// Retry policy for reopening a dropped connection.
    pub fn reconnect_policy(&self, retry: &RetryConfig) -> RetryPolicy {
        retry.policy(
            self.reconnect_attempts,
            Duration::from_millis(self.reconnect_delay_ms),
        )
    }

    /// Longest wait for one reply.
    pub fn response_deadline(&self) -> Duration {
        Duration::from_millis(self.response_deadline_ms)
    }

    /// Read timeout between deadline checks.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            connect_attempts: default_connect_attempts(),
            connect_delay_ms: default_connect_delay(),
            response_deadline_ms: default_response_deadline(),
            poll_interval_ms: default_socket_poll(),
            reconnect_attempts: default_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay(),
            restart_after_failures: default_restart_after(),
        }
    }
}

/// File-drop transport parameters. Paths are relative to `engine.work_dir`.
#[derive(Clone, Debug, Deserialize)]
pub struct FileDropConfig {
    #[serde(default = "default_settings_file")]
    pub settings_file: PathBuf,

    #[serde(default = "default_processes_file")]
    pub processes_file: PathBuf,

    #[serde(default = "default_results_file")]
    pub results_file: PathBuf,

    #[serde(default = "default_ready_file")]
    pub ready_file: Option<PathBuf>,

    #[serde(default = "default_file_poll")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,

    #[serde(default = "default_parse_retry_delay")]
    pub parse_retry_delay_ms: u64,

    #[serde(default)]
    pub restart_each_push: bool,
}

impl FileDropConfig {
    /// Retry policy for polling the results document.
    pub fn poll_policy(&self, retry: &RetryConfig) -> RetryPolicy {
        retry.policy(
            self.poll_attempts,
            Duration::from_millis(self.poll_interval_ms),
        )
    }

    /// Wait before re-reading a results file that did not parse.
    pub fn parse_retry_delay(&self) -> Duration {
        Duration::from_millis(self.parse_retry_delay_ms)
    }
}

impl Default for FileDropConfig {
    fn default() -> Self {
        Self {
            settings_file: default_settings_file(),
            processes_file: default_processes_file(),
            results_file: default_results_file(),
            ready_file: default_ready_file(),
            poll_interval_ms: default_file_poll(),
            poll_attempts: default_poll_attempts(),
            parse_retry_delay_ms: default_parse_retry_delay(),
            restart_each_push: false,
        }
    }
}

/// Virtual address allocation parameters.
#[derive(Clone, Debug, Deserialize)]
pub struct AllocatorConfig {
    #[serde(default = "default_alloc_attempts")]
    pub max_attempts: u32,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_alloc_attempts(),
        }
    }
}

/// Backoff shared by every bounded retry loop.
#[derive(Clone, Debug, Deserialize)]
pub struct RetryConfig {
    /// Multiplier applied to the delay after each failure; 1.0 keeps it fixed.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl RetryConfig {
    /// Builds a policy with this backoff for the given budget and base delay.
    pub fn policy(&self, max_attempts: u32, delay: Duration) -> RetryPolicy {
        RetryPolicy::fixed(max_attempts, delay).with_backoff(
            self.backoff_factor,
            Duration::from_millis(self.max_delay_ms).max(delay),
        )
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_factor: default_backoff_factor(),
            max_delay_ms: default_max_delay(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(DEFAULT_WORK_DIR)
}

fn default_executable() -> PathBuf {
    PathBuf::from(DEFAULT_EXECUTABLE)
}

fn default_startup_grace() -> u64 {
    2000
}

fn default_terminate_timeout() -> u64 {
    1000
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_connect_attempts() -> u32 {
    5
}

fn default_connect_delay() -> u64 {
    1000
}

fn default_response_deadline() -> u64 {
    10_000
}

fn default_socket_poll() -> u64 {
    100
}

fn default_reconnect_attempts() -> u32 {
    3
}

fn default_reconnect_delay() -> u64 {
    500
}

fn default_restart_after() -> u32 {
    2
}

fn default_settings_file() -> PathBuf {
    PathBuf::from("environment_settings.json")
}

fn default_processes_file() -> PathBuf {
    PathBuf::from("processes.json")
}

fn default_results_file() -> PathBuf {
    PathBuf::from("simulation_results.json")
}

fn default_ready_file() -> Option<PathBuf> {
    Some(PathBuf::from("ready.flag"))
}

fn default_file_poll() -> u64 {
    500
}

fn default_poll_attempts() -> u32 {
    60
}

fn default_parse_retry_delay() -> u64 {
    100
}

fn default_alloc_attempts() -> u32 {
    crate::process::allocator::DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_factor() -> f64 {
    1.0
}

fn default_max_delay() -> u64 {
    5000
}
