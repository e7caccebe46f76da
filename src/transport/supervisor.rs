//! Engine Process Supervisor.
//!
//! Launches the engine executable, tracks its process handle and terminates it
//! on request or when the supervisor is dropped. Liveness is decided only by
//! polling the handle; the supervisor never queries the engine over IPC.

use crate::common::TransportError;
use crate::config::EngineConfig;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const TERMINATE_POLL: Duration = Duration::from_millis(25);

/// Owner of the engine process handle.
pub struct EngineSupervisor {
    executable: PathBuf,
    args: Vec<String>,
    work_dir: PathBuf,
    startup_grace: Duration,
    terminate_timeout: Duration,
    child: Option<Child>,
}

impl EngineSupervisor {
    /// Creates a supervisor for the engine described by `config`.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            executable: config.executable_path(),
            args: config.args.clone(),
            work_dir: config.work_dir.clone(),
            startup_grace: config.startup_grace(),
            terminate_timeout: config.terminate_timeout(),
            child: None,
        }
    }

    /// Appends arguments passed to the engine on launch.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Path the engine is launched from.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// OS process id of the tracked engine, if one is running.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Polls the tracked handle; forgets it once the process has exited.
    pub fn is_alive(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                log::info!("engine exited with {}", status);
                self.child = None;
                false
            }
            Err(e) => {
                log::warn!("could not poll engine process: {}", e);
                self.child = None;
                false
            }
        }
    }

    /// Makes sure an engine process is running.
    ///
    /// # Arguments
    ///
    /// * `force_restart` - Terminate a running engine first
    ///
    /// # Returns
    ///
    /// `true` if a new process was launched, `false` if a live one was reused.
    pub fn ensure_running(&mut self, force_restart: bool) -> Result<bool, TransportError> {
        if force_restart {
            self.terminate();
        }
        if self.is_alive() {
            return Ok(false);
        }

        if !self.executable.is_file() {
            return Err(TransportError::EngineUnavailable(format!(
                "engine executable not found at {}",
                self.executable.display()
            )));
        }

        // Resolved before spawning since the child starts in work_dir.
        let program = self
            .executable
            .canonicalize()
            .unwrap_or_else(|_| self.executable.clone());
        let mut command = Command::new(program);
        command.args(&self.args).stdin(Stdio::null());
        if self.work_dir.is_dir() {
            command.current_dir(&self.work_dir);
        }
        let child = command.spawn().map_err(|e| {
            TransportError::EngineUnavailable(format!(
                "failed to launch {}: {}",
                self.executable.display(),
                e
            ))
        })?;

        log::info!(
            "launched engine {} (pid {})",
            self.executable.display(),
            child.id()
        );
        self.child = Some(child);

        if !self.startup_grace.is_zero() {
            thread::sleep(self.startup_grace);
        }
        Ok(true)
    }

    /// Stops the tracked engine process, if any.
    ///
    /// On unix the engine first receives SIGTERM and gets `terminate_timeout`
    /// to exit before it is killed.
    pub fn terminate(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Ok(Some(_)) = child.try_wait() {
            return;
        }

        let pid = child.id();
        if request_stop(pid) {
            let deadline = Instant::now() + self.terminate_timeout;
            while Instant::now() < deadline {
                if let Ok(Some(status)) = child.try_wait() {
                    log::info!("engine {} stopped with {}", pid, status);
                    return;
                }
                thread::sleep(TERMINATE_POLL);
            }
        }

        if let Err(e) = child.kill() {
            log::warn!("could not kill engine {}: {}", pid, e);
        }
        match child.wait() {
            Ok(status) => log::info!("engine {} killed ({})", pid, status),
            Err(e) => log::warn!("could not reap engine {}: {}", pid, e),
        }
    }
}

impl Drop for EngineSupervisor {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(unix)]
fn request_stop(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: kill(2) has no memory-safety preconditions; pid is our own child.
    unsafe { libc::kill(pid, libc::SIGTERM) == 0 }
}

#[cfg(not(unix))]
fn request_stop(_pid: u32) -> bool {
    false
}
