//! Integration tests for the file-drop transport and the engine supervisor.
//!
//! The engine is stood in for by `/bin/sh` scripts, so these only run on unix.

#![cfg(unix)]

use memsim_console::common::{ProcessId, ProcessKind, TransportError, VirtAddr};
use memsim_console::config::{EngineConfig, FileDropConfig, RetryConfig};
use memsim_console::documents::{DocumentStore, Snapshot};
use memsim_console::process::Process;
use memsim_console::settings::Settings;
use memsim_console::transport::{BackendTransport, EngineSupervisor, FileDropTransport};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn engine(dir: &Path, script: &str) -> EngineConfig {
    EngineConfig {
        launch: true,
        work_dir: dir.to_path_buf(),
        executable: "/bin/sh".into(),
        args: vec!["-c".to_string(), script.to_string()],
        startup_grace_ms: 0,
        terminate_timeout_ms: 200,
    }
}

fn files(poll_attempts: u32) -> FileDropConfig {
    FileDropConfig {
        poll_interval_ms: 10,
        poll_attempts,
        parse_retry_delay_ms: 5,
        ..FileDropConfig::default()
    }
}

fn transport(dir: &Path, script: &str, poll_attempts: u32) -> FileDropTransport {
    transport_with(dir, script, poll_attempts, false)
}

fn transport_with(
    dir: &Path,
    script: &str,
    poll_attempts: u32,
    restart_each_push: bool,
) -> FileDropTransport {
    let engine = engine(dir, script);
    let files = files(poll_attempts);
    let documents = DocumentStore::new(&engine, &files);
    let supervisor = EngineSupervisor::new(&engine).with_args([
        files.settings_file.to_string_lossy().into_owned(),
        files.processes_file.to_string_lossy().into_owned(),
    ]);
    FileDropTransport::new(
        documents,
        supervisor,
        files.poll_policy(&RetryConfig::default()),
        files.parse_retry_delay(),
        restart_each_push,
    )
}

fn snapshot() -> Snapshot {
    let settings = Settings::default();
    let proc = Process {
        id: ProcessId::FIRST,
        kind: ProcessKind::user("editor"),
        size_gb: 2.0,
        has_priority: true,
        is_stopped: false,
        virtual_address: VirtAddr::new(0xBEEF),
        created: 0,
    };
    Snapshot::capture(&settings, &[proc])
}

/// Tests a push answered by an engine that reads its arguments.
#[test]
fn test_push_reads_results() {
    let dir = TempDir::new().unwrap();
    let script = r#"test -f "$0" && test -f "$1" && printf '{"total_faults": 2}' > simulation_results.json"#;
    let mut transport = transport(dir.path(), script, 200);

    let results = transport.push(&snapshot()).unwrap();
    assert_eq!(results.total_faults, 2);

    let processes: serde_json::Value =
        serde_json::from_slice(&fs::read(dir.path().join("processes.json")).unwrap()).unwrap();
    assert_eq!(processes[0]["id"], "1001");
    assert_eq!(processes[0]["size_gb"], 2);
    assert_eq!(processes[0]["type"], "User");
    assert_eq!(processes[0]["virtual_address"], "0xbeef");

    let settings: serde_json::Value = serde_json::from_slice(
        &fs::read(dir.path().join("environment_settings.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(settings["ram_size_gb"], 1);
    transport.shutdown();
}

/// Tests that stale results are cleared and the ready marker raised before launch.
#[test]
fn test_stale_results_cleared() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("simulation_results.json"),
        br#"{"total_faults": 99}"#,
    )
    .unwrap();
    let script = r#"test -f ready.flag && printf '{"total_faults": 3}' > simulation_results.json"#;
    let mut transport = transport(dir.path(), script, 200);

    let results = transport.push(&snapshot()).unwrap();
    assert_eq!(results.total_faults, 3);
}

/// Tests that each push relaunches the engine when configured to.
#[test]
fn test_restart_each_push() {
    let dir = TempDir::new().unwrap();
    let script = r#"n=$(cat count 2>/dev/null || echo 0); n=$((n+1)); echo $n > count; printf '{"total_faults": %s}' $n > simulation_results.json"#;
    let mut transport = transport_with(dir.path(), script, 200, true);

    assert_eq!(transport.push(&snapshot()).unwrap().total_faults, 1);
    assert_eq!(transport.push(&snapshot()).unwrap().total_faults, 2);
}

/// Tests that an unparsable results file exhausts the polling budget.
#[test]
fn test_garbage_results() {
    let dir = TempDir::new().unwrap();
    let mut transport = transport(dir.path(), "printf garbage > simulation_results.json", 4);

    match transport.push(&snapshot()) {
        Err(TransportError::EngineDidNotRespond { attempts }) => assert_eq!(attempts, 4),
        other => panic!("expected EngineDidNotRespond, got {:?}", other),
    }
}

/// Tests that a results file still being written is polled again until it parses.
#[test]
fn test_partial_results_retried() {
    let dir = TempDir::new().unwrap();
    let script = r#"printf '{"total_faults": ' > simulation_results.json; sleep 0.2; printf '{"total_faults": 4}' > simulation_results.json"#;
    let mut transport = transport(dir.path(), script, 200);

    let results = transport.push(&snapshot()).unwrap();
    assert_eq!(results.total_faults, 4);
    transport.shutdown();
}

/// Tests a silent engine and its termination on shutdown.
#[test]
fn test_silent_engine() {
    let dir = TempDir::new().unwrap();
    let mut transport = transport(dir.path(), "sleep 30", 3);

    let result = transport.push(&snapshot());
    assert!(matches!(
        result,
        Err(TransportError::EngineDidNotRespond { attempts: 3 })
    ));
    transport.shutdown();
}

/// Tests a missing engine executable.
#[test]
fn test_missing_executable() {
    let dir = TempDir::new().unwrap();
    let mut config = engine(dir.path(), "");
    config.executable = "no_such_engine".into();
    let files = files(3);
    let mut transport = FileDropTransport::new(
        DocumentStore::new(&config, &files),
        EngineSupervisor::new(&config),
        files.poll_policy(&RetryConfig::default()),
        files.parse_retry_delay(),
        false,
    );

    let result = transport.push(&snapshot());
    assert!(matches!(result, Err(TransportError::EngineUnavailable(_))));
    // The documents are on disk even though no engine ran.
    assert!(dir.path().join("environment_settings.json").is_file());
}

/// Tests supervisor launch, reuse and termination.
#[test]
fn test_supervisor_lifecycle() {
    let dir = TempDir::new().unwrap();
    let mut supervisor = EngineSupervisor::new(&engine(dir.path(), "sleep 30"));

    assert!(!supervisor.is_alive());
    assert!(supervisor.ensure_running(false).unwrap());
    let pid = supervisor.pid();
    assert!(pid.is_some());

    assert!(!supervisor.ensure_running(false).unwrap());
    assert_eq!(supervisor.pid(), pid);

    assert!(supervisor.ensure_running(true).unwrap());
    assert_ne!(supervisor.pid(), pid);

    supervisor.terminate();
    assert!(!supervisor.is_alive());
    assert_eq!(supervisor.pid(), None);
}
