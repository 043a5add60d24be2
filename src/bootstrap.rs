//! Startup of the external indexer and filesystem monitor.
//!
//! Both are out-of-process collaborators that fill the index this crate
//! reads. They are launched once in the background; nothing waits for them,
//! so early searches may see a partial or stale index.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use tokio::task::JoinHandle;

use crate::config::Config;

/// Monitor started.
pub const MONITOR_OK: i32 = 0;
/// A monitor is already running.
pub const MONITOR_ALREADY_RUNNING: i32 = 1;
/// The index could not be opened.
pub const MONITOR_INDEX_UNAVAILABLE: i32 = 2;
/// Any other failure.
pub const MONITOR_FAILED: i32 = -1;

/// An external service that keeps the index in step with a directory tree.
pub trait FileMonitor: Send {
    /// Start watching `root`, maintaining the index at `index_path`.
    /// Returns one of the `MONITOR_*` status codes.
    fn start(&mut self, root: &str, index_path: &Path) -> i32;

    /// Stop watching. Failures are swallowed.
    fn stop(&mut self);
}

/// Runs the monitor as a child process: `<program> <root> <index>`.
///
/// The monitor opens (or creates) the index itself, so a missing index
/// file does not prevent it from starting.
#[derive(Debug)]
pub struct CommandMonitor {
    program: PathBuf,
    child: Option<Child>,
}

impl CommandMonitor {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            child: None,
        }
    }
}

impl FileMonitor for CommandMonitor {
    fn start(&mut self, root: &str, index_path: &Path) -> i32 {
        if self.child.is_some() {
            return MONITOR_ALREADY_RUNNING;
        }
        match Command::new(&self.program)
            .arg(root)
            .arg(index_path)
            .stdin(Stdio::null())
            .spawn()
        {
            Ok(child) => {
                self.child = Some(child);
                MONITOR_OK
            }
            Err(e) => {
                tracing::error!(program = %self.program.display(), error = %e, "monitor launch failed");
                MONITOR_FAILED
            }
        }
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// A started monitor that is stopped exactly once: on [`shutdown`] or on drop.
///
/// [`shutdown`]: MonitorGuard::shutdown
pub struct MonitorGuard {
    monitor: Option<Box<dyn FileMonitor>>,
}

impl MonitorGuard {
    #[must_use]
    pub fn new(monitor: Box<dyn FileMonitor>) -> Self {
        Self {
            monitor: Some(monitor),
        }
    }

    /// Stop the monitor if it has not been stopped yet.
    pub fn shutdown(&mut self) {
        if let Some(mut monitor) = self.monitor.take() {
            monitor.stop();
            tracing::info!("file monitor stopped");
        }
    }
}

impl Drop for MonitorGuard {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Run the indexer to completion with `app_root` as its working directory
/// and no arguments. Returns its exit code; `None` if it could not run or
/// was killed by a signal.
pub async fn run_indexer(program: &Path, app_root: &Path) -> Option<i32> {
    tracing::info!(program = %program.display(), "starting indexer");
    let status = tokio::process::Command::new(program)
        .current_dir(app_root)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await;
    match status {
        Ok(status) => {
            let code = status.code();
            tracing::info!(?code, "indexer exited");
            code
        }
        Err(e) => {
            tracing::error!(program = %program.display(), error = %e, "indexer launch failed");
            None
        }
    }
}

/// Start `monitor`, wrapping it in a guard if it came up.
pub fn start_monitor(
    mut monitor: Box<dyn FileMonitor>,
    root: &str,
    index_path: &Path,
) -> Option<MonitorGuard> {
    let code = monitor.start(root, index_path);
    tracing::info!(code, root, "file monitor start returned");
    (code == MONITOR_OK).then(|| MonitorGuard::new(monitor))
}

/// The background startup task: indexer first, then the monitor.
pub struct Bootstrap {
    task: JoinHandle<Option<MonitorGuard>>,
}

impl Bootstrap {
    /// Launch the configured collaborators on a background task. Must be
    /// called from within a tokio runtime.
    #[must_use]
    pub fn spawn(config: &Config) -> Self {
        let monitor = config
            .settings
            .monitor
            .enabled
            .then(|| Box::new(CommandMonitor::new(config.monitor_program())) as Box<dyn FileMonitor>);
        Self::spawn_with(config, monitor)
    }

    /// Like [`Bootstrap::spawn`] with a caller-supplied monitor.
    #[must_use]
    pub fn spawn_with(config: &Config, monitor: Option<Box<dyn FileMonitor>>) -> Self {
        let indexer = config
            .settings
            .indexer
            .enabled
            .then(|| config.indexer_program());
        let app_root = config.app_root.clone();
        let root = config.settings.monitor.root.clone();
        let db_path = config.db_path.clone();

        let task = tokio::spawn(async move {
            if let Some(program) = indexer {
                run_indexer(&program, &app_root).await;
            }
            monitor.and_then(|m| start_monitor(m, &root, &db_path))
        });
        Self { task }
    }

    /// Whether the indexer has exited and the monitor start was attempted.
    #[must_use]
    pub fn startup_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the monitor if startup got that far; otherwise abandon startup.
    pub async fn shutdown(self) {
        if !self.startup_finished() {
            tracing::info!("startup still running, abandoning it");
            self.task.abort();
            return;
        }
        match self.task.await {
            Ok(Some(mut guard)) => guard.shutdown(),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "startup task failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Counts {
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    struct FakeMonitor {
        counts: Arc<Counts>,
        status: i32,
    }

    impl FileMonitor for FakeMonitor {
        fn start(&mut self, _root: &str, _index_path: &Path) -> i32 {
            self.counts.starts.fetch_add(1, Ordering::SeqCst);
            self.status
        }

        fn stop(&mut self) {
            self.counts.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fake(status: i32) -> (Arc<Counts>, Box<dyn FileMonitor>) {
        let counts = Arc::new(Counts::default());
        let monitor = FakeMonitor {
            counts: Arc::clone(&counts),
            status,
        };
        (counts, Box::new(monitor))
    }

    #[test]
    fn guard_stops_exactly_once() {
        let (counts, monitor) = fake(MONITOR_OK);
        let mut guard = start_monitor(monitor, "/", Path::new("/idx")).unwrap();
        guard.shutdown();
        guard.shutdown();
        drop(guard);
        assert_eq!(counts.starts.load(Ordering::SeqCst), 1);
        assert_eq!(counts.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn guard_stops_on_drop() {
        let (counts, monitor) = fake(MONITOR_OK);
        drop(start_monitor(monitor, "/", Path::new("/idx")));
        assert_eq!(counts.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_start_yields_no_guard() {
        let (counts, monitor) = fake(MONITOR_INDEX_UNAVAILABLE);
        assert!(start_monitor(monitor, "/", Path::new("/idx")).is_none());
        assert_eq!(counts.stops.load(Ordering::SeqCst), 0);
    }

    #[cfg(unix)]
    #[test]
    fn command_monitor_starts_without_an_index() {
        let tmp = TempDir::new().unwrap();
        let mut monitor = CommandMonitor::new("sleep");
        assert_eq!(
            monitor.start("5", &tmp.path().join("missing.db")),
            MONITOR_OK
        );
        assert_eq!(
            monitor.start("5", &tmp.path().join("missing.db")),
            MONITOR_ALREADY_RUNNING
        );
        monitor.stop();
        assert!(monitor.child.is_none());
    }

    #[test]
    fn command_monitor_reports_launch_failure() {
        let tmp = TempDir::new().unwrap();
        let index = tmp.path().join("file_index.db");
        std::fs::write(&index, b"").unwrap();
        let mut monitor = CommandMonitor::new(tmp.path().join("no-such-binary"));
        assert_eq!(monitor.start("/", &index), MONITOR_FAILED);
        monitor.stop();
    }

    #[tokio::test]
    async fn missing_indexer_is_not_fatal() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(
            run_indexer(&tmp.path().join("no-such-indexer"), tmp.path()).await,
            None
        );
    }

    #[tokio::test]
    async fn bootstrap_starts_then_stops_monitor() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::new(tmp.path());
        config.settings.indexer.program = "no-such-indexer".into();
        let (counts, monitor) = fake(MONITOR_OK);

        let boot = Bootstrap::spawn_with(&config, Some(monitor));
        for _ in 0..200 {
            if boot.startup_finished() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        boot.shutdown().await;
        assert_eq!(counts.starts.load(Ordering::SeqCst), 1);
        assert_eq!(counts.stops.load(Ordering::SeqCst), 1);
    }
}
