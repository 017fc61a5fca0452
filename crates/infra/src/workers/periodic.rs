use std::io;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::debug;

/// Handle to control and join a background worker.
///
/// Dropping the handle also stops the worker: the shutdown channel disconnects
/// and the worker exits on its next wake-up.
#[derive(Debug)]
pub struct WorkerHandle {
    name: &'static str,
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
            debug!(worker = self.name, "worker stopped");
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs a tick function on a fixed interval in its own thread.
///
/// - The first tick happens one `interval` after spawn
/// - Shutdown wakes the worker immediately (no waiting out the interval)
#[derive(Debug)]
pub struct PeriodicWorker;

impl PeriodicWorker {
    pub fn spawn<F>(name: &'static str, interval: Duration, mut tick: F) -> io::Result<WorkerHandle>
    where
        F: FnMut() + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let interval = interval.max(Duration::from_millis(1));

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                loop {
                    match shutdown_rx.recv_timeout(interval) {
                        Err(mpsc::RecvTimeoutError::Timeout) => tick(),
                        // Explicit shutdown or every sender dropped.
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;

        Ok(WorkerHandle {
            name,
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}
