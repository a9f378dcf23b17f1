//! Periodic `system-status` poll on a background thread.
//!
//! The poller fetches once immediately, then every `interval`, keeping the
//! latest result. Dropping the handle stops the thread without waiting out
//! the current interval.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

use super::{ApiClient, ApiError, SystemStatus};

/// One poll result.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub checked_at: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SystemStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusSnapshot {
    fn from_result(result: Result<SystemStatus, ApiError>) -> Self {
        let (status, error) = match result {
            Ok(status) => (Some(status), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            checked_at: Local::now(),
            status,
            error,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_some()
    }
}

/// Handle to the polling thread.
pub struct StatusPoller {
    latest: Arc<Mutex<Option<StatusSnapshot>>>,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl StatusPoller {
    /// Poll the service's `system-status` endpoint.
    pub fn spawn(client: ApiClient, interval: Duration) -> Self {
        Self::spawn_with(interval, move || client.system_status(), None)
    }

    /// Like [`spawn`](Self::spawn), also sending every snapshot to the
    /// returned receiver as it arrives.
    pub fn watch(client: ApiClient, interval: Duration) -> (Self, mpsc::Receiver<StatusSnapshot>) {
        let (tx, rx) = mpsc::channel();
        let poller = Self::spawn_with(interval, move || client.system_status(), Some(tx));
        (poller, rx)
    }

    /// Poll with any fetch function.
    pub fn spawn_with<F>(interval: Duration, mut fetch: F, updates: Option<Sender<StatusSnapshot>>) -> Self
    where
        F: FnMut() -> Result<SystemStatus, ApiError> + Send + 'static,
    {
        let latest = Arc::new(Mutex::new(None));
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let shared = Arc::clone(&latest);
        let handle = thread::spawn(move || {
            loop {
                let snapshot = StatusSnapshot::from_result(fetch());
                if let Some(tx) = &updates
                    && tx.send(snapshot.clone()).is_err()
                {
                    break;
                }
                if let Ok(mut slot) = shared.lock() {
                    *slot = Some(snapshot);
                }

                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    // Stop requested or handle dropped.
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        Self {
            latest,
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Most recent snapshot, if the first poll has finished.
    pub fn latest(&self) -> Option<StatusSnapshot> {
        self.latest.lock().ok().and_then(|slot| slot.clone())
    }

    /// Stop polling and wait for the thread to exit. Idempotent.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
