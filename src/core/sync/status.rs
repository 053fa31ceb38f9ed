//! Save status shown to the editing surface
//!
//! `Idle → Saving → Success | Error`, with the terminal states reverting to `Idle`
//! after their display interval unless a newer status replaced them first.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Ternary save indicator plus its resting state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Saving,
    Success,
    /// `failed` of `total` line upserts did not persist
    Error { failed: usize, total: usize },
}

impl SaveStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, SaveStatus::Error { .. })
    }
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveStatus::Idle => write!(f, "idle"),
            SaveStatus::Saving => write!(f, "saving"),
            SaveStatus::Success => write!(f, "saved"),
            SaveStatus::Error { failed, total } => {
                write!(f, "{failed} of {total} lines failed to save")
            }
        }
    }
}

/// Publishes [`SaveStatus`] changes over a watch channel
#[derive(Debug, Clone)]
pub struct StatusBoard {
    tx: Arc<watch::Sender<SaveStatus>>,
    epoch: Arc<AtomicU64>,
}

impl StatusBoard {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SaveStatus::Idle);
        Self {
            tx: Arc::new(tx),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> SaveStatus {
        *self.tx.borrow()
    }

    /// Sets a status that stays until replaced
    pub fn set(&self, status: SaveStatus) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.tx.send_replace(status);
    }

    /// Sets a status that reverts to `Idle` after `display`
    ///
    /// Must be called from within a tokio runtime.
    pub fn flash(&self, status: SaveStatus, display: Duration) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx.send_replace(status);

        let tx = Arc::clone(&self.tx);
        let current = Arc::clone(&self.epoch);
        tokio::spawn(async move {
            tokio::time::sleep(display).await;
            if current.load(Ordering::SeqCst) == epoch {
                tx.send_replace(SaveStatus::Idle);
            }
        });
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}
