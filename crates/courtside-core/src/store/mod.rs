// Match store adapters: the only code that talks to the document store.
//
// Two backends implement `MatchStore`: an embedded SQLite collection and a
// hosted HTTP collection with a Server-Sent-Events push channel. Both decode
// the store's native timestamps into `chrono` date-times and leave retry and
// reconnection to the underlying client.

pub mod remote;
pub mod sqlite;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::model::Match;

pub use remote::HttpMatchStore;
pub use sqlite::SqliteMatchStore;

/// One delivery to a subscriber: the full current collection, or the error
/// that prevented reading it.
pub type Snapshot = std::result::Result<Vec<Match>, StoreError>;

/// Callback invoked with every snapshot a subscription produces.
pub type SnapshotCallback = Box<dyn FnMut(Snapshot) + Send + 'static>;

#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Every match in the collection, newest first. No filtering.
    async fn fetch_all(&self) -> Result<Vec<Match>>;

    /// Register `callback` for push updates. It is invoked once right away
    /// with the current snapshot and again after every change, until the
    /// returned handle is unsubscribed or dropped.
    ///
    /// Must be called from within a Tokio runtime.
    fn subscribe(&self, callback: SnapshotCallback) -> Subscription;
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Handle for an active subscription. Unsubscribing more than once is a
/// no-op, and dropping the handle unsubscribes.
pub struct Subscription {
    active: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Spawn the delivery task built by `run`. The task receives a
    /// [`Delivery`] that stops forwarding as soon as the handle is
    /// unsubscribed, even if the task has not been cancelled yet.
    pub fn spawn<F, Fut>(callback: SnapshotCallback, run: F) -> Self
    where
        F: FnOnce(Delivery) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let active = Arc::new(AtomicBool::new(true));
        let delivery = Delivery {
            active: Arc::clone(&active),
            callback,
        };
        let task = tokio::spawn(run(delivery));
        Subscription {
            active,
            task: Some(task),
        }
    }

    /// Stop delivering snapshots and cancel the background task.
    pub fn unsubscribe(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Match subscription cancelled");
        }
    }

    /// Whether snapshots may still be delivered.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
            && self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Delivery side of a subscription, owned by the background task.
pub struct Delivery {
    active: Arc<AtomicBool>,
    callback: SnapshotCallback,
}

impl Delivery {
    /// Hand `snapshot` to the subscriber. Returns `false` once the
    /// subscriber has gone away; the task should then stop.
    pub fn deliver(&mut self, snapshot: Snapshot) -> bool {
        if !self.active.load(Ordering::SeqCst) {
            return false;
        }
        (self.callback)(snapshot);
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
