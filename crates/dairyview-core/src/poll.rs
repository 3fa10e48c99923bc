//! Periodic refresh of view data.
//!
//! A view mounts a poller with `spawn_poller`; every fetch it starts is tagged
//! with a ticket from the view's `RequestSequence`, and the view folds results
//! into a `SnapshotSlot`, which ignores anything older than what it already
//! shows. Dropping the `PollHandle` stops the timer and aborts in-flight fetches.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::ApiError;

/// Monotonic ticket counter, one per view.
#[derive(Debug, Default)]
pub struct RequestSequence(AtomicU64);

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next ticket. Tickets start at 1.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Most recently issued ticket (0 if none)
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrigin {
    /// Timer tick or initial mount
    Poll,
    /// User asked for a refresh
    Manual,
}

/// A fetch result with the ticket it was issued under.
#[derive(Debug)]
pub struct Tagged<T> {
    pub seq: u64,
    pub origin: FetchOrigin,
    pub result: Result<T, ApiError>,
}

type Trigger = Arc<dyn Fn(FetchOrigin) + Send + Sync>;

/// Running poller. Cancels on drop.
pub struct PollHandle {
    cancel: CancellationToken,
    trigger: Trigger,
}

impl PollHandle {
    /// Start an out-of-schedule fetch tagged as manual.
    pub fn refresh(&self) {
        if !self.cancel.is_cancelled() {
            (self.trigger)(FetchOrigin::Manual);
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Fetch immediately, then every `every` (or only on `refresh()` when `every`
/// is `None`). Each fetch runs in its own task so a slow request never delays
/// the timer; results are wrapped into the caller's message type and sent on `tx`.
pub fn spawn_poller<T, M, F, Fut, W>(
    every: Option<Duration>,
    sequence: Arc<RequestSequence>,
    fetch: F,
    wrap: W,
    tx: mpsc::Sender<M>,
) -> PollHandle
where
    T: Send + 'static,
    M: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    W: Fn(Tagged<T>) -> M + Send + Sync + 'static,
{
    let cancel = CancellationToken::new();
    let wrap = Arc::new(wrap);

    let trigger: Trigger = {
        let cancel = cancel.clone();
        Arc::new(move |origin| {
            let seq = sequence.next();
            let request = fetch();
            let wrap = wrap.clone();
            let tx = tx.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!(seq, "Fetch abandoned");
                    }
                    result = request => {
                        let _ = tx.send(wrap(Tagged { seq, origin, result })).await;
                    }
                }
            });
        })
    };

    match every {
        Some(every) => {
            let cancel = cancel.clone();
            let trigger = trigger.clone();
            tokio::spawn(async move {
                // First tick completes immediately.
                let mut ticker = tokio::time::interval(every);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => trigger(FetchOrigin::Poll),
                    }
                }
            });
        }
        None => trigger(FetchOrigin::Poll),
    }

    PollHandle { cancel, trigger }
}

/// Last good snapshot of one resource plus the error to show, if any.
#[derive(Debug)]
pub struct SnapshotSlot<T> {
    snapshot: Option<T>,
    error: Option<String>,
    last_seq: u64,
    updated_at: Option<DateTime<Local>>,
}

impl<T> Default for SnapshotSlot<T> {
    fn default() -> Self {
        Self {
            snapshot: None,
            error: None,
            last_seq: 0,
            updated_at: None,
        }
    }
}

impl<T> SnapshotSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&T> {
        self.snapshot.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn updated_at(&self) -> Option<DateTime<Local>> {
        self.updated_at
    }

    /// Nothing to show yet and no error
    pub fn is_loading(&self) -> bool {
        self.snapshot.is_none() && self.error.is_none()
    }

    /// Forget the snapshot and ignore any result issued at or before `floor`.
    pub fn reset(&mut self, floor: u64) {
        self.snapshot = None;
        self.error = None;
        self.updated_at = None;
        self.last_seq = self.last_seq.max(floor);
    }

    /// Fold a result in. Returns `false` if it was stale and ignored.
    pub fn apply(&mut self, tagged: Tagged<T>) -> bool {
        if tagged.seq <= self.last_seq {
            debug!(seq = tagged.seq, last = self.last_seq, "Dropping stale result");
            return false;
        }
        self.last_seq = tagged.seq;

        match tagged.result {
            Ok(snapshot) => {
                self.snapshot = Some(snapshot);
                self.error = None;
                self.updated_at = Some(Local::now());
            }
            Err(e) if tagged.origin == FetchOrigin::Manual || self.snapshot.is_none() => {
                self.error = Some(e.to_string());
            }
            Err(e) => {
                warn!(seq = tagged.seq, error = %e, "Background refresh failed, keeping last snapshot");
            }
        }
        true
    }
}
