//! Edit sessions with heartbeat renewal
//!
//! An [`EditSession`] is the client-side owner of one lease. Opening it performs
//! the user-initiated acquire; afterwards a background task renews the lease
//! every `heartbeat_interval` until the session ends. Every way of ending the
//! session (cancel, save, or dropping the handle) makes the task release the
//! lease before it exits.

use crate::auth::ActorResolver;
use crate::core::{InvError, LeaseKey, LockResult, Result};
use crate::lock::LockService;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, warn};

/// Why an edit session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    /// The editor was closed without saving.
    Cancelled,
    /// The edit was saved.
    Saved,
    /// The session handle was dropped mid-edit.
    Abandoned,
}

/// Renewal counters of a running session.
#[derive(Debug, Default)]
struct HeartbeatCounters {
    renewals: AtomicU64,
    failed_renewals: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeartbeatStats {
    pub renewals: u64,
    pub failed_renewals: u64,
}

/// Final account of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub key: LeaseKey,
    pub exit: SessionExit,
    pub stats: HeartbeatStats,
    /// Outcome of the release issued on exit. `NotHeld` here means the lease
    /// had already been lost to another actor.
    pub release: LockResult<()>,
}

/// Holds a lease for the duration of one edit.
pub struct EditSession {
    key: LeaseKey,
    counters: Arc<HeartbeatCounters>,
    stop_tx: Option<oneshot::Sender<SessionExit>>,
    join_handle: Option<JoinHandle<SessionReport>>,
}

impl EditSession {
    /// Acquires `key` and starts the heartbeat.
    ///
    /// An acquire failure is returned as-is and no task is started; the caller
    /// must not enter edit mode.
    pub async fn begin(
        service: Arc<LockService>,
        auth: Arc<dyn ActorResolver>,
        key: LeaseKey,
    ) -> LockResult<Self> {
        service.acquire(auth.as_ref(), &key).await?;

        // Validated non-zero when the service was built.
        let period = service.config().heartbeat_interval;

        let counters = Arc::new(HeartbeatCounters::default());
        let (stop_tx, stop_rx) = oneshot::channel::<SessionExit>();
        let join_handle = tokio::spawn(run_heartbeat(
            service,
            auth,
            key.clone(),
            period,
            counters.clone(),
            stop_rx,
        ));

        Ok(Self {
            key,
            counters,
            stop_tx: Some(stop_tx),
            join_handle: Some(join_handle),
        })
    }

    pub fn key(&self) -> &LeaseKey {
        &self.key
    }

    pub fn stats(&self) -> HeartbeatStats {
        self.counters.snapshot()
    }

    /// Ends the session without saving and releases the lease.
    pub async fn cancel(self) -> Result<SessionReport> {
        self.finish(SessionExit::Cancelled).await
    }

    /// Ends the session after a successful save and releases the lease.
    pub async fn complete(self) -> Result<SessionReport> {
        self.finish(SessionExit::Saved).await
    }

    async fn finish(mut self, exit: SessionExit) -> Result<SessionReport> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(exit);
        }

        match self.join_handle.take() {
            Some(join_handle) => join_handle
                .await
                .map_err(|err| InvError::Storage(format!("heartbeat task join: {}", err))),
            None => Err(InvError::Storage("heartbeat task already finished".to_string())),
        }
    }
}

impl Drop for EditSession {
    fn drop(&mut self) {
        // The task keeps running just long enough to release; it is not aborted.
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(SessionExit::Abandoned);
        }
    }
}

impl HeartbeatCounters {
    fn snapshot(&self) -> HeartbeatStats {
        HeartbeatStats {
            renewals: self.renewals.load(Ordering::Relaxed),
            failed_renewals: self.failed_renewals.load(Ordering::Relaxed),
        }
    }
}

async fn run_heartbeat(
    service: Arc<LockService>,
    auth: Arc<dyn ActorResolver>,
    key: LeaseKey,
    period: Duration,
    counters: Arc<HeartbeatCounters>,
    mut stop_rx: oneshot::Receiver<SessionExit>,
) -> SessionReport {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let exit = loop {
        tokio::select! {
            biased;
            signal = &mut stop_rx => {
                // A dropped sender means the session handle went away.
                break signal.unwrap_or(SessionExit::Abandoned);
            }
            _ = ticker.tick() => {
                match service.renew(auth.as_ref(), &key).await {
                    Ok(lease) => {
                        counters.renewals.fetch_add(1, Ordering::Relaxed);
                        debug!(key = %key, expires_at = %lease.expires_at, "heartbeat renewed lease");
                    }
                    Err(err) => {
                        counters.failed_renewals.fetch_add(1, Ordering::Relaxed);
                        warn!(key = %key, error = %err, "heartbeat renewal failed, retrying next tick");
                    }
                }
            }
        }
    };

    let release = service.release(auth.as_ref(), &key).await;
    if let Err(err) = &release {
        warn!(key = %key, exit = ?exit, error = %err, "release on session exit failed");
    } else {
        debug!(key = %key, exit = ?exit, "edit session closed");
    }

    SessionReport {
        key,
        exit,
        stats: counters.snapshot(),
        release,
    }
}
