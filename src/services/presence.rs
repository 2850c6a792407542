// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Presence sessions: live "now playing" state for one visible display.
//!
//! Each session owns two periodic tasks sharing one cancellation token:
//! - the status poll, which replaces the displayed snapshot with fresh data
//! - the progress tick, which advances the progress bar between polls
//!
//! Polls may overlap. Every poll carries a sequence number and a response is
//! only applied if it is newer than the last applied one.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::AppError;
use crate::models::TrackStatus;
use crate::services::spotify::StatusFetcher;

/// Progress added per interpolation tick.
pub const PROGRESS_INCREMENT_MS: u64 = 1000;

/// Timing of a presence session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceSettings {
    pub poll_interval: Duration,
    pub progress_tick: Duration,
    pub progress_increment_ms: u64,
}

impl Default for PresenceSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5000),
            progress_tick: Duration::from_millis(1000),
            progress_increment_ms: PROGRESS_INCREMENT_MS,
        }
    }
}

impl PresenceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.status_poll_interval,
            progress_tick: config.progress_tick,
            progress_increment_ms: PROGRESS_INCREMENT_MS,
        }
    }
}

/// What a display currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayedStatus {
    /// Sequence number of the poll this snapshot came from (0 = none yet)
    pub seq: u64,
    pub track: Option<TrackStatus>,
}

/// Shared, watchable displayed snapshot.
#[derive(Clone)]
pub struct SnapshotCell {
    tx: Arc<watch::Sender<DisplayedStatus>>,
}

impl Default for SnapshotCell {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(DisplayedStatus::default());
        Self { tx: Arc::new(tx) }
    }
}

impl SnapshotCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a poll result unless a newer one has already been applied.
    ///
    /// Replaces any locally interpolated progress. Returns whether it applied.
    pub fn apply_poll(&self, seq: u64, track: Option<TrackStatus>) -> bool {
        let mut applied = false;
        self.tx.send_if_modified(|current| {
            if seq <= current.seq {
                return false;
            }
            current.seq = seq;
            current.track = track;
            applied = true;
            true
        });
        applied
    }

    /// Advance the displayed progress by one interpolation step.
    pub fn tick(&self, increment_ms: u64) -> bool {
        self.tx.send_if_modified(|current| {
            current
                .track
                .as_mut()
                .is_some_and(|track| track.advance_progress(increment_ms))
        })
    }

    pub fn current(&self) -> DisplayedStatus {
        self.tx.borrow().clone()
    }

    pub fn track(&self) -> Option<TrackStatus> {
        self.tx.borrow().track.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DisplayedStatus> {
        self.tx.subscribe()
    }
}

/// One display's polling and interpolation tasks.
///
/// Dropping the session cancels both tasks; [`PresenceSession::stop`] also
/// waits for them to finish.
pub struct PresenceSession {
    cell: SnapshotCell,
    cancel_token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl PresenceSession {
    /// Start polling `fetcher`. Must be called inside a Tokio runtime.
    pub fn start<F: StatusFetcher>(fetcher: Arc<F>, settings: PresenceSettings) -> Self {
        let cell = SnapshotCell::new();
        let cancel_token = CancellationToken::new();

        let poll = tokio::spawn(poll_loop(
            fetcher,
            cell.clone(),
            settings.poll_interval,
            cancel_token.clone(),
        ));
        let progress = tokio::spawn(progress_loop(
            cell.clone(),
            settings.progress_tick,
            settings.progress_increment_ms,
            cancel_token.clone(),
        ));

        Self {
            cell,
            cancel_token,
            tasks: vec![poll, progress],
        }
    }

    pub fn snapshot(&self) -> Option<TrackStatus> {
        self.cell.track()
    }

    pub fn subscribe(&self) -> watch::Receiver<DisplayedStatus> {
        self.cell.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    /// Cancel both tasks and wait until they have exited.
    pub async fn stop(mut self) {
        self.cancel_token.cancel();
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::error!(error = %e, "Presence task panicked");
                }
            }
        }
    }
}

impl Drop for PresenceSession {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn poll_loop<F: StatusFetcher>(
    fetcher: Arc<F>,
    cell: SnapshotCell,
    period: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Dropping the set aborts fetches still in flight
    let mut in_flight = JoinSet::new();
    let mut next_seq: u64 = 0;

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => break,

            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                match joined {
                    Ok((seq, Ok(track))) => {
                        if !cell.apply_poll(seq, track) {
                            tracing::debug!(seq, "Discarded out-of-order status response");
                        }
                    }
                    // Previous snapshot stays until the next poll
                    Ok((seq, Err(e))) => {
                        tracing::warn!(seq, error = %e, "Status poll failed");
                    }
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => tracing::error!(error = %e, "Status poll task panicked"),
                }
            }

            _ = ticker.tick() => {
                next_seq += 1;
                let seq = next_seq;
                let fetcher = fetcher.clone();
                in_flight.spawn(async move { (seq, fetcher.fetch_status().await) });
            }
        }
    }

    tracing::debug!("Status poll stopped");
}

async fn progress_loop(
    cell: SnapshotCell,
    period: Duration,
    increment_ms: u64,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => break,

            _ = ticker.tick() => {
                cell.tick(increment_ms);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionRegistry - open sessions by id, held on a renewable lease
// ─────────────────────────────────────────────────────────────────────────────

/// How long a session survives without being read.
pub const DEFAULT_SESSION_LEASE: Duration = Duration::from_secs(60);
/// Upper bound on concurrently open sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 32;

struct LeasedSession {
    session: PresenceSession,
    last_seen: Instant,
}

impl LeasedSession {
    fn is_expired(&self, now: Instant, lease: Duration) -> bool {
        now.duration_since(self.last_seen) >= lease
    }
}

/// Open presence sessions keyed by id.
///
/// Every read of a session renews its lease. Sessions whose display went
/// away without closing them are torn down by [`SessionRegistry::reap_expired`].
pub struct SessionRegistry {
    sessions: DashMap<u64, LeasedSession>,
    next_id: AtomicU64,
    lease: Duration,
    max_sessions: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_limits(DEFAULT_SESSION_LEASE, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(lease: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(0),
            lease,
            max_sessions,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_limits(config.session_lease, config.max_sessions)
    }

    pub fn lease(&self) -> Duration {
        self.lease
    }

    /// Start a session. Fails once `max_sessions` are open.
    pub fn open<F: StatusFetcher>(
        &self,
        fetcher: Arc<F>,
        settings: PresenceSettings,
    ) -> Result<u64, AppError> {
        if self.sessions.len() >= self.max_sessions {
            tracing::warn!(limit = self.max_sessions, "Presence session limit reached");
            return Err(AppError::SessionLimit(self.max_sessions));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.sessions.insert(
            id,
            LeasedSession {
                session: PresenceSession::start(fetcher, settings),
                last_seen: Instant::now(),
            },
        );
        tracing::info!(session_id = id, "Presence session opened");
        Ok(id)
    }

    /// Current snapshot of a session and renew its lease; `None` if the
    /// session does not exist.
    pub fn snapshot(&self, id: u64) -> Option<Option<TrackStatus>> {
        self.sessions.get_mut(&id).map(|mut entry| {
            entry.last_seen = Instant::now();
            entry.session.snapshot()
        })
    }

    pub fn contains(&self, id: u64) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Tear a session down. Returns false if it was not open.
    pub async fn close(&self, id: u64) -> bool {
        let Some((_, entry)) = self.sessions.remove(&id) else {
            return false;
        };
        entry.session.stop().await;
        tracing::info!(session_id = id, "Presence session closed");
        true
    }

    pub async fn close_all(&self) {
        let ids: Vec<u64> = self.sessions.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            self.close(id).await;
        }
    }

    /// Stop every session whose lease ran out. Returns how many were stopped.
    pub async fn reap_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<u64> = self
            .sessions
            .iter()
            .filter(|entry| entry.is_expired(now, self.lease))
            .map(|entry| *entry.key())
            .collect();

        let mut reaped = 0;
        for id in expired {
            // Re-checked under the shard lock: a read may have renewed it
            let Some((_, entry)) = self
                .sessions
                .remove_if(&id, |_, entry| entry.is_expired(now, self.lease))
            else {
                continue;
            };
            entry.session.stop().await;
            tracing::info!(session_id = id, "Presence session lease expired");
            reaped += 1;
        }
        reaped
    }

    /// Periodically reap expired sessions until `cancel_token` fires.
    pub fn spawn_reaper(self: &Arc<Self>, cancel_token: CancellationToken) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let period = (self.lease / 2).max(Duration::from_millis(100));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;

                    _ = cancel_token.cancelled() => break,

                    _ = ticker.tick() => {
                        registry.reap_expired().await;
                    }
                }
            }

            tracing::debug!("Session reaper stopped");
        })
    }
}
