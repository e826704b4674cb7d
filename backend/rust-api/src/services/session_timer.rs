//! Administrator dashboard timers.
//!
//! Each started timer owns a tokio task that counts seconds and writes the
//! running total to the administrator's `session-admins` row every
//! `persist_every` seconds, plus once more when stopped. Timers for the same
//! administrator are independent and race on the same row.
//!
//! Polling a timer is its heartbeat. A timer whose dashboard stops polling
//! for `idle_timeout` is reaped, and its row is rolled back to the time of
//! the last heartbeat.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::AdminTimerConfig;
use crate::metrics::{ADMIN_SESSION_PERSIST_FAILURES, ADMIN_SESSION_TIMERS_ACTIVE};
use crate::models::session_admin::{
    format_seconds, NewSessionAdminPayload, SessionAdmin, SessionTimePayload, TimerSnapshot,
};
use crate::services::strapi::{StrapiClient, StrapiError, StrapiQuery};

const COLLECTION: &str = "session-admins";

/// Second counter deciding when to persist.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    seconds: u64,
    persist_every: u64,
}

impl SessionClock {
    pub fn resume(seconds: u64, persist_every: u64) -> Self {
        Self {
            seconds,
            persist_every: persist_every.max(1),
        }
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    /// Advances one second; returns the value to persist on every
    /// `persist_every`-th second.
    pub fn tick(&mut self) -> Option<u64> {
        self.seconds += 1;
        (self.seconds % self.persist_every == 0).then_some(self.seconds)
    }
}

/// Last poll of a timer and the seconds it showed.
#[derive(Debug, Clone, Copy)]
pub struct Heartbeat {
    at: Instant,
    seconds: u64,
}

impl Heartbeat {
    pub fn new(seconds: u64) -> Self {
        Self {
            at: Instant::now(),
            seconds,
        }
    }

    pub fn beat(&mut self, seconds: u64) {
        self.at = Instant::now();
        self.seconds = seconds;
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn is_stale(&self, idle_timeout: Duration) -> bool {
        self.at.elapsed() >= idle_timeout
    }
}

struct RunningTimer {
    administrator_id: i64,
    session_document_id: String,
    started_at: DateTime<Utc>,
    seconds: Arc<AtomicU64>,
    heartbeat: Heartbeat,
    /// `Some(seconds)` rolls the final write back to that value
    stop: oneshot::Sender<Option<u64>>,
    task: JoinHandle<u64>,
}

impl RunningTimer {
    fn snapshot(&self, timer_id: Uuid, seconds: u64) -> TimerSnapshot {
        TimerSnapshot {
            timer_id,
            administrator_id: self.administrator_id,
            session_document_id: self.session_document_id.clone(),
            seconds,
            formatted: format_seconds(seconds),
            started_at: self.started_at,
        }
    }
}

pub struct SessionTimers {
    strapi: StrapiClient,
    config: AdminTimerConfig,
    timers: Mutex<HashMap<Uuid, RunningTimer>>,
}

impl SessionTimers {
    pub fn new(strapi: StrapiClient, config: AdminTimerConfig) -> Self {
        Self {
            strapi,
            config,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Loads (or creates at 0) the administrator's row and starts counting
    /// from its stored value.
    pub async fn start(&self, administrator_id: i64) -> Result<TimerSnapshot, StrapiError> {
        let query = StrapiQuery::new()
            .filter_eq(&["administrator", "id"], administrator_id)
            .populate_all();

        let row = match self.strapi.first::<SessionAdmin>(COLLECTION, &query).await? {
            Some(row) => row,
            None => {
                tracing::info!("Creating session row for administrator {}", administrator_id);
                self.strapi
                    .create(COLLECTION, &NewSessionAdminPayload::start(administrator_id))
                    .await?
            }
        };

        let timer_id = Uuid::new_v4();
        let seconds = Arc::new(AtomicU64::new(row.session_time));
        let (stop, stop_rx) = oneshot::channel();

        let task = tokio::spawn(run_timer(
            self.strapi.clone(),
            row.document_id.clone(),
            SessionClock::resume(row.session_time, self.config.persist_every),
            self.config.tick(),
            seconds.clone(),
            stop_rx,
        ));

        let timer = RunningTimer {
            administrator_id,
            session_document_id: row.document_id,
            started_at: Utc::now(),
            seconds,
            heartbeat: Heartbeat::new(row.session_time),
            stop,
            task,
        };
        let snapshot = timer.snapshot(timer_id, row.session_time);

        self.timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(timer_id, timer);
        ADMIN_SESSION_TIMERS_ACTIVE.inc();

        tracing::info!(
            "Session timer {} started for administrator {} at {}s",
            timer_id,
            administrator_id,
            snapshot.seconds
        );
        Ok(snapshot)
    }

    pub fn get(&self, timer_id: Uuid) -> Option<TimerSnapshot> {
        let timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        timers
            .get(&timer_id)
            .map(|timer| timer.snapshot(timer_id, timer.seconds.load(Ordering::SeqCst)))
    }

    /// Snapshot of the administrator's own timer, refreshing its heartbeat.
    pub fn poll(&self, timer_id: Uuid, administrator_id: i64) -> Option<TimerSnapshot> {
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        let timer = timers
            .get_mut(&timer_id)
            .filter(|timer| timer.administrator_id == administrator_id)?;
        let seconds = timer.seconds.load(Ordering::SeqCst);
        timer.heartbeat.beat(seconds);
        Some(timer.snapshot(timer_id, seconds))
    }

    /// Stops the timer after its final write.
    pub async fn stop(&self, timer_id: Uuid) -> Option<TimerSnapshot> {
        let timer = self
            .timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&timer_id)?;
        Some(finish(timer_id, timer, None).await)
    }

    /// Stops every timer of one administrator (logout).
    pub async fn stop_all_for(&self, administrator_id: i64) -> Vec<TimerSnapshot> {
        self.drain(|timer| timer.administrator_id == administrator_id, false)
            .await
    }

    /// Stops every running timer (shutdown); returns how many were stopped.
    pub async fn stop_all(&self) -> usize {
        self.drain(|_| true, false).await.len()
    }

    /// Stops the timers nobody polled within `idle_timeout`. Their final
    /// write is the time shown at the last heartbeat.
    pub async fn reap_idle(&self) -> Vec<TimerSnapshot> {
        let idle_timeout = self.config.idle_timeout();
        let reaped = self
            .drain(|timer| timer.heartbeat.is_stale(idle_timeout), true)
            .await;
        for snapshot in &reaped {
            tracing::warn!(
                "Session timer {} of administrator {} reaped after {:?} without a heartbeat",
                snapshot.timer_id,
                snapshot.administrator_id,
                idle_timeout
            );
        }
        reaped
    }

    /// Runs [`SessionTimers::reap_idle`] every half idle timeout, forever.
    pub async fn reap_forever(&self) {
        let every = (self.config.idle_timeout() / 2).max(Duration::from_millis(1));
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.reap_idle().await;
        }
    }

    async fn drain(
        &self,
        select: impl Fn(&RunningTimer) -> bool,
        roll_back: bool,
    ) -> Vec<TimerSnapshot> {
        let owned: Vec<(Uuid, RunningTimer)> = {
            let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
            let ids: Vec<Uuid> = timers
                .iter()
                .filter(|(_, timer)| select(timer))
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| timers.remove(&id).map(|timer| (id, timer)))
                .collect()
        };

        let mut stopped = Vec::with_capacity(owned.len());
        for (timer_id, timer) in owned {
            let cap = roll_back.then(|| timer.heartbeat.seconds());
            stopped.push(finish(timer_id, timer, cap).await);
        }
        stopped
    }

    pub fn active(&self) -> usize {
        self.timers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

async fn finish(timer_id: Uuid, timer: RunningTimer, cap: Option<u64>) -> TimerSnapshot {
    let RunningTimer {
        administrator_id,
        session_document_id,
        started_at,
        seconds,
        stop,
        task,
        ..
    } = timer;

    // The task may already be gone if it panicked
    let _ = stop.send(cap);
    let total = match task.await {
        Ok(total) => total,
        Err(e) => {
            tracing::error!("Session timer {} task failed: {}", timer_id, e);
            seconds.load(Ordering::SeqCst)
        }
    };
    ADMIN_SESSION_TIMERS_ACTIVE.dec();

    tracing::info!("Session timer {} stopped at {}s", timer_id, total);
    TimerSnapshot {
        timer_id,
        administrator_id,
        session_document_id,
        seconds: total,
        formatted: format_seconds(total),
        started_at,
    }
}

async fn run_timer(
    strapi: StrapiClient,
    document_id: String,
    mut clock: SessionClock,
    tick: std::time::Duration,
    shared: Arc<AtomicU64>,
    mut stop: oneshot::Receiver<Option<u64>>,
) -> u64 {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // First tick completes immediately
    interval.tick().await;

    let cap = loop {
        tokio::select! {
            cap = &mut stop => break cap.ok().flatten(),
            _ = interval.tick() => {
                let due = clock.tick();
                shared.store(clock.seconds(), Ordering::SeqCst);
                if let Some(seconds) = due {
                    persist(&strapi, &document_id, seconds).await;
                }
            }
        }
    };

    let total = cap.map_or(clock.seconds(), |cap| cap.min(clock.seconds()));
    persist(&strapi, &document_id, total).await;
    total
}

async fn persist(strapi: &StrapiClient, document_id: &str, seconds: u64) {
    let payload = SessionTimePayload {
        session_time: seconds,
    };
    match strapi.update_discard(COLLECTION, document_id, &payload).await {
        Ok(()) => tracing::debug!("Session time of {} saved at {}s", document_id, seconds),
        Err(e) => {
            ADMIN_SESSION_PERSIST_FAILURES.inc();
            tracing::error!("Failed to save session time of {}: {}", document_id, e);
        }
    }
}
