use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::io;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use tracing::debug;

use eventgate_core::{Clock, Fingerprint, SystemClock};

use super::DedupCache;
use crate::config::DedupConfig;
use crate::workers::{PeriodicWorker, WorkerHandle};

/// Fingerprint → time of most recent insert.
#[derive(Debug)]
struct Entries {
    map: RwLock<HashMap<Fingerprint, Instant>>,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl Entries {
    fn is_live(&self, inserted_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(inserted_at) < self.window
    }

    fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut map = self.map.write().unwrap_or_else(|p| p.into_inner());
        let before = map.len();
        map.retain(|_, inserted_at| self.is_live(*inserted_at, now));
        before - map.len()
    }
}

/// Sliding-window dedup cache backed by a locked `HashMap`.
///
/// - Lookups take a read lock and apply the window check passively
/// - Inserts take a write lock and restart the key's window
/// - A [`PeriodicWorker`] purges expired entries every `cleanup_interval`
///
/// [`new`](Self::new) and [`with_clock`](Self::with_clock) start the sweeper
/// right away. [`manual`](Self::manual) leaves it off; expired entries then only
/// go away through [`purge_expired`](Self::purge_expired) or a later
/// [`start_sweeper`](Self::start_sweeper).
///
/// The sweeper stops when the cache is dropped.
#[derive(Debug)]
pub struct TtlDedupCache {
    entries: Arc<Entries>,
    cleanup_interval: Duration,
    sweeper: Mutex<Option<WorkerHandle>>,
}

impl TtlDedupCache {
    /// Cache on the system clock, sweeping in the background.
    pub fn new(config: DedupConfig) -> io::Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Cache on `clock`, sweeping in the background.
    pub fn with_clock(config: DedupConfig, clock: Arc<dyn Clock>) -> io::Result<Self> {
        let cache = Self::manual(config, clock);
        cache.start_sweeper()?;
        Ok(cache)
    }

    /// Cache on `clock` without a sweeper (deterministic tests, embedding).
    pub fn manual(config: DedupConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Entries {
                map: RwLock::new(HashMap::new()),
                window: config.window,
                clock,
            }),
            cleanup_interval: config.cleanup_interval,
            sweeper: Mutex::new(None),
        }
    }

    /// Start the background sweeper (no-op when already running).
    pub fn start_sweeper(&self) -> io::Result<()> {
        let mut sweeper = self.sweeper.lock().unwrap_or_else(|p| p.into_inner());
        if sweeper.is_some() {
            return Ok(());
        }

        let entries = self.entries.clone();
        let handle = PeriodicWorker::spawn("dedup-sweeper", self.cleanup_interval, move || {
            let evicted = entries.purge_expired();
            if evicted > 0 {
                debug!(evicted, "evicted expired fingerprints");
            }
        })?;
        *sweeper = Some(handle);
        Ok(())
    }

    /// Stop the background sweeper and wait for it to exit.
    pub fn stop_sweeper(&self) {
        let handle = self
            .sweeper
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.shutdown();
        }
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .is_some()
    }

    /// Remove every expired entry now; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.entries.purge_expired()
    }

    /// Entries physically held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.map.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn window(&self) -> Duration {
        self.entries.window
    }

    pub fn cleanup_interval(&self) -> Duration {
        self.cleanup_interval
    }
}

impl DedupCache for TtlDedupCache {
    fn lookup(&self, fingerprint: &Fingerprint) -> bool {
        let now = self.entries.clock.now();
        let map = self.entries.map.read().unwrap_or_else(|p| p.into_inner());
        map.get(fingerprint)
            .is_some_and(|inserted_at| self.entries.is_live(*inserted_at, now))
    }

    fn insert(&self, fingerprint: Fingerprint) {
        let now = self.entries.clock.now();
        let mut map = self.entries.map.write().unwrap_or_else(|p| p.into_inner());
        map.insert(fingerprint, now);
    }

    fn insert_if_absent(&self, fingerprint: Fingerprint) -> bool {
        let now = self.entries.clock.now();
        let mut map = self.entries.map.write().unwrap_or_else(|p| p.into_inner());
        match map.entry(fingerprint) {
            Entry::Occupied(mut slot) => {
                if self.entries.is_live(*slot.get(), now) {
                    return false;
                }
                slot.insert(now);
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }
}

impl Drop for TtlDedupCache {
    fn drop(&mut self) {
        self.stop_sweeper();
    }
}
