//! Stream replay: read a whole stream back, riding out transient store faults.
//!
//! ## Read Loop
//!
//! `read_all` drives a small state machine, pulling one entry at a time:
//!
//! ```text
//!            ┌────────── entry decoded ──────────┐
//!            ▼                                   │
//!  ──► Reading ──── Unavailable ──► Retrying ────┘ (after backoff, same cursor)
//!            │
//!            ├──── EndOfStream ───────────────► Done    (Ok(events))
//!            └──── NotFound / Unauthorized /
//!                  Other / decode failure ────► Failed  (Err, no partial result)
//! ```
//!
//! ## Retry Policy
//!
//! Only [`ReadFault::Unavailable`] is retried: the store explicitly tells a
//! network blip apart from "no such stream" or "not allowed", and only the blip
//! heals on its own. Retries use a fixed backoff and have no attempt limit.
//!
//! ## Cancellation
//!
//! An unbounded retry loop can't be abandoned by the caller on its own, so
//! [`StreamReplayer::read_all_with`] takes a [`ReplayControl`] carrying an
//! optional deadline and a [`CancelToken`]. Both are checked around every
//! backoff and wake the pause early.
//!
//! ## Ordering
//!
//! Events are returned exactly in the order the store delivered them. A malformed
//! entry is never skipped: dropping it would silently break the replay.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

use crate::config::ReplayConfig;
use crate::event_store::{ReadFault, StoreConnection};

/// Why a replay did not complete.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("unable to read from stream '{0}': it does not exist")]
    StreamNotFound(String),

    #[error("unauthorized to read stream '{stream}': {reason}")]
    Unauthorized { stream: String, reason: String },

    #[error("unable to decode entry {position} of stream '{stream}': {source}")]
    Decode {
        stream: String,
        position: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown error while reading stream '{stream}': {reason}")]
    UnknownRead { stream: String, reason: String },

    #[error("replay of stream '{0}' was cancelled")]
    Cancelled(String),

    #[error("replay of stream '{0}' exceeded its deadline")]
    DeadlineExceeded(String),
}

/// Cooperative cancellation flag that can wake a sleeping replay.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, wake) = &*self.inner;
        *flag.lock().unwrap_or_else(|p| p.into_inner()) = true;
        wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Block for up to `timeout`; returns `true` if cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, wake) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(|p| p.into_inner());
        let (cancelled, _) = wake
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(|p| p.into_inner());
        *cancelled
    }
}

/// Caller-side limits for one replay.
#[derive(Debug, Clone, Default)]
pub struct ReplayControl {
    pub deadline: Option<Instant>,
    pub cancel: CancelToken,
}

impl ReplayControl {
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancel(cancel: CancelToken) -> Self {
        Self {
            deadline: None,
            cancel,
        }
    }
}

/// Pauses the replaying thread between retries.
pub trait Sleeper: Send + Sync {
    /// Block for up to `duration`, returning early once `cancel` fires.
    fn sleep(&self, duration: Duration, cancel: &CancelToken);
}

/// Real pause on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration, cancel: &CancelToken) {
        cancel.wait_timeout(duration);
    }
}

/// Replays whole streams from a store.
pub struct StreamReplayer<S> {
    store: S,
    backoff: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl<S> StreamReplayer<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, ReplayConfig::default())
    }

    pub fn with_config(store: S, config: ReplayConfig) -> Self {
        Self {
            store,
            backoff: config.backoff,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }
}

impl<S> StreamReplayer<S>
where
    S: StoreConnection,
{
    /// Read every event of `stream`, decoded as JSON values.
    pub fn read_all(&self, stream: &str) -> Result<Vec<JsonValue>, ReplayError> {
        self.read_all_as(stream)
    }

    /// Read every event of `stream`, decoded into `T`.
    pub fn read_all_as<T>(&self, stream: &str) -> Result<Vec<T>, ReplayError>
    where
        T: DeserializeOwned,
    {
        self.read_all_with(stream, &ReplayControl::default())
    }

    /// Read every event of `stream`, giving up on cancellation or deadline.
    #[instrument(skip(self, control))]
    pub fn read_all_with<T>(&self, stream: &str, control: &ReplayControl) -> Result<Vec<T>, ReplayError>
    where
        T: DeserializeOwned,
    {
        let mut reader = self.store.open_reader(stream);
        let mut events = Vec::new();

        loop {
            match reader.next_entry() {
                Ok(entry) => {
                    let payload = serde_json::from_slice::<T>(&entry.data).map_err(|source| {
                        error!(position = entry.position, error = %source, "unable to deserialize event");
                        ReplayError::Decode {
                            stream: stream.to_string(),
                            position: entry.position,
                            source,
                        }
                    })?;
                    events.push(payload);
                }
                Err(ReadFault::EndOfStream) => {
                    debug!(count = events.len(), "stream replayed");
                    return Ok(events);
                }
                Err(ReadFault::Unavailable(reason)) => {
                    warn!(
                        %reason,
                        backoff_secs = self.backoff.as_secs_f64(),
                        "store temporarily unavailable, retrying"
                    );
                    self.pause(stream, control)?;
                }
                Err(ReadFault::StreamNotFound(_)) => {
                    error!("stream does not exist");
                    return Err(ReplayError::StreamNotFound(stream.to_string()));
                }
                Err(ReadFault::Unauthorized(reason)) => {
                    error!(%reason, "unauthorized request");
                    return Err(ReplayError::Unauthorized {
                        stream: stream.to_string(),
                        reason,
                    });
                }
                Err(ReadFault::Other(reason)) => {
                    error!(%reason, "unknown error occurred when reading from store");
                    return Err(ReplayError::UnknownRead {
                        stream: stream.to_string(),
                        reason,
                    });
                }
            }
        }
    }

    /// Wait out one backoff, honoring the caller's limits.
    fn pause(&self, stream: &str, control: &ReplayControl) -> Result<(), ReplayError> {
        let cancelled = || ReplayError::Cancelled(stream.to_string());
        let expired = || ReplayError::DeadlineExceeded(stream.to_string());

        if control.cancel.is_cancelled() {
            return Err(cancelled());
        }

        let pause = match control.deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(expired());
                }
                remaining.min(self.backoff)
            }
            None => self.backoff,
        };

        self.sleeper.sleep(pause, &control.cancel);

        if control.cancel.is_cancelled() {
            return Err(cancelled());
        }
        if control.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(expired());
        }
        Ok(())
    }
}
