use chrono::{DateTime, Utc};
use thiserror::Error;

use eventgate_core::EventId;
use eventgate_events::EventRecord;
use std::sync::Arc;

/// One entry pulled from a stream, still in the store's serialized form.
///
/// `RawEntry` is what a [`StreamReader`] hands back. The payload has **not** been
/// decoded yet; decoding (and deciding what a malformed payload means) is the
/// replayer's job, not the store's.
///
/// ## Positions
///
/// `position` is the entry's zero-based index in the stream, assigned by the store
/// at append time. Readers yield entries in ascending position order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub event_id: EventId,
    pub event_type: String,
    pub position: u64,
    pub recorded_at: DateTime<Utc>,
    pub data: Vec<u8>,
    pub metadata: Option<Vec<u8>>,
}

/// Why a reader could not produce the next entry.
///
/// This is a **closed** set: every store adapter must translate its client library's
/// failures into one of these tags, so the replay policy never has to inspect
/// implementation-specific error types.
///
/// | Tag | Meaning | Replay treats it as |
/// |-----|---------|---------------------|
/// | `Unavailable` | network blip, server temporarily unavailable | retry after backoff |
/// | `StreamNotFound` | no such stream | terminal |
/// | `Unauthorized` | credentials rejected | terminal |
/// | `EndOfStream` | clean end of the stream | success |
/// | `Other` | anything else | terminal |
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadFault {
    #[error("store temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("stream '{0}' does not exist")]
    StreamNotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("no more events")]
    EndOfStream,

    #[error("store read failed: {0}")]
    Other(String),
}

/// Store operation error (connect / append).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unable to connect to event store: {0}")]
    Connection(String),

    #[error("store temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("append rejected: {0}")]
    Rejected(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Sequential cursor over one stream.
///
/// A failed `next_entry` call must **not** advance the cursor: after an
/// `Unavailable` fault the next call retries the same position.
pub trait StreamReader: Send {
    fn next_entry(&mut self) -> Result<RawEntry, ReadFault>;
}

/// Handle to an append-only event store.
///
/// The pipeline depends only on this contract, never on a wire format. Adapters
/// wrap a concrete store client; [`super::InMemoryEventStore`] covers tests/dev.
///
/// ## Implementation Requirements
///
/// - `Send + Sync`: one connection is shared by concurrent publishers and replayers
/// - `append_to_stream` is a single attempt; retry policy belongs to the caller
/// - `open_reader` is lazy: a missing stream surfaces as
///   [`ReadFault::StreamNotFound`] from the first `next_entry`, not from `open_reader`
pub trait StoreConnection: Send + Sync {
    /// Establish (or verify) the underlying connection.
    fn connect(&self) -> Result<(), StoreError>;

    /// Append one record to the end of `stream`.
    fn append_to_stream(&self, stream: &str, record: EventRecord) -> Result<(), StoreError>;

    /// Open a reader positioned at the start of `stream`.
    fn open_reader(&self, stream: &str) -> Box<dyn StreamReader + '_>;
}

impl<S> StoreConnection for Arc<S>
where
    S: StoreConnection + ?Sized,
{
    fn connect(&self) -> Result<(), StoreError> {
        (**self).connect()
    }

    fn append_to_stream(&self, stream: &str, record: EventRecord) -> Result<(), StoreError> {
        (**self).append_to_stream(stream, record)
    }

    fn open_reader(&self, stream: &str) -> Box<dyn StreamReader + '_> {
        (**self).open_reader(stream)
    }
}
