use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, RwLock};

use chrono::Utc;

use eventgate_core::EventId;
use eventgate_events::EventRecord;

use super::r#trait::{RawEntry, ReadFault, StoreConnection, StoreError, StreamReader};

/// In-memory append-only event store.
///
/// Intended for tests/dev. Not optimized for performance.
///
/// Besides plain storage it can simulate the failures a remote store produces:
/// - [`set_reachable`](Self::set_reachable): `connect` fails while unreachable
/// - [`fail_next_appends`](Self::fail_next_appends): the next N appends fail
/// - [`inject_read_fault`](Self::inject_read_fault): a reader hits a fault at a position
#[derive(Debug)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<String, Vec<RawEntry>>>,
    read_faults: Mutex<HashMap<String, VecDeque<(u64, ReadFault)>>>,
    failing_appends: AtomicU32,
    reachable: AtomicBool,
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            read_faults: Mutex::new(HashMap::new()),
            failing_appends: AtomicU32::new(0),
            reachable: AtomicBool::new(true),
        }
    }
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Make the next `count` appends fail with [`StoreError::Unavailable`].
    pub fn fail_next_appends(&self, count: u32) {
        self.failing_appends.store(count, Ordering::SeqCst);
    }

    /// Queue a fault that a reader of `stream` hits when its cursor reaches `position`.
    ///
    /// Each queued fault fires once, in the order injected.
    pub fn inject_read_fault(&self, stream: &str, position: u64, fault: ReadFault) {
        let mut faults = self.read_faults.lock().unwrap_or_else(|p| p.into_inner());
        faults
            .entry(stream.to_string())
            .or_default()
            .push_back((position, fault));
    }

    /// Create an empty stream (reading it yields end-of-stream, not not-found).
    pub fn ensure_stream(&self, stream: &str) {
        let mut streams = self.streams.write().unwrap_or_else(|p| p.into_inner());
        streams.entry(stream.to_string()).or_default();
    }

    /// Append an entry with an arbitrary payload, bypassing record serialization.
    pub fn append_raw(&self, stream: &str, event_type: &str, data: Vec<u8>) -> EventId {
        let id = EventId::new();
        self.push(stream, id, event_type.to_string(), data, None);
        id
    }

    /// Number of entries in `stream` (0 if it doesn't exist).
    pub fn stream_len(&self, stream: &str) -> usize {
        let streams = self.streams.read().unwrap_or_else(|p| p.into_inner());
        streams.get(stream).map(Vec::len).unwrap_or(0)
    }

    /// Snapshot of a stream's entries, in append order.
    pub fn entries(&self, stream: &str) -> Vec<RawEntry> {
        let streams = self.streams.read().unwrap_or_else(|p| p.into_inner());
        streams.get(stream).cloned().unwrap_or_default()
    }

    fn push(
        &self,
        stream: &str,
        event_id: EventId,
        event_type: String,
        data: Vec<u8>,
        metadata: Option<Vec<u8>>,
    ) {
        let mut streams = self.streams.write().unwrap_or_else(|p| p.into_inner());
        let entries = streams.entry(stream.to_string()).or_default();
        entries.push(RawEntry {
            event_id,
            event_type,
            position: entries.len() as u64,
            recorded_at: Utc::now(),
            data,
            metadata,
        });
    }

    fn take_fault(&self, stream: &str, position: u64) -> Option<ReadFault> {
        let mut faults = self.read_faults.lock().unwrap_or_else(|p| p.into_inner());
        let queue = faults.get_mut(stream)?;
        if queue.front().is_some_and(|(at, _)| *at == position) {
            queue.pop_front().map(|(_, fault)| fault)
        } else {
            None
        }
    }

    fn take_append_failure(&self) -> bool {
        self.failing_appends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl StoreConnection for InMemoryEventStore {
    fn connect(&self) -> Result<(), StoreError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Connection("in-memory store marked unreachable".to_string()))
        }
    }

    fn append_to_stream(&self, stream: &str, record: EventRecord) -> Result<(), StoreError> {
        if self.take_append_failure() {
            return Err(StoreError::Unavailable("injected append failure".to_string()));
        }

        let data = serde_json::to_vec(record.data())?;
        let metadata = record.metadata().map(serde_json::to_vec).transpose()?;
        self.push(stream, record.id(), record.event_type().to_string(), data, metadata);
        Ok(())
    }

    fn open_reader(&self, stream: &str) -> Box<dyn StreamReader + '_> {
        Box::new(InMemoryReader {
            store: self,
            stream: stream.to_string(),
            cursor: 0,
        })
    }
}

struct InMemoryReader<'a> {
    store: &'a InMemoryEventStore,
    stream: String,
    cursor: u64,
}

impl StreamReader for InMemoryReader<'_> {
    fn next_entry(&mut self) -> Result<RawEntry, ReadFault> {
        if let Some(fault) = self.store.take_fault(&self.stream, self.cursor) {
            return Err(fault);
        }

        let streams = self.store.streams.read().unwrap_or_else(|p| p.into_inner());

        let entries = streams
            .get(&self.stream)
            .ok_or_else(|| ReadFault::StreamNotFound(self.stream.clone()))?;

        match entries.get(self.cursor as usize) {
            Some(entry) => {
                self.cursor += 1;
                Ok(entry.clone())
            }
            None => Err(ReadFault::EndOfStream),
        }
    }
}
