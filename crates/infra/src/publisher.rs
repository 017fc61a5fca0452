//! Event publishing pipeline (validation, dedup, append).
//!
//! ## Publish Flow
//!
//! ```text
//! event
//!   ↓
//! 1. Canonicalize (serde_json, sorted keys)         → Serialization
//!   ↓
//! 2. dedupe? fingerprint + insert-if-absent          → Duplicate
//!   ↓
//! 3. raw mode + schema? validate                     → InvalidEvent
//!   ↓
//! 4. mint EventId, wrap in EventRecord, append       → Append
//!   ↓
//! EventId
//! ```
//!
//! ## Insert-Before-Append
//!
//! The fingerprint is recorded in step 2, before the append. Two concurrent
//! identical events therefore can't both pass the check. The cost: if a later
//! step fails the fingerprint stays cached, and an immediate resubmission is
//! rejected as a duplicate until the window passes.
//!
//! ## No Write Retries
//!
//! An append is attempted exactly once. Retrying writes is the caller's decision;
//! the minted id is discarded on failure.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

use eventgate_core::{EventId, Fingerprint};
use eventgate_events::{
    CanonicalEvent, DEFAULT_EVENT_TYPE, EventRecord, SchemaValidator, canonicalize,
    canonicalize_raw,
};

use crate::dedup::DedupCache;
use crate::event_store::{StoreConnection, StoreError};

/// Why an event was not published.
///
/// Every variant means nothing was durably appended.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The event could not be turned into its canonical JSON form.
    #[error("unable to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The event failed schema validation.
    #[error("event does not conform to the schema")]
    InvalidEvent,

    /// An identical event was published within the dedup window.
    #[error("event {fingerprint} already received within the dedup window")]
    Duplicate { fingerprint: Fingerprint },

    /// The store rejected or failed the append.
    #[error("unable to append event to stream '{stream}': {source}")]
    Append {
        stream: String,
        #[source]
        source: StoreError,
    },
}

/// Publishes events to one stream.
///
/// ## Integration Modes
///
/// - [`publish`](Self::publish): typed events (`T: Serialize`); never schema-validated
/// - [`publish_raw`](Self::publish_raw): raw JSON documents; validated when a
///   [`SchemaValidator`] is attached
///
/// ## Generic Parameters
///
/// - `S`: store connection (shared with replayers via `Arc<S>`)
pub struct EventPublisher<S> {
    store: S,
    stream_name: String,
    event_type: String,
    dedup: Arc<dyn DedupCache>,
    validator: Option<Arc<SchemaValidator>>,
}

impl<S> EventPublisher<S> {
    pub fn new(store: S, stream_name: impl Into<String>, dedup: Arc<dyn DedupCache>) -> Self {
        Self {
            store,
            stream_name: stream_name.into(),
            event_type: DEFAULT_EVENT_TYPE.to_string(),
            dedup,
            validator: None,
        }
    }

    /// Validate raw documents against `validator` before appending.
    pub fn with_validator(mut self, validator: Arc<SchemaValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Tag appended records with `event_type` instead of the default.
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> EventPublisher<S>
where
    S: StoreConnection,
{
    /// Publish a typed event.
    #[instrument(skip(self, event), fields(stream = %self.stream_name))]
    pub fn publish<E>(&self, event: &E, dedupe: bool) -> Result<EventId, PublishError>
    where
        E: Serialize + ?Sized,
    {
        let canonical = canonicalize(event).map_err(|err| {
            error!(error = %err, "unable to marshal event to JSON");
            PublishError::Serialization(err)
        })?;
        self.publish_canonical(canonical, dedupe, false)
    }

    /// Publish a raw JSON document.
    #[instrument(skip(self, document), fields(stream = %self.stream_name))]
    pub fn publish_raw(&self, document: &str, dedupe: bool) -> Result<EventId, PublishError> {
        let canonical = canonicalize_raw(document).map_err(|err| {
            error!(error = %err, "unable to parse event document");
            PublishError::Serialization(err)
        })?;
        self.publish_canonical(canonical, dedupe, true)
    }

    fn publish_canonical(
        &self,
        canonical: CanonicalEvent,
        dedupe: bool,
        raw_mode: bool,
    ) -> Result<EventId, PublishError> {
        if dedupe {
            let fingerprint = canonical.fingerprint();
            if !self.dedup.insert_if_absent(fingerprint) {
                warn!(%fingerprint, "event already received within the dedup window");
                return Err(PublishError::Duplicate { fingerprint });
            }
        }

        if raw_mode {
            if let Some(validator) = &self.validator {
                if !validator.validate_value(canonical.value()) {
                    return Err(PublishError::InvalidEvent);
                }
            }
        }

        let id = EventId::new();
        let record = EventRecord::new(id, self.event_type.clone(), canonical.into_value());

        match self.store.append_to_stream(&self.stream_name, record) {
            Ok(()) => {
                debug!(event_id = %id, "event appended");
                Ok(id)
            }
            Err(source) => {
                error!(error = %source, "unable to push event to store");
                Err(PublishError::Append {
                    stream: self.stream_name.clone(),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DedupConfig;
    use crate::dedup::TtlDedupCache;
    use crate::event_store::InMemoryEventStore;
    use serde_json::json;
    use std::collections::HashMap;

    const STREAM: &str = "cricket_events_v1";

    /// Cache fake that records every call.
    #[derive(Default)]
    struct SpyCache {
        calls: std::sync::Mutex<Vec<&'static str>>,
    }

    impl DedupCache for SpyCache {
        fn lookup(&self, _: &Fingerprint) -> bool {
            self.calls.lock().unwrap().push("lookup");
            false
        }

        fn insert(&self, _: Fingerprint) {
            self.calls.lock().unwrap().push("insert");
        }
    }

    fn publisher() -> (EventPublisher<Arc<InMemoryEventStore>>, Arc<InMemoryEventStore>) {
        let store = Arc::new(InMemoryEventStore::new());
        let cache = Arc::new(TtlDedupCache::new(DedupConfig::default()).unwrap());
        (EventPublisher::new(store.clone(), STREAM, cache), store)
    }

    fn validator() -> Arc<SchemaValidator> {
        Arc::new(
            SchemaValidator::from_value(json!({
                "type": "object",
                "required": ["type", "id"],
                "properties": {
                    "type": { "type": "string" },
                    "id": { "type": "string" }
                }
            }))
            .unwrap(),
        )
    }

    #[test]
    fn duplicate_within_window_is_rejected() {
        let (publisher, store) = publisher();
        let event = json!({"type": "delivery", "id": "abc"});

        let id = publisher.publish(&event, true).unwrap();
        assert!(!id.to_string().is_empty());

        let err = publisher.publish(&event, true).unwrap_err();
        assert!(matches!(err, PublishError::Duplicate { .. }));
        assert_eq!(store.stream_len(STREAM), 1);
    }

    #[test]
    fn dedupe_false_never_touches_the_cache() {
        let store = Arc::new(InMemoryEventStore::new());
        let spy = Arc::new(SpyCache::default());
        let publisher = EventPublisher::new(store.clone(), STREAM, spy.clone());
        let event = json!({"type": "delivery", "id": "abc"});

        let a = publisher.publish(&event, false).unwrap();
        let b = publisher.publish(&event, false).unwrap();

        assert_ne!(a, b);
        assert!(spy.calls.lock().unwrap().is_empty());
        assert_eq!(store.stream_len(STREAM), 2);
    }

    #[test]
    fn field_order_does_not_defeat_dedup() {
        let (publisher, _) = publisher();
        publisher
            .publish_raw(r#"{"type":"delivery","id":"abc"}"#, true)
            .unwrap();
        let err = publisher
            .publish_raw(r#"{"id":"abc","type":"delivery"}"#, true)
            .unwrap_err();
        assert!(matches!(err, PublishError::Duplicate { .. }));
    }

    #[test]
    fn raw_documents_are_validated_when_a_schema_is_attached() {
        let (publisher, store) = publisher();
        let publisher = publisher.with_validator(validator());

        let err = publisher.publish_raw(r#"{"type":"delivery"}"#, false).unwrap_err();
        assert!(matches!(err, PublishError::InvalidEvent));
        assert_eq!(store.stream_len(STREAM), 0);

        publisher
            .publish_raw(r#"{"type":"delivery","id":"abc"}"#, false)
            .unwrap();
        assert_eq!(store.stream_len(STREAM), 1);
    }

    #[test]
    fn typed_events_skip_schema_validation() {
        let (publisher, store) = publisher();
        let publisher = publisher.with_validator(validator());

        publisher.publish(&json!({"runs": 4}), false).unwrap();
        assert_eq!(store.stream_len(STREAM), 1);
    }

    #[test]
    fn malformed_raw_document_is_a_serialization_error() {
        let (publisher, store) = publisher();
        let err = publisher.publish_raw("{\"type\":", true).unwrap_err();
        assert!(matches!(err, PublishError::Serialization(_)));
        assert_eq!(store.stream_len(STREAM), 0);
    }

    #[test]
    fn unserializable_event_is_a_serialization_error() {
        let (publisher, _) = publisher();
        let mut event = HashMap::new();
        event.insert(vec![1u8], "non-string key");

        let err = publisher.publish(&event, true).unwrap_err();
        assert!(matches!(err, PublishError::Serialization(_)));
    }

    #[test]
    fn append_failure_is_surfaced_once_and_keeps_the_fingerprint() {
        let (publisher, store) = publisher();
        let event = json!({"type": "delivery", "id": "abc"});
        store.fail_next_appends(1);

        let err = publisher.publish(&event, true).unwrap_err();
        match err {
            PublishError::Append { stream, source } => {
                assert_eq!(stream, STREAM);
                assert!(matches!(source, StoreError::Unavailable(_)));
            }
            other => panic!("expected append error, got {other:?}"),
        }
        assert_eq!(store.stream_len(STREAM), 0);

        // Insert-before-append: the failed attempt still occupies the window.
        let err = publisher.publish(&event, true).unwrap_err();
        assert!(matches!(err, PublishError::Duplicate { .. }));

        // Without dedup the caller can retry right away.
        publisher.publish(&event, false).unwrap();
        assert_eq!(store.stream_len(STREAM), 1);
    }

    #[test]
    fn records_carry_the_type_tag_and_id() {
        let (publisher, store) = publisher();
        let id = publisher.publish(&json!({"id": "abc"}), false).unwrap();

        let entries = store.entries(STREAM);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event_id, id);
        assert_eq!(entries[0].event_type, "cricket_event");

        let (publisher, store) = self::publisher();
        let publisher = publisher.with_event_type("match_event");
        publisher.publish(&json!({"id": "abc"}), false).unwrap();
        assert_eq!(store.entries(STREAM)[0].event_type, "match_event");
    }
}
