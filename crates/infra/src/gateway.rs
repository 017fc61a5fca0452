//! Integration facade: one configured publisher + replayer over one store.
//!
//! ```text
//! GatewayConfig ──► EventGate::connect(config, store)
//!                     ├─ store.connect()
//!                     ├─ SchemaValidator::load(schema_path)   (if configured)
//!                     ├─ TtlDedupCache + sweeper
//!                     ├─ EventPublisher  ─┐
//!                     └─ StreamReplayer  ─┴─ share Arc<S>
//! ```
//!
//! A schema that fails to load aborts construction: there is no way to get a
//! gate that silently skips validation because its schema was broken.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, info};

use eventgate_core::EventId;
use eventgate_events::{SchemaLoadError, SchemaValidator};

use crate::config::GatewayConfig;
use crate::dedup::{DedupCache, TtlDedupCache};
use crate::event_store::{StoreConnection, StoreError};
use crate::publisher::{EventPublisher, PublishError};
use crate::replay::{ReplayControl, ReplayError, Sleeper, StreamReplayer};

/// Gate construction failed.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Fatal: the process must not accept events without its schema.
    #[error(transparent)]
    Schema(#[from] SchemaLoadError),

    #[error("unable to start dedup sweeper: {0}")]
    Sweeper(#[source] std::io::Error),
}

/// Configured entry point for producers and consumers.
pub struct EventGate<S> {
    config: GatewayConfig,
    dedup: Arc<TtlDedupCache>,
    publisher: EventPublisher<Arc<S>>,
    replayer: StreamReplayer<Arc<S>>,
}

impl<S> EventGate<S>
where
    S: StoreConnection,
{
    /// Connect to the store and assemble the pipeline from `config`.
    pub fn connect(config: GatewayConfig, store: S) -> Result<Self, GatewayError> {
        store.connect().map_err(|err| {
            error!(url = %config.base_url(), error = %err, "unable to create store connection");
            err
        })?;
        info!(url = %config.base_url(), stream = %config.stream_name, "connected to event store");

        let validator = config
            .schema_path
            .as_deref()
            .map(|path| SchemaValidator::load(path))
            .transpose()?
            .map(Arc::new);

        let dedup = Arc::new(TtlDedupCache::new(config.dedup).map_err(GatewayError::Sweeper)?);

        let store = Arc::new(store);
        let shared: Arc<dyn DedupCache> = dedup.clone();
        let mut publisher = EventPublisher::new(store.clone(), config.stream_name.clone(), shared)
            .with_event_type(config.event_type.clone());
        if let Some(validator) = validator {
            publisher = publisher.with_validator(validator);
        }
        let replayer = StreamReplayer::with_config(store, config.replay);

        Ok(Self {
            config,
            dedup,
            publisher,
            replayer,
        })
    }

    /// Replace the replay sleeper (tests, custom schedulers).
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.replayer = self.replayer.with_sleeper(sleeper);
        self
    }

    /// Publish a typed event to the configured stream.
    pub fn push_event<E>(&self, event: &E, dedupe: bool) -> Result<EventId, PublishError>
    where
        E: Serialize + ?Sized,
    {
        self.publisher.publish(event, dedupe)
    }

    /// Publish a raw JSON document to the configured stream (schema-validated).
    pub fn push_raw(&self, document: &str, dedupe: bool) -> Result<EventId, PublishError> {
        self.publisher.publish_raw(document, dedupe)
    }

    /// Replay any stream as JSON values.
    pub fn read_stream(&self, stream: &str) -> Result<Vec<JsonValue>, ReplayError> {
        self.replayer.read_all(stream)
    }

    /// Replay the configured stream, decoded into `T`.
    pub fn read_configured_stream<T>(&self) -> Result<Vec<T>, ReplayError>
    where
        T: DeserializeOwned,
    {
        self.replayer.read_all_as(&self.config.stream_name)
    }

    /// Replay any stream under caller-supplied limits.
    pub fn read_stream_with<T>(
        &self,
        stream: &str,
        control: &ReplayControl,
    ) -> Result<Vec<T>, ReplayError>
    where
        T: DeserializeOwned,
    {
        self.replayer.read_all_with(stream, control)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn dedup_cache(&self) -> &TtlDedupCache {
        &self.dedup
    }

    pub fn store(&self) -> &S {
        self.publisher.store()
    }

    pub fn validates_raw_documents(&self) -> bool {
        self.config.schema_path.is_some()
    }
}
