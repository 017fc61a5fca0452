//! Infrastructure layer: store boundary, dedup cache, publish and replay pipelines.
//!
//! ```text
//! producer ──► EventPublisher ──► (SchemaValidator, DedupCache) ──► StoreConnection
//! consumer ◄── StreamReplayer ◄────── retry / classify faults ◄──── StoreConnection
//! ```

pub mod config;
pub mod dedup;
pub mod event_store;
pub mod gateway;
pub mod publisher;
pub mod replay;
pub mod workers;


pub use config::{ConfigError, DedupConfig, GatewayConfig, ReplayConfig};
pub use dedup::{DedupCache, TtlDedupCache};
pub use event_store::{
    InMemoryEventStore, RawEntry, ReadFault, StoreConnection, StoreError, StreamReader,
};
pub use gateway::{EventGate, GatewayError};
pub use publisher::{EventPublisher, PublishError};
pub use replay::{
    CancelToken, ReplayControl, ReplayError, Sleeper, StreamReplayer, ThreadSleeper,
};
