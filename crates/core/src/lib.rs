//! `eventgate-core`: shared building blocks for the ingestion and replay pipeline.
//!
//! This crate contains **pure** primitives (no IO, no store concerns).

pub mod clock;
pub mod error;
pub mod fingerprint;
pub mod id;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, CoreResult};
pub use fingerprint::Fingerprint;
pub use id::EventId;
