//! Event records, canonical serialization and schema validation.

pub mod canonical;
pub mod record;
pub mod schema;

pub use canonical::{CanonicalEvent, canonicalize, canonicalize_raw};
pub use record::{DEFAULT_EVENT_TYPE, EventRecord};
pub use schema::{SchemaLoadError, SchemaValidator};
