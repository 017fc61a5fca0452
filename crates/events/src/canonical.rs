//! Canonical serialization of outbound events.
//!
//! Both integration modes funnel through here:
//! - **typed**: any `T: Serialize` is converted to a JSON value
//! - **raw**: a caller-supplied JSON document is parsed
//!
//! Either way the value is re-encoded with object keys in sorted order, so
//! field order in the source never affects the fingerprint.

use serde::Serialize;
use serde_json::Value as JsonValue;

use eventgate_core::Fingerprint;

/// An event reduced to its canonical JSON value and byte form.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalEvent {
    value: JsonValue,
    bytes: Vec<u8>,
}

impl CanonicalEvent {
    pub fn value(&self) -> &JsonValue {
        &self.value
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.bytes)
    }

    pub fn into_value(self) -> JsonValue {
        self.value
    }
}

/// Canonicalize a typed event.
pub fn canonicalize<E>(event: &E) -> Result<CanonicalEvent, serde_json::Error>
where
    E: Serialize + ?Sized,
{
    // `serde_json::Map` is ordered by key, so re-encoding the value sorts fields.
    let value = serde_json::to_value(event)?;
    let bytes = serde_json::to_vec(&value)?;
    Ok(CanonicalEvent { value, bytes })
}

/// Canonicalize a raw JSON document.
pub fn canonicalize_raw(document: &str) -> Result<CanonicalEvent, serde_json::Error> {
    let value: JsonValue = serde_json::from_str(document)?;
    let bytes = serde_json::to_vec(&value)?;
    Ok(CanonicalEvent { value, bytes })
}
