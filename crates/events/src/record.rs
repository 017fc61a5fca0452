use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use eventgate_core::EventId;

/// Type tag attached to every record unless the publisher is configured otherwise.
pub const DEFAULT_EVENT_TYPE: &str = "cricket_event";

/// The unit appended to a stream.
///
/// Notes:
/// - Built by the publisher right before the append; owned by the store afterwards.
/// - **Immutable**: there are no setters, only accessors.
/// - `metadata` is carried for wire compatibility and is currently always `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    id: EventId,
    event_type: String,
    data: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<JsonValue>,
}

impl EventRecord {
    pub fn new(id: EventId, event_type: impl Into<String>, data: JsonValue) -> Self {
        Self {
            id,
            event_type: event_type.into(),
            data,
            metadata: None,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn data(&self) -> &JsonValue {
        &self.data
    }

    pub fn metadata(&self) -> Option<&JsonValue> {
        self.metadata.as_ref()
    }

    pub fn into_data(self) -> JsonValue {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metadata_is_omitted_on_the_wire() {
        let record = EventRecord::new(EventId::new(), DEFAULT_EVENT_TYPE, json!({"id": "abc"}));
        let wire = serde_json::to_value(&record).unwrap();

        assert_eq!(wire["event_type"], "cricket_event");
        assert_eq!(wire["data"]["id"], "abc");
        assert!(wire.get("metadata").is_none());
    }
}
