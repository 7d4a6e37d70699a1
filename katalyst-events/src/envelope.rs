use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The envelope every event carries through the bus
///
/// `T` is the opaque payload — the bus dispatches on `T`'s concrete Rust
/// type via a `TypeId`-keyed handler map, so subscribers register for one
/// concrete payload type at a time.
#[derive(Debug, Clone)]
pub struct EventEnvelope<T> {
    pub event_id: String,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub correlation_id: Option<String>,
    pub causation_id: Option<String>,
    pub source: Option<String>,
    pub version: i32,
    pub payload: T,
}

impl<T> EventEnvelope<T> {
    /// Wraps `payload`, stamping a random 128-bit event id and the current
    /// time — the envelope defaults the runtime calls for.
    pub fn new(event_type: impl Into<String>, payload: T) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            occurred_at: Utc::now(),
            correlation_id: None,
            causation_id: None,
            source: None,
            version: 1,
            payload,
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_causation_id(mut self, id: impl Into<String>) -> Self {
        self.causation_id = Some(id.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> EventEnvelope<U> {
        EventEnvelope {
            event_id: self.event_id,
            event_type: self.event_type,
            occurred_at: self.occurred_at,
            correlation_id: self.correlation_id,
            causation_id: self.causation_id,
            source: self.source,
            version: self.version,
            payload: f(self.payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_stamps_distinct_ids_and_metadata_defaults() {
        let a = EventEnvelope::new("OrderPlaced", 1);
        let b = EventEnvelope::new("OrderPlaced", 2);
        assert_ne!(a.event_id, b.event_id);
        assert_eq!(a.version, 1);
        assert!(a.correlation_id.is_none());
    }

    #[test]
    fn builder_methods_set_optional_fields() {
        let envelope = EventEnvelope::new("OrderPlaced", 1)
            .with_correlation_id("corr-1")
            .with_causation_id("cause-1")
            .with_source("orders-service")
            .with_version(2);

        assert_eq!(envelope.correlation_id.as_deref(), Some("corr-1"));
        assert_eq!(envelope.causation_id.as_deref(), Some("cause-1"));
        assert_eq!(envelope.source.as_deref(), Some("orders-service"));
        assert_eq!(envelope.version, 2);
    }
}
