/// Errors returned by the dispatch bookkeeping components.
///
/// None of these are retried internally; retry policy belongs to whoever
/// drives transmission.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("schema already registered: {name}")]
    DuplicateSchema { name: String },

    #[error("schema not found: {name}")]
    SchemaNotFound { name: String },

    #[error("queue entry not found: {id}")]
    QueueEntryNotFound { id: String },

    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("malformed envelope: {message}")]
    MalformedEnvelope { message: String },
}

impl DispatchError {
    /// Returns `true` for lookups of schemas or queue entries that do not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SchemaNotFound { .. } | Self::QueueEntryNotFound { .. })
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedEnvelope { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_variants() {
        assert!(DispatchError::SchemaNotFound { name: "ping".into() }.is_not_found());
        assert!(DispatchError::QueueEntryNotFound { id: "abc".into() }.is_not_found());
        assert!(!DispatchError::DuplicateSchema { name: "ping".into() }.is_not_found());
        assert!(!DispatchError::malformed("bad id").is_not_found());
    }

    #[test]
    fn messages_name_the_key() {
        let err = DispatchError::DuplicateSchema { name: "ping".into() };
        assert_eq!(err.to_string(), "schema already registered: ping");

        let err = DispatchError::QueueEntryNotFound { id: "abc123".into() };
        assert_eq!(err.to_string(), "queue entry not found: abc123");
    }
}
