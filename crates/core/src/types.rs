/// Relay-assigned job identifier (UUID v4, generated at submission).
pub type JobId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
