/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Backend-assigned owner identifier (`user_id` on the wire).
pub type OwnerId = i64;
