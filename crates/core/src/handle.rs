//! Opaque job identifier issued by the backend.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Number of leading characters shown by [`JobHandle::short`].
pub const SHORT_HANDLE_LEN: usize = 8;

/// Backend-assigned `task_id`. Immutable once created and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobHandle(String);

impl JobHandle {
    /// Parse a handle typed or pasted by a user. Surrounding whitespace
    /// is trimmed; blank input is rejected.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::BlankHandle);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters of the handle for compact display.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(SHORT_HANDLE_LEN) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl TryFrom<String> for JobHandle {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<JobHandle> for String {
    fn from(handle: JobHandle) -> Self {
        handle.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_trims_whitespace() {
        let handle = JobHandle::parse("  abc-123 \n").unwrap();
        assert_eq!(handle.as_str(), "abc-123");
    }

    #[test]
    fn parse_rejects_blank() {
        assert_matches!(JobHandle::parse("   "), Err(ValidationError::BlankHandle));
    }

    #[test]
    fn short_truncates_long_ids() {
        let handle = JobHandle::parse("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(handle.short(), "550e8400");
        assert_eq!(JobHandle::parse("abc").unwrap().short(), "abc");
    }

    #[test]
    fn deserialize_rejects_empty_string() {
        assert!(serde_json::from_str::<JobHandle>(r#""""#).is_err());
        let handle: JobHandle = serde_json::from_str(r#""abc-123""#).unwrap();
        assert_eq!(handle.to_string(), "abc-123");
    }
}
