//! Job request model and client-side form validation.
//!
//! A [`JobDraft`] holds the raw text a user typed. [`JobDraft::validate`]
//! turns it into a [`JobRequest`], the only shape the submitter accepts.
//! Validation here is advisory: the backend remains the source of truth.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ValidationError;
use crate::types::OwnerId;

/// Separator between item tokens in the raw form text.
pub const ITEM_SEPARATOR: char = ',';

/// Owner id used by [`JobDraft::sample`].
pub const SAMPLE_OWNER_ID: &str = "001";

/// Item list used by [`JobDraft::sample`].
pub const SAMPLE_ITEMS: &str = "42, 78, 134, 209";

/// Note used by [`JobDraft::sample`].
pub const SAMPLE_NOTE: &str = "Quarterly usage reconciliation";

/// A validated unit of work ready to be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct JobRequest {
    pub owner_id: OwnerId,
    #[validate(length(min = 1))]
    pub items: Vec<i64>,
    pub note: Option<String>,
}

impl JobRequest {
    /// Build a request, rejecting an empty item list.
    pub fn new(
        owner_id: OwnerId,
        items: Vec<i64>,
        note: Option<String>,
    ) -> Result<Self, ValidationError> {
        let request = Self {
            owner_id,
            items,
            note,
        };
        request
            .validate()
            .map_err(|_| ValidationError::EmptyItems)?;
        Ok(request)
    }
}

/// Parse comma-separated item text into integers.
///
/// Tokens are trimmed; blank and non-integer tokens are dropped without
/// error, so `"42, abc, 78"` yields `[42, 78]` and `"abc"` yields `[]`.
pub fn parse_items(text: &str) -> Vec<i64> {
    text.split(ITEM_SEPARATOR)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse::<i64>().ok())
        .collect()
}

/// Raw, unvalidated form input for a job submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDraft {
    pub owner_id: String,
    pub items: String,
    pub note: String,
}

impl JobDraft {
    pub fn new(
        owner_id: impl Into<String>,
        items: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            items: items.into(),
            note: note.into(),
        }
    }

    /// The prefilled sample payload.
    pub fn sample() -> Self {
        Self::new(SAMPLE_OWNER_ID, SAMPLE_ITEMS, SAMPLE_NOTE)
    }

    /// Items as they would be sent, after dropping unparseable tokens.
    pub fn parsed_items(&self) -> Vec<i64> {
        parse_items(&self.items)
    }

    /// Whether the draft is complete enough to submit.
    pub fn can_submit(&self) -> bool {
        self.validate().is_ok()
    }

    /// Validate the draft and produce a [`JobRequest`].
    ///
    /// The owner id must be present and integral; the item text must
    /// yield at least one integer. A blank note becomes `None`.
    pub fn validate(&self) -> Result<JobRequest, ValidationError> {
        let owner = self.owner_id.trim();
        if owner.is_empty() {
            return Err(ValidationError::MissingOwner);
        }
        let owner_id: OwnerId = owner
            .parse()
            .map_err(|_| ValidationError::InvalidOwner(owner.to_string()))?;

        let note = if self.note.trim().is_empty() {
            None
        } else {
            Some(self.note.clone())
        };

        JobRequest::new(owner_id, self.parsed_items(), note)
    }
}
