//! Integration tests for draft validation and the state table.

use jobtrack_core::error::ValidationError;
use jobtrack_core::request::{parse_items, JobDraft};
use jobtrack_core::state::JobState;

// ---------------------------------------------------------------------------
// Item parsing
// ---------------------------------------------------------------------------

#[test]
fn mixed_item_text_keeps_only_integers() {
    assert_eq!(parse_items("42, abc, 78"), vec![42, 78]);
}

#[test]
fn garbage_item_text_blocks_submission() {
    let draft = JobDraft::new("101", "abc", "");
    assert!(draft.parsed_items().is_empty());
    assert!(!draft.can_submit());
    assert_eq!(draft.validate(), Err(ValidationError::EmptyItems));
}

// ---------------------------------------------------------------------------
// End-to-end draft
// ---------------------------------------------------------------------------

#[test]
fn reference_draft_produces_expected_request() {
    let draft = JobDraft::new("101", "42,78,134,209", "Quarterly usage reconciliation");
    let request = draft.validate().expect("draft should be valid");

    assert_eq!(request.owner_id, 101);
    assert_eq!(request.items, vec![42, 78, 134, 209]);
    assert_eq!(
        request.note.as_deref(),
        Some("Quarterly usage reconciliation")
    );
}

// ---------------------------------------------------------------------------
// State table serde
// ---------------------------------------------------------------------------

#[test]
fn job_state_deserializes_unknown_values() {
    let state: JobState = serde_json::from_str(r#""RETRY""#).unwrap();
    assert_eq!(state, JobState::Unknown("RETRY".into()));
    assert_eq!(serde_json::to_string(&state).unwrap(), r#""RETRY""#);
}

#[test]
fn job_state_roundtrips_known_values() {
    let state: JobState = serde_json::from_str(r#""STARTED""#).unwrap();
    assert_eq!(state, JobState::Started);
}
