//! Wire types for the remote expense service.
//!
//! The remote service is the source of truth for expense status. This crate only
//! describes the subset of its `GET /expenses` payload that the alert detector
//! consumes, so the client and its tests decode the same shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Path of the snapshot listing endpoint, relative to the API base URL.
pub const EXPENSES_PATH: &str = "/expenses";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    AutoFlagged,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    Draft,
    Submitted,
    #[serde(other)]
    Unknown,
}

/// Point-in-time read of one expense's status fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSnapshot {
    pub id: String,
    pub merchant: String,
    pub amount: f64,
    pub currency: String,
    pub approval_status: ApprovalStatus,
    pub submission_status: SubmissionStatus,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub reason_for_rejection: Option<String>,
}

impl RemoteSnapshot {
    pub fn is_submitted(&self) -> bool {
        self.submission_status == SubmissionStatus::Submitted
    }

    /// Amount rendered the way alert messages embed it (two decimals).
    pub fn formatted_amount(&self) -> String {
        format_amount(self.amount)
    }
}

pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotParseError {
    #[error("snapshot payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot payload must be a JSON array, got {0}")]
    NotAnArray(&'static str),
}

/// Result of decoding a snapshot listing.
///
/// Individual entries that fail to decode are counted in `skipped` rather than
/// failing the whole listing; one bad record must not hide every other update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotBatch {
    pub snapshots: Vec<RemoteSnapshot>,
    pub skipped: usize,
}

pub fn parse_snapshots(body: &[u8]) -> Result<SnapshotBatch, SnapshotParseError> {
    let value: Value = serde_json::from_slice(body)?;
    parse_snapshot_value(value)
}

pub fn parse_snapshot_value(value: Value) -> Result<SnapshotBatch, SnapshotParseError> {
    let entries = match value {
        Value::Array(entries) => entries,
        other => return Err(SnapshotParseError::NotAnArray(value_kind(&other))),
    };

    let mut batch = SnapshotBatch::default();
    for entry in entries {
        match serde_json::from_value::<RemoteSnapshot>(entry) {
            Ok(snapshot) => batch.snapshots.push(snapshot),
            Err(_) => batch.skipped += 1,
        }
    }
    Ok(batch)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_camel_case_snapshot() {
        let body = br#"[{
            "id": "exp-1",
            "merchant": "Acme",
            "amount": 85,
            "currency": "AED",
            "approvalStatus": "Approved",
            "submissionStatus": "Submitted",
            "updatedAt": "2026-03-01T10:00:00Z"
        }]"#;

        let batch = parse_snapshots(body).expect("parse");
        assert_eq!(batch.skipped, 0);
        let snapshot = &batch.snapshots[0];
        assert_eq!(snapshot.merchant, "Acme");
        assert_eq!(snapshot.approval_status, ApprovalStatus::Approved);
        assert!(snapshot.is_submitted());
        assert_eq!(snapshot.formatted_amount(), "85.00");
        assert!(snapshot.reason_for_rejection.is_none());
    }

    #[test]
    fn test_unknown_status_decodes_to_unknown_variant() {
        let body = br#"[{
            "id": "exp-2",
            "merchant": "Acme",
            "amount": 1.5,
            "currency": "USD",
            "approvalStatus": "Reimbursed",
            "submissionStatus": "Archived",
            "updatedAt": "2026-03-01T10:00:00Z"
        }]"#;

        let batch = parse_snapshots(body).expect("parse");
        assert_eq!(batch.snapshots[0].approval_status, ApprovalStatus::Unknown);
        assert_eq!(
            batch.snapshots[0].submission_status,
            SubmissionStatus::Unknown
        );
    }

    #[test]
    fn test_malformed_entries_are_skipped_not_fatal() {
        let body = br#"[
            {"id": "broken"},
            {
                "id": "exp-3",
                "merchant": "Cafe",
                "amount": 12.345,
                "currency": "EUR",
                "approvalStatus": "Rejected",
                "submissionStatus": "Submitted",
                "updatedAt": "2026-03-01T10:00:00Z",
                "reasonForRejection": "Missing receipt"
            }
        ]"#;

        let batch = parse_snapshots(body).expect("parse");
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.snapshots.len(), 1);
        assert_eq!(
            batch.snapshots[0].reason_for_rejection.as_deref(),
            Some("Missing receipt")
        );
    }

    #[test]
    fn test_non_array_payload_is_rejected() {
        let err = parse_snapshots(br#"{"expenses": []}"#).unwrap_err();
        assert!(matches!(err, SnapshotParseError::NotAnArray("object")));
    }

    #[test]
    fn test_format_amount_rounds_to_two_decimals() {
        assert_eq!(format_amount(85.0), "85.00");
        assert_eq!(format_amount(0.5), "0.50");
        assert_eq!(format_amount(1234.567), "1234.57");
    }
}
