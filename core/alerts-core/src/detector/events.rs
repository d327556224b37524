//! Snapshot classification and alert wording.
//!
//! An expense becomes a candidate event when it is submitted, approved or
//! rejected, and was updated strictly after the low-water-mark.
//!
//! Cross-session dedup matches on message text: a processed notification of the
//! same kind whose message contains both the merchant name and the two-decimal
//! amount counts as "already announced". This is loose. A merchant named "Acme"
//! also matches an alert for "Acme Travel" with the same amount, and two
//! distinct expenses at one merchant for one amount are indistinguishable.

use chrono::{DateTime, Utc};
use expense_protocol::{ApprovalStatus, RemoteSnapshot};

use crate::notifications::{Notification, NotificationKind};

pub const MISSING_REASON: &str = "No reason provided";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CandidateEvent<'a> {
    Approved(&'a RemoteSnapshot),
    Rejected(&'a RemoteSnapshot),
}

impl<'a> CandidateEvent<'a> {
    pub fn snapshot(&self) -> &'a RemoteSnapshot {
        match self {
            CandidateEvent::Approved(snapshot) | CandidateEvent::Rejected(snapshot) => snapshot,
        }
    }

    pub fn kind(&self) -> NotificationKind {
        match self {
            CandidateEvent::Approved(_) => NotificationKind::Success,
            CandidateEvent::Rejected(_) => NotificationKind::Error,
        }
    }

    pub fn message(&self) -> String {
        let snapshot = self.snapshot();
        let amount = snapshot.formatted_amount();
        match self {
            CandidateEvent::Approved(_) => format!(
                "Your expense at {} for {} {} has been approved.",
                snapshot.merchant, snapshot.currency, amount
            ),
            CandidateEvent::Rejected(_) => {
                let reason = snapshot
                    .reason_for_rejection
                    .as_deref()
                    .map(str::trim)
                    .filter(|reason| !reason.is_empty())
                    .unwrap_or(MISSING_REASON);
                format!(
                    "Your expense at {} for {} {} was rejected. Reason: {}",
                    snapshot.merchant, snapshot.currency, amount, reason
                )
            }
        }
    }
}

/// Returns the event a snapshot represents relative to `mark`, if any.
pub fn classify(snapshot: &RemoteSnapshot, mark: DateTime<Utc>) -> Option<CandidateEvent<'_>> {
    if !snapshot.is_submitted() || snapshot.updated_at <= mark {
        return None;
    }
    match snapshot.approval_status {
        ApprovalStatus::Approved => Some(CandidateEvent::Approved(snapshot)),
        ApprovalStatus::Rejected => Some(CandidateEvent::Rejected(snapshot)),
        _ => None,
    }
}

/// True when a dismissed notification already covers this event.
pub fn already_announced(history: &[Notification], event: &CandidateEvent<'_>) -> bool {
    let snapshot = event.snapshot();
    let amount = snapshot.formatted_amount();
    let kind = event.kind();
    history.iter().any(|n| {
        n.kind == kind
            && n.processed
            && n.message.contains(&snapshot.merchant)
            && n.message.contains(&amount)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use expense_protocol::SubmissionStatus;

    fn snapshot(status: ApprovalStatus, updated_at: DateTime<Utc>) -> RemoteSnapshot {
        RemoteSnapshot {
            id: "exp-1".to_string(),
            merchant: "Acme".to_string(),
            amount: 85.0,
            currency: "AED".to_string(),
            approval_status: status,
            submission_status: SubmissionStatus::Submitted,
            updated_at,
            reason_for_rejection: None,
        }
    }

    fn processed(kind: NotificationKind, message: &str) -> Notification {
        let mut n = Notification::new(message, kind, Utc::now());
        n.processed = true;
        n
    }

    #[test]
    fn test_approved_after_mark_is_candidate() {
        let mark = Utc::now() - Duration::minutes(5);
        let s = snapshot(ApprovalStatus::Approved, mark + Duration::seconds(1));

        let event = classify(&s, mark).expect("candidate");
        assert_eq!(event.kind(), NotificationKind::Success);
        let message = event.message();
        assert!(message.contains("Acme"));
        assert!(message.contains("AED 85.00"));
    }

    #[test]
    fn test_update_exactly_at_mark_is_not_candidate() {
        let mark = Utc::now();
        let s = snapshot(ApprovalStatus::Approved, mark);
        assert!(classify(&s, mark).is_none());
    }

    #[test]
    fn test_drafts_and_other_statuses_are_ignored() {
        let mark = Utc::now() - Duration::minutes(5);
        let later = mark + Duration::minutes(1);

        let mut draft = snapshot(ApprovalStatus::Approved, later);
        draft.submission_status = SubmissionStatus::Draft;
        assert!(classify(&draft, mark).is_none());

        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::AutoFlagged,
            ApprovalStatus::Unknown,
        ] {
            assert!(classify(&snapshot(status, later), mark).is_none());
        }
    }

    #[test]
    fn test_rejection_message_includes_reason_or_placeholder() {
        let mark = Utc::now() - Duration::minutes(5);
        let mut s = snapshot(ApprovalStatus::Rejected, Utc::now());

        let event = classify(&s, mark).expect("candidate");
        assert_eq!(event.kind(), NotificationKind::Error);
        assert!(event.message().ends_with(MISSING_REASON));

        s.reason_for_rejection = Some("Receipt unreadable".to_string());
        let event = classify(&s, mark).expect("candidate");
        assert!(event.message().ends_with("Reason: Receipt unreadable"));

        s.reason_for_rejection = Some("   ".to_string());
        let event = classify(&s, mark).expect("candidate");
        assert!(event.message().ends_with(MISSING_REASON));
    }

    #[test]
    fn test_processed_matching_record_counts_as_announced() {
        let s = snapshot(ApprovalStatus::Approved, Utc::now());
        let event = CandidateEvent::Approved(&s);
        let history = vec![processed(
            NotificationKind::Success,
            "Your expense at Acme for AED 85.00 has been approved.",
        )];
        assert!(already_announced(&history, &event));
    }

    #[test]
    fn test_unprocessed_or_other_kind_is_not_announced() {
        let s = snapshot(ApprovalStatus::Approved, Utc::now());
        let event = CandidateEvent::Approved(&s);
        let message = "Your expense at Acme for AED 85.00 has been approved.";

        let unprocessed = Notification::new(message, NotificationKind::Success, Utc::now());
        let wrong_kind = processed(NotificationKind::Error, message);
        assert!(!already_announced(&[unprocessed, wrong_kind], &event));
    }

    #[test]
    fn test_substring_merchant_matches_loosely() {
        // Known weakness of text matching: "Acme" is found inside "Acme Travel".
        let s = snapshot(ApprovalStatus::Approved, Utc::now());
        let event = CandidateEvent::Approved(&s);
        let history = vec![processed(
            NotificationKind::Success,
            "Your expense at Acme Travel for AED 85.00 has been approved.",
        )];
        assert!(already_announced(&history, &event));
    }
}
