//! Pure list operations behind the store's read-merge-write cycle.

use chrono::{DateTime, Duration, Utc};

use super::types::{Notification, NotificationKind};

/// Maximum number of persisted notifications; the oldest are evicted first.
pub const MAX_NOTIFICATIONS: usize = 20;
/// Identical message + kind within this window returns the existing notification.
pub const DEDUP_WINDOW_SECS: i64 = 60;
/// Records with the same message closer than this are treated as one racing insert.
pub const RACE_COLLAPSE_MILLIS: i64 = 1000;

/// Finds an active notification that makes a new `(message, kind)` redundant.
pub fn find_recent_duplicate<'a>(
    notifications: &'a [Notification],
    message: &str,
    kind: NotificationKind,
    now: DateTime<Utc>,
) -> Option<&'a Notification> {
    let window = Duration::seconds(DEDUP_WINDOW_SECS);
    notifications.iter().find(|n| {
        n.is_active()
            && n.kind == kind
            && n.message == message
            && now.signed_duration_since(n.created_at) < window
    })
}

/// Prepends `incoming` to the persisted list and restores every list invariant.
pub fn merge_insert(persisted: Vec<Notification>, incoming: Notification) -> Vec<Notification> {
    let mut merged = Vec::with_capacity(persisted.len() + 1);
    merged.push(incoming);
    merged.extend(persisted.into_iter());
    normalize(merged)
}

/// Collapse racing duplicates, order newest first, then apply the cap.
pub fn normalize(notifications: Vec<Notification>) -> Vec<Notification> {
    let mut list = collapse_near_duplicates(notifications);
    list.sort_by(|left, right| right.created_at.cmp(&left.created_at));
    list.truncate(MAX_NOTIFICATIONS);
    list
}

/// Keeps the first of any records sharing a message whose timestamps are under
/// [`RACE_COLLAPSE_MILLIS`] apart. Duplicate ids are dropped the same way.
fn collapse_near_duplicates(notifications: Vec<Notification>) -> Vec<Notification> {
    let mut kept: Vec<Notification> = Vec::with_capacity(notifications.len());
    for candidate in notifications {
        let duplicate = kept.iter().any(|existing| {
            existing.id == candidate.id
                || (existing.message == candidate.message
                    && existing
                        .created_at
                        .signed_duration_since(candidate.created_at)
                        .num_milliseconds()
                        .abs()
                        < RACE_COLLAPSE_MILLIS)
        });
        if !duplicate {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_secs(base: DateTime<Utc>, offset: i64) -> DateTime<Utc> {
        base + Duration::seconds(offset)
    }

    fn notif(id: &str, message: &str, created_at: DateTime<Utc>) -> Notification {
        Notification {
            id: id.to_string(),
            message: message.to_string(),
            kind: NotificationKind::Info,
            read: false,
            processed: false,
            created_at,
        }
    }

    #[test]
    fn test_duplicate_inside_window_is_found() {
        let now = Utc::now();
        let list = vec![notif("a", "Saved", at_secs(now, -30))];
        let found = find_recent_duplicate(&list, "Saved", NotificationKind::Info, now);
        assert_eq!(found.map(|n| n.id.as_str()), Some("a"));
    }

    #[test]
    fn test_duplicate_outside_window_is_ignored() {
        let now = Utc::now();
        let list = vec![notif("a", "Saved", at_secs(now, -DEDUP_WINDOW_SECS))];
        assert!(find_recent_duplicate(&list, "Saved", NotificationKind::Info, now).is_none());
    }

    #[test]
    fn test_duplicate_requires_same_kind_and_active() {
        let now = Utc::now();
        let mut processed = notif("a", "Saved", now);
        processed.processed = true;
        let list = vec![processed, notif("b", "Saved", now)];

        assert!(find_recent_duplicate(&list, "Saved", NotificationKind::Error, now).is_none());
        let found = find_recent_duplicate(&list, "Saved", NotificationKind::Info, now);
        assert_eq!(found.map(|n| n.id.as_str()), Some("b"));
    }

    #[test]
    fn test_merge_collapses_racing_inserts_keeping_incoming() {
        let now = Utc::now();
        let persisted = vec![notif("old", "Approved", now - Duration::milliseconds(400))];
        let merged = merge_insert(persisted, notif("new", "Approved", now));

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "new");
    }

    #[test]
    fn test_merge_keeps_same_message_a_second_apart() {
        let now = Utc::now();
        let persisted = vec![notif("old", "Approved", at_secs(now, -1))];
        let merged = merge_insert(persisted, notif("new", "Approved", now));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_orders_newest_first_and_caps() {
        let now = Utc::now();
        let persisted: Vec<_> = (0..MAX_NOTIFICATIONS as i64)
            .map(|i| notif(&format!("n{}", i), &format!("msg {}", i), at_secs(now, -10 - i)))
            .collect();

        let merged = merge_insert(persisted, notif("fresh", "fresh", now));

        assert_eq!(merged.len(), MAX_NOTIFICATIONS);
        assert_eq!(merged[0].id, "fresh");
        // n19 was the oldest and is evicted.
        assert!(merged.iter().all(|n| n.id != "n19"));
        assert!(merged
            .windows(2)
            .all(|pair| pair[0].created_at >= pair[1].created_at));
    }

    #[test]
    fn test_merge_sorts_out_of_order_persisted_list() {
        let now = Utc::now();
        let persisted = vec![
            notif("older", "a", at_secs(now, -100)),
            notif("newer", "b", at_secs(now, -5)),
        ];
        let merged = merge_insert(persisted, notif("mid", "c", at_secs(now, -50)));
        let ids: Vec<_> = merged.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["newer", "mid", "older"]);
    }
}
