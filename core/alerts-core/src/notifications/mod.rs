//! User-facing alert history.
//!
//! - `types`: the persisted [`Notification`] record and its kind
//! - [`merge`]: dedup window, race collapse and cap, as pure functions
//! - `store`: [`NotificationStore`], the single writer for the persisted list

pub mod merge;
mod store;
mod types;

pub use merge::{DEDUP_WINDOW_SECS, MAX_NOTIFICATIONS};
pub use store::{NotificationStore, NotificationView};
pub use types::{Notification, NotificationKind};
