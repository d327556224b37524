//! Persisted timestamps that bound what the detector considers.
//!
//! The low-water-mark (`lastNotificationCheck`) means "every remote change at or
//! before this instant was already considered". The last login time
//! (`lastLoginTime`) seeds the mark on the next login so changes made while the
//! user was away still surface.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::kv::{read_json, write_json, KvStore, LAST_CHECK_KEY, LAST_LOGIN_KEY};

pub fn low_water_mark(kv: &dyn KvStore) -> Option<DateTime<Utc>> {
    read_json(kv, LAST_CHECK_KEY)
}

pub fn set_low_water_mark(kv: &dyn KvStore, at: DateTime<Utc>) -> Result<()> {
    write_json(kv, LAST_CHECK_KEY, &at)
}

pub fn last_login(kv: &dyn KvStore) -> Option<DateTime<Utc>> {
    read_json(kv, LAST_LOGIN_KEY)
}

pub fn set_last_login(kv: &dyn KvStore, at: DateTime<Utc>) -> Result<()> {
    write_json(kv, LAST_LOGIN_KEY, &at)
}
