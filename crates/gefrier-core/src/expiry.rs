//! Expiry date helpers
//!
//! "Today" is the local calendar day. An item is expired when its expiry
//! instant lies strictly before today's local midnight, so an item expiring
//! today is not expired yet.

use std::cmp::Ordering;

use chrono::{DateTime, Days, Local, NaiveDate, TimeZone, Utc};

use crate::models::Item;

/// Start of the local calendar day as a UTC instant
pub fn local_day_start(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    // Zones that skip midnight on a DST switch have no local 00:00; fall back to UTC
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Today's local midnight relative to `now`
pub fn local_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    local_day_start(now.with_timezone(&Local).date_naive())
}

/// Expiry instant for a date picked by the user (local midnight of that day)
pub fn expiry_from_date(date: NaiveDate) -> DateTime<Utc> {
    local_day_start(date)
}

pub fn is_expired(expiry: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expiry < local_midnight(now)
}

/// Expires today or within the next `days` days
pub fn is_expiring_soon(expiry: DateTime<Utc>, now: DateTime<Utc>, days: u32) -> bool {
    let today = now.with_timezone(&Local).date_naive();
    let threshold = today
        .checked_add_days(Days::new(u64::from(days)))
        .map(local_day_start)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    expiry >= local_day_start(today) && expiry <= threshold
}

/// Sort items for display: expired first, then most recently added first
pub fn sort_for_display(items: &mut [Item], now: DateTime<Utc>) {
    let today = local_midnight(now);
    let expired = |item: &Item| item.expiry_date.is_some_and(|d| d < today);

    items.sort_by(|a, b| match (expired(a), expired(b)) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => b.date_added.cmp(&a.date_added),
    });
}
