//! Conversion of native file-time values into display strings.
//!
//! The index stores timestamps as 100-nanosecond intervals since
//! 1601-01-01T00:00:00Z. A stored value of 0 means the timestamp is unset.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

/// Milliseconds between 1601-01-01 and 1970-01-01.
pub const FILETIME_EPOCH_OFFSET_MS: i64 = 11_644_473_600_000;

/// Number of 100ns ticks in one millisecond.
const TICKS_PER_MS: u64 = 10_000;

/// Display format for decoded timestamps.
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Convert a native file-time into Unix milliseconds. `None` for the unset value.
#[must_use]
pub fn to_unix_millis(raw: u64) -> Option<i64> {
    if raw == 0 {
        return None;
    }
    // u64::MAX / 10_000 fits comfortably in i64.
    let ms_since_1601 = (raw / TICKS_PER_MS) as i64;
    Some(ms_since_1601 - FILETIME_EPOCH_OFFSET_MS)
}

/// Decode a native file-time into `yyyy-MM-dd HH:mm:ss` local time.
///
/// Returns an empty string for 0. Values chrono cannot place on the
/// calendar also decode to an empty string.
#[must_use]
pub fn decode(raw: u64) -> String {
    let Some(ms) = to_unix_millis(raw) else {
        return String::new();
    };
    DateTime::from_timestamp_millis(ms)
        .map(|utc| utc.with_timezone(&Local).format(DISPLAY_FORMAT).to_string())
        .unwrap_or_default()
}

/// Encode a local wall-clock time as a native file-time.
///
/// Ambiguous local times (DST fold) resolve to the earlier instant.
/// Returns `None` for times that do not exist locally or precede 1601.
#[must_use]
pub fn encode_local(naive: NaiveDateTime) -> Option<u64> {
    let local = Local.from_local_datetime(&naive).earliest()?;
    let ms = local.timestamp_millis() + FILETIME_EPOCH_OFFSET_MS;
    u64::try_from(ms).ok().map(|ms| ms * TICKS_PER_MS)
}
