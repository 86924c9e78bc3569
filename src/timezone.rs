//! Converts the configured canonical timezone into offsets and local dates.

use time::{Date, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

/// The current UTC offset of `canonical_timezone`, e.g. "Pacific/Auckland".
///
/// Returns `None` if the timezone name is not recognised.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Today's date in `canonical_timezone`.
///
/// Allowances fall due on local calendar days, so this is the "today" passed
/// to the allowance engine.
pub fn get_local_date(canonical_timezone: &str) -> Option<Date> {
    let offset = get_local_offset(canonical_timezone)?;

    Some(OffsetDateTime::now_utc().to_offset(offset).date())
}

#[cfg(test)]
mod tests {
    use time::{OffsetDateTime, UtcOffset};

    use super::{get_local_date, get_local_offset};

    #[test]
    fn utc_has_zero_offset() {
        assert_eq!(get_local_offset("Etc/UTC"), Some(UtcOffset::UTC));
    }

    #[test]
    fn unknown_timezone_has_no_offset() {
        assert_eq!(get_local_offset("Middle/Earth"), None);
        assert_eq!(get_local_date("Middle/Earth"), None);
    }

    #[test]
    fn local_date_in_utc_is_utc_date() {
        let before = OffsetDateTime::now_utc().date();

        let today = get_local_date("Etc/UTC").unwrap();

        let after = OffsetDateTime::now_utc().date();
        assert!(today == before || today == after);
    }
}
