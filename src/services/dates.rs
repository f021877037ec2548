use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::models::MonthKey;

pub fn now_in(offset: FixedOffset) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&offset)
}

pub fn first_day(key: MonthKey) -> NaiveDate {
    // MonthKey guarantees 1..=12
    NaiveDate::from_ymd_opt(key.year, key.month, 1).unwrap_or(NaiveDate::MIN)
}

pub fn last_day(key: MonthKey) -> NaiveDate {
    first_day(key.next()) - Duration::days(1)
}

pub fn days_in_month(key: MonthKey) -> impl Iterator<Item = NaiveDate> {
    first_day(key)
        .iter_days()
        .take_while(move |d| key.contains(*d))
}

/// First and last instant of the month in business-local time.
pub fn month_bounds(
    key: MonthKey,
    offset: FixedOffset,
) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
    let start = first_day(key).and_time(NaiveTime::MIN);
    let end = last_day(key)
        .and_hms_opt(23, 59, 59)
        .unwrap_or(start);
    (at_offset(offset, start), at_offset(offset, end))
}

pub fn at_offset(offset: FixedOffset, naive: chrono::NaiveDateTime) -> DateTime<FixedOffset> {
    // a fixed offset never produces an ambiguous local time
    offset
        .from_local_datetime(&naive)
        .single()
        .unwrap_or_else(|| offset.from_utc_datetime(&naive))
}

pub fn parse_iso(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s.trim()).ok()
}

/// "Monday, November 2, 2026"
pub fn format_date_long(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

/// "9:00 AM"
pub fn format_time(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%-I:%M %p").to_string()
}

/// "November 2026"
pub fn format_month_title(key: MonthKey) -> String {
    first_day(key).format("%B %Y").to_string()
}

/// Weekday column (Sunday = 0) of the first day of the month.
pub fn leading_blank_days(key: MonthKey) -> u32 {
    first_day(key).weekday().num_days_from_sunday()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eastern() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).unwrap()
    }

    fn key(y: i32, m: u32) -> MonthKey {
        MonthKey::new(y, m).unwrap()
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(key(2026, 2)).count(), 28);
        assert_eq!(days_in_month(key(2028, 2)).count(), 29);
        assert_eq!(days_in_month(key(2026, 12)).count(), 31);
        assert_eq!(last_day(key(2026, 4)), NaiveDate::from_ymd_opt(2026, 4, 30).unwrap());
    }

    #[test]
    fn test_month_bounds() {
        let (start, end) = month_bounds(key(2026, 11), eastern());
        assert_eq!(start.to_rfc3339(), "2026-11-01T00:00:00-05:00");
        assert_eq!(end.to_rfc3339(), "2026-11-30T23:59:59-05:00");
    }

    #[test]
    fn test_parse_iso() {
        let dt = parse_iso("2026-11-02T14:00:00Z").unwrap();
        assert_eq!(format_time(&dt.with_timezone(&eastern())), "9:00 AM");
        assert!(parse_iso("next tuesday").is_none());
    }

    #[test]
    fn test_formatting() {
        let date = NaiveDate::from_ymd_opt(2026, 11, 2).unwrap();
        assert_eq!(format_date_long(date), "Monday, November 2, 2026");
        assert_eq!(format_month_title(key(2026, 11)), "November 2026");
        let afternoon = parse_iso("2026-11-02T13:30:00-05:00").unwrap();
        assert_eq!(format_time(&afternoon), "1:30 PM");
    }

    #[test]
    fn test_leading_blank_days() {
        // 2026-11-01 is a Sunday, 2026-10-01 a Thursday
        assert_eq!(leading_blank_days(key(2026, 11)), 0);
        assert_eq!(leading_blank_days(key(2026, 10)), 4);
    }
}
