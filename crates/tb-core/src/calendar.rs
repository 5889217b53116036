//! Calendar bucketing.
//!
//! All boundaries are computed in UTC, the single canonical calendar for
//! bucket edges. A bucket runs from midnight of its first day to the last
//! representable instant before the next bucket starts, so consecutive
//! buckets are exactly one nanosecond apart and an event stamped at a
//! bucket's `end` belongs to that bucket.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, Utc};

use crate::error::TrendError;
use crate::granularity::Granularity;

/// A closed calendar interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bucket {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Bucket {
    /// Whether `instant` falls inside the bucket, inclusive on both ends.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Calendar date of the first day.
    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Calendar date of the last day.
    pub fn end_date(&self) -> NaiveDate {
        self.end.date_naive()
    }
}

/// A validated, day-aligned query range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a range, rejecting `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TrendError> {
        if start > end {
            return Err(TrendError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range from the start of `first` to the end of `last`.
    pub fn for_dates(first: NaiveDate, last: NaiveDate) -> Result<Self, TrendError> {
        Self::new(midnight(first), end_of_date(last))
    }

    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// Returns the bucket of the given granularity that contains `instant`.
pub fn bucket_containing(instant: DateTime<Utc>, granularity: Granularity) -> Bucket {
    let date = instant.date_naive();
    let (first, next) = match granularity {
        Granularity::Day => (date, date.succ_opt()),
        Granularity::Week => {
            let days_since_monday = date.weekday().num_days_from_monday();
            let monday = date
                .checked_sub_days(Days::new(u64::from(days_since_monday)))
                .unwrap_or(NaiveDate::MIN);
            (monday, monday.checked_add_days(Days::new(7)))
        }
        Granularity::Month => {
            let first = date.with_day(1).unwrap_or(date);
            (first, first_of_next_month(first))
        }
    };
    Bucket {
        start: midnight(first),
        end: last_instant_before(next),
    }
}

/// Generates the ordered buckets covering `[range_start, range_end]`.
///
/// Starts from the bucket containing `range_start` and keeps stepping to the
/// next bucket until one would start after `range_end`. Buckets are
/// calendar-aligned, so with week or month granularity the first bucket may
/// begin before `range_start` and the last may end after `range_end`.
pub fn generate_buckets(
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    granularity: Granularity,
) -> Result<Vec<Bucket>, TrendError> {
    if range_start > range_end {
        return Err(TrendError::InvalidRange {
            start: range_start,
            end: range_end,
        });
    }

    let mut buckets = Vec::new();
    let mut cursor = range_start;
    loop {
        let bucket = bucket_containing(cursor, granularity);
        buckets.push(bucket);
        match next_bucket_start(&bucket, granularity) {
            Some(next) if next <= range_end => cursor = next,
            _ => break,
        }
    }
    Ok(buckets)
}

fn next_bucket_start(bucket: &Bucket, granularity: Granularity) -> Option<DateTime<Utc>> {
    match granularity {
        // Jump by calendar month, never by a fixed duration.
        Granularity::Month => first_of_next_month(bucket.start_date()).map(midnight),
        Granularity::Day | Granularity::Week => {
            bucket.end.checked_add_signed(Duration::nanoseconds(1))
        }
    }
}

fn first_of_next_month(date: NaiveDate) -> Option<NaiveDate> {
    if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_date(date: NaiveDate) -> DateTime<Utc> {
    last_instant_before(date.succ_opt())
}

/// The instant one nanosecond before midnight of `next`, or the end of time.
fn last_instant_before(next: Option<NaiveDate>) -> DateTime<Utc> {
    next.map_or(DateTime::<Utc>::MAX_UTC, |next| {
        midnight(next) - Duration::nanoseconds(1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Timelike};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn assert_contiguous(buckets: &[Bucket]) {
        for pair in buckets.windows(2) {
            assert!(pair[0].start <= pair[0].end);
            assert_eq!(
                pair[1].start,
                pair[0].end + Duration::nanoseconds(1),
                "gap or overlap between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    // ========== bucket_containing ==========

    #[test]
    fn day_bucket_spans_whole_day() {
        let bucket = bucket_containing(at(2025, 9, 3, 14, 30), Granularity::Day);
        assert_eq!(bucket.start, at(2025, 9, 3, 0, 0));
        assert_eq!(bucket.end, at(2025, 9, 4, 0, 0) - Duration::nanoseconds(1));
        assert_eq!(bucket.end.hour(), 23);
        assert_eq!(bucket.end.nanosecond(), 999_999_999);
    }

    #[test]
    fn week_bucket_starts_on_monday() {
        // Sep 3, 2025 is a Wednesday
        let bucket = bucket_containing(at(2025, 9, 3, 9, 0), Granularity::Week);
        assert_eq!(bucket.start_date(), date(2025, 9, 1));
        assert_eq!(bucket.end_date(), date(2025, 9, 7));
    }

    #[test]
    fn sunday_belongs_to_preceding_monday() {
        // Sep 7, 2025 is a Sunday
        let bucket = bucket_containing(at(2025, 9, 7, 23, 59), Granularity::Week);
        assert_eq!(bucket.start_date(), date(2025, 9, 1));
    }

    #[test]
    fn monday_starts_its_own_week() {
        let bucket = bucket_containing(at(2025, 9, 8, 0, 0), Granularity::Week);
        assert_eq!(bucket.start_date(), date(2025, 9, 8));
        assert_eq!(bucket.end_date(), date(2025, 9, 14));
    }

    #[test]
    fn month_bucket_handles_leap_february() {
        let bucket = bucket_containing(at(2024, 2, 10, 12, 0), Granularity::Month);
        assert_eq!(bucket.start_date(), date(2024, 2, 1));
        assert_eq!(bucket.end_date(), date(2024, 2, 29));
    }

    #[test]
    fn december_month_bucket_ends_on_new_years_eve() {
        let bucket = bucket_containing(at(2025, 12, 15, 0, 0), Granularity::Month);
        assert_eq!(bucket.start_date(), date(2025, 12, 1));
        assert_eq!(bucket.end, at(2026, 1, 1, 0, 0) - Duration::nanoseconds(1));
    }

    // ========== generate_buckets ==========

    #[test]
    fn daily_buckets_cover_four_days() {
        let range = TimeRange::for_dates(date(2025, 9, 1), date(2025, 9, 4)).unwrap();
        let buckets = generate_buckets(range.start(), range.end(), Granularity::Day).unwrap();

        let starts: Vec<_> = buckets.iter().map(Bucket::start_date).collect();
        assert_eq!(
            starts,
            vec![
                date(2025, 9, 1),
                date(2025, 9, 2),
                date(2025, 9, 3),
                date(2025, 9, 4)
            ]
        );
        assert_contiguous(&buckets);
        assert_eq!(buckets[0].start, range.start());
        assert_eq!(buckets[3].end, range.end());
    }

    #[test]
    fn single_day_range_yields_one_bucket() {
        let range = TimeRange::for_dates(date(2025, 9, 1), date(2025, 9, 1)).unwrap();
        for granularity in Granularity::ALL {
            let buckets = generate_buckets(range.start(), range.end(), granularity).unwrap();
            assert_eq!(buckets.len(), 1, "{granularity}");
        }
    }

    #[test]
    fn weekly_buckets_are_calendar_aligned() {
        // Wed Sep 3 .. Tue Sep 16
        let range = TimeRange::for_dates(date(2025, 9, 3), date(2025, 9, 16)).unwrap();
        let buckets = generate_buckets(range.start(), range.end(), Granularity::Week).unwrap();

        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].start_date(), date(2025, 9, 1));
        assert_eq!(buckets[2].end_date(), date(2025, 9, 21));
        assert_contiguous(&buckets);
    }

    #[test]
    fn monthly_buckets_do_not_drift() {
        let range = TimeRange::for_dates(date(2025, 1, 31), date(2025, 3, 1)).unwrap();
        let buckets = generate_buckets(range.start(), range.end(), Granularity::Month).unwrap();

        let spans: Vec<_> = buckets
            .iter()
            .map(|b| (b.start_date(), b.end_date()))
            .collect();
        assert_eq!(
            spans,
            vec![
                (date(2025, 1, 1), date(2025, 1, 31)),
                (date(2025, 2, 1), date(2025, 2, 28)),
                (date(2025, 3, 1), date(2025, 3, 31)),
            ]
        );
        assert_contiguous(&buckets);
    }

    #[test]
    fn monthly_buckets_cross_year_boundary() {
        let range = TimeRange::for_dates(date(2024, 11, 20), date(2025, 2, 2)).unwrap();
        let buckets = generate_buckets(range.start(), range.end(), Granularity::Month).unwrap();
        let starts: Vec<_> = buckets.iter().map(Bucket::start_date).collect();
        assert_eq!(
            starts,
            vec![
                date(2024, 11, 1),
                date(2024, 12, 1),
                date(2025, 1, 1),
                date(2025, 2, 1)
            ]
        );
    }

    #[test]
    fn buckets_always_cover_the_range() {
        let ranges = [
            (date(2025, 9, 1), date(2025, 9, 1)),
            (date(2025, 9, 1), date(2025, 9, 30)),
            (date(2024, 2, 27), date(2024, 3, 4)),
            (date(2024, 12, 30), date(2025, 1, 6)),
            (date(2023, 6, 15), date(2025, 6, 15)),
        ];
        for (first, last) in ranges {
            let range = TimeRange::for_dates(first, last).unwrap();
            for granularity in Granularity::ALL {
                let buckets =
                    generate_buckets(range.start(), range.end(), granularity).unwrap();
                assert!(!buckets.is_empty());
                assert!(buckets[0].contains(range.start()), "{granularity} {first}");
                assert!(
                    buckets[buckets.len() - 1].contains(range.end()),
                    "{granularity} {last}"
                );
                assert_contiguous(&buckets);
            }
        }
    }

    #[test]
    fn start_after_end_is_invalid() {
        let result = generate_buckets(at(2025, 9, 4, 0, 0), at(2025, 9, 1, 0, 0), Granularity::Day);
        assert!(matches!(result, Err(TrendError::InvalidRange { .. })));

        let result = TimeRange::for_dates(date(2025, 9, 4), date(2025, 9, 1));
        assert!(matches!(result, Err(TrendError::InvalidRange { .. })));
    }

    #[test]
    fn range_for_dates_spans_whole_days() {
        let range = TimeRange::for_dates(date(2025, 9, 2), date(2025, 9, 2)).unwrap();
        assert_eq!(range.start(), at(2025, 9, 2, 0, 0));
        assert_eq!(range.end(), at(2025, 9, 3, 0, 0) - Duration::nanoseconds(1));
    }
}
