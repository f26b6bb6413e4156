use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeSet;

// US Eastern standard time. DST is ignored; the date only moves near midnight.
const US_EASTERN_OFFSET_SECS: i32 = -5 * 3600;

// Padding around each calendar year so searches can cross Jan 1 / Dec 31.
const WINDOW_PADDING_DAYS: i64 = 14;

/// Current market date, used as the forward-search cutoff.
pub fn resolve_today(now_utc: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    let eastern =
        chrono::FixedOffset::east_opt(US_EASTERN_OFFSET_SECS).context("invalid US Eastern offset")?;
    Ok(now_utc.with_timezone(&eastern).date_naive())
}

/// Inclusive date range to request for `year`, or None when the whole window
/// lies in the future.
pub fn fetch_window(year: i32, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)? - Duration::days(WINDOW_PADDING_DAYS);
    let end = NaiveDate::from_ymd_opt(year, 12, 31)? + Duration::days(WINDOW_PADDING_DAYS);
    if start > today {
        return None;
    }
    Some((start, end.min(today)))
}

/// First date on or after `nominal` present in `index`.
///
/// Steps one calendar day at a time and gives up once the scan passes `today`
/// or the last indexed date.
pub fn next_trading_day(
    nominal: NaiveDate,
    index: &BTreeSet<NaiveDate>,
    today: NaiveDate,
) -> Option<NaiveDate> {
    let last = *index.last()?;
    let mut date = nominal;
    while !index.contains(&date) {
        date = date.succ_opt()?;
        if date > today || date > last {
            tracing::debug!(%nominal, %today, "no trading day before cutoff");
            return None;
        }
    }
    Some(date)
}

/// Last date strictly before `date` present in `index`.
pub fn previous_trading_day(date: NaiveDate, index: &BTreeSet<NaiveDate>) -> Option<NaiveDate> {
    let first = *index.first()?;
    let mut cur = date.pred_opt()?;
    while !index.contains(&cur) {
        cur = cur.pred_opt()?;
        if cur < first {
            return None;
        }
    }
    Some(cur)
}
