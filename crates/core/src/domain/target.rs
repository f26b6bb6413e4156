use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A calendar month/day that is placed into every analysed year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMonthDay")]
pub struct MonthDay {
    month: u32,
    day: u32,
}

#[derive(Deserialize)]
struct RawMonthDay {
    month: u32,
    day: u32,
}

impl TryFrom<RawMonthDay> for MonthDay {
    type Error = anyhow::Error;

    fn try_from(raw: RawMonthDay) -> anyhow::Result<Self> {
        Self::try_new(raw.month, raw.day)
    }
}

impl MonthDay {
    /// Accepts any month/day that exists in a leap year, so Feb 29 is allowed
    /// and simply has no nominal date in other years.
    pub fn try_new(month: u32, day: u32) -> anyhow::Result<Self> {
        anyhow::ensure!(
            NaiveDate::from_ymd_opt(2000, month, day).is_some(),
            "invalid month/day: {month:02}-{day:02}"
        );
        Ok(Self { month, day })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn in_year(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
    }

    pub fn month_abbreviation(&self) -> &'static str {
        self.month
            .checked_sub(1)
            .and_then(|i| MONTH_ABBREVIATIONS.get(i as usize))
            .copied()
            .unwrap_or("???")
    }
}

impl Default for MonthDay {
    fn default() -> Self {
        Self { month: 12, day: 25 }
    }
}

impl FromStr for MonthDay {
    type Err = anyhow::Error;

    /// Parses `MM-DD` (e.g. `12-25`).
    fn from_str(s: &str) -> anyhow::Result<Self> {
        let (month, day) = s
            .trim()
            .split_once('-')
            .with_context(|| format!("expected MM-DD, got {s:?}"))?;
        let month = month
            .parse::<u32>()
            .with_context(|| format!("invalid month in {s:?}"))?;
        let day = day
            .parse::<u32>()
            .with_context(|| format!("invalid day in {s:?}"))?;
        Self::try_new(month, day)
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month_abbreviation(), self.day)
    }
}
