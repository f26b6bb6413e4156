use crate::domain::target::MonthDay;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum YearOutcome {
    Computed {
        nominal_date: NaiveDate,
        target_day: NaiveDate,
        previous_day: NaiveDate,
        changes: BTreeMap<String, f64>,
    },
    /// The provider returned nothing for any ticker.
    NoData,
    /// The target month/day does not exist in this year (Feb 29).
    InvalidDate,
    NoTradingDay {
        nominal_date: NaiveDate,
    },
    NoPreviousDay {
        target_day: NaiveDate,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearResult {
    pub year: i32,
    #[serde(flatten)]
    pub outcome: YearOutcome,
}

impl YearResult {
    pub fn change(&self, ticker: &str) -> Option<f64> {
        match &self.outcome {
            YearOutcome::Computed { changes, .. } => changes.get(ticker).copied(),
            _ => None,
        }
    }

    pub fn has_values(&self) -> bool {
        matches!(&self.outcome, YearOutcome::Computed { changes, .. } if !changes.is_empty())
    }

    /// X-axis label; years without computed values get a placeholder marker.
    pub fn label(&self) -> String {
        if self.has_values() {
            self.year.to_string()
        } else {
            format!("{} n/a", self.year)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalReport {
    pub tickers: Vec<String>,
    pub target: MonthDay,
    pub start_year: i32,
    /// Exclusive.
    pub end_year: i32,
    pub years: Vec<YearResult>,
}

impl SeasonalReport {
    /// Computed changes for one ticker in year order, one per year with data.
    pub fn series(&self, ticker: &str) -> Vec<(i32, f64)> {
        self.years
            .iter()
            .filter_map(|y| y.change(ticker).map(|pct| (y.year, pct)))
            .collect()
    }

    pub fn year_labels(&self) -> Vec<String> {
        self.years.iter().map(YearResult::label).collect()
    }

    pub fn title(&self) -> String {
        format!(
            "Percentage Change for {} after {}",
            join_with_and(&self.tickers),
            self.target
        )
    }

    /// Smallest and largest computed change across every ticker and year.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.tickers
            .iter()
            .flat_map(|t| self.series(t))
            .map(|(_, pct)| pct)
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

fn join_with_and(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [one] => one.clone(),
        [a, b] => format!("{a} and {b}"),
        [head @ .., last] => format!("{}, and {last}", head.join(", ")),
    }
}
