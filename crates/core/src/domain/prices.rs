use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: f64,
}

/// Closing prices for several tickers over one fetch window.
///
/// The trading-day index is the union of every date on which at least one
/// ticker has a close.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    closes: BTreeMap<String, BTreeMap<NaiveDate, f64>>,
    trading_days: BTreeSet<NaiveDate>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_series(&mut self, ticker: &str, series: impl IntoIterator<Item = DailyClose>) {
        let entry = self.closes.entry(ticker.to_string()).or_default();
        for obs in series {
            entry.insert(obs.date, obs.close);
            self.trading_days.insert(obs.date);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.trading_days.is_empty()
    }

    pub fn trading_days(&self) -> &BTreeSet<NaiveDate> {
        &self.trading_days
    }

    pub fn close(&self, ticker: &str, date: NaiveDate) -> Option<f64> {
        self.closes.get(ticker)?.get(&date).copied()
    }

    /// Observations for one ticker in date order.
    pub fn series(&self, ticker: &str) -> Vec<DailyClose> {
        self.closes
            .get(ticker)
            .map(|m| {
                m.iter()
                    .map(|(&date, &close)| DailyClose { date, close })
                    .collect()
            })
            .unwrap_or_default()
    }
}
