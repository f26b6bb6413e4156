use crate::domain::target::MonthDay;
use anyhow::Context;

pub const DEFAULT_TICKERS: [&str; 3] = ["QQQ", "SPY", "DIA"];
pub const DEFAULT_START_YEAR: i32 = 2014;
pub const DEFAULT_END_YEAR: i32 = 2024;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    pub tickers: Vec<String>,
    pub target: MonthDay,
    pub start_year: i32,
    /// Exclusive.
    pub end_year: i32,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            tickers: DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
            target: MonthDay::default(),
            start_year: DEFAULT_START_YEAR,
            end_year: DEFAULT_END_YEAR,
        }
    }
}

impl AnalysisOptions {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Applies `SEASONAL_*` overrides from `lookup` on top of the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut out = Self::default();

        if let Some(s) = lookup("SEASONAL_TICKERS") {
            let tickers = parse_tickers(&s);
            if !tickers.is_empty() {
                out.tickers = tickers;
            }
        }

        if let Some(s) = lookup("SEASONAL_TARGET") {
            out.target = s.parse().context("SEASONAL_TARGET must be MM-DD")?;
        }

        if let Some(s) = lookup("SEASONAL_START_YEAR") {
            out.start_year = s
                .trim()
                .parse()
                .context("SEASONAL_START_YEAR must be a year")?;
        }

        if let Some(s) = lookup("SEASONAL_END_YEAR") {
            out.end_year = s
                .trim()
                .parse()
                .context("SEASONAL_END_YEAR must be a year")?;
        }

        Ok(out)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.tickers.is_empty(), "at least one ticker is required");
        anyhow::ensure!(
            self.start_year < self.end_year,
            "start year must be before end year (got {}..{})",
            self.start_year,
            self.end_year
        );
        Ok(())
    }

    pub fn years(&self) -> std::ops::Range<i32> {
        self.start_year..self.end_year
    }
}

/// Splits a comma list, trims, uppercases and drops duplicates while keeping order.
pub fn parse_tickers(s: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in s.split(',') {
        let t = part.trim().to_ascii_uppercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}
