pub mod options;

use crate::domain::prices::PriceTable;
use crate::domain::report::{SeasonalReport, YearOutcome, YearResult};
use crate::domain::target::MonthDay;
use crate::ingest::provider::DataProviderClient;
use crate::time::trading_days::{fetch_window, next_trading_day, previous_trading_day};
use anyhow::Context;
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub use options::AnalysisOptions;

/// `(target - previous) / previous * 100`, or None when `previous` cannot divide.
pub fn percent_change(previous: f64, target: f64) -> Option<f64> {
    if previous == 0.0 || !previous.is_finite() || !target.is_finite() {
        return None;
    }
    Some((target - previous) / previous * 100.0)
}

pub async fn run(
    provider: &dyn DataProviderClient,
    opts: &AnalysisOptions,
    today: NaiveDate,
) -> anyhow::Result<SeasonalReport> {
    opts.validate()?;

    let mut years = Vec::with_capacity(opts.years().len());
    for year in opts.years() {
        tracing::info!(year, provider = provider.provider_name(), "fetching price data");

        let table = match fetch_window(year, today) {
            Some((start, end)) => fetch_year(provider, &opts.tickers, start, end)
                .await
                .with_context(|| format!("fetch for {year} failed"))?,
            None => PriceTable::new(),
        };

        years.push(analyze_year(&table, &opts.tickers, year, opts.target, today));
    }

    Ok(SeasonalReport {
        tickers: opts.tickers.clone(),
        target: opts.target,
        start_year: opts.start_year,
        end_year: opts.end_year,
        years,
    })
}

async fn fetch_year(
    provider: &dyn DataProviderClient,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<PriceTable> {
    let mut table = PriceTable::new();
    for ticker in tickers {
        let closes = provider
            .fetch_daily_closes(ticker, start, end)
            .await
            .with_context(|| format!("fetch {ticker} {start}..={end} failed"))?;
        tracing::debug!(%ticker, %start, %end, rows = closes.len(), "fetched closes");
        table.insert_series(ticker, closes);
    }
    Ok(table)
}

pub fn analyze_year(
    table: &PriceTable,
    tickers: &[String],
    year: i32,
    target: MonthDay,
    today: NaiveDate,
) -> YearResult {
    let outcome = resolve_outcome(table, tickers, year, target, today);
    YearResult { year, outcome }
}

fn resolve_outcome(
    table: &PriceTable,
    tickers: &[String],
    year: i32,
    target: MonthDay,
    today: NaiveDate,
) -> YearOutcome {
    if table.is_empty() {
        tracing::warn!(year, "no data found; skipping year");
        return YearOutcome::NoData;
    }

    let Some(nominal_date) = target.in_year(year) else {
        tracing::warn!(year, %target, "target date does not exist this year; skipping");
        return YearOutcome::InvalidDate;
    };

    let index = table.trading_days();
    let Some(target_day) = next_trading_day(nominal_date, index, today) else {
        tracing::warn!(year, %nominal_date, "no trading day on or after target; skipping");
        return YearOutcome::NoTradingDay { nominal_date };
    };
    tracing::info!(year, %nominal_date, %target_day, "resolved trading day");

    let Some(previous_day) = previous_trading_day(target_day, index) else {
        tracing::warn!(year, %target_day, "no previous trading day found; skipping");
        return YearOutcome::NoPreviousDay { target_day };
    };

    let mut changes = BTreeMap::new();
    for ticker in tickers {
        let closes = (
            table.close(ticker, previous_day),
            table.close(ticker, target_day),
        );
        let pct = match closes {
            (Some(prev), Some(cur)) => percent_change(prev, cur),
            _ => None,
        };
        match pct {
            Some(pct) => {
                changes.insert(ticker.clone(), pct);
            }
            None => {
                tracing::warn!(year, %ticker, %previous_day, %target_day, "missing close; skipping ticker");
            }
        }
    }

    YearOutcome::Computed {
        nominal_date,
        target_day,
        previous_day,
        changes,
    }
}
