use crate::config::Settings;
use crate::domain::prices::DailyClose;
use crate::ingest::types::ChartResponse;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration as DateDuration, NaiveDate};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 1;
const MAX_RETRIES: u32 = 10;
const BASE_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) seasonal-report/0.1";
const NOT_FOUND_CODE: &str = "Not Found";

#[async_trait::async_trait]
pub trait DataProviderClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Daily closes for `ticker` between `start` and `end` (both inclusive),
    /// in date order. An empty vector means the provider has no data.
    async fn fetch_daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyClose>>;
}

#[derive(Debug, Clone)]
pub struct YahooChartProvider {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
    retries: u32,
}

impl YahooChartProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout_secs = settings
            .data_provider_timeout_secs
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build data provider http client")?;

        Ok(Self {
            http,
            base_url: settings.data_provider_base_url().to_string(),
            user_agent: settings
                .data_provider_user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            retries: settings
                .data_provider_retries
                .unwrap_or(DEFAULT_RETRIES)
                .clamp(1, MAX_RETRIES),
        })
    }

    fn url(&self, ticker: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), ticker.trim())
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&self.user_agent)?);
        Ok(headers)
    }

    async fn fetch_once(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyClose>> {
        let (period1, period2) = period_bounds(start, end)?;

        let res = self
            .http
            .get(self.url(ticker))
            .headers(self.headers()?)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await
            .context("data provider request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read provider response")?;

        if !status.is_success() {
            if is_not_found(&text) {
                return Ok(Vec::new());
            }
            anyhow::bail!("data provider HTTP {status}: {text}");
        }

        parse_chart(&text).with_context(|| format!("failed to parse chart for {ticker}"))
    }
}

#[async_trait::async_trait]
impl DataProviderClient for YahooChartProvider {
    fn provider_name(&self) -> &'static str {
        "yahoo_chart"
    }

    async fn fetch_daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyClose>> {
        with_retries(self.retries, BASE_BACKOFF, |attempt| async move {
            let res = self.fetch_once(ticker, start, end).await;
            if let Err(err) = &res {
                tracing::warn!(attempt, ticker, error = %err, "price fetch failed");
            }
            res
        })
        .await
    }
}

/// Runs `op` up to `attempts` times, doubling the pause after each failure.
/// The last error is returned once attempts run out.
async fn with_retries<T, F, Fut>(attempts: u32, base_backoff: Duration, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => return Err(err),
            Err(_) => {
                let backoff = backoff_for(base_backoff, attempt);
                tracing::debug!(attempt, ?backoff, "retrying after backoff");
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

/// `base * 2^(attempt - 1)`, capped at `MAX_BACKOFF`.
fn backoff_for(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32
        .checked_shl(attempt.saturating_sub(1))
        .unwrap_or(u32::MAX);
    base.checked_mul(factor)
        .map_or(MAX_BACKOFF, |d| d.min(MAX_BACKOFF))
}

/// Unix seconds for midnight UTC of `start` and of the day after `end`.
fn period_bounds(start: NaiveDate, end: NaiveDate) -> Result<(i64, i64)> {
    anyhow::ensure!(start <= end, "empty date range: {start}..={end}");
    let period1 = start
        .and_hms_opt(0, 0, 0)
        .context("invalid start date")?
        .and_utc()
        .timestamp();
    let period2 = (end + DateDuration::days(1))
        .and_hms_opt(0, 0, 0)
        .context("invalid end date")?
        .and_utc()
        .timestamp();
    Ok((period1, period2))
}

fn is_not_found(text: &str) -> bool {
    serde_json::from_str::<ChartResponse>(text)
        .ok()
        .and_then(|r| r.chart.error)
        .is_some_and(|e| e.code == NOT_FOUND_CODE)
}

fn parse_chart(text: &str) -> Result<Vec<DailyClose>> {
    let resp: ChartResponse =
        serde_json::from_str(text).context("provider response is not a chart payload")?;

    if let Some(err) = resp.chart.error {
        if err.code == NOT_FOUND_CODE {
            return Ok(Vec::new());
        }
        anyhow::bail!(
            "data provider error {}: {}",
            err.code,
            err.description.unwrap_or_default()
        );
    }

    let Some(result) = resp.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    // Timestamps mark the session open; shift into exchange time before taking the date.
    let gmtoffset = result.meta.as_ref().map(|m| m.gmtoffset).unwrap_or(0);
    let closes = result
        .indicators
        .quote
        .first()
        .map(|q| q.close.as_slice())
        .unwrap_or_default();

    let mut out: Vec<DailyClose> = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let Some(Some(close)) = closes.get(i).copied() else {
            continue;
        };
        if !close.is_finite() {
            continue;
        }
        let date = DateTime::from_timestamp(ts + gmtoffset, 0)
            .with_context(|| format!("timestamp out of range: {ts}"))?
            .date_naive();
        out.push(DailyClose { date, close });
    }

    out.sort_by_key(|c| c.date);
    out.dedup_by_key(|c| c.date);
    Ok(out)
}
