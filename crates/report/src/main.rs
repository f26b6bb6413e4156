use anyhow::Context;
use clap::{Parser, ValueEnum};
use seasonal_core::analysis::{self, options::parse_tickers, AnalysisOptions};
use seasonal_core::config::Settings;
use seasonal_core::ingest::provider::YahooChartProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod chart;
mod table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Interactive grouped bar chart in the terminal.
    Chart,
    /// Plain text table on stdout.
    Table,
    /// Full report as JSON on stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "seasonal_report")]
struct Args {
    /// Comma separated tickers (default QQQ,SPY,DIA).
    #[arg(long, value_delimiter = ',')]
    tickers: Option<Vec<String>>,

    /// Target calendar date as MM-DD (default 12-25).
    #[arg(long)]
    target: Option<String>,

    /// First year analysed.
    #[arg(long)]
    start_year: Option<i32>,

    /// Year after the last one analysed.
    #[arg(long)]
    end_year: Option<i32>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Chart)]
    output: OutputFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    if let Err(err) = run(args, &settings).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "seasonal report failed");
        return Err(err);
    }

    Ok(())
}

async fn run(args: Args, settings: &Settings) -> anyhow::Result<()> {
    let opts = resolve_options(&args, AnalysisOptions::from_env()?)?;

    let provider = YahooChartProvider::from_settings(settings)?;
    let today = seasonal_core::time::trading_days::resolve_today(chrono::Utc::now())?;

    let report = analysis::run(&provider, &opts, today)
        .await
        .context("seasonal analysis failed")?;

    tracing::info!(
        years = report.years.len(),
        with_values = report.years.iter().filter(|y| y.has_values()).count(),
        "analysis complete"
    );

    match args.output {
        OutputFormat::Chart => chart::show(&report)?,
        OutputFormat::Table => print!("{}", table::render(&report)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize report failed")?
        ),
    }

    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

/// Flags override `base`, which already carries environment over defaults.
fn resolve_options(args: &Args, base: AnalysisOptions) -> anyhow::Result<AnalysisOptions> {
    let mut opts = base;

    if let Some(tickers) = &args.tickers {
        let tickers = parse_tickers(&tickers.join(","));
        if !tickers.is_empty() {
            opts.tickers = tickers;
        }
    }
    if let Some(target) = args.target.as_deref() {
        opts.target = target.parse().context("--target must be MM-DD")?;
    }
    if let Some(year) = args.start_year {
        opts.start_year = year;
    }
    if let Some(year) = args.end_year {
        opts.end_year = year;
    }

    opts.validate()?;
    Ok(opts)
}
