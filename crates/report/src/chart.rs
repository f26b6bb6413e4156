use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame, Terminal,
};
use seasonal_core::domain::report::SeasonalReport;
use std::io;

const TICKER_COLORS: [Color; 6] = [
    Color::Cyan,
    Color::Yellow,
    Color::Magenta,
    Color::Green,
    Color::Blue,
    Color::LightRed,
];

// Grid step in percent; doubled until the labels fit.
const Y_TICK_STEP: f64 = 0.25;
const MAX_Y_LABELS: usize = 13;

// Share of one year slot covered by its group of bars.
const GROUP_WIDTH: f64 = 0.8;

#[derive(Debug, Clone, PartialEq)]
struct YScale {
    bounds: [f64; 2],
    ticks: Vec<f64>,
}

/// Y bounds that always include the zero line, snapped to the tick grid.
fn y_scale(range: Option<(f64, f64)>) -> YScale {
    let (lo, hi) = range.unwrap_or((0.0, 0.0));
    let (lo, hi) = (lo.min(0.0), hi.max(0.0));

    let mut step = Y_TICK_STEP;
    loop {
        let mut first = (lo / step).floor() as i64;
        let mut last = (hi / step).ceil() as i64;
        if first == last {
            first -= 1;
            last += 1;
        }
        let count = (last - first + 1) as usize;
        if count <= MAX_Y_LABELS {
            return YScale {
                bounds: [first as f64 * step, last as f64 * step],
                ticks: (first..=last).map(|k| k as f64 * step).collect(),
            };
        }
        step *= 2.0;
    }
}

/// Bar positions for one ticker: year slot `k` is centred on `x = k`, and the
/// tickers sit side by side inside the slot.
fn ticker_points(report: &SeasonalReport, ticker_idx: usize) -> Vec<(f64, f64)> {
    let n = report.tickers.len().max(1) as f64;
    let offset = (ticker_idx as f64 - (n - 1.0) / 2.0) * GROUP_WIDTH / n;
    let Some(ticker) = report.tickers.get(ticker_idx) else {
        return Vec::new();
    };
    report
        .years
        .iter()
        .enumerate()
        .filter_map(|(k, year)| year.change(ticker).map(|pct| (k as f64 + offset, pct)))
        .collect()
}

/// Padded with blanks so that label `k + 1` lands on slot `k` when spread
/// evenly over `[-1, years]`.
fn x_labels(report: &SeasonalReport) -> Vec<String> {
    let mut labels = vec![String::new()];
    labels.extend(report.year_labels());
    labels.push(String::new());
    labels
}

fn ticker_color(idx: usize) -> Color {
    TICKER_COLORS[idx % TICKER_COLORS.len()]
}

fn draw(f: &mut Frame, report: &SeasonalReport) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Chart
            Constraint::Length(3), // Legend
        ])
        .split(f.area());

    let range = report.value_range();
    let range_text = match range {
        Some((lo, hi)) => format!("range {lo:.2}% .. {hi:.2}%"),
        None => "no values".to_string(),
    };
    let title = Paragraph::new(Line::from(vec![
        Span::styled(report.title(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("   ({range_text})")),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let x_max = report.years.len().max(1) as f64;
    let baseline = [(-1.0, 0.0), (x_max, 0.0)];
    let series: Vec<Vec<(f64, f64)>> = (0..report.tickers.len())
        .map(|i| ticker_points(report, i))
        .collect();

    let mut datasets = vec![Dataset::default()
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::DarkGray))
        .data(&baseline)];
    for (i, points) in series.iter().enumerate() {
        datasets.push(
            Dataset::default()
                .marker(Marker::Block)
                .graph_type(GraphType::Bar)
                .style(Style::default().fg(ticker_color(i)))
                .data(points),
        );
    }

    let scale = y_scale(range);
    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Percentage Change by Year"),
        )
        .x_axis(
            Axis::default()
                .title("Year")
                .style(Style::default().fg(Color::Gray))
                .bounds([-1.0, x_max])
                .labels(x_labels(report).into_iter().map(Span::raw).collect::<Vec<_>>()),
        )
        .y_axis(
            Axis::default()
                .title("Percentage Change")
                .style(Style::default().fg(Color::Gray))
                .bounds(scale.bounds)
                .labels(
                    scale
                        .ticks
                        .iter()
                        .map(|v| Span::raw(format!("{v:.2}%")))
                        .collect::<Vec<_>>(),
                ),
        );
    f.render_widget(chart, chunks[1]);

    let mut legend: Vec<Span> = Vec::new();
    for (i, ticker) in report.tickers.iter().enumerate() {
        legend.push(Span::styled("■ ", Style::default().fg(ticker_color(i))));
        legend.push(Span::raw(format!("{ticker}   ")));
    }
    legend.push(Span::raw("  bars below 0.00% are declines   q/Esc to quit"));
    let legend = Paragraph::new(Line::from(legend)).block(Block::default().borders(Borders::ALL));
    f.render_widget(legend, chunks[2]);
}

/// Runs `restore` when dropped, including while unwinding from a panic.
struct RestoreOnDrop<F: FnMut()> {
    restore: F,
}

impl<F: FnMut()> Drop for RestoreOnDrop<F> {
    fn drop(&mut self) {
        (self.restore)()
    }
}

fn restore_terminal() {
    if let Err(e) = disable_raw_mode() {
        tracing::warn!(error = %e, "failed to disable raw mode");
    }
    if let Err(e) = io::stdout().execute(LeaveAlternateScreen) {
        tracing::warn!(error = %e, "failed to leave alternate screen");
    }
}

/// Shows the chart until the user quits.
pub fn show(report: &SeasonalReport) -> Result<()> {
    enable_raw_mode()?;
    let _restore = RestoreOnDrop {
        restore: restore_terminal,
    };
    io::stdout().execute(EnterAlternateScreen)?;

    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    event_loop(&mut terminal, report)
}

fn event_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    report: &SeasonalReport,
) -> Result<()> {
    loop {
        terminal.draw(|f| draw(f, report))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
            {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ratatui::backend::TestBackend;
    use seasonal_core::domain::report::{YearOutcome, YearResult};
    use seasonal_core::domain::target::MonthDay;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn computed(year: i32, changes: &[(&str, f64)]) -> YearResult {
        YearResult {
            year,
            outcome: YearOutcome::Computed {
                nominal_date: d(year, 12, 25),
                target_day: d(year, 12, 26),
                previous_day: d(year, 12, 24),
                changes: changes.iter().map(|(t, v)| (t.to_string(), *v)).collect(),
            },
        }
    }

    fn report(tickers: &[&str], years: Vec<YearResult>) -> SeasonalReport {
        SeasonalReport {
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
            target: MonthDay::default(),
            start_year: years.first().map(|y| y.year).unwrap_or(2018),
            end_year: years.last().map(|y| y.year + 1).unwrap_or(2019),
            years,
        }
    }

    fn sample_report() -> SeasonalReport {
        report(
            &["QQQ", "SPY", "DIA"],
            vec![
                computed(2018, &[("QQQ", 6.0152), ("SPY", 5.0525), ("DIA", -0.004)]),
                YearResult { year: 2019, outcome: YearOutcome::NoData },
            ],
        )
    }

    #[test]
    fn y_scale_uses_quarter_percent_grid_around_zero() {
        let scale = y_scale(Some((-0.3, 0.6)));
        assert_eq!(scale.bounds, [-0.5, 0.75]);
        assert_eq!(scale.ticks, vec![-0.5, -0.25, 0.0, 0.25, 0.5, 0.75]);

        // All-positive values still keep the zero line in view.
        assert_eq!(y_scale(Some((0.1, 0.2))).bounds, [0.0, 0.25]);
        assert_eq!(y_scale(None).bounds, [-0.25, 0.25]);
    }

    #[test]
    fn y_scale_widens_step_for_large_ranges() {
        let scale = y_scale(Some((-2.0, 6.0)));
        assert_eq!(scale.bounds, [-2.0, 6.0]);
        assert_eq!(scale.ticks.len(), 9);
        assert!(scale.ticks.contains(&0.0));
    }

    #[test]
    fn points_keep_sign_and_skip_missing_years() {
        let r = sample_report();
        let dia = ticker_points(&r, 2);
        assert_eq!(dia.len(), 1);
        assert!(dia[0].1 < 0.0);

        let qqq = ticker_points(&r, 0);
        let spy = ticker_points(&r, 1);
        assert!(qqq[0].0 < spy[0].0 && spy[0].0 < dia[0].0);
        assert!((spy[0].0 - 0.0).abs() < 1e-12);
        assert_eq!(x_labels(&r), vec!["", "2018", "2019 n/a", ""]);
    }

    #[test]
    fn loss_bar_renders_below_gain_bar() {
        let r = report(&["SPY"], vec![computed(2018, &[("SPY", 1.5)]), computed(2019, &[("SPY", -1.5)])]);
        let (width, height) = (80u16, 30u16);
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| draw(f, &r)).unwrap();

        let buf = terminal.backend().buffer();
        let mut gain_rows = Vec::new();
        let mut loss_rows = Vec::new();
        for (i, cell) in buf.content().iter().enumerate() {
            let (x, y) = (i as u16 % width, i as u16 / width);
            // Skip the title and legend panels.
            if y < 3 || y >= height - 3 || cell.fg != Color::Cyan || cell.symbol().trim().is_empty() {
                continue;
            }
            if x < width / 2 {
                gain_rows.push(y);
            } else {
                loss_rows.push(y);
            }
        }

        assert!(!gain_rows.is_empty() && !loss_rows.is_empty());
        // Screen rows grow downwards.
        assert!(gain_rows.iter().min() < loss_rows.iter().min());
        assert!(loss_rows.iter().max() > gain_rows.iter().max());
    }

    #[test]
    fn draws_title_axes_and_legend() {
        let r = sample_report();
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| draw(f, &r)).unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("Percentage Change for QQQ, SPY, and DIA after Dec 25"));
        assert!(text.contains("q/Esc to quit"));
        assert!(text.contains("2019 n/a"));
        assert!(text.contains("0.00%"));
    }

    #[test]
    fn terminal_is_restored_when_drawing_panics() {
        let restored = AtomicBool::new(false);
        let result = std::panic::catch_unwind(|| {
            let _restore = RestoreOnDrop {
                restore: || restored.store(true, Ordering::SeqCst),
            };
            panic!("draw failed");
        });
        assert!(result.is_err());
        assert!(restored.load(Ordering::SeqCst));
    }
}
