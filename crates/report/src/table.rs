use seasonal_core::domain::report::{SeasonalReport, YearOutcome, YearResult};
use std::fmt::Write;

pub fn render(report: &SeasonalReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", report.title());

    let mut header = format!("{:<10} {:<12} {:<12}", "Year", "Previous", "Target");
    for ticker in &report.tickers {
        let _ = write!(header, " {ticker:>10}");
    }
    let _ = writeln!(out, "{header}");
    let _ = writeln!(out, "{}", "-".repeat(header.len()));

    for year in &report.years {
        let _ = writeln!(out, "{}", render_row(report, year));
    }
    out
}

fn render_row(report: &SeasonalReport, year: &YearResult) -> String {
    let mut row = format!("{:<10}", year.label());
    match &year.outcome {
        YearOutcome::Computed {
            target_day,
            previous_day,
            ..
        } => {
            let _ = write!(row, " {:<12} {:<12}", previous_day.to_string(), target_day.to_string());
            for ticker in &report.tickers {
                let cell = year
                    .change(ticker)
                    .map(|pct| format!("{pct:+.2}%"))
                    .unwrap_or_else(|| "-".to_string());
                let _ = write!(row, " {cell:>10}");
            }
        }
        YearOutcome::NoData => row.push_str(" no data"),
        YearOutcome::InvalidDate => {
            let _ = write!(row, " {} does not exist", report.target);
        }
        YearOutcome::NoTradingDay { nominal_date } => {
            let _ = write!(row, " no trading day on or after {nominal_date}");
        }
        YearOutcome::NoPreviousDay { target_day } => {
            let _ = write!(row, " no trading day before {target_day}");
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use seasonal_core::domain::target::MonthDay;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn renders_values_and_placeholders() {
        let report = SeasonalReport {
            tickers: vec!["QQQ".into(), "SPY".into()],
            target: MonthDay::default(),
            start_year: 2022,
            end_year: 2024,
            years: vec![
                YearResult {
                    year: 2022,
                    outcome: YearOutcome::Computed {
                        nominal_date: d(2022, 12, 25),
                        target_day: d(2022, 12, 27),
                        previous_day: d(2022, 12, 23),
                        changes: [("QQQ".to_string(), -1.4384)].into_iter().collect(),
                    },
                },
                YearResult { year: 2023, outcome: YearOutcome::NoData },
            ],
        };

        let text = render(&report);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Percentage Change for QQQ and SPY after Dec 25");
        assert!(lines[1].starts_with("Year"));
        assert!(lines[3].contains("2022-12-23"));
        assert!(lines[3].contains("-1.44%"));
        assert!(lines[3].trim_end().ends_with('-'));
        assert_eq!(lines[4], "2023 n/a   no data");
    }
}
