//! Select command.
//!
//! Exports the top and bottom bucket tickers of one signal date as
//! `longs.csv` and `shorts.csv` for the order execution step.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::Args;
use sentiment_trade_core::{AppConfig, SignalRow};
use sentiment_trade_data::parsing::parse_date;
use sentiment_trade_data::CsvStorage;
use std::path::PathBuf;

/// Arguments for the select command.
#[derive(Args, Debug, Clone)]
pub struct SelectArgs {
    /// Signal date (YYYY-MM-DD); the latest date in the file when omitted
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Output directory (defaults to <data.output_dir>/signals)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

/// Long and short tickers of one date, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySelection {
    pub date: NaiveDate,
    pub longs: Vec<String>,
    pub shorts: Vec<String>,
}

/// Picks bucket 1 as longs and bucket `num_quantiles` as shorts on `date`.
///
/// # Errors
/// Returns an error when the signal set is empty or has no row on `date`.
pub fn daily_selection(
    signals: &[SignalRow],
    date: Option<NaiveDate>,
    num_quantiles: u32,
) -> Result<DailySelection> {
    let date = match date {
        Some(date) => date,
        None => signals
            .iter()
            .map(|row| row.date)
            .max()
            .ok_or_else(|| anyhow!("Signal file is empty"))?,
    };

    let on_date: Vec<&SignalRow> = signals.iter().filter(|row| row.date == date).collect();
    if on_date.is_empty() {
        return Err(anyhow!("No signals on {date}"));
    }

    let tickers = |bucket: u32| -> Vec<String> {
        on_date
            .iter()
            .filter(|row| row.quintile == bucket)
            .map(|row| row.ticker.clone())
            .collect()
    };
    Ok(DailySelection {
        date,
        longs: tickers(1),
        shorts: tickers(num_quantiles),
    })
}

pub async fn run_select(config: AppConfig, args: SelectArgs) -> Result<()> {
    let signals_file = config.data.signals_file.clone();
    let signals = tokio::task::spawn_blocking(move || CsvStorage::read_signals(&signals_file))
        .await
        .context("Signal loading task panicked")??;

    let selection = daily_selection(&signals, args.date, config.backtest.num_quantiles)?;
    let dir = args
        .output_dir
        .unwrap_or_else(|| config.data.output_dir.join("signals"));
    CsvStorage::write_tickers(&dir.join("longs.csv"), &selection.longs)?;
    CsvStorage::write_tickers(&dir.join("shorts.csv"), &selection.shorts)?;

    println!(
        "\n{}: {} longs, {} shorts written to {}",
        selection.date,
        selection.longs.len(),
        selection.shorts.len(),
        dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(day: u32, ticker: &str, quintile: u32) -> SignalRow {
        SignalRow {
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            ticker: ticker.to_string(),
            turnover_usd: None,
            realized_return: 0.0,
            net_sentiment: 0.0,
            rank: 0.5,
            quintile,
        }
    }

    #[test]
    fn defaults_to_latest_date() {
        let signals = vec![row(1, "A", 1), row(2, "B", 1), row(2, "C", 5), row(2, "D", 3)];
        let selection = daily_selection(&signals, None, 5).unwrap();
        assert_eq!(selection.date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert_eq!(selection.longs, vec!["B"]);
        assert_eq!(selection.shorts, vec!["C"]);
    }

    #[test]
    fn shorts_follow_bucket_count() {
        let signals = vec![row(1, "A", 5), row(1, "B", 10)];
        let date = NaiveDate::from_ymd_opt(2024, 5, 1);
        let selection = daily_selection(&signals, date, 10).unwrap();
        assert!(selection.longs.is_empty());
        assert_eq!(selection.shorts, vec!["B"]);
    }

    #[test]
    fn missing_date_is_an_error() {
        let signals = vec![row(1, "A", 1)];
        assert!(daily_selection(&signals, NaiveDate::from_ymd_opt(2024, 5, 9), 5).is_err());
        assert!(daily_selection(&[], None, 5).is_err());
    }
}
