//! Backtest command.
//!
//! Runs the long/short engine over the signal file, writes the return,
//! allocation and selection files, and prints the statistics report.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use sentiment_trade_backtest::{BacktestEngine, BacktestReport, BacktestRun};
use sentiment_trade_core::{AppConfig, BacktestConfig};
use sentiment_trade_data::parsing::parse_date;
use sentiment_trade_data::CsvStorage;
use std::path::PathBuf;

/// Arguments for the backtest command.
#[derive(Args, Debug, Clone, Default)]
pub struct BacktestArgs {
    /// First date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub start: Option<NaiveDate>,

    /// Last date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub end: Option<NaiveDate>,

    /// Names kept per side per date
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Per-name weight cap, e.g. 0.05
    #[arg(long)]
    pub max_alloc: Option<f64>,

    /// Rank on same-day predictions instead of the previous day's
    #[arg(long)]
    pub no_lag: bool,

    /// Signal file (overrides data.signals_file)
    #[arg(long)]
    pub signals: Option<PathBuf>,

    /// Benchmark `Date,Daily Return` file (overrides data.benchmark_file)
    #[arg(long)]
    pub benchmark: Option<PathBuf>,
}

impl BacktestArgs {
    /// Applies command-line overrides to the configured parameters.
    pub fn apply(&self, config: &mut AppConfig) {
        let backtest: &mut BacktestConfig = &mut config.backtest;
        if let Some(start) = self.start {
            backtest.start_date = start;
        }
        if let Some(end) = self.end {
            backtest.end_date = end;
        }
        if let Some(top_n) = self.top_n {
            backtest.top_n_signals = top_n;
        }
        if self.max_alloc.is_some() {
            backtest.max_alloc = self.max_alloc;
        }
        if self.no_lag {
            backtest.lag_sentiment = false;
        }
        if let Some(path) = &self.signals {
            config.data.signals_file.clone_from(path);
        }
        if let Some(path) = &self.benchmark {
            config.data.benchmark_file = Some(path.clone());
        }
    }
}

pub async fn run_backtest(mut config: AppConfig, args: BacktestArgs) -> Result<()> {
    args.apply(&mut config);

    tracing::info!(
        "Running backtest from {} to {} on {}",
        config.backtest.start_date,
        config.backtest.end_date,
        config.data.signals_file.display()
    );

    let report = tokio::task::spawn_blocking(move || -> Result<String> {
        let (run, report) = backtest_pipeline(&config)?;
        write_outputs(&config, &run)?;
        Ok(report.render())
    })
    .await
    .context("Backtest task panicked")??;

    println!("{report}");
    Ok(())
}

/// Loads inputs, runs the engine and builds the report.
pub fn backtest_pipeline(config: &AppConfig) -> Result<(BacktestRun, BacktestReport)> {
    let signals = CsvStorage::read_signals(&config.data.signals_file)?;
    let returns = CsvStorage::read_returns_matrix(&config.data.returns_file)?;
    let benchmark = config
        .data
        .benchmark_file
        .as_deref()
        .map(CsvStorage::read_benchmark)
        .transpose()?;

    let engine = BacktestEngine::new(config.backtest.clone())?;
    let run = engine.run(&signals, &returns)?;
    let diagnostics = &run.diagnostics;
    tracing::info!(
        "{} of {} signal rows in range; {} without a lagged prediction; {} excluded by momentum",
        diagnostics.rows_in_range,
        diagnostics.signal_rows,
        diagnostics.lag_ineligible,
        diagnostics.momentum_excluded
    );
    if diagnostics.fail_open_total() > 0 {
        tracing::warn!(
            "Momentum data missing for {} selections ({} short history, {} date, {} ticker)",
            diagnostics.fail_open_total(),
            diagnostics.missing_history,
            diagnostics.missing_date,
            diagnostics.missing_ticker
        );
    }

    let report = BacktestReport::new(&run, benchmark.as_ref())?;
    Ok((run, report))
}

fn write_outputs(config: &AppConfig, run: &BacktestRun) -> Result<()> {
    let dir = &config.data.output_dir;
    let returns_file = dir.join("strategy_returns.csv");
    CsvStorage::write_strategy_returns(&returns_file, &run.returns)?;
    CsvStorage::write_selections(&dir.join("selections.csv"), &run.selections)?;
    if !run.allocations.is_empty() {
        CsvStorage::write_allocations(&dir.join("allocations.csv"), &run.allocations)?;
    }
    tracing::info!("Wrote backtest outputs to {}", dir.display());
    Ok(())
}
