//! Train command.
//!
//! Loads the raw price and news files, builds regression rows, fits the
//! walk-forward model and writes the signal file plus per-window diagnostics.

use anyhow::{Context, Result};
use clap::Args;
use sentiment_trade_core::AppConfig;
use sentiment_trade_data::{CsvStorage, NewsLoader, PriceLoader};
use sentiment_trade_signals::{train, FeatureBuilder};
use std::path::PathBuf;

/// Arguments for the train command.
#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Price directory (overrides data.price_dir)
    #[arg(long)]
    pub price_dir: Option<PathBuf>,

    /// News file (overrides data.news_file)
    #[arg(long)]
    pub news_file: Option<PathBuf>,

    /// Signal file to write (overrides data.signals_file)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Years of training data per window
    #[arg(long)]
    pub lookback_years: Option<u32>,

    /// Fit windows one at a time
    #[arg(long)]
    pub sequential: bool,
}

/// Summary of a training run.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub signal_rows: usize,
    pub windows: usize,
    pub signals_file: PathBuf,
    pub windows_file: PathBuf,
}

pub async fn run_train(mut config: AppConfig, args: TrainArgs) -> Result<()> {
    if let Some(dir) = args.price_dir {
        config.data.price_dir = dir;
    }
    if let Some(file) = args.news_file {
        config.data.news_file = file;
    }
    if let Some(file) = args.output {
        config.data.signals_file = file;
    }
    if let Some(years) = args.lookback_years {
        config.trainer.lookback_years = years;
    }
    if args.sequential {
        config.trainer.parallel = false;
    }

    let summary = tokio::task::spawn_blocking(move || train_pipeline(&config))
        .await
        .context("Training task panicked")??;

    println!(
        "\nWrote {} signal rows from {} windows to {}",
        summary.signal_rows,
        summary.windows,
        summary.signals_file.display()
    );
    println!("Model windows: {}", summary.windows_file.display());
    Ok(())
}

/// Runs the full training pipeline synchronously.
pub fn train_pipeline(config: &AppConfig) -> Result<TrainSummary> {
    config.trainer.validate()?;

    let prices = PriceLoader::new(config.features.turnover_window)
        .load_dir(&config.data.price_dir)
        .with_context(|| format!("Failed to load prices from {}", config.data.price_dir.display()))?;
    let news = NewsLoader::new(config.features.relevance_threshold).load_file(&config.data.news_file)?;
    let fx = config
        .data
        .fx_file
        .as_deref()
        .map(CsvStorage::read_fx_rates)
        .transpose()?;
    if fx.is_none() {
        tracing::info!("No FX file configured; turnover will be left empty");
    }

    let features = FeatureBuilder::new(config.features.clone()).build(
        &prices.records,
        &news.scores,
        fx.as_ref(),
    );
    let output = train(&features.rows, &config.trainer)?;

    CsvStorage::write_signals(&config.data.signals_file, &output.signals)?;
    let windows_file = config.data.output_dir.join("model_windows.json");
    CsvStorage::write_json(&windows_file, &output.windows)?;

    Ok(TrainSummary {
        signal_rows: output.signals.len(),
        windows: output.windows.len(),
        signals_file: config.data.signals_file.clone(),
        windows_file,
    })
}
