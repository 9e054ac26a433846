//! Sweep command.
//!
//! Reruns the backtest over a two-parameter grid and writes the metric
//! surface as CSV (rows: first parameter, columns: second parameter).

use anyhow::{anyhow, Context, Result};
use clap::Args;
use sentiment_trade_backtest::{ParameterSweep, SweepSurface};
use sentiment_trade_core::{AppConfig, OptimizationMetric, SweepAxis};
use sentiment_trade_data::CsvStorage;
use std::path::PathBuf;

/// Arguments for the sweep command.
#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    /// First axis as `parameter=start:stop:steps`, e.g. `top_n_signals=1:50:10`
    #[arg(long, value_parser = parse_axis)]
    pub first: Option<SweepAxis>,

    /// Second axis as `parameter=start:stop:steps`
    #[arg(long, value_parser = parse_axis)]
    pub second: Option<SweepAxis>,

    /// Metric per cell: annualized_return, sharpe_ratio, max_drawdown, calmar_ratio
    #[arg(short, long)]
    pub metric: Option<OptimizationMetric>,

    /// Run cells one at a time
    #[arg(long)]
    pub sequential: bool,

    /// Surface CSV path (defaults to <data.output_dir>/sweep_<first>_<second>.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Parses `parameter=start:stop:steps`.
pub fn parse_axis(value: &str) -> Result<SweepAxis> {
    let (name, range) = value
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected parameter=start:stop:steps, got '{value}'"))?;
    let parts: Vec<&str> = range.split(':').collect();
    let [start, stop, steps] = parts.as_slice() else {
        return Err(anyhow!("Expected start:stop:steps, got '{range}'"));
    };
    Ok(SweepAxis {
        parameter: name.parse()?,
        start: start.trim().parse().context("Invalid axis start")?,
        stop: stop.trim().parse().context("Invalid axis stop")?,
        steps: steps.trim().parse().context("Invalid axis steps")?,
    })
}

pub async fn run_sweep(mut config: AppConfig, args: SweepArgs) -> Result<()> {
    if let Some(axis) = args.first {
        config.sweep.first = axis;
    }
    if let Some(axis) = args.second {
        config.sweep.second = axis;
    }
    if let Some(metric) = args.metric {
        config.sweep.metric = metric;
    }
    if args.sequential {
        config.sweep.parallel = false;
    }
    let output = args.output.unwrap_or_else(|| {
        config.data.output_dir.join(format!(
            "sweep_{}_{}.csv",
            config.sweep.first.parameter, config.sweep.second.parameter
        ))
    });

    let surface = tokio::task::spawn_blocking(move || sweep_pipeline(&config))
        .await
        .context("Sweep task panicked")??;

    CsvStorage::write_surface(
        &output,
        surface.first.name(),
        &surface.first_values,
        &surface.second_values,
        &surface.cells,
    )?;
    println!("{}", surface.render());
    println!("Surface written to {}", output.display());
    Ok(())
}

/// Loads the signal and returns files and evaluates the grid.
pub fn sweep_pipeline(config: &AppConfig) -> Result<SweepSurface> {
    let sweep = ParameterSweep::new(config.backtest.clone(), config.sweep.clone())?;
    let signals = CsvStorage::read_signals(&config.data.signals_file)?;
    let returns = CsvStorage::read_returns_matrix(&config.data.returns_file)?;

    let surface = sweep.run(&signals, &returns);
    let undefined = surface.undefined_cells();
    if undefined > 0 {
        tracing::warn!("{} sweep cells have no {}", undefined, surface.metric);
    }
    Ok(surface)
}
