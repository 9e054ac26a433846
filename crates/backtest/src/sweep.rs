//! Two-parameter grid search over the backtest.

#![allow(clippy::format_push_string)]

use crate::engine::generate_returns;
use sentiment_trade_core::parallel::map_slice;
use sentiment_trade_core::{
    BacktestConfig, OptimizationMetric, PipelineError, PipelineResult, SignalRow, SweepAxis,
    SweepConfig, SweepParameter,
};
use sentiment_trade_data::ReturnsMatrix;
use serde::Serialize;
use tracing::{info, warn};

/// `steps` evenly spaced values from `start` to `stop` inclusive.
#[must_use]
pub fn linspace(start: f64, stop: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            #[allow(clippy::cast_precision_loss)]
            let step = (stop - start) / (steps - 1) as f64;
            (0..steps)
                .map(|i| {
                    if i == steps - 1 {
                        stop
                    } else {
                        #[allow(clippy::cast_precision_loss)]
                        let offset = step * i as f64;
                        start + offset
                    }
                })
                .collect()
        }
    }
}

/// Rounds half away from zero to `decimals` places.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (value * scale).round() / scale
}

/// Decimal places kept on the first and second axis.
const FIRST_AXIS_DECIMALS: i32 = 1;
const SECOND_AXIS_DECIMALS: i32 = 3;

/// Axis values after rounding; a value already seen is dropped.
fn axis_values(axis: &SweepAxis, decimals: i32) -> Vec<f64> {
    let mut values: Vec<f64> = Vec::with_capacity(axis.steps);
    for raw in linspace(axis.start, axis.stop, axis.steps) {
        let value = round_to(raw, decimals);
        if !values.iter().any(|seen| seen.to_bits() == value.to_bits()) {
            values.push(value);
        }
    }
    values
}

/// Rejects an axis whose rounded values collapse below the requested steps.
fn checked_axis_values(axis: &SweepAxis, decimals: i32) -> PipelineResult<Vec<f64>> {
    let values = axis_values(axis, decimals);
    if values.len() < axis.steps {
        return Err(PipelineError::invalid_config(format!(
            "{} axis {}:{}:{} has only {} distinct values after rounding to {} decimals",
            axis.parameter,
            axis.start,
            axis.stop,
            axis.steps,
            values.len(),
            decimals
        )));
    }
    Ok(values)
}

/// Metric value per grid cell; `cells[i][j]` belongs to `first_values[i]`
/// and `second_values[j]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepSurface {
    pub first: SweepParameter,
    pub second: SweepParameter,
    pub metric: OptimizationMetric,
    pub first_values: Vec<f64>,
    pub second_values: Vec<f64>,
    pub cells: Vec<Vec<Option<f64>>>,
}

impl SweepSurface {
    /// Highest defined cell as `(first value, second value, metric)`.
    ///
    /// Ties keep the earliest cell in row-major order.
    #[must_use]
    pub fn best(&self) -> Option<(f64, f64, f64)> {
        let mut best: Option<(f64, f64, f64)> = None;
        for (i, row) in self.cells.iter().enumerate() {
            for (j, cell) in row.iter().enumerate() {
                if let Some(value) = cell {
                    if best.map_or(true, |(_, _, b)| *value > b) {
                        best = Some((self.first_values[i], self.second_values[j], *value));
                    }
                }
            }
        }
        best
    }

    /// Number of cells without a metric value.
    #[must_use]
    pub fn undefined_cells(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_none()).count()
    }

    /// Text table of the surface with the best cell underneath.
    #[must_use]
    pub fn render(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "\n{} by {} (rows) and {} (columns)\n",
            self.metric, self.first, self.second
        ));
        output.push_str(&format!("{:>12}", ""));
        for value in &self.second_values {
            output.push_str(&format!("{value:>12}"));
        }
        output.push('\n');

        for (value, row) in self.first_values.iter().zip(&self.cells) {
            output.push_str(&format!("{value:>12}"));
            for cell in row {
                match cell {
                    Some(v) => output.push_str(&format!("{v:>12.4}")),
                    None => output.push_str(&format!("{:>12}", "N/A")),
                }
            }
            output.push('\n');
        }

        match self.best() {
            Some((first, second, value)) => output.push_str(&format!(
                "\nBest {}: {value:.4} at {}={first}, {}={second}\n",
                self.metric, self.first, self.second
            )),
            None => output.push_str("\nNo cell produced a defined metric.\n"),
        }
        output
    }
}

pub struct ParameterSweep {
    base: BacktestConfig,
    config: SweepConfig,
}

impl ParameterSweep {
    /// # Errors
    /// Returns [`PipelineError::InvalidConfig`] when an axis has no steps,
    /// loses steps to rounding, or both axes vary the same parameter.
    pub fn new(base: BacktestConfig, config: SweepConfig) -> PipelineResult<Self> {
        if config.first.steps == 0 || config.second.steps == 0 {
            return Err(PipelineError::invalid_config("sweep axes need at least one step"));
        }
        if config.first.parameter == config.second.parameter {
            return Err(PipelineError::invalid_config(format!(
                "sweep axes must vary different parameters, both are {}",
                config.first.parameter
            )));
        }
        checked_axis_values(&config.first, FIRST_AXIS_DECIMALS)?;
        checked_axis_values(&config.second, SECOND_AXIS_DECIMALS)?;
        Ok(Self { base, config })
    }

    /// Runs one backtest per grid cell.
    ///
    /// A cell whose backtest fails, or whose metric is undefined, is `None`.
    #[must_use]
    pub fn run(&self, signals: &[SignalRow], returns: &ReturnsMatrix) -> SweepSurface {
        let first_values = axis_values(&self.config.first, FIRST_AXIS_DECIMALS);
        let second_values = axis_values(&self.config.second, SECOND_AXIS_DECIMALS);
        info!(
            "Sweeping {} x {} ({} cells) on {}",
            self.config.first.parameter,
            self.config.second.parameter,
            first_values.len() * second_values.len(),
            self.config.metric
        );

        let grid: Vec<(f64, f64)> = first_values
            .iter()
            .flat_map(|a| second_values.iter().map(move |b| (*a, *b)))
            .collect();

        let values = map_slice(
            &grid,
            |&(a, b)| self.evaluate(signals, returns, a, b),
            !self.config.parallel,
        );

        let width = second_values.len();
        let cells = values.chunks(width).map(<[Option<f64>]>::to_vec).collect();

        SweepSurface {
            first: self.config.first.parameter,
            second: self.config.second.parameter,
            metric: self.config.metric,
            first_values,
            second_values,
            cells,
        }
    }

    fn evaluate(&self, signals: &[SignalRow], returns: &ReturnsMatrix, a: f64, b: f64) -> Option<f64> {
        let config = self
            .base
            .with_parameter(self.config.first.parameter, a)
            .with_parameter(self.config.second.parameter, b);
        let outcome = generate_returns(signals, returns, &config).and_then(|run| run.statistics());
        match outcome {
            Ok(stats) => stats.metric(self.config.metric),
            Err(e) => {
                warn!(
                    "Sweep cell {}={a}, {}={b} failed: {e}",
                    self.config.first.parameter, self.config.second.parameter
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 6, day).unwrap()
    }

    fn signals() -> Vec<SignalRow> {
        let mut rows = Vec::new();
        for day in 1..=20 {
            for (i, ticker) in ["A", "B", "C", "D"].iter().enumerate() {
                let sentiment = f64::from(4 - u32::try_from(i).unwrap());
                // Best-ranked names earn more, with an alternating sign to create drawdowns.
                let sign = if day % 3 == 0 { -1.0 } else { 1.0 };
                rows.push(SignalRow {
                    date: d(day),
                    ticker: (*ticker).to_string(),
                    turnover_usd: None,
                    realized_return: sign * sentiment / 1000.0,
                    net_sentiment: sentiment,
                    rank: 0.0,
                    quintile: 1,
                });
            }
        }
        rows
    }

    fn base() -> BacktestConfig {
        BacktestConfig {
            start_date: d(1),
            end_date: d(30),
            long_sentiment_threshold: -100.0,
            short_sentiment_threshold: 100.0,
            long_return_threshold: -100.0,
            short_return_threshold: 100.0,
            lag_sentiment: false,
            zero_return_dates: Vec::new(),
            ..BacktestConfig::default()
        }
    }

    fn sweep_config(parallel: bool) -> SweepConfig {
        SweepConfig {
            first: SweepAxis {
                parameter: SweepParameter::TopNSignals,
                start: 1.0,
                stop: 4.0,
                steps: 4,
            },
            second: SweepAxis {
                parameter: SweepParameter::LongLeverage,
                start: 0.5,
                stop: 1.5,
                steps: 3,
            },
            metric: OptimizationMetric::AnnualizedReturn,
            parallel,
        }
    }

    // ============================================
    // Axes
    // ============================================

    #[test]
    fn linspace_hits_both_ends() {
        let values = linspace(0.001, 0.01, 5);
        assert_eq!(values.len(), 5);
        assert!((values[0] - 0.001).abs() < 1e-15);
        assert!((values[2] - 0.0055).abs() < 1e-12);
        assert!((values[4] - 0.01).abs() < f64::EPSILON);
        assert_eq!(linspace(3.0, 9.0, 1), vec![3.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn rounding_collapses_duplicates_keeping_first() {
        let axis = SweepAxis {
            parameter: SweepParameter::TopNSignals,
            start: 1.0,
            stop: 1.2,
            steps: 5,
        };
        // 1.0, 1.05, 1.1, 1.15, 1.2 rounded to one decimal.
        let values = axis_values(&axis, FIRST_AXIS_DECIMALS);
        assert_eq!(values.len(), 3);
        assert!((values[0] - 1.0).abs() < f64::EPSILON);
        assert!((values[2] - 1.2).abs() < 1e-12);
        assert!(checked_axis_values(&axis, FIRST_AXIS_DECIMALS).is_err());
    }

    #[test]
    fn fractional_first_axis_is_rejected() {
        let config = SweepConfig {
            first: SweepAxis {
                parameter: SweepParameter::MaxAlloc,
                start: 0.01,
                stop: 0.05,
                steps: 5,
            },
            ..sweep_config(false)
        };
        let err = ParameterSweep::new(base(), config.clone()).err().unwrap();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
        assert!(err.to_string().contains("max_alloc"));

        // The same range keeps all five values on the finer second axis.
        let swapped = SweepConfig {
            first: sweep_config(false).first,
            second: config.first,
            ..sweep_config(false)
        };
        assert!(ParameterSweep::new(base(), swapped).is_ok());
    }

    // ============================================
    // Grid
    // ============================================

    #[test]
    fn surface_has_one_cell_per_grid_point() {
        let sweep = ParameterSweep::new(base(), sweep_config(false)).unwrap();
        let surface = sweep.run(&signals(), &ReturnsMatrix::default());

        assert_eq!(surface.first_values, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(surface.cells.len(), 4);
        assert!(surface.cells.iter().all(|row| row.len() == 3));
        assert_eq!(surface.undefined_cells(), 0);

        // Only the best name is held at top_n=1, so it dominates; more leverage helps.
        let (first, second, _) = surface.best().unwrap();
        assert!((first - 1.0).abs() < f64::EPSILON);
        assert!((second - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn cell_matches_a_direct_run() {
        let sweep = ParameterSweep::new(base(), sweep_config(false)).unwrap();
        let surface = sweep.run(&signals(), &ReturnsMatrix::default());

        let config = base()
            .with_parameter(SweepParameter::TopNSignals, 2.0)
            .with_parameter(SweepParameter::LongLeverage, 1.0);
        let direct = generate_returns(&signals(), &ReturnsMatrix::default(), &config)
            .unwrap()
            .statistics()
            .unwrap()
            .annualized_return;
        let cell = surface.cells[1][1].unwrap();
        assert!((cell - direct).abs() < 1e-12);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let sequential = ParameterSweep::new(base(), sweep_config(false))
            .unwrap()
            .run(&signals(), &ReturnsMatrix::default());
        let parallel = ParameterSweep::new(base(), sweep_config(true))
            .unwrap()
            .run(&signals(), &ReturnsMatrix::default());
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn failing_cells_are_none() {
        let config = SweepConfig {
            second: SweepAxis {
                parameter: SweepParameter::MaxAlloc,
                start: 0.5,
                stop: 1.5,
                steps: 2,
            },
            ..sweep_config(false)
        };
        let surface = ParameterSweep::new(base(), config)
            .unwrap()
            .run(&signals(), &ReturnsMatrix::default());
        // max_alloc 1.5 fails validation.
        assert!(surface.cells.iter().all(|row| row[0].is_some() && row[1].is_none()));
        assert!(surface.render().contains("N/A"));
    }

    #[test]
    fn invalid_axes_are_rejected() {
        let same = SweepConfig {
            second: sweep_config(false).first,
            ..sweep_config(false)
        };
        assert!(ParameterSweep::new(base(), same).is_err());

        let mut empty = sweep_config(false);
        empty.first.steps = 0;
        assert!(ParameterSweep::new(base(), empty).is_err());
    }
}
