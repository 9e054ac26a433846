//! Walk-forward elastic net training.
//!
//! Each window trains on `lookback_years` of history and predicts the
//! following calendar year out of sample. Predictions are ranked and bucketed
//! per date to produce the signal table the backtest consumes.

use crate::elastic_net::{ElasticNet, ElasticNetParams};
use crate::quantile::rank_and_bucket;
use chrono::{Datelike, Duration, Months, NaiveDate};
use ndarray::{Array1, Array2};
use sentiment_trade_core::{
    parallel, ModelWindow, PipelineError, PipelineResult, RegressionRow, SignalRow, TrainerConfig,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Date bounds of one walk-forward window.
///
/// Training covers `[training_start, testing_start)`. Testing covers
/// `[testing_start, testing_end)`, or `[testing_start, testing_end]` when the
/// window was capped at the last available date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub year: i32,
    pub training_start: NaiveDate,
    pub testing_start: NaiveDate,
    pub testing_end: NaiveDate,
    pub capped: bool,
}

impl WindowBounds {
    #[must_use]
    pub fn in_training(&self, date: NaiveDate) -> bool {
        date >= self.training_start && date < self.testing_start
    }

    #[must_use]
    pub fn in_testing(&self, date: NaiveDate) -> bool {
        date >= self.testing_start
            && (date < self.testing_end || (self.capped && date == self.testing_end))
    }

    /// Last training day.
    #[must_use]
    pub fn training_end(&self) -> NaiveDate {
        self.testing_start - Duration::days(1)
    }

    /// Last testing day.
    #[must_use]
    pub fn last_testing_day(&self) -> NaiveDate {
        if self.capped {
            self.testing_end
        } else {
            self.testing_end - Duration::days(1)
        }
    }
}

/// Signals and per-window model diagnostics.
#[derive(Debug, Clone, Default)]
pub struct TrainingOutput {
    pub signals: Vec<SignalRow>,
    pub windows: Vec<ModelWindow>,
}

/// Generates walk-forward windows between `min_date` and `max_date`.
///
/// The first training window starts at `start_date`, or `min_date` when
/// absent. Testing starts on January 1 of the year `lookback_years` after the
/// training start and lasts one year, capped at `max_date`. The next window's
/// training starts on January 1 of the following year. Generation stops once
/// a training start plus the lookback passes `max_date`.
#[must_use]
pub fn generate_windows(
    min_date: NaiveDate,
    max_date: NaiveDate,
    lookback_years: u32,
    start_date: Option<NaiveDate>,
) -> Vec<WindowBounds> {
    let mut windows = Vec::new();
    let mut cursor = start_date.unwrap_or(min_date);

    loop {
        let Some(testing_start) = add_years(cursor, lookback_years).and_then(january_first) else {
            break;
        };
        if testing_start > max_date {
            break;
        }
        let Some(full_end) = add_years(testing_start, 1) else {
            break;
        };
        let capped = full_end > max_date;
        windows.push(WindowBounds {
            year: testing_start.year(),
            training_start: cursor,
            testing_start,
            testing_end: if capped { max_date } else { full_end },
            capped,
        });

        let Some(next) = add_years(cursor, 1).and_then(january_first) else {
            break;
        };
        cursor = next;
        match add_years(cursor, lookback_years) {
            Some(horizon) if horizon <= max_date => {}
            _ => break,
        }
    }

    windows
}

/// Runs the walk-forward procedure over regression rows.
///
/// Windows without training or testing rows are skipped with a warning.
/// Window fits are independent and run on the rayon pool when
/// `config.parallel` is set; output is always in window order.
///
/// # Errors
/// Returns [`PipelineError::InvalidConfig`] for invalid parameters and
/// [`PipelineError::InsufficientData`] when no window could be fitted.
pub fn train(rows: &[RegressionRow], config: &TrainerConfig) -> PipelineResult<TrainingOutput> {
    config.validate()?;

    let (Some(min_date), Some(max_date)) = (
        rows.iter().map(|r| r.date).min(),
        rows.iter().map(|r| r.date).max(),
    ) else {
        return Err(PipelineError::InsufficientData(
            "no regression rows".to_string(),
        ));
    };

    let windows = generate_windows(min_date, max_date, config.lookback_years, config.start_date);
    info!(
        "Walk-forward over {} rows ({} to {}): {} windows",
        rows.len(),
        min_date,
        max_date,
        windows.len()
    );

    let fitted = parallel::filter_map_slice(
        &windows,
        |bounds| fit_window(rows, bounds, config),
        !config.parallel,
    );
    if fitted.is_empty() {
        return Err(PipelineError::InsufficientData(format!(
            "no usable walk-forward window between {min_date} and {max_date}"
        )));
    }

    let mut output = TrainingOutput::default();
    for (window, signals) in fitted {
        output.windows.push(window);
        output.signals.extend(signals);
    }
    info!(
        "Trained {} windows, {} signal rows",
        output.windows.len(),
        output.signals.len()
    );
    Ok(output)
}

fn fit_window(
    rows: &[RegressionRow],
    bounds: &WindowBounds,
    config: &TrainerConfig,
) -> Option<(ModelWindow, Vec<SignalRow>)> {
    let training: Vec<&RegressionRow> = rows.iter().filter(|r| bounds.in_training(r.date)).collect();
    let mut testing: Vec<&RegressionRow> = rows.iter().filter(|r| bounds.in_testing(r.date)).collect();
    if training.is_empty() || testing.is_empty() {
        warn!(
            "Skipping window {}: {} training rows, {} testing rows",
            bounds.year,
            training.len(),
            testing.len()
        );
        return None;
    }
    testing.sort_by_key(|r| r.date);

    let x_train = design_matrix(&training, config);
    let y_train: Array1<f64> = training.iter().map(|r| r.target(config.target)).collect();

    let mut model = ElasticNet::new(ElasticNetParams {
        alpha: config.alpha,
        l1_ratio: config.l1_ratio,
        max_iter: config.max_iter,
        tolerance: config.tolerance,
    });
    let summary = match model.fit(&x_train, &y_train) {
        Ok(summary) => summary,
        Err(e) => {
            warn!("Skipping window {}: fit failed: {}", bounds.year, e);
            return None;
        }
    };
    if !summary.converged {
        warn!(
            "Window {} did not converge after {} iterations; keeping best iterate",
            bounds.year, summary.iterations
        );
    }

    let predictions = match model.predict(&design_matrix(&testing, config)) {
        Ok(predictions) => predictions,
        Err(e) => {
            warn!("Skipping window {}: prediction failed: {}", bounds.year, e);
            return None;
        }
    };

    let signals = bucket_predictions(&testing, &predictions.to_vec(), config);
    let window = ModelWindow {
        year: bounds.year,
        training_start: bounds.training_start,
        training_end: bounds.training_end(),
        testing_start: bounds.testing_start,
        testing_end: bounds.last_testing_day(),
        features: config.features.clone(),
        coefficients: model.coefficients().map(|c| c.to_vec()).unwrap_or_default(),
        intercept: model.intercept().unwrap_or(0.0),
        zero_coefficients: model.zero_coefficients(),
        converged: summary.converged,
        iterations: summary.iterations,
        training_rows: training.len(),
        testing_rows: testing.len(),
    };
    info!(
        "Window {}: {} training rows, {} testing rows, {} of {} features kept",
        window.year,
        window.training_rows,
        window.testing_rows,
        window.used_features(),
        window.coefficients.len()
    );

    Some((window, signals))
}

fn design_matrix(rows: &[&RegressionRow], config: &TrainerConfig) -> Array2<f64> {
    let features = &config.features;
    Array2::from_shape_fn((rows.len(), features.len()), |(i, j)| {
        rows[i].feature(features[j])
    })
}

/// Ranks predictions within each date; `rows` must be sorted by date.
fn bucket_predictions(
    rows: &[&RegressionRow],
    predictions: &[f64],
    config: &TrainerConfig,
) -> Vec<SignalRow> {
    let mut signals = Vec::with_capacity(rows.len());
    let mut start = 0;
    while start < rows.len() {
        let date = rows[start].date;
        let end = rows[start..]
            .iter()
            .position(|r| r.date != date)
            .map_or(rows.len(), |offset| start + offset);

        let buckets = rank_and_bucket(&predictions[start..end], config.num_quantiles);
        for ((row, prediction), (rank, quintile)) in rows[start..end]
            .iter()
            .zip(&predictions[start..end])
            .zip(buckets)
        {
            signals.push(SignalRow {
                date,
                ticker: row.ticker.clone(),
                turnover_usd: row.turnover_usd,
                realized_return: row.realized_return,
                net_sentiment: *prediction,
                rank,
                quintile,
            });
        }
        start = end;
    }
    signals
}

fn add_years(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(years.checked_mul(12)?))
}

fn january_first(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), 1, 1)
}
