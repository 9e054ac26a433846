use sentiment_trade_core::{PerformanceStatistics, PipelineError, PipelineResult};

/// Trading days per year used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Running product of `1 + r`.
#[must_use]
pub fn cumulative_returns(daily_returns: &[f64]) -> Vec<f64> {
    daily_returns
        .iter()
        .scan(1.0, |acc, r| {
            *acc *= 1.0 + r;
            Some(*acc)
        })
        .collect()
}

/// Computes return and risk statistics.
///
/// `n` in the annualization exponent is the number of daily observations.
/// Sharpe uses the sample standard deviation and is `None` below two
/// observations or with zero dispersion. Calmar is `None` without a drawdown.
///
/// # Errors
/// Returns [`PipelineError::EmptySeries`] for empty input and
/// [`PipelineError::LengthMismatch`] when the series are not aligned.
pub fn calculate_statistics(
    cumulative_returns: &[f64],
    daily_returns: &[f64],
) -> PipelineResult<PerformanceStatistics> {
    if daily_returns.is_empty() {
        return Err(PipelineError::EmptySeries("daily_returns"));
    }
    if cumulative_returns.len() != daily_returns.len() {
        return Err(PipelineError::LengthMismatch {
            left: cumulative_returns.len(),
            right: daily_returns.len(),
        });
    }

    #[allow(clippy::cast_precision_loss)]
    let n = daily_returns.len() as f64;
    let final_cumulative = cumulative_returns[cumulative_returns.len() - 1];
    let annualized_return = final_cumulative.powf(TRADING_DAYS_PER_YEAR / n) - 1.0;

    let sharpe_ratio = if daily_returns.len() < 2 {
        None
    } else {
        let mean = daily_returns.iter().sum::<f64>() / n;
        let variance = daily_returns
            .iter()
            .map(|r| (r - mean).powi(2))
            .sum::<f64>()
            / (n - 1.0);
        let std_dev = variance.sqrt();
        (std_dev > 0.0 && std_dev.is_finite())
            .then(|| TRADING_DAYS_PER_YEAR.sqrt() * mean / std_dev)
    };

    let max_drawdown = max_drawdown(cumulative_returns);
    let calmar_ratio = (max_drawdown < 0.0).then(|| annualized_return / max_drawdown.abs());

    Ok(PerformanceStatistics {
        annualized_return,
        sharpe_ratio,
        max_drawdown,
        calmar_ratio,
        observations: daily_returns.len(),
        final_cumulative_return: final_cumulative,
    })
}

/// Statistics straight from daily returns.
///
/// # Errors
/// Returns [`PipelineError::EmptySeries`] for an empty series.
pub fn statistics_from_daily(daily_returns: &[f64]) -> PipelineResult<PerformanceStatistics> {
    calculate_statistics(&cumulative_returns(daily_returns), daily_returns)
}

/// Worst peak-to-trough decline, `min (cum - running_max) / running_max`.
fn max_drawdown(cumulative_returns: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &value in cumulative_returns {
        peak = peak.max(value);
        if peak != 0.0 {
            worst = worst.min((value - peak) / peak);
        }
    }
    worst
}
