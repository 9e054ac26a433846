use crate::config::OptimizationMetric;
use serde::{Deserialize, Serialize};

/// Return and risk statistics of a daily return series.
///
/// Ratios whose denominator vanishes are `None` rather than zero or NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStatistics {
    pub annualized_return: f64,
    pub sharpe_ratio: Option<f64>,
    /// Worst peak-to-trough decline as a non-positive fraction.
    pub max_drawdown: f64,
    pub calmar_ratio: Option<f64>,
    /// Daily observations the statistics were computed from.
    pub observations: usize,
    pub final_cumulative_return: f64,
}

impl PerformanceStatistics {
    /// Returns the value of one optimization metric.
    #[must_use]
    pub fn metric(&self, metric: OptimizationMetric) -> Option<f64> {
        match metric {
            OptimizationMetric::AnnualizedReturn => Some(self.annualized_return),
            OptimizationMetric::SharpeRatio => self.sharpe_ratio,
            OptimizationMetric::MaxDrawdown => Some(self.max_drawdown),
            OptimizationMetric::CalmarRatio => self.calmar_ratio,
        }
    }

    /// Total return over the whole series.
    #[must_use]
    pub fn total_return(&self) -> f64 {
        self.final_cumulative_return - 1.0
    }
}
