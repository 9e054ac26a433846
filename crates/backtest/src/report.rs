use crate::engine::BacktestRun;
use crate::metrics::calculate_statistics;
use chrono::NaiveDate;
use sentiment_trade_core::{MetricsFormatter, PerformanceStatistics, PipelineError, PipelineResult};
use sentiment_trade_data::BenchmarkSeries;
use serde::Serialize;
use tracing::warn;

/// Strategy statistics next to the benchmark over the same period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub strategy: PerformanceStatistics,
    pub benchmark: Option<PerformanceStatistics>,
}

impl BacktestReport {
    /// Builds the report for `run`, clipping the benchmark to the run's dates.
    ///
    /// A benchmark with no observations in the period is dropped with a warning.
    ///
    /// # Errors
    /// Returns [`PipelineError::EmptySeries`] when the run has no dates.
    pub fn new(run: &BacktestRun, benchmark: Option<&BenchmarkSeries>) -> PipelineResult<Self> {
        let (start, end) = run
            .period()
            .ok_or(PipelineError::EmptySeries("strategy returns"))?;
        let strategy = run.statistics()?;

        let benchmark = match benchmark.map(|series| series.between(start, end)) {
            Some(clipped) if clipped.is_empty() => {
                warn!("Benchmark has no observations between {start} and {end}");
                None
            }
            Some(clipped) => Some(calculate_statistics(
                &clipped.cumulative(),
                &clipped.daily_returns,
            )?),
            None => None,
        };

        Ok(Self {
            start,
            end,
            strategy,
            benchmark,
        })
    }

    #[must_use]
    pub fn render(&self) -> String {
        MetricsFormatter::format((self.start, self.end), &self.strategy, self.benchmark.as_ref())
    }
}
