//! Long/short quintile backtest.
//!
//! For every signal date in range the engine:
//!
//! 1. takes top-bucket names as long candidates and bottom-bucket names as
//!    short candidates,
//! 2. ranks them by the previous trading day's prediction and keeps the best
//!    `top_n_signals` per side that clear the sentiment thresholds,
//! 3. drops names whose trailing return fails the momentum filter,
//! 4. sizes each side and combines them with leverage into a daily return.

use crate::allocation::Sizing;
use crate::filter::{FilterDecision, MissingData, MomentumFilter};
use crate::metrics::calculate_statistics;
use chrono::NaiveDate;
use sentiment_trade_core::{
    AllocationRow, BacktestConfig, PerformanceStatistics, PipelineError, PipelineResult,
    Selection, Side, SignalRow, StrategyReturn,
};
use sentiment_trade_data::ReturnsMatrix;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

/// Data-completeness counters collected during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestDiagnostics {
    pub signal_rows: usize,
    pub rows_in_range: usize,
    pub trading_days: usize,
    /// Rows with no prediction on the previous trading day.
    pub lag_ineligible: usize,
    pub long_candidates: usize,
    pub short_candidates: usize,
    pub momentum_excluded: usize,
    pub missing_history: usize,
    pub missing_date: usize,
    pub missing_ticker: usize,
    pub zeroed_dates: usize,
}

impl BacktestDiagnostics {
    fn record_missing(&mut self, reason: MissingData) {
        match reason {
            MissingData::InsufficientHistory => self.missing_history += 1,
            MissingData::DateAbsent => self.missing_date += 1,
            MissingData::TickerAbsent => self.missing_ticker += 1,
        }
    }

    /// Selections kept only because the momentum lookup had no data.
    #[must_use]
    pub fn fail_open_total(&self) -> usize {
        self.missing_history + self.missing_date + self.missing_ticker
    }
}

/// Everything one backtest run produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BacktestRun {
    pub returns: Vec<StrategyReturn>,
    /// Filled only when a per-name allocation cap is configured.
    pub allocations: Vec<AllocationRow>,
    pub selections: Vec<Selection>,
    pub diagnostics: BacktestDiagnostics,
}

impl BacktestRun {
    #[must_use]
    pub fn daily_returns(&self) -> Vec<f64> {
        self.returns.iter().map(|r| r.daily_return).collect()
    }

    #[must_use]
    pub fn cumulative_returns(&self) -> Vec<f64> {
        self.returns.iter().map(|r| r.cumulative_return).collect()
    }

    /// First and last date of the return series.
    #[must_use]
    pub fn period(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.returns.first()?.date, self.returns.last()?.date))
    }

    /// Statistics of the strategy return series.
    ///
    /// # Errors
    /// Returns [`PipelineError::EmptySeries`] when the run produced no dates.
    pub fn statistics(&self) -> PipelineResult<PerformanceStatistics> {
        calculate_statistics(&self.cumulative_returns(), &self.daily_returns())
    }
}

/// A signal row eligible for selection on its date.
#[derive(Debug, Clone)]
struct Candidate<'a> {
    row: &'a SignalRow,
    /// Prediction used for ranking, already lagged when the lag is enabled.
    sentiment: f64,
}

pub struct BacktestEngine {
    config: BacktestConfig,
    filter: MomentumFilter,
    sizing: Sizing,
}

impl BacktestEngine {
    /// Creates an engine after validating the configuration.
    ///
    /// # Errors
    /// Returns the validation error of [`BacktestConfig::validate`].
    pub fn new(config: BacktestConfig) -> PipelineResult<Self> {
        config.validate()?;
        let filter = MomentumFilter {
            window: config.return_threshold_window,
            long_threshold: config.long_return_threshold,
            short_threshold: config.short_return_threshold,
        };
        let sizing = Sizing::from_max_alloc(config.max_alloc);
        Ok(Self {
            config,
            filter,
            sizing,
        })
    }

    #[must_use]
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Runs the backtest over `signals`, using `returns` for the momentum filter.
    ///
    /// Output is fully determined by the inputs.
    ///
    /// # Errors
    /// Returns [`PipelineError::EmptyDateRange`] when no signal row falls
    /// inside the configured date range.
    pub fn run(&self, signals: &[SignalRow], returns: &ReturnsMatrix) -> PipelineResult<BacktestRun> {
        let mut diagnostics = BacktestDiagnostics {
            signal_rows: signals.len(),
            ..BacktestDiagnostics::default()
        };

        let lagged = self.lagged_sentiment(signals);

        let mut by_date: BTreeMap<NaiveDate, Vec<Candidate<'_>>> = BTreeMap::new();
        for (row, sentiment) in signals.iter().zip(lagged) {
            if row.date < self.config.start_date || row.date > self.config.end_date {
                continue;
            }
            diagnostics.rows_in_range += 1;
            let candidates = by_date.entry(row.date).or_default();
            match sentiment {
                Some(sentiment) => candidates.push(Candidate { row, sentiment }),
                None => diagnostics.lag_ineligible += 1,
            }
        }
        if by_date.is_empty() {
            return Err(PipelineError::EmptyDateRange {
                start: self.config.start_date,
                end: self.config.end_date,
            });
        }
        diagnostics.trading_days = by_date.len();

        let zero_dates: BTreeSet<NaiveDate> = self.config.zero_return_dates.iter().copied().collect();
        let mut run = BacktestRun::default();
        let mut cumulative = 1.0;

        for (date, candidates) in &by_date {
            let longs = self.select_side(*date, candidates, Side::Long, returns, &mut diagnostics);
            let shorts = self.select_side(*date, candidates, Side::Short, returns, &mut diagnostics);

            let long_returns: Vec<f64> = longs.iter().map(|c| c.row.realized_return).collect();
            let short_returns: Vec<f64> = shorts.iter().map(|c| c.row.realized_return).collect();
            let long_return = self.sizing.side_return(&long_returns);
            let short_return = self.sizing.side_return(&short_returns);

            let mut daily_return = self.config.long_leverage * long_return.unwrap_or(0.0)
                - self.config.short_leverage * short_return.unwrap_or(0.0);
            if zero_dates.contains(date) {
                debug!("Forcing zero return on {date}");
                diagnostics.zeroed_dates += 1;
                daily_return = 0.0;
            }
            cumulative *= 1.0 + daily_return;

            run.returns.push(StrategyReturn {
                date: *date,
                long_return,
                short_return,
                daily_return,
                cumulative_return: cumulative,
            });

            if let Sizing::MaxAlloc(_) = self.sizing {
                run.allocations.push(AllocationRow {
                    date: *date,
                    long_allocation: self.sizing.deployed(longs.len()),
                    short_allocation: self.sizing.deployed(shorts.len()),
                });
            }

            for (side, chosen) in [(Side::Long, &longs), (Side::Short, &shorts)] {
                let weight = self.sizing.weight(chosen.len());
                run.selections.extend(chosen.iter().map(|c| Selection {
                    date: *date,
                    ticker: c.row.ticker.clone(),
                    side,
                    weight,
                }));
            }
        }

        info!(
            "Backtest {} to {}: {} days, {} selections, {} kept on missing momentum data",
            self.config.start_date,
            self.config.end_date,
            diagnostics.trading_days,
            run.selections.len(),
            diagnostics.fail_open_total()
        );
        run.diagnostics = diagnostics;
        Ok(run)
    }

    /// Prediction each row is ranked on.
    ///
    /// With the lag enabled this is the same ticker's prediction on the
    /// previous date of the signal calendar, or `None` if it has none there.
    fn lagged_sentiment(&self, signals: &[SignalRow]) -> Vec<Option<f64>> {
        if !self.config.lag_sentiment {
            return signals.iter().map(|r| Some(r.net_sentiment)).collect();
        }

        let calendar: Vec<NaiveDate> = signals
            .iter()
            .map(|r| r.date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let previous: HashMap<NaiveDate, NaiveDate> = calendar
            .windows(2)
            .map(|pair| (pair[1], pair[0]))
            .collect();

        let mut predictions: HashMap<(NaiveDate, &str), f64> = HashMap::with_capacity(signals.len());
        for row in signals {
            predictions
                .entry((row.date, row.ticker.as_str()))
                .or_insert(row.net_sentiment);
        }

        signals
            .iter()
            .map(|row| {
                let prior = previous.get(&row.date)?;
                predictions.get(&(*prior, row.ticker.as_str())).copied()
            })
            .collect()
    }

    fn select_side<'a>(
        &self,
        date: NaiveDate,
        candidates: &[Candidate<'a>],
        side: Side,
        returns: &ReturnsMatrix,
        diagnostics: &mut BacktestDiagnostics,
    ) -> Vec<Candidate<'a>> {
        let bucket = match side {
            Side::Long => 1,
            Side::Short => self.config.num_quantiles,
        };
        let mut pool: Vec<Candidate<'a>> = candidates
            .iter()
            .filter(|c| c.row.quintile == bucket)
            .cloned()
            .collect();
        match side {
            Side::Long => {
                diagnostics.long_candidates += pool.len();
                pool.sort_by(|a, b| b.sentiment.total_cmp(&a.sentiment));
            }
            Side::Short => {
                diagnostics.short_candidates += pool.len();
                pool.sort_by(|a, b| a.sentiment.total_cmp(&b.sentiment));
            }
        }

        pool.into_iter()
            .take(self.config.top_n_signals)
            .filter(|c| match side {
                Side::Long => c.sentiment >= self.config.long_sentiment_threshold,
                Side::Short => c.sentiment <= self.config.short_sentiment_threshold,
            })
            .filter(|c| {
                let decision = self.filter.evaluate(returns, date, &c.row.ticker, side);
                match decision {
                    FilterDecision::Include => {}
                    FilterDecision::Exclude => diagnostics.momentum_excluded += 1,
                    FilterDecision::MissingDataInclude(reason) => {
                        debug!("Keeping {} {} on {}: {}", side, c.row.ticker, date, reason);
                        diagnostics.record_missing(reason);
                    }
                }
                decision.keeps()
            })
            .collect()
    }
}

/// Runs one backtest with a fresh engine.
///
/// # Errors
/// Returns a configuration error or [`PipelineError::EmptyDateRange`].
pub fn generate_returns(
    signals: &[SignalRow],
    returns: &ReturnsMatrix,
    config: &BacktestConfig,
) -> PipelineResult<BacktestRun> {
    BacktestEngine::new(config.clone())?.run(signals, returns)
}
