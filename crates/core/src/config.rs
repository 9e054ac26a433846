use crate::error::{PipelineError, PipelineResult};
use crate::records::{ScoreType, TargetColumn};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub features: FeatureConfig,
    pub trainer: TrainerConfig,
    pub backtest: BacktestConfig,
    pub sweep: SweepConfig,
}

/// Input and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory scanned recursively for per-ticker `*.txt` price files.
    pub price_dir: PathBuf,
    /// Tab-separated vendor news file.
    pub news_file: PathBuf,
    /// `Date,Rate` file with local currency per reference currency.
    pub fx_file: Option<PathBuf>,
    pub signals_file: PathBuf,
    pub returns_file: PathBuf,
    /// `Date,Daily Return` benchmark series, already downloaded.
    pub benchmark_file: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            price_dir: PathBuf::from("data/tse_stocks"),
            news_file: PathBuf::from("data/raw_sentiment_news.tsv"),
            fx_file: None,
            signals_file: PathBuf::from("data/japan_signals.csv"),
            returns_file: PathBuf::from("data/all-japan-ticker-returns.csv"),
            benchmark_file: None,
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Feature construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Price rows before this date are discarded before standardization.
    pub price_history_start: NaiveDate,
    /// Rolling window (rows) of the turnover mean.
    pub turnover_window: usize,
    /// Articles with relevance below this are dropped.
    pub relevance_threshold: f64,
    /// News stamped after this local time counts toward the next trading date.
    pub news_cutoff: NaiveTime,
    /// Sub-scores at or above this are positive.
    pub positive_threshold: f64,
    /// Sub-scores at or below this are negative.
    pub negative_threshold: f64,
    pub standardize_sentiment: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            price_history_start: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or_default(),
            turnover_window: 63,
            relevance_threshold: 100.0,
            news_cutoff: NaiveTime::from_hms_opt(15, 0, 0).unwrap_or_default(),
            positive_threshold: 60.0,
            negative_threshold: 40.0,
            standardize_sentiment: true,
        }
    }
}

/// Walk-forward elastic net parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub lookback_years: u32,
    /// First training day; the data's first date when absent.
    pub start_date: Option<NaiveDate>,
    pub alpha: f64,
    pub l1_ratio: f64,
    pub target: TargetColumn,
    pub features: Vec<ScoreType>,
    pub num_quantiles: u32,
    pub max_iter: usize,
    pub tolerance: f64,
    /// Fit windows on the rayon pool.
    pub parallel: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            lookback_years: 3,
            start_date: NaiveDate::from_ymd_opt(2011, 1, 1),
            alpha: 1e-5,
            l1_ratio: 0.5,
            target: TargetColumn::Return,
            features: ScoreType::ALL.to_vec(),
            num_quantiles: 5,
            max_iter: 10_000,
            tolerance: 1e-5,
            parallel: true,
        }
    }
}

impl TrainerConfig {
    /// Checks parameter domains before any fitting starts.
    ///
    /// # Errors
    /// Returns [`PipelineError::InvalidConfig`] for out-of-range values.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.lookback_years == 0 {
            return Err(PipelineError::invalid_config("lookback_years must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.l1_ratio) {
            return Err(PipelineError::invalid_config("l1_ratio must be in [0, 1]"));
        }
        if self.alpha < 0.0 || !self.alpha.is_finite() {
            return Err(PipelineError::invalid_config("alpha must be a non-negative number"));
        }
        if self.features.is_empty() {
            return Err(PipelineError::invalid_config("at least one feature is required"));
        }
        if self.num_quantiles < 2 {
            return Err(PipelineError::invalid_config("num_quantiles must be at least 2"));
        }
        if self.max_iter == 0 {
            return Err(PipelineError::invalid_config("max_iter must be at least 1"));
        }
        Ok(())
    }
}

/// Backtest selection, filtering and sizing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Names kept per side per date.
    pub top_n_signals: usize,
    pub long_sentiment_threshold: f64,
    pub short_sentiment_threshold: f64,
    pub long_leverage: f64,
    pub short_leverage: f64,
    /// Trailing rows summed by the momentum filter.
    pub return_threshold_window: usize,
    pub long_return_threshold: f64,
    pub short_return_threshold: f64,
    /// Per-name weight cap; equal weighting when absent.
    pub max_alloc: Option<f64>,
    /// Bucket count of the signal file; the bottom bucket is the short book.
    pub num_quantiles: u32,
    /// Rank on the previous trading day's prediction.
    pub lag_sentiment: bool,
    /// Dates whose daily return is forced to zero (known bad vendor prints).
    pub zero_return_dates: Vec<NaiveDate>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap_or_default(),
            top_n_signals: 100,
            long_sentiment_threshold: 0.0029,
            short_sentiment_threshold: 100.0,
            long_leverage: 1.75,
            short_leverage: 1.0,
            return_threshold_window: 20,
            long_return_threshold: -100.0,
            short_return_threshold: 100.0,
            max_alloc: None,
            num_quantiles: 5,
            lag_sentiment: true,
            // Reverse split misprint in the vendor returns.
            zero_return_dates: NaiveDate::from_ymd_opt(2024, 7, 29).into_iter().collect(),
        }
    }
}

impl BacktestConfig {
    /// Checks parameter domains before a run.
    ///
    /// # Errors
    /// Returns [`PipelineError::EmptyDateRange`] when the range is inverted and
    /// [`PipelineError::InvalidConfig`] for out-of-range values.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.start_date > self.end_date {
            return Err(PipelineError::EmptyDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if self.return_threshold_window == 0 {
            return Err(PipelineError::invalid_config(
                "return_threshold_window must be at least 1",
            ));
        }
        if self.long_leverage < 0.0 || self.short_leverage < 0.0 {
            return Err(PipelineError::invalid_config("leverage must be non-negative"));
        }
        if let Some(max_alloc) = self.max_alloc {
            if !(max_alloc > 0.0 && max_alloc <= 1.0) {
                return Err(PipelineError::invalid_config(format!(
                    "max_alloc must be in (0, 1], got {max_alloc}"
                )));
            }
        }
        if self.num_quantiles < 2 {
            return Err(PipelineError::invalid_config("num_quantiles must be at least 2"));
        }
        Ok(())
    }

    /// Returns a copy with one sweepable parameter replaced.
    ///
    /// Integer parameters take the floor of `value`, clamped at zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn with_parameter(&self, parameter: SweepParameter, value: f64) -> Self {
        let mut config = self.clone();
        let as_count = value.max(0.0).floor() as usize;
        match parameter {
            SweepParameter::TopNSignals => config.top_n_signals = as_count,
            SweepParameter::LongSentimentThreshold => config.long_sentiment_threshold = value,
            SweepParameter::ShortSentimentThreshold => config.short_sentiment_threshold = value,
            SweepParameter::LongLeverage => config.long_leverage = value,
            SweepParameter::ShortLeverage => config.short_leverage = value,
            SweepParameter::ReturnThresholdWindow => config.return_threshold_window = as_count,
            SweepParameter::LongReturnThreshold => config.long_return_threshold = value,
            SweepParameter::ShortReturnThreshold => config.short_return_threshold = value,
            SweepParameter::MaxAlloc => config.max_alloc = Some(value),
        }
        config
    }
}

/// Backtest parameters that the sweep can vary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepParameter {
    TopNSignals,
    LongSentimentThreshold,
    ShortSentimentThreshold,
    LongLeverage,
    ShortLeverage,
    ReturnThresholdWindow,
    LongReturnThreshold,
    ShortReturnThreshold,
    MaxAlloc,
}

impl SweepParameter {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            SweepParameter::TopNSignals => "top_n_signals",
            SweepParameter::LongSentimentThreshold => "long_sentiment_threshold",
            SweepParameter::ShortSentimentThreshold => "short_sentiment_threshold",
            SweepParameter::LongLeverage => "long_leverage",
            SweepParameter::ShortLeverage => "short_leverage",
            SweepParameter::ReturnThresholdWindow => "return_threshold_window",
            SweepParameter::LongReturnThreshold => "long_return_threshold",
            SweepParameter::ShortReturnThreshold => "short_return_threshold",
            SweepParameter::MaxAlloc => "max_alloc",
        }
    }
}

impl fmt::Display for SweepParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SweepParameter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let all = [
            SweepParameter::TopNSignals,
            SweepParameter::LongSentimentThreshold,
            SweepParameter::ShortSentimentThreshold,
            SweepParameter::LongLeverage,
            SweepParameter::ShortLeverage,
            SweepParameter::ReturnThresholdWindow,
            SweepParameter::LongReturnThreshold,
            SweepParameter::ShortReturnThreshold,
            SweepParameter::MaxAlloc,
        ];
        let normalized = s.trim().to_lowercase().replace('-', "_");
        all.into_iter()
            .find(|p| p.name() == normalized)
            .ok_or_else(|| anyhow::anyhow!("Unknown sweep parameter: '{s}'"))
    }
}

/// Statistic a parameter sweep reports per grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMetric {
    AnnualizedReturn,
    SharpeRatio,
    MaxDrawdown,
    #[default]
    CalmarRatio,
}

impl fmt::Display for OptimizationMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationMetric::AnnualizedReturn => write!(f, "Annualized Return"),
            OptimizationMetric::SharpeRatio => write!(f, "Sharpe Ratio"),
            OptimizationMetric::MaxDrawdown => write!(f, "Max Drawdown"),
            OptimizationMetric::CalmarRatio => write!(f, "Calmar Ratio"),
        }
    }
}

impl std::str::FromStr for OptimizationMetric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "annualized_return" | "return" => Ok(OptimizationMetric::AnnualizedReturn),
            "sharpe_ratio" | "sharpe" => Ok(OptimizationMetric::SharpeRatio),
            "max_drawdown" | "drawdown" => Ok(OptimizationMetric::MaxDrawdown),
            "calmar_ratio" | "calmar" => Ok(OptimizationMetric::CalmarRatio),
            _ => Err(anyhow::anyhow!(
                "Invalid metric: '{s}'. Valid values: annualized_return, sharpe_ratio, max_drawdown, calmar_ratio"
            )),
        }
    }
}

/// One axis of a parameter sweep: `steps` evenly spaced values from `start` to `stop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepAxis {
    pub parameter: SweepParameter,
    pub start: f64,
    pub stop: f64,
    pub steps: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub first: SweepAxis,
    pub second: SweepAxis,
    pub metric: OptimizationMetric,
    pub parallel: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            first: SweepAxis {
                parameter: SweepParameter::TopNSignals,
                start: 1.0,
                stop: 50.0,
                steps: 10,
            },
            second: SweepAxis {
                parameter: SweepParameter::LongSentimentThreshold,
                start: 0.001,
                stop: 0.01,
                steps: 5,
            },
            metric: OptimizationMetric::CalmarRatio,
            parallel: true,
        }
    }
}
