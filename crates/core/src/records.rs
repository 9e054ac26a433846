//! Value records that flow through the pipeline.
//!
//! Every stage consumes immutable records produced by the previous stage:
//! regression rows feed the walk-forward trainer, signal rows feed the
//! backtest engine, strategy returns feed the statistics module.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four vendor sub-scores attached to every news article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreType {
    QuantitativeMarket,
    QualitativeRule,
    SentimentExpert,
    QualitativeRuleNew,
}

impl ScoreType {
    /// All score types in raw-file column order.
    pub const ALL: [ScoreType; 4] = [
        ScoreType::QuantitativeMarket,
        ScoreType::QualitativeRule,
        ScoreType::SentimentExpert,
        ScoreType::QualitativeRuleNew,
    ];

    /// Column name in the raw news file.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            ScoreType::QuantitativeMarket => "QuantitativeScore_Market",
            ScoreType::QualitativeRule => "QualitativeScore_Rule",
            ScoreType::SentimentExpert => "SentimentScore_Expert",
            ScoreType::QualitativeRuleNew => "QualitativeScore_Rule_New",
        }
    }

    /// Column name of the derived long/short log-odds feature.
    #[must_use]
    pub fn feature_column(self) -> String {
        format!("{}_LS", self.column())
    }

    /// Position of this score type inside fixed-size score arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            ScoreType::QuantitativeMarket => 0,
            ScoreType::QualitativeRule => 1,
            ScoreType::SentimentExpert => 2,
            ScoreType::QualitativeRuleNew => 3,
        }
    }
}

impl fmt::Display for ScoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Which regression row column the model is trained against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetColumn {
    /// Raw forward one-day simple return.
    #[default]
    Return,
    /// Cross-sectionally standardized forward log return.
    StandardizedLogReturn,
}

/// One (date, ticker) observation joining price and news features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionRow {
    pub date: NaiveDate,
    pub ticker: String,
    /// Trailing turnover in the reference currency; `None` when no FX rate was available.
    pub turnover_usd: Option<f64>,
    /// Forward one-day simple return (close D to close D+1).
    pub realized_return: f64,
    pub standardized_log_return: f64,
    /// Log-odds sentiment features indexed by [`ScoreType::index`].
    pub sentiment: [f64; 4],
}

impl RegressionRow {
    /// Returns the sentiment feature for one score type.
    #[must_use]
    pub fn feature(&self, score: ScoreType) -> f64 {
        self.sentiment[score.index()]
    }

    /// Returns the value of the chosen target column.
    #[must_use]
    pub fn target(&self, target: TargetColumn) -> f64 {
        match target {
            TargetColumn::Return => self.realized_return,
            TargetColumn::StandardizedLogReturn => self.standardized_log_return,
        }
    }
}

/// A scored, ranked and bucketed prediction. The contract between model and backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub date: NaiveDate,
    pub ticker: String,
    pub turnover_usd: Option<f64>,
    pub realized_return: f64,
    /// Model prediction for this (date, ticker).
    pub net_sentiment: f64,
    /// Percentile rank of `net_sentiment` within the date, in (0, 1].
    pub rank: f64,
    /// Bucket label; 1 is the most bullish bucket.
    pub quintile: u32,
}

/// Fitted model for one walk-forward window, keyed by the test year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelWindow {
    pub year: i32,
    pub training_start: NaiveDate,
    pub training_end: NaiveDate,
    pub testing_start: NaiveDate,
    pub testing_end: NaiveDate,
    pub features: Vec<ScoreType>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Number of coefficients the L1 penalty drove to exactly zero.
    pub zero_coefficients: usize,
    pub converged: bool,
    pub iterations: usize,
    pub training_rows: usize,
    pub testing_rows: usize,
}

impl ModelWindow {
    /// Number of features the fit kept.
    #[must_use]
    pub fn used_features(&self) -> usize {
        self.coefficients.len() - self.zero_coefficients
    }
}

/// Position side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

/// A single name chosen for a date, handed to order execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub date: NaiveDate,
    pub ticker: String,
    pub side: Side,
    /// Fraction of the side's capital assigned to this name.
    pub weight: f64,
}

/// One day of the strategy return series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyReturn {
    pub date: NaiveDate,
    /// Realized return of the long book; `None` when nothing was selected.
    pub long_return: Option<f64>,
    /// Realized return of the short book; `None` when nothing was selected.
    pub short_return: Option<f64>,
    pub daily_return: f64,
    pub cumulative_return: f64,
}

/// Capital deployed per side on a date in max-allocation mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRow {
    pub date: NaiveDate,
    pub long_allocation: f64,
    pub short_allocation: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_type_indices_match_all_order() {
        for (i, score) in ScoreType::ALL.iter().enumerate() {
            assert_eq!(score.index(), i);
        }
    }

    #[test]
    fn feature_column_appends_ls_suffix() {
        assert_eq!(
            ScoreType::SentimentExpert.feature_column(),
            "SentimentScore_Expert_LS"
        );
    }

    #[test]
    fn regression_row_target_selects_column() {
        let row = RegressionRow {
            date: NaiveDate::from_ymd_opt(2020, 1, 6).unwrap(),
            ticker: "7203".to_string(),
            turnover_usd: None,
            realized_return: 0.02,
            standardized_log_return: -0.4,
            sentiment: [0.1, 0.2, 0.3, 0.4],
        };
        assert!((row.target(TargetColumn::Return) - 0.02).abs() < f64::EPSILON);
        assert!((row.target(TargetColumn::StandardizedLogReturn) + 0.4).abs() < f64::EPSILON);
        assert!((row.feature(ScoreType::QualitativeRuleNew) - 0.4).abs() < f64::EPSILON);
    }
}
