//! Trailing-return momentum filter.
//!
//! A missing lookup never removes a name: the filter fails open and reports
//! why, so callers can count data gaps separately from real exclusions.

use chrono::NaiveDate;
use sentiment_trade_core::Side;
use sentiment_trade_data::{ReturnsMatrix, TrailingReturn};
use std::fmt;

/// Why a trailing return could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissingData {
    /// Too few rows before the date, or an empty cell inside the window.
    InsufficientHistory,
    DateAbsent,
    TickerAbsent,
}

impl fmt::Display for MissingData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingData::InsufficientHistory => write!(f, "insufficient history"),
            MissingData::DateAbsent => write!(f, "date absent from returns"),
            MissingData::TickerAbsent => write!(f, "ticker absent from returns"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterDecision {
    Include,
    Exclude,
    MissingDataInclude(MissingData),
}

impl FilterDecision {
    #[must_use]
    pub fn keeps(&self) -> bool {
        !matches!(self, FilterDecision::Exclude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumFilter {
    pub window: usize,
    pub long_threshold: f64,
    pub short_threshold: f64,
}

impl MomentumFilter {
    /// Longs need a trailing return at or above the long threshold; shorts at
    /// or below the short threshold.
    #[must_use]
    pub fn evaluate(
        &self,
        returns: &ReturnsMatrix,
        date: NaiveDate,
        ticker: &str,
        side: Side,
    ) -> FilterDecision {
        let trailing = match returns.trailing_sum(date, ticker, self.window) {
            TrailingReturn::Value(value) => value,
            TrailingReturn::Undefined => {
                return FilterDecision::MissingDataInclude(MissingData::InsufficientHistory)
            }
            TrailingReturn::DateAbsent => {
                return FilterDecision::MissingDataInclude(MissingData::DateAbsent)
            }
            TrailingReturn::TickerAbsent => {
                return FilterDecision::MissingDataInclude(MissingData::TickerAbsent)
            }
        };

        let passes = match side {
            Side::Long => trailing >= self.long_threshold,
            Side::Short => trailing <= self.short_threshold,
        };
        if passes {
            FilterDecision::Include
        } else {
            FilterDecision::Exclude
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, day).unwrap()
    }

    fn returns() -> ReturnsMatrix {
        ReturnsMatrix::new(
            vec!["UP".to_string(), "DOWN".to_string()],
            vec![
                (d(6), vec![Some(0.05), Some(-0.05)]),
                (d(7), vec![Some(0.05), Some(-0.05)]),
                (d(8), vec![Some(0.0), None]),
            ],
        )
        .unwrap()
    }

    fn filter() -> MomentumFilter {
        MomentumFilter {
            window: 2,
            long_threshold: 0.0,
            short_threshold: 0.0,
        }
    }

    #[test]
    fn thresholds_are_inclusive_per_side() {
        let m = returns();
        let f = filter();
        assert_eq!(f.evaluate(&m, d(8), "UP", Side::Long), FilterDecision::Include);
        assert_eq!(f.evaluate(&m, d(8), "DOWN", Side::Long), FilterDecision::Exclude);
        assert_eq!(f.evaluate(&m, d(8), "DOWN", Side::Short), FilterDecision::Include);
        assert_eq!(f.evaluate(&m, d(8), "UP", Side::Short), FilterDecision::Exclude);

        let at_threshold = MomentumFilter {
            long_threshold: 0.1,
            ..filter()
        };
        assert_eq!(
            at_threshold.evaluate(&m, d(8), "UP", Side::Long),
            FilterDecision::Include
        );
    }

    #[test]
    fn missing_data_fails_open_with_reason() {
        let m = returns();
        let f = filter();
        assert_eq!(
            f.evaluate(&m, d(7), "UP", Side::Long),
            FilterDecision::MissingDataInclude(MissingData::InsufficientHistory)
        );
        assert_eq!(
            f.evaluate(&m, d(9), "UP", Side::Long),
            FilterDecision::MissingDataInclude(MissingData::DateAbsent)
        );
        let decision = f.evaluate(&m, d(8), "NEW", Side::Short);
        assert_eq!(
            decision,
            FilterDecision::MissingDataInclude(MissingData::TickerAbsent)
        );
        assert!(decision.keeps());
        assert!(!FilterDecision::Exclude.keeps());
    }
}
