//! News sentiment records.
//!
//! Every article carries up to four vendor sub-scores on a 0-100 scale.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use sentiment_trade_core::ScoreType;
use serde::{Deserialize, Serialize};

/// One article's sentiment scores for a single company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsScore {
    /// Publication time in exchange-local time.
    pub timestamp: NaiveDateTime,
    pub ticker: String,
    pub relevance: f64,
    /// Raw sub-scores indexed by [`ScoreType::index`].
    pub sub_scores: [Option<f64>; 4],
}

impl NewsScore {
    #[must_use]
    pub fn sub_score(&self, score: ScoreType) -> Option<f64> {
        self.sub_scores[score.index()]
    }

    /// Mean of the present sub-scores rescaled to [-1, 1].
    #[must_use]
    pub fn score(&self) -> Option<f64> {
        let present: Vec<f64> = self.sub_scores.iter().flatten().copied().collect();
        if present.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let mean = present.iter().sum::<f64>() / present.len() as f64;
        Some(mean / 50.0 - 1.0)
    }

    /// Score weighted by relevance.
    #[must_use]
    pub fn average_score(&self) -> Option<f64> {
        self.score().map(|score| score * self.relevance)
    }

    /// Trading date this article counts toward.
    ///
    /// Articles stamped after `cutoff` roll to the next calendar date.
    #[must_use]
    pub fn trading_date(&self, cutoff: NaiveTime) -> NaiveDate {
        let date = self.timestamp.date();
        if self.timestamp.time() > cutoff {
            date + Duration::days(1)
        } else {
            date
        }
    }
}

/// Three-way sentiment bucket of a single sub-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentClass {
    Positive,
    Neutral,
    Negative,
}

impl SentimentClass {
    /// Classifies a 0-100 sub-score: `>= positive` is positive, `<= negative` is negative.
    #[must_use]
    pub fn classify(value: f64, positive: f64, negative: f64) -> Self {
        if value >= positive {
            SentimentClass::Positive
        } else if value > negative {
            SentimentClass::Neutral
        } else {
            SentimentClass::Negative
        }
    }
}
