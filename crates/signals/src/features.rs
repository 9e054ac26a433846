//! Regression feature construction.
//!
//! Joins per-ticker price records with per-article news scores into one
//! [`RegressionRow`] per (date, ticker):
//!
//! 1. Price rows before the history start are discarded.
//! 2. Forward returns become log returns, standardized across tickers per date.
//! 3. News sub-scores are classified and aggregated into one log-odds feature
//!    per score type; score types are outer-joined and gaps filled with zero.
//! 4. The price and news tables are inner-joined on (date, ticker).
//! 5. Sentiment features are optionally standardized per date.

use chrono::NaiveDate;
use sentiment_trade_core::{FeatureConfig, RegressionRow, ScoreType};
use sentiment_trade_data::{FxSeries, NewsScore, PriceRecord, SentimentClass};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Log-odds sentiment features keyed by (trading date, ticker).
pub type SentimentTable = BTreeMap<(NaiveDate, String), [f64; 4]>;

/// Counts describing what happened to the inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureDiagnostics {
    pub price_rows: usize,
    pub price_rows_before_history: usize,
    pub duplicate_price_rows: usize,
    pub sentiment_keys: usize,
    /// Joined rows whose turnover could not be converted for lack of an FX rate.
    pub missing_fx: usize,
    pub regression_rows: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureOutput {
    pub rows: Vec<RegressionRow>,
    pub diagnostics: FeatureDiagnostics,
}

pub struct FeatureBuilder {
    config: FeatureConfig,
}

impl FeatureBuilder {
    #[must_use]
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    /// Builds regression rows, sorted by date then ticker.
    ///
    /// Without an FX series every turnover is `None`. With one, a date that has
    /// no rate leaves that row's turnover `None` and is counted.
    #[must_use]
    pub fn build(
        &self,
        prices: &[PriceRecord],
        news: &[NewsScore],
        fx: Option<&FxSeries>,
    ) -> FeatureOutput {
        let mut diagnostics = FeatureDiagnostics {
            price_rows: prices.len(),
            ..FeatureDiagnostics::default()
        };

        let mut by_key: BTreeMap<(NaiveDate, &str), &PriceRecord> = BTreeMap::new();
        for record in prices {
            if record.date < self.config.price_history_start {
                diagnostics.price_rows_before_history += 1;
                continue;
            }
            if by_key.contains_key(&(record.date, record.ticker.as_str())) {
                diagnostics.duplicate_price_rows += 1;
                continue;
            }
            by_key.insert((record.date, record.ticker.as_str()), record);
        }

        let standardized_returns = standardized_log_returns(&by_key);

        let sentiment = self.sentiment_table(news);
        diagnostics.sentiment_keys = sentiment.len();

        let mut rows = Vec::new();
        for (((date, ticker), record), std_return) in by_key.iter().zip(standardized_returns) {
            let Some(features) = sentiment.get(&(*date, (*ticker).to_string())) else {
                continue;
            };

            let turnover_usd = match fx {
                Some(fx) => {
                    let converted = fx.rate_on(*date).map(|rate| record.turnover_3m / rate);
                    if converted.is_none() {
                        diagnostics.missing_fx += 1;
                        debug!("No FX rate on {date}; turnover for {ticker} left empty");
                    }
                    converted
                }
                None => None,
            };

            rows.push(RegressionRow {
                date: *date,
                ticker: (*ticker).to_string(),
                turnover_usd,
                realized_return: record.forward_return,
                standardized_log_return: std_return,
                sentiment: *features,
            });
        }

        if self.config.standardize_sentiment {
            standardize_sentiment(&mut rows);
        }

        diagnostics.regression_rows = rows.len();
        info!(
            "Built {} regression rows from {} price rows and {} sentiment keys ({} without FX)",
            diagnostics.regression_rows,
            diagnostics.price_rows,
            diagnostics.sentiment_keys,
            diagnostics.missing_fx
        );

        FeatureOutput { rows, diagnostics }
    }

    /// Aggregates news into `log10((positive + 1) / (negative + 1))` per score type.
    ///
    /// An article only counts toward the score types it has a sub-score for.
    /// A key present for any score type gets zeros for the others.
    #[must_use]
    pub fn sentiment_table(&self, news: &[NewsScore]) -> SentimentTable {
        let mut counts: BTreeMap<(NaiveDate, String), [(u32, u32); 4]> = BTreeMap::new();

        for record in news {
            let date = record.trading_date(self.config.news_cutoff);
            for score in ScoreType::ALL {
                let Some(value) = record.sub_score(score) else {
                    continue;
                };
                let entry = counts
                    .entry((date, record.ticker.clone()))
                    .or_insert([(0, 0); 4]);
                let (positive, negative) = &mut entry[score.index()];
                match SentimentClass::classify(
                    value,
                    self.config.positive_threshold,
                    self.config.negative_threshold,
                ) {
                    SentimentClass::Positive => *positive += 1,
                    SentimentClass::Negative => *negative += 1,
                    SentimentClass::Neutral => {}
                }
            }
        }

        counts
            .into_iter()
            .map(|(key, per_type)| {
                let features = per_type.map(|(positive, negative)| {
                    (f64::from(positive + 1) / f64::from(negative + 1)).log10()
                });
                (key, features)
            })
            .collect()
    }
}

/// Standardizes values in place with the sample standard deviation.
///
/// A single value is left as is; a constant slice is only centered.
pub fn standardize(values: &mut [f64]) {
    if values.len() < 2 {
        return;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();

    for value in values.iter_mut() {
        *value -= mean;
        if std_dev > 0.0 && std_dev.is_finite() {
            *value /= std_dev;
        }
    }
}

/// `ln(1 + r)` standardized within each date, in key order.
fn standardized_log_returns(by_key: &BTreeMap<(NaiveDate, &str), &PriceRecord>) -> Vec<f64> {
    let mut output = Vec::with_capacity(by_key.len());
    let mut current: Option<NaiveDate> = None;
    let mut group: Vec<f64> = Vec::new();

    for ((date, _), record) in by_key {
        if current != Some(*date) {
            standardize(&mut group);
            output.append(&mut group);
            current = Some(*date);
        }
        group.push(record.forward_return.ln_1p());
    }
    standardize(&mut group);
    output.append(&mut group);
    output
}

fn standardize_sentiment(rows: &mut [RegressionRow]) {
    let mut start = 0;
    while start < rows.len() {
        let date = rows[start].date;
        let end = rows[start..]
            .iter()
            .position(|row| row.date != date)
            .map_or(rows.len(), |offset| start + offset);

        for score in ScoreType::ALL {
            let mut column: Vec<f64> = rows[start..end].iter().map(|r| r.feature(score)).collect();
            standardize(&mut column);
            for (row, value) in rows[start..end].iter_mut().zip(column) {
                row.sentiment[score.index()] = value;
            }
        }
        start = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, NaiveTime};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, day).unwrap()
    }

    fn price(day: u32, ticker: &str, forward_return: f64) -> PriceRecord {
        PriceRecord {
            date: d(day),
            ticker: ticker.to_string(),
            close: 100.0,
            volume: 1000.0,
            forward_return,
            turnover_3m: 1.08e7,
        }
    }

    fn news(stamp: &str, ticker: &str, scores: [Option<f64>; 4]) -> NewsScore {
        NewsScore {
            timestamp: NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S").unwrap(),
            ticker: ticker.to_string(),
            relevance: 100.0,
            sub_scores: scores,
        }
    }

    fn raw_config() -> FeatureConfig {
        FeatureConfig {
            standardize_sentiment: false,
            ..FeatureConfig::default()
        }
    }

    // ============================================
    // Standardization
    // ============================================

    #[test]
    fn standardize_uses_sample_deviation() {
        let mut values = vec![1.0, 2.0, 3.0];
        standardize(&mut values);
        assert!((values[0] + 1.0).abs() < 1e-12);
        assert!(values[1].abs() < 1e-12);
        assert!((values[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn standardize_leaves_singletons_and_centers_constants() {
        let mut single = vec![0.7];
        standardize(&mut single);
        assert_eq!(single, vec![0.7]);

        let mut constant = vec![0.3, 0.3, 0.3];
        standardize(&mut constant);
        assert!(constant.iter().all(|v| v.abs() < 1e-12));
    }

    // ============================================
    // Sentiment aggregation
    // ============================================

    #[test]
    fn sentiment_table_counts_per_score_type() {
        let builder = FeatureBuilder::new(raw_config());
        let table = builder.sentiment_table(&[
            news("2020-01-06 09:00:00", "7203", [Some(70.0), Some(30.0), None, Some(50.0)]),
            news("2020-01-06 10:00:00", "7203", [Some(65.0), Some(35.0), None, None]),
            news("2020-01-06 11:00:00", "7203", [Some(20.0), None, None, None]),
        ]);

        let features = table[&(d(6), "7203".to_string())];
        // Two positive, one negative.
        assert!((features[0] - (3.0_f64 / 2.0).log10()).abs() < 1e-12);
        // Zero positive, two negative.
        assert!((features[1] - (1.0_f64 / 3.0).log10()).abs() < 1e-12);
        // No records for this score type.
        assert_eq!(features[2], 0.0);
        // Neutral only.
        assert_eq!(features[3], 0.0);
    }

    #[test]
    fn late_news_counts_toward_next_date() {
        let builder = FeatureBuilder::new(raw_config());
        let table = builder.sentiment_table(&[news(
            "2020-01-06 15:30:00",
            "7203",
            [Some(90.0), None, None, None],
        )]);
        assert!(table.contains_key(&(d(7), "7203".to_string())));
        assert!(!table.contains_key(&(d(6), "7203".to_string())));
    }

    // ============================================
    // Build
    // ============================================

    #[test]
    fn build_inner_joins_prices_and_news() {
        let builder = FeatureBuilder::new(raw_config());
        let prices = vec![
            price(6, "7203", 0.01),
            price(6, "6758", -0.02),
            price(7, "7203", 0.03),
        ];
        let scores = vec![
            news("2020-01-06 09:00:00", "7203", [Some(70.0); 4]),
            news("2020-01-06 09:00:00", "9984", [Some(70.0); 4]),
        ];

        let output = builder.build(&prices, &scores, None);

        assert_eq!(output.rows.len(), 1);
        let row = &output.rows[0];
        assert_eq!((row.date, row.ticker.as_str()), (d(6), "7203"));
        assert!((row.realized_return - 0.01).abs() < 1e-12);
        assert_eq!(row.turnover_usd, None);
        assert_eq!(output.diagnostics.sentiment_keys, 2);
    }

    #[test]
    fn returns_are_standardized_over_all_priced_tickers() {
        let builder = FeatureBuilder::new(raw_config());
        let prices = vec![price(6, "A", 0.01), price(6, "B", 0.03)];
        let scores = vec![news("2020-01-06 09:00:00", "A", [Some(70.0); 4])];

        let output = builder.build(&prices, &scores, None);
        assert_eq!(output.rows.len(), 1);
        // Two observations standardize to -1/sqrt(2) and +1/sqrt(2).
        assert!((output.rows[0].standardized_log_return + 0.5_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn missing_fx_rate_is_counted_not_fatal() {
        let builder = FeatureBuilder::new(raw_config());
        let prices = vec![price(6, "A", 0.01), price(7, "A", 0.02)];
        let scores = vec![
            news("2020-01-06 09:00:00", "A", [Some(70.0); 4]),
            news("2020-01-07 09:00:00", "A", [Some(70.0); 4]),
        ];
        let fx: FxSeries = [(d(6), 108.0)].into_iter().collect();

        let output = builder.build(&prices, &scores, Some(&fx));

        assert_eq!(output.rows.len(), 2);
        assert!((output.rows[0].turnover_usd.unwrap() - 1.0e5).abs() < 1e-6);
        assert_eq!(output.rows[1].turnover_usd, None);
        assert_eq!(output.diagnostics.missing_fx, 1);
    }

    #[test]
    fn history_start_drops_early_prices() {
        let builder = FeatureBuilder::new(FeatureConfig {
            price_history_start: d(7),
            ..raw_config()
        });
        let prices = vec![price(6, "A", 0.01), price(7, "A", 0.02)];
        let scores = vec![
            news("2020-01-06 09:00:00", "A", [Some(70.0); 4]),
            news("2020-01-07 09:00:00", "A", [Some(70.0); 4]),
        ];

        let output = builder.build(&prices, &scores, None);
        assert_eq!(output.rows.len(), 1);
        assert_eq!(output.rows[0].date, d(7));
        assert_eq!(output.diagnostics.price_rows_before_history, 1);
    }

    #[test]
    fn sentiment_standardization_runs_per_date() {
        let builder = FeatureBuilder::new(FeatureConfig {
            news_cutoff: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            ..FeatureConfig::default()
        });
        let prices = vec![price(6, "A", 0.01), price(6, "B", 0.02), price(7, "A", 0.0)];
        let scores = vec![
            news("2020-01-06 09:00:00", "A", [Some(90.0); 4]),
            news("2020-01-06 09:00:00", "B", [Some(10.0); 4]),
            news("2020-01-07 09:00:00", "A", [Some(90.0); 4]),
        ];

        let output = builder.build(&prices, &scores, None);
        assert_eq!(output.rows.len(), 3);
        let a = output.rows[0].feature(ScoreType::SentimentExpert);
        let b = output.rows[1].feature(ScoreType::SentimentExpert);
        assert!((a + b).abs() < 1e-12);
        assert!(a > 0.0);
        // A single row on the second date keeps its raw value.
        let raw = 2.0_f64.log10();
        assert!((output.rows[2].feature(ScoreType::SentimentExpert) - raw).abs() < 1e-12);
    }
}
