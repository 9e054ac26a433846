//! Daily price bars and the per-ticker derived price record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One raw daily bar as read from a vendor price file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
}

/// A price row enriched with its forward return and trailing turnover.
///
/// Derived once per raw price file; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub ticker: String,
    pub close: f64,
    pub volume: f64,
    /// Simple return from this row's close to the next row's close.
    pub forward_return: f64,
    /// Rolling mean of `volume * close` in local currency.
    pub turnover_3m: f64,
}

/// Builds price records for one ticker.
///
/// Bars are ordered by date first. The turnover mean needs at least one
/// observation, so every row has a turnover; the last row has no forward
/// return and is dropped, as is any row whose return is not finite
/// (a zero close).
#[must_use]
pub fn derive_price_records(ticker: &str, bars: &[PriceBar], turnover_window: usize) -> Vec<PriceRecord> {
    let mut bars = bars.to_vec();
    bars.sort_by_key(|bar| bar.date);

    let window = turnover_window.max(1);
    let mut trailing: VecDeque<f64> = VecDeque::with_capacity(window);
    let mut trailing_sum = 0.0;
    let mut records = Vec::with_capacity(bars.len().saturating_sub(1));

    for (i, bar) in bars.iter().enumerate() {
        let traded = bar.volume * bar.close;
        trailing.push_back(traded);
        trailing_sum += traded;
        if trailing.len() > window {
            if let Some(expired) = trailing.pop_front() {
                trailing_sum -= expired;
            }
        }

        let Some(next) = bars.get(i + 1) else {
            break;
        };
        let forward_return = next.close / bar.close - 1.0;
        if !forward_return.is_finite() {
            continue;
        }

        #[allow(clippy::cast_precision_loss)]
        let turnover_3m = trailing_sum / trailing.len() as f64;
        records.push(PriceRecord {
            date: bar.date,
            ticker: ticker.to_string(),
            close: bar.close,
            volume: bar.volume,
            forward_return,
            turnover_3m,
        });
    }

    records
}

/// Ticker symbol encoded in a price file name: the stem up to the first `.`.
///
/// `7203.jp.txt` yields `7203`.
#[must_use]
pub fn ticker_from_file_name(file_name: &str) -> Option<&str> {
    let ticker = file_name.split('.').next()?.trim();
    (!ticker.is_empty()).then_some(ticker)
}
