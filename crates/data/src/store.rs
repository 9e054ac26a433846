//! In-memory time series keyed by date and ticker.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Outcome of a trailing-return lookup in the returns matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrailingReturn {
    Value(f64),
    /// Fewer rows than the window precede the date, or a cell inside the window is empty.
    Undefined,
    DateAbsent,
    TickerAbsent,
}

/// Dense date x ticker matrix of daily simple returns; empty cells are `None`.
#[derive(Debug, Clone, Default)]
pub struct ReturnsMatrix {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    date_index: HashMap<NaiveDate, usize>,
    ticker_index: HashMap<String, usize>,
    /// Row-major: `values[date_row][ticker_col]`.
    values: Vec<Vec<Option<f64>>>,
}

impl ReturnsMatrix {
    /// Builds a matrix from unordered rows; rows are sorted by date.
    ///
    /// # Errors
    /// Returns an error on a duplicate date or ticker, or a row whose width
    /// differs from the ticker count.
    pub fn new(tickers: Vec<String>, rows: Vec<(NaiveDate, Vec<Option<f64>>)>) -> Result<Self> {
        let mut ticker_index = HashMap::with_capacity(tickers.len());
        for (col, ticker) in tickers.iter().enumerate() {
            if ticker_index.insert(ticker.clone(), col).is_some() {
                bail!("Duplicate ticker column '{ticker}'");
            }
        }

        let mut rows = rows;
        rows.sort_by_key(|(date, _)| *date);

        let mut dates = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len());
        let mut date_index = HashMap::with_capacity(rows.len());
        for (row_idx, (date, row)) in rows.into_iter().enumerate() {
            if row.len() != tickers.len() {
                bail!(
                    "Row {date} has {} cells, expected {}",
                    row.len(),
                    tickers.len()
                );
            }
            if date_index.insert(date, row_idx).is_some() {
                bail!("Duplicate date row {date}");
            }
            dates.push(date);
            values.push(row);
        }

        Ok(Self {
            dates,
            tickers,
            date_index,
            ticker_index,
            values,
        })
    }

    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    #[must_use]
    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Cell value; `None` when the date, the ticker or the value is missing.
    #[must_use]
    pub fn get(&self, date: NaiveDate, ticker: &str) -> Option<f64> {
        let row = *self.date_index.get(&date)?;
        let col = *self.ticker_index.get(ticker)?;
        self.values[row][col]
    }

    /// Sum of the `window` returns on the rows strictly before `date`.
    ///
    /// Matches a one-row shift followed by a full-window rolling sum: any empty
    /// cell inside the window makes the sum undefined.
    #[must_use]
    pub fn trailing_sum(&self, date: NaiveDate, ticker: &str, window: usize) -> TrailingReturn {
        let Some(&row) = self.date_index.get(&date) else {
            return TrailingReturn::DateAbsent;
        };
        let Some(&col) = self.ticker_index.get(ticker) else {
            return TrailingReturn::TickerAbsent;
        };
        if window == 0 || row < window {
            return TrailingReturn::Undefined;
        }

        let mut sum = 0.0;
        for values in &self.values[row - window..row] {
            match values[col] {
                Some(value) => sum += value,
                None => return TrailingReturn::Undefined,
            }
        }
        TrailingReturn::Value(sum)
    }
}

/// Local currency per unit of reference currency, by date.
#[derive(Debug, Clone, Default)]
pub struct FxSeries {
    rates: BTreeMap<NaiveDate, f64>,
}

impl FxSeries {
    #[must_use]
    pub fn new(rates: BTreeMap<NaiveDate, f64>) -> Self {
        Self { rates }
    }

    /// Same-day rate; no carry-forward.
    #[must_use]
    pub fn rate_on(&self, date: NaiveDate) -> Option<f64> {
        self.rates.get(&date).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl FromIterator<(NaiveDate, f64)> for FxSeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Daily simple returns of the comparison index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkSeries {
    pub dates: Vec<NaiveDate>,
    pub daily_returns: Vec<f64>,
}

impl BenchmarkSeries {
    /// Builds a series sorted by date.
    #[must_use]
    pub fn new(mut observations: Vec<(NaiveDate, f64)>) -> Self {
        observations.sort_by_key(|(date, _)| *date);
        let (dates, daily_returns) = observations.into_iter().unzip();
        Self {
            dates,
            daily_returns,
        }
    }

    /// Observations inside `[start, end]`.
    #[must_use]
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let (dates, daily_returns) = self
            .dates
            .iter()
            .zip(&self.daily_returns)
            .filter(|(date, _)| (start..=end).contains(*date))
            .map(|(date, r)| (*date, *r))
            .unzip();
        Self {
            dates,
            daily_returns,
        }
    }

    /// Running product of `1 + daily_return`.
    #[must_use]
    pub fn cumulative(&self) -> Vec<f64> {
        self.daily_returns
            .iter()
            .scan(1.0, |acc, r| {
                *acc *= 1.0 + r;
                Some(*acc)
            })
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}
