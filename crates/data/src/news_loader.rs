//! Reader for the vendor news sentiment export.
//!
//! The export is tab-separated and ISO-8859-1 encoded. Only the timestamp,
//! relevance, company id and the four score columns are read; free-text
//! columns are ignored.

use crate::models::NewsScore;
use crate::parsing::{normalize_ticker, parse_datetime, parse_optional_f64};
use anyhow::{anyhow, Context, Result};
use sentiment_trade_core::ScoreType;
use std::path::Path;
use tracing::{debug, info};

const TIMESTAMP_COLUMN: &str = "Time_Stamp_Original(JST)";
const RELEVANCE_COLUMN: &str = "Company_Relevance";
const TICKER_COLUMN: &str = "Company_IDs(TSE)";

/// Parsed news plus counts of rows that did not make it through.
#[derive(Debug, Default)]
pub struct NewsLoadOutcome {
    pub scores: Vec<NewsScore>,
    pub rows_read: usize,
    pub malformed_rows: usize,
    pub below_relevance: usize,
    /// Kept records with no sub-score at all.
    pub unscored: usize,
}

impl NewsLoadOutcome {
    /// Mean relevance-weighted score over the records that have one.
    #[must_use]
    pub fn mean_average_score(&self) -> Option<f64> {
        let weighted: Vec<f64> = self.scores.iter().filter_map(NewsScore::average_score).collect();
        if weighted.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = weighted.len() as f64;
        Some(weighted.iter().sum::<f64>() / count)
    }
}

pub struct NewsLoader {
    relevance_threshold: f64,
}

impl NewsLoader {
    #[must_use]
    pub fn new(relevance_threshold: f64) -> Self {
        Self { relevance_threshold }
    }

    /// Reads and filters a news export.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or lacks a required column.
    pub fn load_file(&self, path: &Path) -> Result<NewsLoadOutcome> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read news file: {}", path.display()))?;
        self.parse_str(&decode_latin1(&bytes))
            .with_context(|| format!("Failed to parse news file: {}", path.display()))
    }

    /// Parses already-decoded TSV text.
    ///
    /// Rows with an unparseable timestamp, relevance, company id or score
    /// are counted and skipped. Rows below the relevance threshold are dropped.
    ///
    /// # Errors
    /// Returns an error if a required column is missing from the header.
    pub fn parse_str(&self, text: &str) -> Result<NewsLoadOutcome> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers().context("Missing header row")?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| anyhow!("Missing column {name}"))
        };
        let timestamp_idx = column(TIMESTAMP_COLUMN)?;
        let relevance_idx = column(RELEVANCE_COLUMN)?;
        let ticker_idx = column(TICKER_COLUMN)?;
        let score_idx: Vec<usize> = ScoreType::ALL
            .iter()
            .map(|score| column(score.column()))
            .collect::<Result<_>>()?;

        let mut outcome = NewsLoadOutcome::default();
        for (line, row) in reader.records().enumerate() {
            outcome.rows_read += 1;
            let parsed = row
                .map_err(anyhow::Error::from)
                .and_then(|row| {
                    let field = |idx: usize| row.get(idx).unwrap_or("");
                    let timestamp = parse_datetime(field(timestamp_idx))?;
                    let relevance = parse_optional_f64(field(relevance_idx))?
                        .ok_or_else(|| anyhow!("Missing relevance"))?;
                    let ticker = normalize_ticker(field(ticker_idx));
                    if ticker.is_empty() {
                        return Err(anyhow!("Missing company id"));
                    }
                    let mut sub_scores = [None; 4];
                    for (slot, idx) in sub_scores.iter_mut().zip(&score_idx) {
                        *slot = parse_optional_f64(field(*idx))?;
                    }
                    Ok(NewsScore {
                        timestamp,
                        ticker,
                        relevance,
                        sub_scores,
                    })
                });

            match parsed {
                Ok(score) if score.relevance >= self.relevance_threshold => {
                    if score.score().is_none() {
                        outcome.unscored += 1;
                    }
                    outcome.scores.push(score);
                }
                Ok(_) => outcome.below_relevance += 1,
                Err(e) => {
                    debug!("Skipping news row {}: {}", line + 2, e);
                    outcome.malformed_rows += 1;
                }
            }
        }

        info!(
            "Loaded {} news records ({} below relevance, {} malformed, {} unscored)",
            outcome.scores.len(),
            outcome.below_relevance,
            outcome.malformed_rows,
            outcome.unscored
        );
        if let Some(mean) = outcome.mean_average_score() {
            debug!("Mean relevance-weighted news score: {mean:.4}");
        }
        Ok(outcome)
    }
}

/// Decodes ISO-8859-1 bytes; every byte maps to the code point of the same value.
#[must_use]
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADER: &str = "Time_Stamp_Original(JST)\tHeadline\tCompany_Relevance\tCompany_IDs(TSE)\tQuantitativeScore_Market\tQualitativeScore_Rule\tSentimentScore_Expert\tQualitativeScore_Rule_New";

    fn tsv(rows: &[&str]) -> String {
        let mut text = HEADER.to_string();
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text
    }

    #[test]
    fn parses_rows_and_filters_relevance() {
        let text = tsv(&[
            "2020-01-06 09:00:00\tUp\t100\t7203\t70\t65\t\t50",
            "2020-01-06 10:00:00\tMeh\t80\t7203\t50\t50\t50\t50",
            "2020-01-06 16:00:00\tDown\t100\t6758.0\t30\t20\t10\t",
        ]);
        let outcome = NewsLoader::new(100.0).parse_str(&text).unwrap();

        assert_eq!(outcome.rows_read, 3);
        assert_eq!(outcome.below_relevance, 1);
        assert_eq!(outcome.malformed_rows, 0);
        assert_eq!(outcome.scores.len(), 2);
        assert_eq!(outcome.scores[0].sub_score(ScoreType::SentimentExpert), None);
        assert_eq!(outcome.scores[1].ticker, "6758");
        assert_eq!(
            outcome.scores[1].timestamp.date(),
            NaiveDate::from_ymd_opt(2020, 1, 6).unwrap()
        );
    }

    #[test]
    fn malformed_rows_are_counted() {
        let text = tsv(&[
            "yesterday\tX\t100\t7203\t70\t65\t60\t50",
            "2020-01-06 09:00:00\tX\tn/a\t7203\t70\t65\t60\t50",
            "2020-01-06 09:00:00\tX\t100\t7203\t70\t65\t60\t50",
        ]);
        let outcome = NewsLoader::new(100.0).parse_str(&text).unwrap();
        assert_eq!(outcome.malformed_rows, 2);
        assert_eq!(outcome.scores.len(), 1);
    }

    #[test]
    fn unscored_rows_are_kept_and_counted() {
        let text = tsv(&[
            "2020-01-06 09:00:00\tBlank\t100\t7203\t\t\t\t",
            "2020-01-06 09:00:00\tUp\t100\t7203\t80\t\t60\t",
        ]);
        let outcome = NewsLoader::new(100.0).parse_str(&text).unwrap();
        assert_eq!(outcome.scores.len(), 2);
        assert_eq!(outcome.unscored, 1);
        // Only the scored row contributes: 0.4 * 100.
        assert!((outcome.mean_average_score().unwrap() - 40.0).abs() < 1e-9);
        assert_eq!(NewsLoadOutcome::default().mean_average_score(), None);
    }

    #[test]
    fn missing_score_column_is_an_error() {
        let text = "Time_Stamp_Original(JST)\tCompany_Relevance\tCompany_IDs(TSE)\n";
        assert!(NewsLoader::new(100.0).parse_str(text).is_err());
    }

    #[test]
    fn latin1_bytes_decode_to_matching_code_points() {
        assert_eq!(decode_latin1(&[0x41, 0xE9, 0xFC]), "Aéü");
    }
}
