//! Loads per-ticker vendor price files from a directory tree.

use crate::models::{derive_price_records, ticker_from_file_name, PriceBar, PriceRecord};
use crate::parsing::{parse_date, parse_optional_f64};
use anyhow::{anyhow, bail, Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

const DATE_COLUMN: &str = "<DATE>";
const CLOSE_COLUMN: &str = "<CLOSE>";
const VOLUME_COLUMN: &str = "<VOL>";

/// A price file that could not be used.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of loading a price directory.
#[derive(Debug, Default)]
pub struct PriceLoadOutcome {
    pub records: Vec<PriceRecord>,
    pub files_loaded: usize,
    pub skipped: Vec<SkippedFile>,
}

pub struct PriceLoader {
    turnover_window: usize,
}

impl PriceLoader {
    #[must_use]
    pub fn new(turnover_window: usize) -> Self {
        Self { turnover_window }
    }

    /// Loads every `*.txt` file below `dir`, in path order.
    ///
    /// A malformed file is skipped with a warning; the rest of the batch continues.
    ///
    /// # Errors
    /// Returns an error only when `dir` itself is not a readable directory.
    pub fn load_dir(&self, dir: &Path) -> Result<PriceLoadOutcome> {
        if !dir.is_dir() {
            bail!("Price directory not found: {}", dir.display());
        }

        let mut paths: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
            .collect();
        paths.sort();

        let mut outcome = PriceLoadOutcome::default();
        for path in paths {
            match self.load_file(&path) {
                Ok(records) => {
                    outcome.files_loaded += 1;
                    outcome.records.extend(records);
                }
                Err(e) => {
                    warn!("Skipping price file {}: {:#}", path.display(), e);
                    outcome.skipped.push(SkippedFile {
                        path,
                        reason: format!("{e:#}"),
                    });
                }
            }
        }

        info!(
            "Loaded {} price rows from {} files ({} skipped)",
            outcome.records.len(),
            outcome.files_loaded,
            outcome.skipped.len()
        );
        Ok(outcome)
    }

    /// Loads a single price file; the ticker comes from the file name.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a row is malformed.
    pub fn load_file(&self, path: &Path) -> Result<Vec<PriceRecord>> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow!("Unreadable file name"))?;
        let ticker = ticker_from_file_name(file_name)
            .ok_or_else(|| anyhow!("No ticker in file name '{file_name}'"))?;
        let file = File::open(path)
            .with_context(|| format!("Failed to open price file: {}", path.display()))?;
        let bars = parse_bars(file)?;
        Ok(derive_price_records(ticker, &bars, self.turnover_window))
    }
}

/// Parses raw bars from a comma-separated vendor file with `<DATE>`, `<CLOSE>`
/// and `<VOL>` columns. Rows with a missing close or volume are dropped.
///
/// # Errors
/// Returns an error if the file is empty, a required column is missing, or a
/// date cannot be parsed.
pub fn parse_bars<R: Read>(reader: R) -> Result<Vec<PriceBar>> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv.headers().context("Missing header row")?.clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        bail!("Empty price file");
    }
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow!("Missing column {name}"))
    };
    let date_idx = column(DATE_COLUMN)?;
    let close_idx = column(CLOSE_COLUMN)?;
    let volume_idx = column(VOLUME_COLUMN)?;

    let mut bars = Vec::new();
    for (line, row) in csv.records().enumerate() {
        let row = row.with_context(|| format!("Malformed row {}", line + 2))?;
        let field = |idx: usize| row.get(idx).unwrap_or("");
        let date = parse_date(field(date_idx)).with_context(|| format!("Row {}", line + 2))?;
        let close = parse_optional_f64(field(close_idx))?;
        let volume = parse_optional_f64(field(volume_idx))?;
        if let (Some(close), Some(volume)) = (close, volume) {
            bars.push(PriceBar { date, close, volume });
        }
    }
    Ok(bars)
}
