use crate::parsing::{normalize_ticker, parse_date, parse_optional_f64};
use crate::store::{BenchmarkSeries, FxSeries, ReturnsMatrix};
use anyhow::{anyhow, Context, Result};
use csv::{StringRecord, Writer};
use sentiment_trade_core::{AllocationRow, Selection, SignalRow, StrategyReturn};
use serde::Serialize;
use std::fs::File;
use std::path::Path;

pub struct CsvStorage;

impl CsvStorage {
    // ============================================
    // Readers
    // ============================================

    /// Reads a signal file.
    ///
    /// Columns are located by name: `Date, Ticker, Return, net_sentiment, rank,
    /// quintiles`, plus an optional `Turnover_p3m_USD`. Other columns, such as a
    /// leading unnamed index, are ignored.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, a required column is
    /// missing, or a value cannot be parsed.
    pub fn read_signals(path: &Path) -> Result<Vec<SignalRow>> {
        let mut reader = open_reader(path)?;
        let headers = reader.headers()?.clone();
        let columns = SignalColumns {
            date: column(&headers, "Date")?,
            ticker: column(&headers, "Ticker")?,
            realized_return: column(&headers, "Return")?,
            net_sentiment: column(&headers, "net_sentiment")?,
            rank: column(&headers, "rank")?,
            quintile: column(&headers, "quintiles")?,
            turnover: headers.iter().position(|h| h == "Turnover_p3m_USD"),
        };

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let row = record
                .map_err(anyhow::Error::from)
                .and_then(|record| columns.parse(&record))
                .with_context(|| format!("{}: line {}", path.display(), line + 2))?;
            rows.push(row);
        }

        tracing::info!("Read {} signal rows from {}", rows.len(), path.display());
        Ok(rows)
    }

    /// Reads a `Date, <ticker>...` returns matrix. Empty cells are missing values.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a cell is malformed.
    pub fn read_returns_matrix(path: &Path) -> Result<ReturnsMatrix> {
        let mut reader = open_reader(path)?;
        let headers = reader.headers()?.clone();
        let date_idx = column(&headers, "Date")?;
        let ticker_cols: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(idx, name)| *idx != date_idx && !name.trim().is_empty())
            .map(|(idx, name)| (idx, normalize_ticker(name)))
            .collect();

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let context = || format!("{}: line {}", path.display(), line + 2);
            let date = parse_date(record.get(date_idx).unwrap_or("")).with_context(context)?;
            let values = ticker_cols
                .iter()
                .map(|(idx, _)| parse_optional_f64(record.get(*idx).unwrap_or("")))
                .collect::<Result<Vec<_>>>()
                .with_context(context)?;
            rows.push((date, values));
        }

        let tickers = ticker_cols.into_iter().map(|(_, name)| name).collect();
        let matrix = ReturnsMatrix::new(tickers, rows)
            .with_context(|| format!("Invalid returns matrix: {}", path.display()))?;
        tracing::info!(
            "Read returns matrix {} dates x {} tickers from {}",
            matrix.dates().len(),
            matrix.tickers().len(),
            path.display()
        );
        Ok(matrix)
    }

    /// Reads a `Date, Rate` FX file. Rows with an empty rate are skipped.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a row is malformed.
    pub fn read_fx_rates(path: &Path) -> Result<FxSeries> {
        let pairs = read_dated_values(path, "Rate")?;
        Ok(pairs.into_iter().collect())
    }

    /// Reads a `Date, Daily Return` benchmark file. Empty returns are skipped.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a row is malformed.
    pub fn read_benchmark(path: &Path) -> Result<BenchmarkSeries> {
        Ok(BenchmarkSeries::new(read_dated_values(path, "Daily Return")?))
    }

    // ============================================
    // Writers
    // ============================================

    /// Writes signal rows as `Date, Ticker, Turnover_p3m_USD, Return, net_sentiment, rank, quintiles`.
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_signals(path: &Path, rows: &[SignalRow]) -> Result<()> {
        let mut writer = create_writer(path)?;
        writer.write_record([
            "Date",
            "Ticker",
            "Turnover_p3m_USD",
            "Return",
            "net_sentiment",
            "rank",
            "quintiles",
        ])?;
        for row in rows {
            writer.write_record(&[
                row.date.to_string(),
                row.ticker.clone(),
                optional(row.turnover_usd),
                row.realized_return.to_string(),
                row.net_sentiment.to_string(),
                row.rank.to_string(),
                row.quintile.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes the strategy return series.
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_strategy_returns(path: &Path, rows: &[StrategyReturn]) -> Result<()> {
        let mut writer = create_writer(path)?;
        writer.write_record([
            "Date",
            "filtered_return_q1",
            "filtered_return_q5",
            "Daily Return",
            "Cumulative Return",
        ])?;
        for row in rows {
            writer.write_record(&[
                row.date.to_string(),
                optional(row.long_return),
                optional(row.short_return),
                row.daily_return.to_string(),
                row.cumulative_return.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes per-side deployed capital in max-allocation mode.
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_allocations(path: &Path, rows: &[AllocationRow]) -> Result<()> {
        let mut writer = create_writer(path)?;
        writer.write_record(["Date", "Long Allocation", "Short Allocation"])?;
        for row in rows {
            writer.write_record(&[
                row.date.to_string(),
                row.long_allocation.to_string(),
                row.short_allocation.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes selections as `Date, Ticker, Side, Weight`.
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_selections(path: &Path, selections: &[Selection]) -> Result<()> {
        let mut writer = create_writer(path)?;
        writer.write_record(["Date", "Ticker", "Side", "Weight"])?;
        for selection in selections {
            writer.write_record(&[
                selection.date.to_string(),
                selection.ticker.clone(),
                selection.side.to_string(),
                selection.weight.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes a single `Ticker` column, the format the order client consumes.
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_tickers(path: &Path, tickers: &[String]) -> Result<()> {
        let mut writer = create_writer(path)?;
        writer.write_record(["Ticker"])?;
        for ticker in tickers {
            writer.write_record([ticker])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes a metric surface: one row per first-axis value, one column per
    /// second-axis value. Undefined cells are left empty.
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_surface(
        path: &Path,
        corner: &str,
        rows: &[f64],
        columns: &[f64],
        cells: &[Vec<Option<f64>>],
    ) -> Result<()> {
        let mut writer = create_writer(path)?;
        let mut header = vec![corner.to_string()];
        header.extend(columns.iter().map(ToString::to_string));
        writer.write_record(&header)?;

        for (value, row) in rows.iter().zip(cells) {
            let mut record = vec![value.to_string()];
            record.extend(row.iter().copied().map(optional));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes any serializable value as pretty JSON.
    ///
    /// # Errors
    /// Returns error if file cannot be created or serialization fails
    pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
        ensure_parent(path)?;
        let file = File::create(path)
            .with_context(|| format!("Failed to create JSON file: {}", path.display()))?;
        serde_json::to_writer_pretty(file, value)
            .with_context(|| format!("Failed to write JSON file: {}", path.display()))
    }
}

struct SignalColumns {
    date: usize,
    ticker: usize,
    realized_return: usize,
    net_sentiment: usize,
    rank: usize,
    quintile: usize,
    turnover: Option<usize>,
}

impl SignalColumns {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn parse(&self, record: &StringRecord) -> Result<SignalRow> {
        let field = |idx: usize| record.get(idx).unwrap_or("");
        let required = |idx: usize, name: &str| {
            parse_optional_f64(field(idx))?.ok_or_else(|| anyhow!("Missing {name}"))
        };

        let quintile = required(self.quintile, "quintiles")?;
        if quintile < 1.0 || quintile.fract().abs() > f64::EPSILON {
            return Err(anyhow!("Invalid quintile label {quintile}"));
        }
        let turnover_usd = match self.turnover {
            Some(idx) => parse_optional_f64(field(idx))?,
            None => None,
        };

        Ok(SignalRow {
            date: parse_date(field(self.date))?,
            ticker: normalize_ticker(field(self.ticker)),
            turnover_usd,
            realized_return: required(self.realized_return, "Return")?,
            net_sentiment: required(self.net_sentiment, "net_sentiment")?,
            rank: required(self.rank, "rank")?,
            quintile: quintile as u32,
        })
    }
}

fn read_dated_values(path: &Path, value_column: &str) -> Result<Vec<(chrono::NaiveDate, f64)>> {
    let mut reader = open_reader(path)?;
    let headers = reader.headers()?.clone();
    let date_idx = column(&headers, "Date")?;
    let value_idx = column(&headers, value_column)?;

    let mut pairs = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let context = || format!("{}: line {}", path.display(), line + 2);
        let date = parse_date(record.get(date_idx).unwrap_or("")).with_context(context)?;
        if let Some(value) =
            parse_optional_f64(record.get(value_idx).unwrap_or("")).with_context(context)?
        {
            pairs.push((date, value));
        }
    }
    Ok(pairs)
}

fn open_reader(path: &Path) -> Result<csv::Reader<File>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
    Ok(csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file))
}

fn create_writer(path: &Path) -> Result<Writer<File>> {
    ensure_parent(path)?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    Ok(Writer::from_writer(file))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

fn column(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| anyhow!("Missing column '{name}'"))
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
