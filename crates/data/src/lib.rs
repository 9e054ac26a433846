//! Data loading and storage for the sentiment pipeline.
//!
//! This crate provides:
//! - Raw vendor file loaders for price histories and news scores
//! - The in-memory returns matrix, FX and benchmark series
//! - CSV and JSON storage for signals, returns, selections and sweep surfaces

pub mod csv_storage;
pub mod models;
pub mod news_loader;
pub mod parsing;
pub mod price_loader;
pub mod store;

pub use csv_storage::CsvStorage;
pub use models::{NewsScore, PriceBar, PriceRecord, SentimentClass};
pub use news_loader::{NewsLoadOutcome, NewsLoader};
pub use price_loader::{PriceLoadOutcome, PriceLoader, SkippedFile};
pub use store::{BenchmarkSeries, FxSeries, ReturnsMatrix, TrailingReturn};
