//! Raw-input data models.
//!
//! Price bars and news scores as read from vendor files, before any joining.

pub mod news;
pub mod price;

pub use news::{NewsScore, SentimentClass};
pub use price::{derive_price_records, ticker_from_file_name, PriceBar, PriceRecord};
