//! Signal generation for the news-sentiment strategy.
//!
//! - [`features`]: regression rows from prices and news
//! - [`elastic_net`]: the regularized linear model
//! - [`walk_forward`]: rolling out-of-sample training
//! - [`quantile`]: per-date ranking and bucketing of predictions

pub mod elastic_net;
pub mod features;
pub mod quantile;
pub mod walk_forward;

pub use elastic_net::{ElasticNet, ElasticNetParams, FitSummary, ModelError};
pub use features::{standardize, FeatureBuilder, FeatureDiagnostics, FeatureOutput, SentimentTable};
pub use quantile::{cut_labels, ordinal_ranks, percentile_ranks, rank_and_bucket};
pub use walk_forward::{generate_windows, train, TrainingOutput, WindowBounds};
