pub mod allocation;
pub mod engine;
pub mod filter;
pub mod metrics;
pub mod report;
pub mod sweep;

pub use allocation::Sizing;
pub use engine::{generate_returns, BacktestDiagnostics, BacktestEngine, BacktestRun};
pub use filter::{FilterDecision, MissingData, MomentumFilter};
pub use metrics::{
    calculate_statistics, cumulative_returns, statistics_from_daily, TRADING_DAYS_PER_YEAR,
};
pub use report::BacktestReport;
pub use sweep::{linspace, round_to, ParameterSweep, SweepSurface};
