//! Subcommands of the `sentiment-trade` binary.

pub mod backtest;
pub mod select;
pub mod show_config;
pub mod sweep;
pub mod train;

pub use backtest::{run_backtest, BacktestArgs};
pub use select::{run_select, SelectArgs};
pub use show_config::{run_show_config, ConfigArgs};
pub use sweep::{run_sweep, SweepArgs};
pub use train::{run_train, TrainArgs};
