pub mod config;
pub mod config_loader;
pub mod error;
pub mod metrics_formatter;
pub mod parallel;
pub mod records;
pub mod statistics;

pub use config::{
    AppConfig, BacktestConfig, DataConfig, FeatureConfig, OptimizationMetric, SweepAxis,
    SweepConfig, SweepParameter, TrainerConfig,
};
pub use config_loader::ConfigLoader;
pub use error::{PipelineError, PipelineResult};
pub use metrics_formatter::MetricsFormatter;
pub use records::{
    AllocationRow, ModelWindow, RegressionRow, ScoreType, Selection, Side, SignalRow,
    StrategyReturn, TargetColumn,
};
pub use statistics::PerformanceStatistics;
