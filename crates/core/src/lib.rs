pub mod config;
pub mod config_loader;
pub mod error;
pub mod jobs;
pub mod market;
pub mod param;
pub mod report;
pub mod traits;

pub use config::{
    AnalysisConfig, DatabaseConfig, FilterConfig, ForgeConfig, OptimizerSettings, ScoringWeights,
};
pub use config_loader::ConfigLoader;
pub use error::{ExecutionError, InvalidParameterSpace};
pub use jobs::{BacktestRun, JobStatus, OptimizationJob, RunStatus, WfoJob, WfoRun};
pub use market::{Candle, DateRange};
pub use param::{ParamValue, ParameterAssignment, ParameterSpace, ParameterSpec};
pub use report::{BacktestOutcome, EquityPoint, PerformanceReport, Trade};
pub use traits::{BacktestRunner, MarketDataProvider};
