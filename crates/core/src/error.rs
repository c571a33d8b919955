use thiserror::Error;

/// Rejections raised while validating or enumerating a parameter space.
///
/// These are configuration errors: they are reported before any backtest
/// work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidParameterSpace {
    #[error("parameter space has no axes")]
    EmptySpace,

    #[error("parameter '{0}' yields no values")]
    EmptyAxis(String),

    #[error("parameter '{0}' must have a positive step")]
    NonPositiveStep(String),

    #[error("parameter '{0}' has start greater than end")]
    InvertedRange(String),

    #[error("parameter space has {size} combinations, exceeding the cap of {cap}")]
    TooManyCombinations { size: u64, cap: u64 },
}

/// Failure modes of a single backtest execution.
///
/// Within a sweep these are recorded against the failing assignment and the
/// sweep continues; only the walk-forward controller treats a failure of its
/// single out-of-sample call as fatal for the owning job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("no market data available for the requested symbol and range")]
    DataUnavailable,

    #[error("simulation fault: {0}")]
    SimulationError(String),

    #[error("backtest exceeded its time budget")]
    Timeout,
}
