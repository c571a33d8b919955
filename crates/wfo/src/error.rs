use quant_forge_core::ExecutionError;
use quant_forge_data::StoreError;
use quant_forge_optimizer::SweepError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WfoError {
    #[error("invalid windowing: {0}")]
    InvalidWindowing(String),

    #[error("window {window}: no candidate survived filtering, cannot select parameters")]
    NoViableParameters { window: u32 },

    #[error("window {window}: out-of-sample backtest failed: {source}")]
    OosExecution {
        window: u32,
        source: ExecutionError,
    },

    #[error("walk-forward job cancelled at window {window}")]
    Cancelled { window: u32 },

    #[error(transparent)]
    Sweep(#[from] SweepError),

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}
