use quant_forge_core::InvalidParameterSpace;
use quant_forge_data::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Space(#[from] InvalidParameterSpace),

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("sweep task failure: {0}")]
    Task(String),
}
