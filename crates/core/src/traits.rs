use crate::error::ExecutionError;
use crate::market::{Candle, DateRange};
use crate::param::ParameterAssignment;
use crate::report::BacktestOutcome;
use async_trait::async_trait;

/// The narrow interface to the external single-backtest engine.
///
/// Implementations must be safely callable concurrently: calls share no
/// mutable state beyond read-only market data, and each outcome is privately
/// owned by the caller until persisted.
#[async_trait]
pub trait BacktestRunner: Send + Sync {
    async fn run(
        &self,
        strategy_id: &str,
        symbol: &str,
        interval: &str,
        range: DateRange,
        parameters: &ParameterAssignment,
    ) -> Result<BacktestOutcome, ExecutionError>;
}

/// Read-only access to historical market data.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn get_ohlc(
        &self,
        symbol: &str,
        interval: &str,
        range: DateRange,
    ) -> Result<Vec<Candle>, ExecutionError>;
}
