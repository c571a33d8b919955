use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A standardized report of a single backtest's performance.
///
/// Ratio metrics are `Option` because they can be undefined: the profit
/// factor when there is no losing trade, Sharpe when returns have no
/// variance, Calmar when there is no drawdown, and so on. All values are
/// fixed-precision decimals so stored scores reproduce bit-for-bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub total_net_profit: Decimal,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    pub profit_factor: Option<Decimal>,
    pub total_return_pct: Decimal,

    pub max_drawdown: Decimal,
    pub max_drawdown_pct: Decimal,
    pub sharpe_ratio: Option<Decimal>,
    pub calmar_ratio: Option<Decimal>,

    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub win_rate_pct: Option<Decimal>,
    pub average_win: Decimal,
    pub average_loss: Decimal,
    pub payoff_ratio: Option<Decimal>,
}

impl PerformanceReport {
    /// A zeroed-out report, useful as a starting point before calculations.
    #[must_use]
    pub fn new() -> Self {
        Self {
            total_net_profit: Decimal::ZERO,
            gross_profit: Decimal::ZERO,
            gross_loss: Decimal::ZERO,
            profit_factor: None,
            total_return_pct: Decimal::ZERO,
            max_drawdown: Decimal::ZERO,
            max_drawdown_pct: Decimal::ZERO,
            sharpe_ratio: None,
            calmar_ratio: None,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate_pct: None,
            average_win: Decimal::ZERO,
            average_loss: Decimal::ZERO,
            payoff_ratio: None,
        }
    }
}

impl Default for PerformanceReport {
    fn default() -> Self {
        Self::new()
    }
}

/// A completed round-trip trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: Uuid,
    pub symbol: String,
    pub entry_price: Decimal,
    pub entry_qty: Decimal,
    pub entry_timestamp: DateTime<Utc>,
    pub exit_price: Decimal,
    pub exit_qty: Decimal,
    pub exit_timestamp: DateTime<Utc>,
    pub pnl: Decimal,
}

/// One point on an equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: Decimal,
}

/// Everything a single simulation produces: the metric summary plus the
/// trade list and equity curve it was computed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestOutcome {
    pub report: PerformanceReport,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}
