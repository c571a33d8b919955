use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForgeConfig {
    #[serde(default)]
    pub optimizer: OptimizerSettings,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Runtime knobs for the sweep scheduler and enumerator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerSettings {
    /// Number of backtests allowed in flight at once. Bounded so parallel
    /// sweeps cannot exhaust the shared market-data store.
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
    /// Upper bound on the cartesian product of a parameter space. Spaces
    /// larger than this are rejected before any work starts.
    #[serde(default = "default_max_combinations")]
    pub max_combinations: u64,
    /// Time budget for one backtest call; expiry is recorded as a timeout.
    #[serde(default = "default_backtest_timeout_secs")]
    pub backtest_timeout_secs: u64,
}

fn default_worker_pool_size() -> usize {
    std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get)
}

const fn default_max_combinations() -> u64 {
    100_000
}

const fn default_backtest_timeout_secs() -> u64 {
    300
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            worker_pool_size: default_worker_pool_size(),
            max_combinations: default_max_combinations(),
            backtest_timeout_secs: default_backtest_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "postgresql://localhost/quant_forge".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Filters and scoring weights applied when ranking a job's reports.
///
/// Passed explicitly into the scoring engine with each job rather than held
/// as ambient state, so two jobs can rank under different criteria.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub weights: ScoringWeights,
}

/// Hard thresholds a report must pass to be scored at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Reports with fewer trades than this are excluded from ranking.
    #[serde(default)]
    pub min_total_trades: u32,
    /// Reports whose max drawdown percentage exceeds this are excluded.
    #[serde(default = "default_max_drawdown_pct")]
    pub max_drawdown_pct: Decimal,
}

fn default_max_drawdown_pct() -> Decimal {
    Decimal::ONE_HUNDRED
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_total_trades: 0,
            max_drawdown_pct: default_max_drawdown_pct(),
        }
    }
}

/// Non-negative weights combined over batch-normalized metrics.
///
/// Weights need not sum to one; a metric that is undefined for a report
/// contributes zero to its term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_weight")]
    pub profit_factor: Decimal,
    #[serde(default = "default_weight")]
    pub calmar_ratio: Decimal,
    #[serde(default = "default_weight")]
    pub avg_win_loss_ratio: Decimal,
}

fn default_weight() -> Decimal {
    Decimal::ONE
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            profit_factor: default_weight(),
            calmar_ratio: default_weight(),
            avg_win_loss_ratio: default_weight(),
        }
    }
}
