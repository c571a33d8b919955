use crate::config::AnalysisConfig;
use crate::market::DateRange;
use crate::param::{ParameterAssignment, ParameterSpace};
use crate::report::{EquityPoint, PerformanceReport, Trade};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an optimization or walk-forward job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Running" => Ok(Self::Running),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

/// Terminal outcome of one backtest run within a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Completed,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            other => Err(format!("unknown run status '{other}'")),
        }
    }
}

/// One requested parameter sweep over a single symbol and date range.
///
/// Created when the sweep is submitted; only its status changes afterwards,
/// and only once, when the sweep reaches a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationJob {
    pub job_id: Uuid,
    pub strategy_id: String,
    pub symbol: String,
    pub interval: String,
    pub range: DateRange,
    pub parameter_space: ParameterSpace,
    pub analysis: AnalysisConfig,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl OptimizationJob {
    #[must_use]
    pub fn new(
        strategy_id: impl Into<String>,
        symbol: impl Into<String>,
        interval: impl Into<String>,
        range: DateRange,
        parameter_space: ParameterSpace,
        analysis: AnalysisConfig,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            strategy_id: strategy_id.into(),
            symbol: symbol.into(),
            interval: interval.into(),
            range,
            parameter_space,
            analysis,
            status: JobStatus::Running,
            created_at: Utc::now(),
        }
    }
}

/// The persisted result of one simulation for one parameter assignment.
///
/// A failed execution is recorded too: `status` is `Failed`, `error` holds
/// the reason, and the report/trades/equity fields stay empty. Never mutated
/// after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestRun {
    pub run_id: Uuid,
    pub job_id: Uuid,
    pub parameters: ParameterAssignment,
    pub status: RunStatus,
    pub error: Option<String>,
    pub report: Option<PerformanceReport>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub created_at: DateTime<Utc>,
}

impl BacktestRun {
    /// Records a successful simulation.
    #[must_use]
    pub fn completed(
        job_id: Uuid,
        parameters: ParameterAssignment,
        report: PerformanceReport,
        trades: Vec<Trade>,
        equity_curve: Vec<EquityPoint>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            job_id,
            parameters,
            status: RunStatus::Completed,
            error: None,
            report: Some(report),
            trades,
            equity_curve,
            created_at: Utc::now(),
        }
    }

    /// Records an execution failure against the assignment that caused it.
    #[must_use]
    pub fn failed(job_id: Uuid, parameters: ParameterAssignment, error: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            job_id,
            parameters,
            status: RunStatus::Failed,
            error: Some(error.into()),
            report: None,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// One requested walk-forward validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WfoJob {
    pub wfo_job_id: Uuid,
    pub strategy_id: String,
    pub symbol: String,
    pub interval: String,
    pub range: DateRange,
    pub in_sample_days: i64,
    pub out_of_sample_days: i64,
    pub status: JobStatus,
    /// Zero-based index of the window that failed, when `status` is `Failed`.
    pub failed_window: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl WfoJob {
    #[must_use]
    pub fn new(
        strategy_id: impl Into<String>,
        symbol: impl Into<String>,
        interval: impl Into<String>,
        range: DateRange,
        in_sample_days: i64,
        out_of_sample_days: i64,
    ) -> Self {
        Self {
            wfo_job_id: Uuid::new_v4(),
            strategy_id: strategy_id.into(),
            symbol: symbol.into(),
            interval: interval.into(),
            range,
            in_sample_days,
            out_of_sample_days,
            status: JobStatus::Running,
            failed_window: None,
            created_at: Utc::now(),
        }
    }
}

/// The record of one completed out-of-sample validation within a WFO job.
///
/// Links the winning in-sample assignment to the single out-of-sample
/// backtest it was validated with. Deleted in cascade with its owning
/// `WfoJob` or referenced `BacktestRun`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WfoRun {
    pub wfo_run_id: Uuid,
    pub wfo_job_id: Uuid,
    pub oos_run_id: Uuid,
    pub winning_parameters: ParameterAssignment,
    pub oos_start: DateTime<Utc>,
    pub oos_end: DateTime<Utc>,
}
