//! Service facade over the optimization subsystem.
//!
//! Owns the handles a presentation layer needs: submit a sweep or a
//! walk-forward job, read back ranked or stitched results, cancel in-flight
//! work. Submissions validate eagerly, persist the job record, then hand the
//! long-running work to a background task; results are always read from the
//! store, so they survive a restart of the submitting process.

use quant_forge_core::{
    AnalysisConfig, BacktestRun, BacktestRunner, DateRange, ExecutionError, ForgeConfig,
    InvalidParameterSpace, MarketDataProvider, OptimizationJob, ParameterSpace, WfoJob, WfoRun,
};
use quant_forge_data::{Store, StoreError};
use quant_forge_optimizer::{space_size, Analyzer, CancelFlag, RankedReport, SweepScheduler};
use quant_forge_wfo::{CompositeWfoReport, WfoEngine};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Space(#[from] InvalidParameterSpace),

    #[error("market data for {symbol} is unavailable: {source}")]
    DataUnavailable {
        symbol: String,
        source: ExecutionError,
    },

    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),
}

/// A job record with its ranked reports, recomputed from stored runs.
#[derive(Debug, Clone)]
pub struct JobResults {
    pub job: OptimizationJob,
    pub ranked: Vec<RankedReport>,
}

/// A walk-forward job with its validation records and the stitched
/// composite, when at least one out-of-sample run carries equity data.
#[derive(Debug, Clone)]
pub struct WfoResults {
    pub job: WfoJob,
    pub runs: Vec<WfoRun>,
    pub composite: Option<CompositeWfoReport>,
}

pub struct OptimizationService {
    store: Arc<dyn Store>,
    runner: Arc<dyn BacktestRunner>,
    market_data: Arc<dyn MarketDataProvider>,
    config: ForgeConfig,
    active: Arc<RwLock<HashMap<Uuid, CancelFlag>>>,
}

impl OptimizationService {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        runner: Arc<dyn BacktestRunner>,
        market_data: Arc<dyn MarketDataProvider>,
        config: ForgeConfig,
    ) -> Self {
        Self {
            store,
            runner,
            market_data,
            config,
            active: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Validates and persists a sweep job, then runs it in the background.
    ///
    /// Returns as soon as the job record exists; progress is observable
    /// through `get_job_results` and the job's status.
    ///
    /// # Errors
    /// Returns `ServiceError::Space` when the parameter space is invalid or
    /// exceeds the configured combination cap; nothing is persisted in that
    /// case.
    pub async fn submit_optimization(
        &self,
        strategy_id: impl Into<String>,
        symbol: impl Into<String>,
        interval: impl Into<String>,
        range: DateRange,
        parameter_space: ParameterSpace,
        analysis: AnalysisConfig,
    ) -> Result<Uuid, ServiceError> {
        self.check_space(&parameter_space)?;

        let job = OptimizationJob::new(
            strategy_id,
            symbol,
            interval,
            range,
            parameter_space,
            analysis,
        );
        self.store.create_job(&job).await?;
        let job_id = job.job_id;
        info!("Accepted optimization job {job_id} for {}", job.symbol);

        let cancel = CancelFlag::new();
        self.active.write().await.insert(job_id, cancel.clone());

        let scheduler = SweepScheduler::new(
            Arc::clone(&self.store),
            Arc::clone(&self.runner),
            self.config.optimizer.clone(),
        );
        let active = Arc::clone(&self.active);
        tokio::spawn(async move {
            if let Err(err) = scheduler.run_sweep(&job, &cancel).await {
                error!("Optimization job {job_id} ended with error: {err}");
            }
            active.write().await.remove(&job_id);
        });

        Ok(job_id)
    }

    /// Reads a job and re-ranks its stored runs.
    ///
    /// Ranking is recomputed from persisted reports with the job's own
    /// analysis configuration, so repeated reads of a finished job return
    /// identical scores.
    ///
    /// # Errors
    /// Returns `ServiceError::Store` when the job is unknown or the store
    /// fails.
    pub async fn get_job_results(&self, job_id: Uuid) -> Result<JobResults, ServiceError> {
        let job = self.store.get_job(job_id).await?;
        let runs = self.store.get_runs_for_job(job_id).await?;
        let ranked = Analyzer::new(job.analysis.clone()).rank(&runs);
        Ok(JobResults { job, ranked })
    }

    /// Validates and persists a walk-forward job, then runs it in the
    /// background.
    ///
    /// Beyond space validation, probes the market data provider for the
    /// requested series before accepting the job, so an unavailable symbol
    /// is rejected up front instead of failing every window.
    ///
    /// # Errors
    /// Returns `ServiceError::Space` for an invalid or oversized parameter
    /// space and `ServiceError::DataUnavailable` when the probe fails or
    /// returns an empty series.
    #[allow(clippy::too_many_arguments)]
    pub async fn submit_wfo(
        &self,
        strategy_id: impl Into<String>,
        symbol: impl Into<String>,
        interval: impl Into<String>,
        range: DateRange,
        in_sample_days: i64,
        out_of_sample_days: i64,
        parameter_space: ParameterSpace,
        analysis: AnalysisConfig,
    ) -> Result<Uuid, ServiceError> {
        self.check_space(&parameter_space)?;

        let symbol = symbol.into();
        let interval = interval.into();
        let candles = self
            .market_data
            .get_ohlc(&symbol, &interval, range)
            .await
            .map_err(|source| ServiceError::DataUnavailable {
                symbol: symbol.clone(),
                source,
            })?;
        if candles.is_empty() {
            return Err(ServiceError::DataUnavailable {
                symbol,
                source: ExecutionError::DataUnavailable,
            });
        }

        let job = WfoJob::new(
            strategy_id,
            symbol,
            interval,
            range,
            in_sample_days,
            out_of_sample_days,
        );
        self.store.create_wfo_job(&job).await?;
        let wfo_job_id = job.wfo_job_id;
        info!("Accepted WFO job {wfo_job_id} for {}", job.symbol);

        let cancel = CancelFlag::new();
        self.active.write().await.insert(wfo_job_id, cancel.clone());

        let engine = WfoEngine::new(
            Arc::clone(&self.store),
            Arc::clone(&self.runner),
            self.config.optimizer.clone(),
        );
        let active = Arc::clone(&self.active);
        tokio::spawn(async move {
            if let Err(err) = engine.run(&job, &parameter_space, &analysis, &cancel).await {
                error!("WFO job {wfo_job_id} ended with error: {err}");
            }
            active.write().await.remove(&wfo_job_id);
        });

        Ok(wfo_job_id)
    }

    /// Reads a walk-forward job, its validation records in window order, and
    /// the composite stitched from their out-of-sample runs.
    ///
    /// # Errors
    /// Returns `ServiceError::Store` when the job is unknown or the store
    /// fails.
    pub async fn get_wfo_results(&self, wfo_job_id: Uuid) -> Result<WfoResults, ServiceError> {
        let job = self.store.get_wfo_job(wfo_job_id).await?;
        let runs = self.store.get_wfo_runs_for_job(wfo_job_id).await?;

        let mut oos_runs: Vec<BacktestRun> = Vec::with_capacity(runs.len());
        for run in &runs {
            oos_runs.push(self.store.get_run(run.oos_run_id).await?);
        }
        let composite = CompositeWfoReport::stitch(&oos_runs);

        Ok(WfoResults {
            job,
            runs,
            composite,
        })
    }

    /// Trips the cancel flag of an in-flight job.
    ///
    /// Returns whether a running job was found; cancelling an unknown or
    /// already-terminal job is a no-op. The job still drains its in-flight
    /// backtests before its status turns terminal.
    pub async fn cancel_job(&self, job_id: Uuid) -> bool {
        match self.active.read().await.get(&job_id) {
            Some(flag) => {
                flag.cancel();
                info!("Cancellation requested for job {job_id}");
                true
            }
            None => false,
        }
    }

    fn check_space(&self, parameter_space: &ParameterSpace) -> Result<(), ServiceError> {
        let size = space_size(parameter_space)?;
        let cap = self.config.optimizer.max_combinations;
        if size > cap {
            return Err(InvalidParameterSpace::TooManyCombinations { size, cap }.into());
        }
        Ok(())
    }
}
