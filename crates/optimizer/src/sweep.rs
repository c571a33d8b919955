//! Runs an enumerated parameter sweep under bounded concurrency.
//!
//! Every assignment gets a terminal outcome: a persisted successful run or a
//! persisted failure record. A single failing assignment never aborts the
//! sweep; the job only fails when every assignment failed or the sweep was
//! cancelled. The job's status flips exactly once, after the last
//! outstanding unit of work has joined.

use crate::analyzer::{Analyzer, RankedReport};
use crate::enumerator::enumerate;
use crate::error::SweepError;
use quant_forge_core::{
    BacktestRun, BacktestRunner, ExecutionError, JobStatus, OptimizationJob, OptimizerSettings,
    RunStatus,
};
use quant_forge_data::{Store, StoreError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Cooperative cancellation handle for a sweep or walk-forward job.
///
/// Tripping the flag stops new work from being dispatched; in-flight
/// backtests are allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct SweepScheduler {
    store: Arc<dyn Store>,
    runner: Arc<dyn BacktestRunner>,
    settings: OptimizerSettings,
}

impl SweepScheduler {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        runner: Arc<dyn BacktestRunner>,
        settings: OptimizerSettings,
    ) -> Self {
        Self {
            store,
            runner,
            settings,
        }
    }

    /// Runs the full sweep for one job and returns its ranked successes.
    ///
    /// Outcomes are persisted incrementally as assignments complete, so
    /// partial progress survives a crash. The returned ranking covers only
    /// successful runs that pass the job's filters.
    ///
    /// # Errors
    /// Returns `SweepError` for an invalid parameter space (before any work
    /// starts) or when persistence fails; per-assignment execution errors
    /// are recorded, not returned.
    pub async fn run_sweep(
        &self,
        job: &OptimizationJob,
        cancel: &CancelFlag,
    ) -> Result<Vec<RankedReport>, SweepError> {
        let assignments = match enumerate(&job.parameter_space, self.settings.max_combinations) {
            Ok(iter) => iter,
            Err(err) => {
                self.store
                    .update_job_status(job.job_id, JobStatus::Failed)
                    .await?;
                return Err(err.into());
            }
        };

        let semaphore = Arc::new(Semaphore::new(self.settings.worker_pool_size.max(1)));
        let timeout = Duration::from_secs(self.settings.backtest_timeout_secs);
        let mut join_set: JoinSet<Result<BacktestRun, StoreError>> = JoinSet::new();

        let mut dispatched: usize = 0;
        let mut cancelled = false;
        for assignment in assignments {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| SweepError::Task(e.to_string()))?;
            let store = Arc::clone(&self.store);
            let runner = Arc::clone(&self.runner);
            let job_id = job.job_id;
            let strategy_id = job.strategy_id.clone();
            let symbol = job.symbol.clone();
            let interval = job.interval.clone();
            let range = job.range;

            join_set.spawn(async move {
                let _permit = permit;
                let result = match tokio::time::timeout(
                    timeout,
                    runner.run(&strategy_id, &symbol, &interval, range, &assignment),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(ExecutionError::Timeout),
                };

                let run = match result {
                    Ok(outcome) => BacktestRun::completed(
                        job_id,
                        assignment,
                        outcome.report,
                        outcome.trades,
                        outcome.equity_curve,
                    ),
                    Err(err) => {
                        warn!("Backtest for job {} failed: {}", job_id, err);
                        BacktestRun::failed(job_id, assignment, err.to_string())
                    }
                };

                store.create_run(&run).await?;
                Ok(run)
            });
            dispatched += 1;
        }

        let mut successes = Vec::new();
        let mut failures: usize = 0;
        let mut first_store_error: Option<SweepError> = None;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(run)) => {
                    if run.status == RunStatus::Completed {
                        successes.push(run);
                    } else {
                        failures += 1;
                    }
                }
                Ok(Err(store_err)) => {
                    if first_store_error.is_none() {
                        first_store_error = Some(store_err.into());
                    }
                }
                Err(join_err) => {
                    if first_store_error.is_none() {
                        first_store_error = Some(SweepError::Task(join_err.to_string()));
                    }
                }
            }
        }

        let status = if cancelled || successes.is_empty() || first_store_error.is_some() {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        };
        self.store.update_job_status(job.job_id, status).await?;

        if let Some(err) = first_store_error {
            return Err(err);
        }

        info!(
            "Sweep for job {} finished: {} dispatched, {} succeeded, {} failed{}",
            job.job_id,
            dispatched,
            successes.len(),
            failures,
            if cancelled { " (cancelled)" } else { "" }
        );

        Ok(Analyzer::new(job.analysis.clone()).rank(&successes))
    }
}
