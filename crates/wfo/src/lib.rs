//! Walk-forward optimization engine.
//!
//! Partitions a historical range into in-sample/out-of-sample windows, runs
//! a full parameter sweep per in-sample range, validates each window's
//! winning assignment with a single out-of-sample backtest, and records the
//! sequence of validations. Windows run strictly in order; the sweep inside
//! a window is parallel.

pub mod composite;
pub mod error;
pub mod windows;

pub use composite::CompositeWfoReport;
pub use error::WfoError;
pub use windows::{partition, WalkWindow};

use quant_forge_core::{
    AnalysisConfig, BacktestRun, BacktestRunner, ExecutionError, JobStatus, OptimizationJob,
    OptimizerSettings, ParameterSpace, WfoJob, WfoRun,
};
use quant_forge_data::Store;
use quant_forge_optimizer::{CancelFlag, SweepScheduler};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

pub struct WfoEngine {
    store: Arc<dyn Store>,
    runner: Arc<dyn BacktestRunner>,
    settings: OptimizerSettings,
}

impl WfoEngine {
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

    /// Runs the whole walk-forward job to a terminal status.
    ///
    /// A failure in window `k` marks the job `Failed` with that window
    /// recorded; windows `0..k` keep their completed `WfoRun`s. Out-of-sample
    /// data of any window never reaches the optimization of that window or a
    /// later one, because windows are partitioned forward-only before any
    /// backtest runs.
    ///
    /// # Errors
    /// Returns the failure that terminated the job: invalid windowing, an
    /// unviable or failed window, cancellation, or a persistence fault.
    pub async fn run(
        &self,
        job: &WfoJob,
        parameter_space: &ParameterSpace,
        analysis: &AnalysisConfig,
        cancel: &CancelFlag,
    ) -> Result<(), WfoError> {
        let windows = match partition(job.range, job.in_sample_days, job.out_of_sample_days) {
            Ok(windows) => windows,
            Err(err) => {
                self.store
                    .update_wfo_job_status(job.wfo_job_id, JobStatus::Failed, None)
                    .await?;
                return Err(err);
            }
        };

        info!(
            "Starting WFO job {} with {} windows over {} -> {}",
            job.wfo_job_id,
            windows.len(),
            job.range.start,
            job.range.end
        );

        for (index, window) in windows.iter().enumerate() {
            let index = index as u32;
            if let Err(err) = self
                .execute_walk(job, window, index, parameter_space, analysis, cancel)
                .await
            {
                error!("WFO job {} failed at window {index}: {err}", job.wfo_job_id);
                self.store
                    .update_wfo_job_status(job.wfo_job_id, JobStatus::Failed, Some(index))
                    .await?;
                return Err(err);
            }
        }

        self.store
            .update_wfo_job_status(job.wfo_job_id, JobStatus::Completed, None)
            .await?;
        info!("WFO job {} completed", job.wfo_job_id);
        Ok(())
    }

    /// One walk: in-sample sweep, best-parameter selection, out-of-sample
    /// validation, and the linking record.
    async fn execute_walk(
        &self,
        job: &WfoJob,
        window: &WalkWindow,
        index: u32,
        parameter_space: &ParameterSpace,
        analysis: &AnalysisConfig,
        cancel: &CancelFlag,
    ) -> Result<(), WfoError> {
        if cancel.is_cancelled() {
            return Err(WfoError::Cancelled { window: index });
        }

        info!(
            "WFO job {} window {index}: in-sample {} -> {}, out-of-sample {} -> {}",
            job.wfo_job_id, window.is_start, window.is_end, window.oos_start, window.oos_end
        );

        let is_job = OptimizationJob::new(
            job.strategy_id.clone(),
            job.symbol.clone(),
            job.interval.clone(),
            window.in_sample(),
            parameter_space.clone(),
            analysis.clone(),
        );
        self.store.create_job(&is_job).await?;

        let scheduler = SweepScheduler::new(
            Arc::clone(&self.store),
            Arc::clone(&self.runner),
            self.settings.clone(),
        );
        let ranked = scheduler.run_sweep(&is_job, cancel).await?;
        let best = ranked
            .first()
            .ok_or(WfoError::NoViableParameters { window: index })?;
        let winning = best.parameters.clone();
        info!(
            "WFO job {} window {index}: selected run {} with score {}",
            job.wfo_job_id, best.run_id, best.score
        );

        // The single validation backtest has no redundancy; any failure,
        // including a timeout, aborts the job.
        let timeout = Duration::from_secs(self.settings.backtest_timeout_secs);
        let outcome = match tokio::time::timeout(
            timeout,
            self.runner.run(
                &job.strategy_id,
                &job.symbol,
                &job.interval,
                window.out_of_sample(),
                &winning,
            ),
        )
        .await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(source)) => return Err(WfoError::OosExecution { window: index, source }),
            Err(_) => {
                return Err(WfoError::OosExecution {
                    window: index,
                    source: ExecutionError::Timeout,
                })
            }
        };

        let oos_run = BacktestRun::completed(
            is_job.job_id,
            winning.clone(),
            outcome.report,
            outcome.trades,
            outcome.equity_curve,
        );
        self.store.create_run(&oos_run).await?;

        self.store
            .create_wfo_run(&WfoRun {
                wfo_run_id: Uuid::new_v4(),
                wfo_job_id: job.wfo_job_id,
                oos_run_id: oos_run.run_id,
                winning_parameters: winning,
                oos_start: window.oos_start,
                oos_end: window.oos_end,
            })
            .await?;

        Ok(())
    }
}
