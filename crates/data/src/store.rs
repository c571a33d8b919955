use crate::error::StoreError;
use async_trait::async_trait;
use quant_forge_core::{BacktestRun, JobStatus, OptimizationJob, WfoJob, WfoRun};
use uuid::Uuid;

/// Create/read access to the persisted optimization entities.
///
/// Implementations must support concurrent appends of runs from parallel
/// sweep workers without a global lock; rows are independent, keyed by
/// generated unique ids.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_job(&self, job: &OptimizationJob) -> Result<(), StoreError>;
    async fn get_job(&self, job_id: Uuid) -> Result<OptimizationJob, StoreError>;
    async fn update_job_status(&self, job_id: Uuid, status: JobStatus) -> Result<(), StoreError>;

    async fn create_run(&self, run: &BacktestRun) -> Result<(), StoreError>;
    async fn get_run(&self, run_id: Uuid) -> Result<BacktestRun, StoreError>;
    /// Returns every run recorded for a job, successes and failures alike,
    /// in creation order.
    async fn get_runs_for_job(&self, job_id: Uuid) -> Result<Vec<BacktestRun>, StoreError>;
    /// Deletes a run; any `WfoRun` referencing it goes with it.
    async fn delete_run(&self, run_id: Uuid) -> Result<(), StoreError>;

    async fn create_wfo_job(&self, job: &WfoJob) -> Result<(), StoreError>;
    async fn get_wfo_job(&self, wfo_job_id: Uuid) -> Result<WfoJob, StoreError>;
    async fn update_wfo_job_status(
        &self,
        wfo_job_id: Uuid,
        status: JobStatus,
        failed_window: Option<u32>,
    ) -> Result<(), StoreError>;
    /// Deletes a WFO job and, in cascade, its `WfoRun`s.
    async fn delete_wfo_job(&self, wfo_job_id: Uuid) -> Result<(), StoreError>;

    async fn create_wfo_run(&self, run: &WfoRun) -> Result<(), StoreError>;
    /// Returns a job's `WfoRun`s ordered by out-of-sample start.
    async fn get_wfo_runs_for_job(&self, wfo_job_id: Uuid) -> Result<Vec<WfoRun>, StoreError>;
}
