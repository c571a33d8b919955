use crate::error::StoreError;
use crate::store::Store;
use async_trait::async_trait;
use quant_forge_core::{BacktestRun, JobStatus, OptimizationJob, WfoJob, WfoRun};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory store, used by tests and single-process runs without a database.
#[derive(Default)]
pub struct MemoryStore {
    jobs: RwLock<HashMap<Uuid, OptimizationJob>>,
    runs: RwLock<HashMap<Uuid, BacktestRun>>,
    wfo_jobs: RwLock<HashMap<Uuid, WfoJob>>,
    wfo_runs: RwLock<HashMap<Uuid, WfoRun>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_job(&self, job: &OptimizationJob) -> Result<(), StoreError> {
        self.jobs.write().await.insert(job.job_id, job.clone());
        Ok(())
    }

    async fn get_job(&self, job_id: Uuid) -> Result<OptimizationJob, StoreError> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_job_status(&self, job_id: Uuid, status: JobStatus) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(StoreError::NotFound)?;
        job.status = status;
        Ok(())
    }

    async fn create_run(&self, run: &BacktestRun) -> Result<(), StoreError> {
        self.runs.write().await.insert(run.run_id, run.clone());
        Ok(())
    }

    async fn get_run(&self, run_id: Uuid) -> Result<BacktestRun, StoreError> {
        self.runs
            .read()
            .await
            .get(&run_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_runs_for_job(&self, job_id: Uuid) -> Result<Vec<BacktestRun>, StoreError> {
        let mut runs: Vec<BacktestRun> = self
            .runs
            .read()
            .await
            .values()
            .filter(|r| r.job_id == job_id)
            .cloned()
            .collect();
        runs.sort_by_key(|r| r.created_at);
        Ok(runs)
    }

    async fn delete_run(&self, run_id: Uuid) -> Result<(), StoreError> {
        self.runs
            .write()
            .await
            .remove(&run_id)
            .ok_or(StoreError::NotFound)?;
        self.wfo_runs
            .write()
            .await
            .retain(|_, wr| wr.oos_run_id != run_id);
        Ok(())
    }

    async fn create_wfo_job(&self, job: &WfoJob) -> Result<(), StoreError> {
        self.wfo_jobs
            .write()
            .await
            .insert(job.wfo_job_id, job.clone());
        Ok(())
    }

    async fn get_wfo_job(&self, wfo_job_id: Uuid) -> Result<WfoJob, StoreError> {
        self.wfo_jobs
            .read()
            .await
            .get(&wfo_job_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_wfo_job_status(
        &self,
        wfo_job_id: Uuid,
        status: JobStatus,
        failed_window: Option<u32>,
    ) -> Result<(), StoreError> {
        let mut jobs = self.wfo_jobs.write().await;
        let job = jobs.get_mut(&wfo_job_id).ok_or(StoreError::NotFound)?;
        job.status = status;
        job.failed_window = failed_window;
        Ok(())
    }

    async fn delete_wfo_job(&self, wfo_job_id: Uuid) -> Result<(), StoreError> {
        self.wfo_jobs
            .write()
            .await
            .remove(&wfo_job_id)
            .ok_or(StoreError::NotFound)?;
        self.wfo_runs
            .write()
            .await
            .retain(|_, wr| wr.wfo_job_id != wfo_job_id);
        Ok(())
    }

    async fn create_wfo_run(&self, run: &WfoRun) -> Result<(), StoreError> {
        self.wfo_runs
            .write()
            .await
            .insert(run.wfo_run_id, run.clone());
        Ok(())
    }

    async fn get_wfo_runs_for_job(&self, wfo_job_id: Uuid) -> Result<Vec<WfoRun>, StoreError> {
        let mut runs: Vec<WfoRun> = self
            .wfo_runs
            .read()
            .await
            .values()
            .filter(|r| r.wfo_job_id == wfo_job_id)
            .cloned()
            .collect();
        runs.sort_by_key(|r| r.oos_start);
        Ok(runs)
    }
}
