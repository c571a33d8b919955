use crate::error::StoreError;
use crate::store::Store;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quant_forge_core::{
    AnalysisConfig, BacktestRun, DateRange, EquityPoint, JobStatus, OptimizationJob,
    ParameterAssignment, ParameterSpace, PerformanceReport, Trade, WfoJob, WfoRun,
};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL-backed [`Store`].
///
/// Parameter payloads and report summaries are stored as JSONB; trades and
/// equity curves get their own rows so run details can be paged without
/// deserializing whole blobs. `wfo_runs` rows cascade away with either of
/// their parents.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects to the given database.
    ///
    /// # Errors
    /// Returns an error if the connection cannot be established.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled schema. Idempotent.
    ///
    /// # Errors
    /// Returns an error if any DDL statement fails.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        let schema = include_str!("../migrations/001_init.sql");
        for statement in schema.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("Applied quant-forge schema migrations");
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    job_id: Uuid,
    strategy_id: String,
    symbol: String,
    interval: String,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    parameter_space: JsonValue,
    analysis: JsonValue,
    job_status: String,
    created_at: DateTime<Utc>,
}

impl JobRow {
    fn into_job(self) -> Result<OptimizationJob, StoreError> {
        Ok(OptimizationJob {
            job_id: self.job_id,
            strategy_id: self.strategy_id,
            symbol: self.symbol,
            interval: self.interval,
            range: DateRange::new(self.range_start, self.range_end),
            parameter_space: serde_json::from_value::<ParameterSpace>(self.parameter_space)?,
            analysis: serde_json::from_value::<AnalysisConfig>(self.analysis)?,
            status: self.job_status.parse().map_err(StoreError::Corrupt)?,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RunRow {
    run_id: Uuid,
    job_id: Uuid,
    parameters: JsonValue,
    run_status: String,
    error: Option<String>,
    report: Option<JsonValue>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct TradeRow {
    trade_id: Uuid,
    symbol: String,
    entry_price: Decimal,
    entry_qty: Decimal,
    entry_timestamp: DateTime<Utc>,
    exit_price: Decimal,
    exit_qty: Decimal,
    exit_timestamp: DateTime<Utc>,
    pnl: Decimal,
}

#[derive(sqlx::FromRow)]
struct EquityRow {
    timestamp: DateTime<Utc>,
    equity: Decimal,
}

#[derive(sqlx::FromRow)]
struct WfoJobRow {
    wfo_job_id: Uuid,
    strategy_id: String,
    symbol: String,
    interval: String,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    in_sample_days: i64,
    out_of_sample_days: i64,
    wfo_status: String,
    failed_window: Option<i32>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct WfoRunRow {
    wfo_run_id: Uuid,
    wfo_job_id: Uuid,
    oos_run_id: Uuid,
    winning_parameters: JsonValue,
    oos_start: DateTime<Utc>,
    oos_end: DateTime<Utc>,
}

impl PgStore {
    async fn hydrate_run(&self, row: RunRow) -> Result<BacktestRun, StoreError> {
        let trades = sqlx::query_as::<_, TradeRow>(
            r"
            SELECT trade_id, symbol, entry_price, entry_qty, entry_timestamp,
                   exit_price, exit_qty, exit_timestamp, pnl
            FROM trades
            WHERE run_id = $1
            ORDER BY entry_timestamp ASC
            ",
        )
        .bind(row.run_id)
        .fetch_all(&self.pool)
        .await?;

        let equity = sqlx::query_as::<_, EquityRow>(
            r"
            SELECT timestamp, equity
            FROM equity_curves
            WHERE run_id = $1
            ORDER BY timestamp ASC
            ",
        )
        .bind(row.run_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(BacktestRun {
            run_id: row.run_id,
            job_id: row.job_id,
            parameters: serde_json::from_value::<ParameterAssignment>(row.parameters)?,
            status: row.run_status.parse().map_err(StoreError::Corrupt)?,
            error: row.error,
            report: row
                .report
                .map(serde_json::from_value::<PerformanceReport>)
                .transpose()?,
            trades: trades
                .into_iter()
                .map(|t| Trade {
                    trade_id: t.trade_id,
                    symbol: t.symbol,
                    entry_price: t.entry_price,
                    entry_qty: t.entry_qty,
                    entry_timestamp: t.entry_timestamp,
                    exit_price: t.exit_price,
                    exit_qty: t.exit_qty,
                    exit_timestamp: t.exit_timestamp,
                    pnl: t.pnl,
                })
                .collect(),
            equity_curve: equity
                .into_iter()
                .map(|e| EquityPoint {
                    timestamp: e.timestamp,
                    equity: e.equity,
                })
                .collect(),
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_job(&self, job: &OptimizationJob) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO optimization_jobs
            (job_id, strategy_id, symbol, interval, range_start, range_end,
             parameter_space, analysis, job_status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(job.job_id)
        .bind(&job.strategy_id)
        .bind(&job.symbol)
        .bind(&job.interval)
        .bind(job.range.start)
        .bind(job.range.end)
        .bind(serde_json::to_value(&job.parameter_space)?)
        .bind(serde_json::to_value(&job.analysis)?)
        .bind(job.status.as_str())
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_job(&self, job_id: Uuid) -> Result<OptimizationJob, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(
            r"
            SELECT job_id, strategy_id, symbol, interval, range_start, range_end,
                   parameter_space, analysis, job_status, created_at
            FROM optimization_jobs
            WHERE job_id = $1
            ",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        row.into_job()
    }

    async fn update_job_status(&self, job_id: Uuid, status: JobStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE optimization_jobs SET job_status = $1 WHERE job_id = $2")
            .bind(status.as_str())
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn create_run(&self, run: &BacktestRun) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO backtest_runs
            (run_id, job_id, parameters, run_status, error, report, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(run.run_id)
        .bind(run.job_id)
        .bind(serde_json::to_value(&run.parameters)?)
        .bind(run.status.as_str())
        .bind(run.error.as_deref())
        .bind(run.report.as_ref().map(serde_json::to_value).transpose()?)
        .bind(run.created_at)
        .execute(&mut *tx)
        .await?;

        for trade in &run.trades {
            sqlx::query(
                r"
                INSERT INTO trades
                (trade_id, run_id, symbol, entry_price, entry_qty, entry_timestamp,
                 exit_price, exit_qty, exit_timestamp, pnl)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ",
            )
            .bind(trade.trade_id)
            .bind(run.run_id)
            .bind(&trade.symbol)
            .bind(trade.entry_price)
            .bind(trade.entry_qty)
            .bind(trade.entry_timestamp)
            .bind(trade.exit_price)
            .bind(trade.exit_qty)
            .bind(trade.exit_timestamp)
            .bind(trade.pnl)
            .execute(&mut *tx)
            .await?;
        }

        for point in &run.equity_curve {
            sqlx::query("INSERT INTO equity_curves (run_id, timestamp, equity) VALUES ($1, $2, $3)")
                .bind(run.run_id)
                .bind(point.timestamp)
                .bind(point.equity)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_run(&self, run_id: Uuid) -> Result<BacktestRun, StoreError> {
        let row = sqlx::query_as::<_, RunRow>(
            r"
            SELECT run_id, job_id, parameters, run_status, error, report, created_at
            FROM backtest_runs
            WHERE run_id = $1
            ",
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        self.hydrate_run(row).await
    }

    async fn get_runs_for_job(&self, job_id: Uuid) -> Result<Vec<BacktestRun>, StoreError> {
        let rows = sqlx::query_as::<_, RunRow>(
            r"
            SELECT run_id, job_id, parameters, run_status, error, report, created_at
            FROM backtest_runs
            WHERE job_id = $1
            ORDER BY created_at ASC
            ",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        let mut runs = Vec::with_capacity(rows.len());
        for row in rows {
            runs.push(self.hydrate_run(row).await?);
        }
        Ok(runs)
    }

    async fn delete_run(&self, run_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM backtest_runs WHERE run_id = $1")
            .bind(run_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn create_wfo_job(&self, job: &WfoJob) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO wfo_jobs
            (wfo_job_id, strategy_id, symbol, interval, range_start, range_end,
             in_sample_days, out_of_sample_days, wfo_status, failed_window, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(job.wfo_job_id)
        .bind(&job.strategy_id)
        .bind(&job.symbol)
        .bind(&job.interval)
        .bind(job.range.start)
        .bind(job.range.end)
        .bind(job.in_sample_days)
        .bind(job.out_of_sample_days)
        .bind(job.status.as_str())
        .bind(job.failed_window.map(|w| i32::try_from(w).unwrap_or(i32::MAX)))
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_wfo_job(&self, wfo_job_id: Uuid) -> Result<WfoJob, StoreError> {
        let row = sqlx::query_as::<_, WfoJobRow>(
            r"
            SELECT wfo_job_id, strategy_id, symbol, interval, range_start, range_end,
                   in_sample_days, out_of_sample_days, wfo_status, failed_window, created_at
            FROM wfo_jobs
            WHERE wfo_job_id = $1
            ",
        )
        .bind(wfo_job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(WfoJob {
            wfo_job_id: row.wfo_job_id,
            strategy_id: row.strategy_id,
            symbol: row.symbol,
            interval: row.interval,
            range: DateRange::new(row.range_start, row.range_end),
            in_sample_days: row.in_sample_days,
            out_of_sample_days: row.out_of_sample_days,
            status: row.wfo_status.parse().map_err(StoreError::Corrupt)?,
            failed_window: row.failed_window.and_then(|w| u32::try_from(w).ok()),
            created_at: row.created_at,
        })
    }

    async fn update_wfo_job_status(
        &self,
        wfo_job_id: Uuid,
        status: JobStatus,
        failed_window: Option<u32>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE wfo_jobs SET wfo_status = $1, failed_window = $2 WHERE wfo_job_id = $3",
        )
        .bind(status.as_str())
        .bind(failed_window.map(|w| i32::try_from(w).unwrap_or(i32::MAX)))
        .bind(wfo_job_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_wfo_job(&self, wfo_job_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM wfo_jobs WHERE wfo_job_id = $1")
            .bind(wfo_job_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn create_wfo_run(&self, run: &WfoRun) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO wfo_runs
            (wfo_run_id, wfo_job_id, oos_run_id, winning_parameters, oos_start, oos_end)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(run.wfo_run_id)
        .bind(run.wfo_job_id)
        .bind(run.oos_run_id)
        .bind(serde_json::to_value(&run.winning_parameters)?)
        .bind(run.oos_start)
        .bind(run.oos_end)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_wfo_runs_for_job(&self, wfo_job_id: Uuid) -> Result<Vec<WfoRun>, StoreError> {
        let rows = sqlx::query_as::<_, WfoRunRow>(
            r"
            SELECT wfo_run_id, wfo_job_id, oos_run_id, winning_parameters, oos_start, oos_end
            FROM wfo_runs
            WHERE wfo_job_id = $1
            ORDER BY oos_start ASC
            ",
        )
        .bind(wfo_job_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(WfoRun {
                    wfo_run_id: row.wfo_run_id,
                    wfo_job_id: row.wfo_job_id,
                    oos_run_id: row.oos_run_id,
                    winning_parameters: serde_json::from_value::<ParameterAssignment>(
                        row.winning_parameters,
                    )?,
                    oos_start: row.oos_start,
                    oos_end: row.oos_end,
                })
            })
            .collect()
    }
}
