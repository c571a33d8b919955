//! End-to-end coverage of the service facade against the in-memory store
//! and a deterministic backtest runner.

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use quant_forge_core::{
    AnalysisConfig, BacktestOutcome, BacktestRunner, Candle, DateRange, EquityPoint,
    ExecutionError, ForgeConfig, JobStatus, MarketDataProvider, ParamValue, ParameterAssignment,
    ParameterSpace, ParameterSpec, PerformanceReport,
};
use quant_forge_data::{MemoryStore, Store};
use quant_forge_orchestrator::{OptimizationService, ServiceError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

/// Runner whose profit factor tracks the `p` parameter; `fail_all` turns
/// every call into a simulation fault.
struct ScriptedRunner {
    fail_all: bool,
}

#[async_trait]
impl BacktestRunner for ScriptedRunner {
    async fn run(
        &self,
        _strategy_id: &str,
        _symbol: &str,
        _interval: &str,
        range: DateRange,
        parameters: &ParameterAssignment,
    ) -> Result<BacktestOutcome, ExecutionError> {
        if self.fail_all {
            return Err(ExecutionError::SimulationError("scripted fault".into()));
        }
        let p = match parameters.get("p") {
            Some(ParamValue::Int(v)) => *v,
            _ => return Err(ExecutionError::SimulationError("missing p".into())),
        };

        let report = PerformanceReport {
            profit_factor: Some(Decimal::from(p)),
            total_trades: 10,
            max_drawdown_pct: dec!(5),
            ..PerformanceReport::new()
        };
        let equity_curve = vec![
            EquityPoint {
                timestamp: range.start,
                equity: dec!(1000),
            },
            EquityPoint {
                timestamp: range.end,
                equity: dec!(1000) + Decimal::from(10 * p),
            },
        ];
        Ok(BacktestOutcome {
            report,
            trades: Vec::new(),
            equity_curve,
        })
    }
}

struct ScriptedMarketData {
    available: bool,
}

#[async_trait]
impl MarketDataProvider for ScriptedMarketData {
    async fn get_ohlc(
        &self,
        _symbol: &str,
        _interval: &str,
        range: DateRange,
    ) -> Result<Vec<Candle>, ExecutionError> {
        if !self.available {
            return Err(ExecutionError::DataUnavailable);
        }
        Ok(vec![Candle {
            open_time: range.start,
            open: dec!(100),
            high: dec!(101),
            low: dec!(99),
            close: dec!(100),
            volume: dec!(1),
        }])
    }
}

fn service(store: Arc<MemoryStore>, fail_all: bool) -> OptimizationService {
    OptimizationService::new(
        store,
        Arc::new(ScriptedRunner { fail_all }),
        Arc::new(ScriptedMarketData { available: true }),
        ForgeConfig::default(),
    )
}

fn six_month_range() -> DateRange {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    DateRange::new(start, start + Duration::days(180))
}

fn p_space(start: i64, end: i64) -> ParameterSpace {
    ParameterSpace::new().with(
        "p",
        ParameterSpec::RangeInt {
            start,
            end,
            step: 1,
        },
    )
}

async fn wait_for_job(store: &MemoryStore, job_id: Uuid) -> JobStatus {
    for _ in 0..500 {
        let status = store.get_job(job_id).await.unwrap().status;
        if status.is_terminal() {
            return status;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never reached a terminal status");
}

async fn wait_for_wfo_job(store: &MemoryStore, wfo_job_id: Uuid) -> JobStatus {
    for _ in 0..500 {
        let status = store.get_wfo_job(wfo_job_id).await.unwrap().status;
        if status.is_terminal() {
            return status;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("WFO job {wfo_job_id} never reached a terminal status");
}

#[tokio::test]
async fn three_point_sweep_returns_three_ranked_reports_in_score_order() {
    let store = Arc::new(MemoryStore::new());
    let service = service(Arc::clone(&store), false);

    let job_id = service
        .submit_optimization(
            "scripted",
            "BTCUSDT",
            "1h",
            six_month_range(),
            p_space(1, 3),
            AnalysisConfig::default(),
        )
        .await
        .unwrap();

    assert_eq!(wait_for_job(&store, job_id).await, JobStatus::Completed);

    let results = service.get_job_results(job_id).await.unwrap();
    assert_eq!(results.ranked.len(), 3);
    assert!(results.ranked.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(results.ranked[0].parameters["p"], ParamValue::Int(3));
}

#[tokio::test]
async fn job_where_every_assignment_fails_ends_failed_with_zero_ranked() {
    let store = Arc::new(MemoryStore::new());
    let service = service(Arc::clone(&store), true);

    let job_id = service
        .submit_optimization(
            "scripted",
            "BTCUSDT",
            "1h",
            six_month_range(),
            p_space(1, 3),
            AnalysisConfig::default(),
        )
        .await
        .unwrap();

    assert_eq!(wait_for_job(&store, job_id).await, JobStatus::Failed);

    let results = service.get_job_results(job_id).await.unwrap();
    assert!(results.ranked.is_empty());
    // The failures themselves are still on record.
    assert_eq!(store.get_runs_for_job(job_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn oversized_space_is_rejected_without_creating_a_job() {
    let store = Arc::new(MemoryStore::new());
    let mut config = ForgeConfig::default();
    config.optimizer.max_combinations = 2;
    let service = OptimizationService::new(
        Arc::clone(&store) as Arc<dyn Store>,
        Arc::new(ScriptedRunner { fail_all: false }),
        Arc::new(ScriptedMarketData { available: true }),
        config,
    );

    let err = service
        .submit_optimization(
            "scripted",
            "BTCUSDT",
            "1h",
            six_month_range(),
            p_space(1, 3),
            AnalysisConfig::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Space(_)));
}

#[tokio::test]
async fn twenty_month_wfo_yields_two_windows_and_a_continuous_composite() {
    let store = Arc::new(MemoryStore::new());
    let service = service(Arc::clone(&store), false);

    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    let range = DateRange::new(start, start + Duration::days(600));
    let wfo_job_id = service
        .submit_wfo(
            "scripted",
            "BTCUSDT",
            "1d",
            range,
            240,
            60,
            p_space(1, 3),
            AnalysisConfig::default(),
        )
        .await
        .unwrap();

    assert_eq!(
        wait_for_wfo_job(&store, wfo_job_id).await,
        JobStatus::Completed
    );

    let results = service.get_wfo_results(wfo_job_id).await.unwrap();
    assert_eq!(results.runs.len(), 2);
    // Out-of-sample ranges sit at days 240..300 and 540..600: ordered,
    // non-overlapping, separated by the second window's in-sample span.
    assert_eq!(results.runs[0].oos_start, start + Duration::days(240));
    assert_eq!(results.runs[0].oos_end, start + Duration::days(300));
    assert_eq!(results.runs[1].oos_start, start + Duration::days(540));
    assert_eq!(results.runs[1].oos_end, start + Duration::days(600));
    for run in &results.runs {
        assert_eq!(run.winning_parameters["p"], ParamValue::Int(3));
    }

    let composite = results.composite.unwrap();
    // Two points per out-of-sample segment, re-based into one curve with no
    // jump at the boundary.
    assert_eq!(composite.equity_curve.len(), 4);
    assert_eq!(
        composite.equity_curve[1].equity,
        composite.equity_curve[2].equity
    );
    assert!(composite.final_equity > composite.initial_equity);
}

#[tokio::test]
async fn wfo_submission_is_rejected_when_market_data_is_unavailable() {
    let store = Arc::new(MemoryStore::new());
    let service = OptimizationService::new(
        Arc::clone(&store) as Arc<dyn Store>,
        Arc::new(ScriptedRunner { fail_all: false }),
        Arc::new(ScriptedMarketData { available: false }),
        ForgeConfig::default(),
    );

    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    let range = DateRange::new(start, start + Duration::days(600));
    let err = service
        .submit_wfo(
            "scripted",
            "BTCUSDT",
            "1d",
            range,
            240,
            60,
            p_space(1, 3),
            AnalysisConfig::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::DataUnavailable { .. }));
}

#[tokio::test]
async fn cancelling_an_unknown_job_is_a_no_op() {
    let store = Arc::new(MemoryStore::new());
    let service = service(store, false);
    assert!(!service.cancel_job(Uuid::new_v4()).await);
}

#[tokio::test]
async fn repeated_reads_of_a_finished_job_return_identical_scores() {
    let store = Arc::new(MemoryStore::new());
    let service = service(Arc::clone(&store), false);

    let job_id = service
        .submit_optimization(
            "scripted",
            "BTCUSDT",
            "1h",
            six_month_range(),
            p_space(1, 5),
            AnalysisConfig::default(),
        )
        .await
        .unwrap();
    wait_for_job(&store, job_id).await;

    let first: Vec<Decimal> = service
        .get_job_results(job_id)
        .await
        .unwrap()
        .ranked
        .iter()
        .map(|r| r.score)
        .collect();
    let second: Vec<Decimal> = service
        .get_job_results(job_id)
        .await
        .unwrap()
        .ranked
        .iter()
        .map(|r| r.score)
        .collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 5);
}
