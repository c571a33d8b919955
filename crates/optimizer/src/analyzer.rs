//! Filters, scores, and ranks the performance reports of one job.
//!
//! Scoring normalizes each metric min-max across the current batch, so
//! scores are comparable only within the same job, never across jobs.

use chrono::{DateTime, Utc};
use quant_forge_core::{
    AnalysisConfig, BacktestRun, ParameterAssignment, PerformanceReport, RunStatus,
};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// A performance report annotated with the assignment that produced it and
/// its composite score.
#[derive(Debug, Clone, Serialize)]
pub struct RankedReport {
    pub run_id: Uuid,
    pub parameters: ParameterAssignment,
    pub score: Decimal,
    pub report: PerformanceReport,
    pub created_at: DateTime<Utc>,
}

/// Min and max observed for one metric across the batch.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min: Decimal,
    max: Decimal,
}

impl Bounds {
    fn over<F>(reports: &[&PerformanceReport], accessor: F) -> Self
    where
        F: Fn(&PerformanceReport) -> Option<Decimal>,
    {
        reports
            .iter()
            .filter_map(|r| accessor(r))
            .fold(
                Self {
                    min: Decimal::MAX,
                    max: Decimal::MIN,
                },
                |b, v| Self {
                    min: b.min.min(v),
                    max: b.max.max(v),
                },
            )
    }

    /// Scales a value to `[0, 1]`. A degenerate batch where every report
    /// shares the same value normalizes to one so the metric still
    /// contributes its full weighted term.
    fn normalize(&self, value: Decimal) -> Decimal {
        if self.min >= self.max {
            return Decimal::ONE;
        }
        (value - self.min) / (self.max - self.min)
    }
}

/// The scoring and filtering engine.
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    #[must_use]
    pub const fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Filters, scores, and ranks the given runs.
    ///
    /// Failed runs and runs whose report misses a hard threshold are left
    /// out of the ranking; their stored rows are untouched. The result is
    /// ordered by score descending, ties broken by lower max drawdown, then
    /// by earlier run creation. Fixed-precision decimal arithmetic makes the
    /// scores reproducible bit-for-bit for a given batch and weights.
    #[must_use]
    pub fn rank(&self, runs: &[BacktestRun]) -> Vec<RankedReport> {
        let candidates: Vec<&BacktestRun> = runs
            .iter()
            .filter(|r| r.status == RunStatus::Completed)
            .filter(|r| r.report.as_ref().is_some_and(|rep| self.passes_filters(rep)))
            .collect();

        let reports: Vec<&PerformanceReport> = candidates
            .iter()
            .filter_map(|r| r.report.as_ref())
            .collect();

        let pf_bounds = Bounds::over(&reports, |r| r.profit_factor);
        let calmar_bounds = Bounds::over(&reports, |r| r.calmar_ratio);
        let payoff_bounds = Bounds::over(&reports, |r| r.payoff_ratio);

        let weights = &self.config.weights;
        let mut ranked: Vec<RankedReport> = candidates
            .into_iter()
            .filter_map(|run| {
                let report = run.report.as_ref()?;
                // An undefined metric contributes zero to its term.
                let score = report
                    .profit_factor
                    .map_or(Decimal::ZERO, |v| {
                        pf_bounds.normalize(v) * weights.profit_factor
                    })
                    + report.calmar_ratio.map_or(Decimal::ZERO, |v| {
                        calmar_bounds.normalize(v) * weights.calmar_ratio
                    })
                    + report.payoff_ratio.map_or(Decimal::ZERO, |v| {
                        payoff_bounds.normalize(v) * weights.avg_win_loss_ratio
                    });

                Some(RankedReport {
                    run_id: run.run_id,
                    parameters: run.parameters.clone(),
                    score,
                    report: report.clone(),
                    created_at: run.created_at,
                })
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.report.max_drawdown_pct.cmp(&b.report.max_drawdown_pct))
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        ranked
    }

    fn passes_filters(&self, report: &PerformanceReport) -> bool {
        let filters = &self.config.filters;
        report.total_trades >= filters.min_total_trades
            && report.max_drawdown_pct <= filters.max_drawdown_pct
    }
}
