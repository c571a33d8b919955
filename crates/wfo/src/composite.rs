//! Stitches a sequence of out-of-sample backtests into one continuous
//! performance view.
//!
//! Each out-of-sample segment was simulated from the same initial capital,
//! so segments after the first are re-based: every equity point is scaled so
//! the segment opens at exactly the equity the previous segment closed with.
//! Drawdown and return figures are then recomputed over the stitched curve,
//! since per-segment figures cannot simply be summed.

use chrono::{DateTime, Utc};
use quant_forge_core::{BacktestRun, EquityPoint, Trade};
use rust_decimal::Decimal;
use serde::Serialize;

/// Aggregate walk-forward performance, derived on read.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeWfoReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub initial_equity: Decimal,
    pub final_equity: Decimal,
    pub total_net_profit: Decimal,
    pub total_return_pct: Decimal,
    pub max_drawdown: Decimal,
    pub max_drawdown_pct: Decimal,
    pub total_trades: u32,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
}

impl CompositeWfoReport {
    /// Builds the composite from out-of-sample runs in window order.
    ///
    /// Runs without equity points contribute nothing to the curve. Returns
    /// `None` when no run carries any equity data, since there is nothing
    /// to stitch.
    #[must_use]
    pub fn stitch(oos_runs: &[BacktestRun]) -> Option<Self> {
        let mut curve: Vec<EquityPoint> = Vec::new();
        let mut trades: Vec<Trade> = Vec::new();

        for run in oos_runs {
            trades.extend(run.trades.iter().cloned());
            let segment = &run.equity_curve;
            let Some(first) = segment.first() else {
                continue;
            };

            // Scale so this segment opens where the previous one closed. A
            // segment opening at zero equity cannot be re-based by ratio and
            // is appended as-is.
            let factor = match curve.last() {
                Some(prev) if !first.equity.is_zero() => prev.equity / first.equity,
                _ => Decimal::ONE,
            };
            curve.extend(segment.iter().map(|p| EquityPoint {
                timestamp: p.timestamp,
                equity: p.equity * factor,
            }));
        }

        let first = curve.first()?;
        let last = curve.last()?;
        let initial_equity = first.equity;
        let final_equity = last.equity;
        let start = first.timestamp;
        let end = last.timestamp;

        let mut peak = Decimal::MIN;
        let mut max_drawdown = Decimal::ZERO;
        let mut max_drawdown_pct = Decimal::ZERO;
        for point in &curve {
            peak = peak.max(point.equity);
            let drawdown = peak - point.equity;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
            if !peak.is_zero() {
                let pct = drawdown / peak * Decimal::ONE_HUNDRED;
                if pct > max_drawdown_pct {
                    max_drawdown_pct = pct;
                }
            }
        }

        let total_net_profit = final_equity - initial_equity;
        let total_return_pct = if initial_equity.is_zero() {
            Decimal::ZERO
        } else {
            total_net_profit / initial_equity * Decimal::ONE_HUNDRED
        };

        Some(Self {
            start,
            end,
            initial_equity,
            final_equity,
            total_net_profit,
            total_return_pct,
            max_drawdown,
            max_drawdown_pct,
            total_trades: trades.len() as u32,
            equity_curve: curve,
            trades,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use quant_forge_core::{ParameterAssignment, PerformanceReport};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn oos_run(day_offset: i64, equities: &[Decimal]) -> BacktestRun {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let curve = equities
            .iter()
            .enumerate()
            .map(|(i, equity)| EquityPoint {
                timestamp: base + Duration::days(day_offset + i as i64),
                equity: *equity,
            })
            .collect();
        BacktestRun::completed(
            Uuid::new_v4(),
            ParameterAssignment::new(),
            PerformanceReport::new(),
            Vec::new(),
            curve,
        )
    }

    #[test]
    fn stitched_curve_is_continuous_across_segments() {
        // Both segments start from the same simulated capital of 1000.
        let first = oos_run(0, &[dec!(1000), dec!(1100), dec!(1200)]);
        let second = oos_run(3, &[dec!(1000), dec!(1050)]);

        let composite = CompositeWfoReport::stitch(&[first, second]).unwrap();

        // The second segment opens at exactly 1200, scaled by 1200/1000.
        assert_eq!(composite.equity_curve[2].equity, dec!(1200));
        assert_eq!(composite.equity_curve[3].equity, dec!(1200));
        assert_eq!(composite.final_equity, dec!(1260.0));
    }

    #[test]
    fn return_is_recomputed_over_the_whole_stitched_curve() {
        let first = oos_run(0, &[dec!(1000), dec!(1100)]);
        let second = oos_run(2, &[dec!(1000), dec!(1100)]);

        let composite = CompositeWfoReport::stitch(&[first, second]).unwrap();

        // Two +10% segments compound to +21%.
        assert_eq!(composite.initial_equity, dec!(1000));
        assert_eq!(composite.final_equity, dec!(1210.0));
        assert_eq!(composite.total_return_pct, dec!(21.0));
    }

    #[test]
    fn drawdown_spans_segment_boundaries() {
        // Peak inside segment one, trough inside segment two.
        let first = oos_run(0, &[dec!(1000), dec!(2000), dec!(1500)]);
        let second = oos_run(3, &[dec!(1000), dec!(800)]);

        let composite = CompositeWfoReport::stitch(&[first, second]).unwrap();

        // Segment two re-bases at 1500, so its trough sits at 1200;
        // drawdown from the 2000 peak is 800, i.e. 40%.
        assert_eq!(composite.max_drawdown, dec!(800));
        assert_eq!(composite.max_drawdown_pct, dec!(40));
    }

    #[test]
    fn runs_without_equity_points_are_skipped() {
        let empty = oos_run(0, &[]);
        let only = oos_run(1, &[dec!(1000), dec!(1010)]);

        let composite = CompositeWfoReport::stitch(&[empty, only]).unwrap();
        assert_eq!(composite.equity_curve.len(), 2);
        assert_eq!(composite.total_net_profit, dec!(10));
    }

    #[test]
    fn no_equity_data_at_all_yields_none() {
        assert!(CompositeWfoReport::stitch(&[]).is_none());
        assert!(CompositeWfoReport::stitch(&[oos_run(0, &[])]).is_none());
    }
}
