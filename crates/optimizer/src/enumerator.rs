//! Turns a declarative parameter space into the concrete sequence of
//! parameter assignments covering its full cartesian product.
//!
//! Enumeration is pure and restartable: re-enumerating the same space yields
//! an identical sequence. Axis order is declaration order; within an axis,
//! range values ascend and discrete values keep their declared order.

use itertools::Itertools;
use quant_forge_core::{
    InvalidParameterSpace, ParamValue, ParameterAssignment, ParameterSpace, ParameterSpec,
};
use rust_decimal::Decimal;

/// Expands one axis into its concrete value list.
///
/// Decimal range values are computed as `start + i * step` rather than by
/// repeated addition, so long ranges accumulate no drift.
///
/// # Errors
/// Returns `InvalidParameterSpace` if the axis yields no values, has a
/// non-positive step, or has `start > end`.
pub fn axis_values(
    name: &str,
    spec: &ParameterSpec,
) -> Result<Vec<ParamValue>, InvalidParameterSpace> {
    let values: Vec<ParamValue> = match spec {
        ParameterSpec::DiscreteInt(vals) => vals.iter().copied().map(ParamValue::Int).collect(),
        ParameterSpec::DiscreteDecimal(vals) => {
            vals.iter().copied().map(ParamValue::Number).collect()
        }
        ParameterSpec::DiscreteText(vals) => {
            vals.iter().cloned().map(ParamValue::Text).collect()
        }
        ParameterSpec::RangeInt { start, end, step } => {
            if *step <= 0 {
                return Err(InvalidParameterSpace::NonPositiveStep(name.to_string()));
            }
            if start > end {
                return Err(InvalidParameterSpace::InvertedRange(name.to_string()));
            }
            (0..)
                .map(|i| start + i * step)
                .take_while(|v| v <= end)
                .map(ParamValue::Int)
                .collect()
        }
        ParameterSpec::RangeDecimal { start, end, step } => {
            if step.is_sign_negative() || step.is_zero() {
                return Err(InvalidParameterSpace::NonPositiveStep(name.to_string()));
            }
            if start > end {
                return Err(InvalidParameterSpace::InvertedRange(name.to_string()));
            }
            let count = ((end - start) / step).floor() + Decimal::ONE;
            let count = u64::try_from(count)
                .map_err(|_| InvalidParameterSpace::InvertedRange(name.to_string()))?;
            (0..count)
                .map(|i| ParamValue::Number(start + Decimal::from(i) * step))
                .collect()
        }
    };

    if values.is_empty() {
        return Err(InvalidParameterSpace::EmptyAxis(name.to_string()));
    }
    Ok(values)
}

/// Exact cartesian product size of the space, without enumerating it.
///
/// # Errors
/// Returns `InvalidParameterSpace` if the space has no axes or any axis is
/// itself invalid.
pub fn space_size(space: &ParameterSpace) -> Result<u64, InvalidParameterSpace> {
    if space.is_empty() {
        return Err(InvalidParameterSpace::EmptySpace);
    }
    let mut size: u64 = 1;
    for (name, spec) in space.iter() {
        let axis = axis_values(name, spec)?;
        size = size.saturating_mul(axis.len() as u64);
    }
    Ok(size)
}

/// Lazily enumerates every assignment in the space's cartesian product.
///
/// # Errors
/// Returns `InvalidParameterSpace` if the space is invalid or its product
/// size exceeds `max_combinations` (the guard against accidental
/// combinatorial explosion; the default cap is configured in
/// `OptimizerSettings::max_combinations`).
pub fn enumerate(
    space: &ParameterSpace,
    max_combinations: u64,
) -> Result<impl Iterator<Item = ParameterAssignment>, InvalidParameterSpace> {
    if space.is_empty() {
        return Err(InvalidParameterSpace::EmptySpace);
    }

    let mut names = Vec::with_capacity(space.len());
    let mut lists = Vec::with_capacity(space.len());
    for (name, spec) in space.iter() {
        lists.push(axis_values(name, spec)?);
        names.push(name.to_string());
    }

    let size = lists
        .iter()
        .fold(1_u64, |acc, l| acc.saturating_mul(l.len() as u64));
    if size > max_combinations {
        return Err(InvalidParameterSpace::TooManyCombinations {
            size,
            cap: max_combinations,
        });
    }

    let iter = lists
        .into_iter()
        .map(Vec::into_iter)
        .multi_cartesian_product()
        .map(move |combo| {
            names
                .iter()
                .cloned()
                .zip(combo)
                .collect::<ParameterAssignment>()
        });
    Ok(iter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn int_range(start: i64, end: i64, step: i64) -> ParameterSpec {
        ParameterSpec::RangeInt { start, end, step }
    }

    #[test]
    fn int_range_yields_floor_count_plus_one_values() {
        let values = axis_values("p", &int_range(10, 50, 7)).unwrap();
        // floor((50 - 10) / 7) + 1 = 6
        assert_eq!(values.len(), 6);
        assert_eq!(values.first(), Some(&ParamValue::Int(10)));
        assert_eq!(values.last(), Some(&ParamValue::Int(45)));
    }

    #[test]
    fn int_range_values_stay_within_bounds_and_increase() {
        let values = axis_values("p", &int_range(1, 9, 2)).unwrap();
        let ints: Vec<i64> = values
            .iter()
            .map(|v| match v {
                ParamValue::Int(i) => *i,
                other => panic!("unexpected value {other}"),
            })
            .collect();
        assert_eq!(ints, vec![1, 3, 5, 7, 9]);
        assert!(ints.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn decimal_range_has_no_accumulation_drift() {
        let spec = ParameterSpec::RangeDecimal {
            start: dec!(0.1),
            end: dec!(0.3),
            step: dec!(0.1),
        };
        let values = axis_values("p", &spec).unwrap();
        assert_eq!(
            values,
            vec![
                ParamValue::Number(dec!(0.1)),
                ParamValue::Number(dec!(0.2)),
                ParamValue::Number(dec!(0.3)),
            ]
        );
    }

    #[test]
    fn single_point_range_yields_one_value() {
        let values = axis_values("p", &int_range(5, 5, 1)).unwrap();
        assert_eq!(values, vec![ParamValue::Int(5)]);
    }

    #[test]
    fn zero_step_is_rejected() {
        let err = axis_values("p", &int_range(1, 10, 0)).unwrap_err();
        assert_eq!(err, InvalidParameterSpace::NonPositiveStep("p".into()));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = axis_values("p", &int_range(10, 1, 1)).unwrap_err();
        assert_eq!(err, InvalidParameterSpace::InvertedRange("p".into()));
    }

    #[test]
    fn empty_discrete_axis_is_rejected() {
        let err = axis_values("p", &ParameterSpec::DiscreteInt(Vec::new())).unwrap_err();
        assert_eq!(err, InvalidParameterSpace::EmptyAxis("p".into()));
    }

    #[test]
    fn product_size_is_the_product_of_axis_sizes() {
        let space = ParameterSpace::new()
            .with("a", int_range(1, 3, 1))
            .with("b", ParameterSpec::DiscreteInt(vec![1, 2]))
            .with("c", ParameterSpec::DiscreteText(vec!["x".into(), "y".into()]));
        assert_eq!(space_size(&space).unwrap(), 3 * 2 * 2);
        assert_eq!(enumerate(&space, 100).unwrap().count(), 12);
    }

    #[test]
    fn enumeration_is_deterministic_across_calls() {
        let space = ParameterSpace::new()
            .with("a", int_range(1, 2, 1))
            .with(
                "b",
                ParameterSpec::DiscreteDecimal(vec![dec!(0.5), dec!(1.5)]),
            );

        let first: Vec<ParameterAssignment> = enumerate(&space, 100).unwrap().collect();
        let second: Vec<ParameterAssignment> = enumerate(&space, 100).unwrap().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn enumeration_covers_the_product_in_declared_axis_order() {
        let space = ParameterSpace::new()
            .with("a", int_range(1, 2, 1))
            .with("b", ParameterSpec::DiscreteInt(vec![10, 20]));

        let combos: Vec<(i64, i64)> = enumerate(&space, 100)
            .unwrap()
            .map(|assignment| {
                let a = match assignment["a"] {
                    ParamValue::Int(v) => v,
                    _ => panic!("expected int"),
                };
                let b = match assignment["b"] {
                    ParamValue::Int(v) => v,
                    _ => panic!("expected int"),
                };
                (a, b)
            })
            .collect();

        // First axis varies slowest, matching declaration order.
        assert_eq!(combos, vec![(1, 10), (1, 20), (2, 10), (2, 20)]);
    }

    #[test]
    fn oversized_space_is_rejected_before_enumeration() {
        let space = ParameterSpace::new()
            .with("a", int_range(1, 100, 1))
            .with("b", int_range(1, 100, 1));

        let err = enumerate(&space, 9_999).err().unwrap();
        assert_eq!(
            err,
            InvalidParameterSpace::TooManyCombinations {
                size: 10_000,
                cap: 9_999
            }
        );
    }

    #[test]
    fn empty_space_is_rejected() {
        let space = ParameterSpace::new();
        assert_eq!(
            space_size(&space).unwrap_err(),
            InvalidParameterSpace::EmptySpace
        );
    }
}
