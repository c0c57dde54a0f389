//! Resampling a collection onto new base values.

use serde_json::Value;
use tasc_model::{CORE_DOMAIN, Collection, Column, ColumnValues, Result, StepIndex};
use tracing::warn;

use crate::args::{BoundArgs, Param, ParamDefault, ParamKind};
use crate::registry::{OperationDef, OperationRegistry};

/// Base name selecting the step index instead of a column.
const STEP_BASE: &str = "step";

const INTERPOLATE: &[Param] = &[
    Param::with_default("base_column_name", ParamKind::Column, ParamDefault::Text(STEP_BASE)),
    Param::optional("x_values", ParamKind::Numbers),
    Param::optional("point_count", ParamKind::Integer),
    Param::with_default("method", ParamKind::Text, ParamDefault::Text("linear")),
    Param::optional("columns", ParamKind::Columns),
];

/// `count` evenly spaced values from `start` to `stop` inclusive.
fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    if count <= 1 {
        return vec![start];
    }
    let step = (stop - start) / (count - 1) as f64;
    (0..count).map(|i| start + step * i as f64).collect()
}

/// Piecewise-linear interpolation through `points` (sorted by x), with
/// linear extrapolation from the outermost segments.
fn linear(points: &[(f64, f64)], x: f64) -> Option<f64> {
    let segment = |a: (f64, f64), b: (f64, f64)| {
        if b.0 == a.0 {
            a.1
        } else {
            a.1 + (x - a.0) * (b.1 - a.1) / (b.0 - a.0)
        }
    };
    match points {
        [] => None,
        [only] => Some(only.1),
        [first, second, ..] if x < first.0 => Some(segment(*first, *second)),
        [.., before_last, last] if x > last.0 => Some(segment(*before_last, *last)),
        _ => points
            .windows(2)
            .find(|pair| pair[0].0 <= x && x <= pair[1].0)
            .map(|pair| segment(pair[0], pair[1])),
    }
}

/// Position of the base value nearest to `x`; the first one wins ties.
fn nearest(base: &[f64], x: f64) -> usize {
    let mut best = 0;
    for (position, value) in base.iter().enumerate() {
        if (value - x).abs() < (base[best] - x).abs() {
            best = position;
        }
    }
    best
}

/// Known `(base, value)` pairs sorted by base, nulls dropped.
fn sorted_points(base: &[f64], values: &[Option<f64>]) -> Vec<(f64, f64)> {
    let mut points: Vec<(f64, f64)> = base
        .iter()
        .zip(values)
        .filter_map(|(&x, y)| y.map(|y| (x, y)))
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    points
}

/// Resample every column at new base values.
///
/// The base is the step index or a null-free numeric column. Targets come
/// from `x_values` or `point_count` evenly spaced values across the base
/// range (exactly one of the two). Numeric columns are interpolated
/// linearly; text columns and columns left out of `columns` take the value
/// at the nearest base position.
fn interpolate(mut collection: Collection, args: &BoundArgs) -> Result<Collection> {
    if args.str("method")? != "linear" {
        return Err(args.invalid("method", "only linear interpolation is supported"));
    }
    let base_name = args.str("base_column_name")?;
    let base: Vec<f64> = if base_name == STEP_BASE {
        collection.index().as_slice().to_vec()
    } else {
        collection
            .column(base_name)?
            .numbers()?
            .iter()
            .copied()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                args.invalid(
                    "base_column_name",
                    format!("column '{base_name}' contains nulls"),
                )
            })?
    };
    if base.is_empty() {
        return Err(args.invalid(
            "base_column_name",
            "cannot interpolate an empty collection",
        ));
    }

    let targets = match (args.numbers("x_values"), args.opt_usize("point_count")?) {
        (Some(x_values), None) => x_values,
        (None, Some(count)) if count >= 2 => {
            let min = base.iter().copied().fold(f64::INFINITY, f64::min);
            let max = base.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            linspace(min, max, count)
        }
        (None, Some(count)) => {
            return Err(args.invalid(
                "point_count",
                format!("{count} points are too few; need at least 2"),
            ));
        }
        (None, None) => {
            return Err(args.invalid(
                "x_values",
                "either x_values or point_count is required",
            ));
        }
        (Some(_), Some(_)) => {
            return Err(args.invalid(
                "x_values",
                "x_values and point_count are mutually exclusive",
            ));
        }
    };

    let interpolated: Vec<String> = match args.strings("columns") {
        Some(names) => {
            for name in &names {
                collection.column(name)?.numbers()?;
            }
            names
        }
        None => collection
            .columns()
            .filter(|c| c.as_numbers().is_some_and(|v| v.iter().all(Option::is_some)))
            .map(|c| c.name().to_string())
            .collect(),
    };

    let step_values: Vec<Option<f64>> = collection.index().iter().map(Some).collect();
    let step_points = sorted_points(&base, &step_values);
    let new_steps: StepIndex = targets
        .iter()
        .map(|&x| linear(&step_points, x).unwrap_or(x))
        .collect();
    let nearest_positions: Vec<usize> = targets.iter().map(|&x| nearest(&base, x)).collect();

    let mut columns = Vec::with_capacity(collection.column_count());
    for column in collection.columns() {
        let resampled = if column.name() == base_name {
            ColumnValues::Number(targets.iter().copied().map(Some).collect::<Vec<_>>().into())
        } else if interpolated.iter().any(|name| name == column.name()) {
            let points = sorted_points(&base, column.numbers()?);
            if points.is_empty() {
                warn!(column = column.name(), "no values to interpolate; filling with nulls");
            }
            ColumnValues::Number(
                targets
                    .iter()
                    .map(|&x| linear(&points, x))
                    .collect::<Vec<_>>()
                    .into(),
            )
        } else {
            column.take(&nearest_positions).values().clone()
        };
        columns.push(rebuilt(column, resampled));
    }

    collection.rebuild(new_steps, columns)?;
    let metadata = collection.metadata_mut();
    metadata.insert("interpolation_method".into(), Value::from("linear"));
    metadata.insert("interpolation_basis".into(), Value::from(base_name));
    Ok(collection)
}

fn rebuilt(template: &Column, values: ColumnValues) -> Column {
    let mut column = Column::new(template.name(), values)
        .with_optional_unit(template.unit().map(str::to_string));
    if let Some(channel) = template.channel() {
        column = column.with_channel(channel);
    }
    column
}

pub fn register(registry: &mut OperationRegistry) -> Result<()> {
    registry.register(
        "interpolate",
        CORE_DOMAIN,
        OperationDef::collection(INTERPOLATE, interpolate),
        false,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Args;

    fn registry() -> OperationRegistry {
        let mut registry = OperationRegistry::new();
        register(&mut registry).unwrap();
        registry
    }

    fn sample() -> Collection {
        Collection::new(
            vec![0.0, 1.0, 2.0],
            vec![
                Column::from_values("load", vec![0.0, 10.0, 30.0]).with_unit("kN"),
                Column::numeric("gap", vec![Some(1.0), None, Some(3.0)]),
                Column::text("tag", vec![Some("a".into()), Some("b".into()), Some("c".into())]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn linear_extrapolates_outside_the_range() {
        let points = [(0.0, 0.0), (1.0, 10.0), (2.0, 30.0)];
        assert_eq!(linear(&points, 0.5), Some(5.0));
        assert_eq!(linear(&points, 1.5), Some(20.0));
        assert_eq!(linear(&points, -1.0), Some(-10.0));
        assert_eq!(linear(&points, 3.0), Some(50.0));
        assert_eq!(linear(&[], 1.0), None);
    }

    #[test]
    fn resample_on_step_index() {
        let out = registry()
            .invoke_collection(sample(), "interpolate", &Args::new().kwarg("point_count", 5))
            .unwrap();
        assert_eq!(out.index().as_slice(), &[0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_eq!(
            out.column("load").unwrap().as_numbers().unwrap(),
            &[Some(0.0), Some(5.0), Some(10.0), Some(20.0), Some(30.0)]
        );
        assert_eq!(out.column("load").unwrap().unit(), Some("kN"));
        // Columns with nulls are not interpolated by default.
        assert_eq!(
            out.column("gap").unwrap().as_numbers().unwrap(),
            &[Some(1.0), Some(1.0), None, None, Some(3.0)]
        );
        assert_eq!(
            out.column("tag").unwrap().get(3).unwrap(),
            tasc_model::CellValue::Text("b".into())
        );
        assert_eq!(out.metadata()["interpolation_basis"], "step");
    }

    #[test]
    fn resample_on_a_column_base() {
        let out = registry()
            .invoke_collection(
                sample(),
                "interpolate",
                &Args::new().arg("load").arg(vec![20.0]),
            )
            .unwrap();
        assert_eq!(out.index().as_slice(), &[1.5]);
        assert_eq!(out.column("load").unwrap().as_numbers().unwrap(), &[Some(20.0)]);
    }

    #[test]
    fn exactly_one_target_source() {
        let registry = registry();
        assert!(registry
            .invoke_collection(sample(), "interpolate", &Args::new())
            .is_err());
        assert!(registry
            .invoke_collection(
                sample(),
                "interpolate",
                &Args::new().kwarg("x_values", vec![0.5]).kwarg("point_count", 3),
            )
            .is_err());
    }
}
