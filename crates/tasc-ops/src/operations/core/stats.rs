//! Moving averages, outlier flags and column summaries.

use serde_json::{Map, Value};
use tasc_model::{CORE_DOMAIN, Collection, Result, stats};

use crate::args::{BoundArgs, Param, ParamDefault, ParamKind};
use crate::operations::support::{result_name, unit_of, write_numeric};
use crate::registry::{OperationDef, OperationRegistry};

const MOVING_AVERAGE: &[Param] = &[
    Param::required("column", ParamKind::Column),
    Param::with_default("window_size", ParamKind::Integer, ParamDefault::Int(3)),
    Param::optional("result_column", ParamKind::Column),
    Param::with_default(
        "edge_handling",
        ParamKind::Text,
        ParamDefault::Text("asymmetric"),
    ),
    Param::in_place(),
];

const DETECT_OUTLIERS: &[Param] = &[
    Param::required("column", ParamKind::Column),
    Param::with_default("window_size", ParamKind::Integer, ParamDefault::Int(3)),
    Param::with_default("threshold", ParamKind::Number, ParamDefault::Float(0.5)),
    Param::with_default(
        "edge_handling",
        ParamKind::Text,
        ParamDefault::Text("asymmetric"),
    ),
    Param::with_default("min_abs_value", ParamKind::Number, ParamDefault::Float(1e-10)),
    Param::with_default("scale_factor", ParamKind::Number, ParamDefault::Float(1.0)),
    Param::optional("result_column", ParamKind::Column),
];

const DESCRIBE: &[Param] = &[Param::optional("columns", ParamKind::Columns)];

/// How windows behave near the first and last rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeHandling {
    /// Centered windows that shrink at the edges.
    Symmetric,
    /// Left-edge windows start at the first row and right-edge windows end
    /// at the last row; both shrink to the rows available.
    Asymmetric,
}

impl EdgeHandling {
    fn parse(args: &BoundArgs) -> Result<Self> {
        match args.str("edge_handling")? {
            "symmetric" => Ok(EdgeHandling::Symmetric),
            "asymmetric" => Ok(EdgeHandling::Asymmetric),
            other => Err(args.invalid(
                "edge_handling",
                format!("unknown edge handling {other:?}; expected symmetric or asymmetric"),
            )),
        }
    }

    /// Row range of the window around `position`.
    fn window(self, position: usize, window_size: usize, len: usize) -> std::ops::Range<usize> {
        let half = window_size / 2;
        match self {
            EdgeHandling::Symmetric => {
                position.saturating_sub(half)..(position + half + 1).min(len)
            }
            EdgeHandling::Asymmetric if position < half => 0..(position + half + 1).min(len),
            EdgeHandling::Asymmetric if position + half >= len => position - half..len,
            EdgeHandling::Asymmetric => position - half..position + half + 1,
        }
    }
}

/// Windowed means of `values`; nulls inside a window are skipped.
fn windowed_means(
    values: &[Option<f64>],
    window_size: usize,
    edges: EdgeHandling,
) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|position| stats::mean(&values[edges.window(position, window_size, values.len())]))
        .collect()
}

fn window_size(args: &BoundArgs, len: usize) -> Result<usize> {
    let window_size = args.i64("window_size")?;
    if window_size < 1 {
        return Err(args.invalid("window_size", "window size must be at least 1"));
    }
    let window_size = usize::try_from(window_size).unwrap_or(usize::MAX);
    if window_size > len {
        return Err(args.invalid(
            "window_size",
            format!("window size {window_size} exceeds the row count {len}"),
        ));
    }
    Ok(window_size)
}

fn moving_average(mut collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let source = args.str("column")?;
    let values = collection.column(source)?.numbers()?;
    let edges = EdgeHandling::parse(args)?;
    let window_size = window_size(args, values.len())?;
    let averaged = windowed_means(values, window_size, edges);
    let name = result_name(args, || format!("ma{window_size}({source})"));
    let unit = unit_of(&collection, source);
    write_numeric(&mut collection, &name, averaged, unit)?;
    Ok(collection)
}

/// Flags rows deviating from their moving average by more than
/// `threshold`, relative to the larger of the local average and the scaled
/// column spread. Flags are 1.0 for outliers and 0.0 otherwise.
fn detect_outliers(mut collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let source = args.str("column")?;
    let values = collection.column(source)?.numbers()?;
    let edges = EdgeHandling::parse(args)?;
    let window_size = window_size(args, values.len())?;
    let threshold = args.f64("threshold")?;
    let min_abs_value = args.f64("min_abs_value")?;
    let scale_factor = args.f64("scale_factor")?;

    let Some(spread) = stats::std(values) else {
        return Err(args.invalid("column", format!("column '{source}' has no values")));
    };
    let reference = (spread * scale_factor).max(min_abs_value);
    let averages = windowed_means(values, window_size, edges);
    let flags = values
        .iter()
        .zip(&averages)
        .map(|pair| {
            let flagged = match pair {
                (Some(value), Some(average)) => {
                    let diff = (value - average).abs();
                    diff / average.abs().max(reference) > threshold && diff > min_abs_value
                }
                _ => false,
            };
            Some(if flagged { 1.0 } else { 0.0 })
        })
        .collect();

    let name = result_name(args, || format!("outlier({source})"));
    write_numeric(&mut collection, &name, flags, None)?;
    Ok(collection)
}

fn describe(collection: &Collection, args: &BoundArgs) -> Result<Value> {
    let names: Vec<String> = match args.strings("columns") {
        Some(names) => names,
        None => collection
            .columns()
            .filter(|c| c.is_numeric())
            .map(|c| c.name().to_string())
            .collect(),
    };
    let mut summaries = Map::new();
    for name in names {
        let summary = collection.column(&name)?.summary()?;
        let summary = serde_json::to_value(summary)
            .map_err(|err| args.invalid("columns", err.to_string()))?;
        summaries.insert(name, summary);
    }
    Ok(Value::Object(summaries))
}

pub fn register(registry: &mut OperationRegistry) -> Result<()> {
    registry.register(
        "moving_average",
        CORE_DOMAIN,
        OperationDef::collection(MOVING_AVERAGE, moving_average),
        false,
    )?;
    registry.register(
        "detect_outliers",
        CORE_DOMAIN,
        OperationDef::collection(DETECT_OUTLIERS, detect_outliers),
        false,
    )?;
    registry.register(
        "describe",
        CORE_DOMAIN,
        OperationDef::value(DESCRIBE, describe),
        false,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tasc_model::{Column, TascError};

    use super::*;
    use crate::args::Args;

    fn registry() -> OperationRegistry {
        let mut registry = OperationRegistry::new();
        register(&mut registry).unwrap();
        registry
    }

    fn sample(values: Vec<f64>) -> Collection {
        let steps: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
        Collection::new(steps, vec![Column::from_values("x", values)]).unwrap()
    }

    #[test]
    fn window_ranges() {
        assert_eq!(EdgeHandling::Symmetric.window(0, 3, 5), 0..2);
        assert_eq!(EdgeHandling::Symmetric.window(2, 3, 5), 1..4);
        assert_eq!(EdgeHandling::Symmetric.window(4, 3, 5), 3..5);
        assert_eq!(EdgeHandling::Asymmetric.window(0, 3, 5), 0..2);
        assert_eq!(EdgeHandling::Asymmetric.window(2, 3, 5), 1..4);
        assert_eq!(EdgeHandling::Asymmetric.window(4, 3, 5), 3..5);
        assert_eq!(EdgeHandling::Asymmetric.window(1, 5, 5), 0..4);
        assert_eq!(EdgeHandling::Asymmetric.window(3, 5, 5), 1..5);
        assert_eq!(EdgeHandling::Asymmetric.window(0, 3, 2), 0..2);
    }

    #[test]
    fn moving_average_edges() {
        let registry = registry();
        let input = sample(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let out = registry
            .invoke_collection(
                input.clone(),
                "moving_average",
                &Args::new().arg("x").kwarg("edge_handling", "symmetric"),
            )
            .unwrap();
        assert_eq!(
            out.column("ma3(x)").unwrap().as_numbers().unwrap(),
            &[Some(1.5), Some(2.0), Some(3.0), Some(4.0), Some(4.5)]
        );

        let out = registry
            .invoke_collection(input.clone(), "moving_average", &Args::new().arg("x"))
            .unwrap();
        assert_eq!(
            out.column("ma3(x)").unwrap().as_numbers().unwrap(),
            &[Some(1.5), Some(2.0), Some(3.0), Some(4.0), Some(4.5)]
        );

        let out = registry
            .invoke_collection(input, "moving_average", &Args::new().arg("x").arg(5))
            .unwrap();
        assert_eq!(
            out.column("ma5(x)").unwrap().as_numbers().unwrap(),
            &[Some(2.0), Some(2.5), Some(3.0), Some(3.5), Some(4.0)]
        );
    }

    #[test]
    fn window_larger_than_data() {
        let args = Args::new().arg("x").arg(5);
        let err = registry()
            .invoke_collection(sample(vec![1.0, 2.0]), "moving_average", &args)
            .unwrap_err();
        assert!(matches!(
            err,
            TascError::InvalidArgument { parameter, .. } if parameter == "window_size"
        ));
    }

    #[test]
    fn detect_outliers_flags_spikes() {
        let out = registry()
            .invoke_collection(
                sample(vec![1.0, 1.0, 1.0, 10.0, 1.0, 1.0, 1.0]),
                "detect_outliers",
                &Args::new().arg("x").kwarg("threshold", 1.0),
            )
            .unwrap();
        assert_eq!(
            out.column("outlier(x)").unwrap().as_numbers().unwrap(),
            &[Some(0.0), Some(0.0), Some(0.0), Some(1.0), Some(0.0), Some(0.0), Some(0.0)]
        );
    }

    #[test]
    fn describe_summarizes_numeric_columns() {
        let summary = registry()
            .invoke_value(&sample(vec![1.0, 3.0]), "describe", &Args::new())
            .unwrap();
        assert_eq!(
            summary,
            json!({"x": {"count": 2, "mean": 2.0, "std": 1.0, "min": 1.0, "max": 3.0}})
        );
    }
}
