//! Combining two or more columns into one, by step position or by a
//! condition column.

use serde_json::Value;
use tasc_model::{CORE_DOMAIN, Collection, Result, StepIndex, stats};

use crate::args::{BoundArgs, Param, ParamDefault, ParamKind};
use crate::operations::support::{
    Comparison, numbers, push_warning, result_name, unit_of, write_numeric,
};
use crate::registry::{OperationDef, OperationRegistry};

const SWITCH_BY_STEP: &[Param] = &[
    Param::required("column1", ParamKind::Column),
    Param::required("column2", ParamKind::Column),
    Param::required("threshold", ParamKind::Number),
    Param::with_default("compare_mode", ParamKind::Text, ParamDefault::Text("value")),
    Param::with_default("by_step_value", ParamKind::Bool, ParamDefault::Bool(true)),
    Param::optional("result_column", ParamKind::Column),
    Param::in_place(),
    Param::optional("tolerance", ParamKind::Number),
];

const BLEND_BY_STEP: &[Param] = &[
    Param::required("column1", ParamKind::Column),
    Param::required("column2", ParamKind::Column),
    Param::required("start", ParamKind::Number),
    Param::required("end", ParamKind::Number),
    Param::with_default("compare_mode", ParamKind::Text, ParamDefault::Text("value")),
    Param::with_default("by_step_value", ParamKind::Bool, ParamDefault::Bool(true)),
    Param::with_default("blend_method", ParamKind::Text, ParamDefault::Text("linear")),
    Param::optional("result_column", ParamKind::Column),
    Param::in_place(),
    Param::optional("tolerance", ParamKind::Number),
];

const CONDITIONAL_SELECT: &[Param] = &[
    Param::required("column1", ParamKind::Column),
    Param::required("column2", ParamKind::Column),
    Param::required("condition_column", ParamKind::Column),
    Param::with_default("threshold", ParamKind::Number, ParamDefault::Int(0)),
    Param::with_default("compare", ParamKind::Text, ParamDefault::Text(">")),
    Param::optional("result_column", ParamKind::Column),
    Param::in_place(),
];

const REDUCE_COLUMNS: &[Param] = &[
    Param::optional("columns", ParamKind::Columns),
    Param::optional("result_column", ParamKind::Column),
    Param::in_place(),
];

/// What a switch or blend boundary is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareMode {
    /// Step values, or row positions when `by_step_value` is false.
    Value,
    /// Row positions, located by step value when `by_step_value` is true.
    Index,
}

impl CompareMode {
    fn parse(args: &BoundArgs) -> Result<Self> {
        match args.str("compare_mode")? {
            "value" => Ok(CompareMode::Value),
            "index" => Ok(CompareMode::Index),
            other => Err(args.invalid(
                "compare_mode",
                format!("unknown compare mode {other:?}; expected value or index"),
            )),
        }
    }
}

/// Position of `step` in the index: exact match without a tolerance,
/// nearest step within `tolerance` otherwise.
fn find_step(index: &StepIndex, step: f64, tolerance: Option<f64>) -> Option<usize> {
    match tolerance {
        None => index.position(step),
        Some(tolerance) => index
            .iter()
            .enumerate()
            .map(|(position, s)| (position, (s - step).abs()))
            .filter(|(_, distance)| *distance <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(position, _)| position),
    }
}

fn mode_label(by_step_value: bool) -> &'static str {
    if by_step_value { "step" } else { "index" }
}

/// Boundary positions resolved from step values, with warnings for steps
/// that were not found.
fn locate(
    collection: &mut Collection,
    step: f64,
    tolerance: Option<f64>,
    fallback: usize,
) -> f64 {
    match find_step(collection.index(), step, tolerance) {
        Some(position) => position as f64,
        None => {
            push_warning(
                collection,
                format!("step {step} was not found; using index {fallback}"),
            );
            fallback as f64
        }
    }
}

/// Values of `column1` before `threshold` and of `column2` from it on.
fn switch_by_step(mut collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let first = args.str("column1")?;
    let second = args.str("column2")?;
    let threshold = args.f64("threshold")?;
    let mode = CompareMode::parse(args)?;
    let by_step_value = args.bool("by_step_value");
    numbers(&collection, second)?;

    let boundary = if mode == CompareMode::Index && by_step_value {
        let fallback = collection.len() / 2;
        locate(&mut collection, threshold, args.opt_f64("tolerance"), fallback)
    } else {
        threshold
    };
    let steps = collection.index().clone();
    let left = numbers(&collection, first)?;
    let right = numbers(&collection, second)?;
    let values = (0..collection.len())
        .map(|position| {
            let key = if mode == CompareMode::Value && by_step_value {
                steps.as_slice()[position]
            } else {
                position as f64
            };
            if key < boundary { left[position] } else { right[position] }
        })
        .collect();

    let name = result_name(args, || {
        format!(
            "switch({first},{second}@{}_{})",
            args.label("threshold"),
            mode_label(by_step_value)
        )
    });
    let unit = unit_of(&collection, first);
    write_numeric(&mut collection, &name, values, unit)?;
    let metadata = collection.metadata_mut();
    metadata.insert("operation".into(), "switch_by_step".into());
    metadata.insert("by_step_value".into(), by_step_value.into());
    metadata.insert("compare_mode".into(), args.value("compare_mode").clone());
    metadata.insert("threshold".into(), args.value("threshold").clone());
    Ok(collection)
}

/// Easing curve applied to the blend fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlendMethod {
    Linear,
    Smooth,
    Log,
    Exp,
}

impl BlendMethod {
    fn parse(args: &BoundArgs) -> Result<Self> {
        match args.str("blend_method")? {
            "linear" => Ok(BlendMethod::Linear),
            "smooth" => Ok(BlendMethod::Smooth),
            "log" => Ok(BlendMethod::Log),
            "exp" => Ok(BlendMethod::Exp),
            other => Err(args.invalid(
                "blend_method",
                format!("unknown blend method {other:?}; expected linear, smooth, log or exp"),
            )),
        }
    }

    fn ease(self, t: f64) -> f64 {
        match self {
            BlendMethod::Linear => t,
            BlendMethod::Smooth => 3.0 * t.powi(2) - 2.0 * t.powi(3),
            BlendMethod::Log => (t * 9.0 + 1.0).log10(),
            BlendMethod::Exp => (t.exp() - 1.0) / (1.0_f64.exp() - 1.0),
        }
    }
}

/// Gradual transition from `column1` to `column2` between `start` and
/// `end`. Outside the range only one column is used; inside it a null on
/// either side yields null.
fn blend_by_step(mut collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let first = args.str("column1")?;
    let second = args.str("column2")?;
    let start = args.f64("start")?;
    let end = args.f64("end")?;
    let mode = CompareMode::parse(args)?;
    let by_step_value = args.bool("by_step_value");
    let method = BlendMethod::parse(args)?;
    numbers(&collection, first)?;
    numbers(&collection, second)?;

    let (lower, upper) = if mode == CompareMode::Index && by_step_value {
        let tolerance = args.opt_f64("tolerance");
        let last = collection.len().saturating_sub(1);
        let lower = locate(&mut collection, start, tolerance, 0);
        let upper = locate(&mut collection, end, tolerance, last);
        (lower, upper)
    } else {
        (start, end)
    };
    if upper <= lower {
        return Err(args.invalid(
            "end",
            format!("end ({upper}) must be greater than start ({lower})"),
        ));
    }

    let steps = collection.index().clone();
    let left = numbers(&collection, first)?;
    let right = numbers(&collection, second)?;
    let values = (0..collection.len())
        .map(|position| {
            let key = if mode == CompareMode::Value && by_step_value {
                steps.as_slice()[position]
            } else {
                position as f64
            };
            if key < lower {
                left[position]
            } else if key > upper {
                right[position]
            } else {
                let t = method.ease((key - lower) / (upper - lower));
                match (left[position], right[position]) {
                    (Some(a), Some(b)) => Some(a * (1.0 - t) + b * t),
                    _ => None,
                }
            }
        })
        .collect();

    let name = result_name(args, || {
        format!(
            "blend({first},{second},{}-{}_{})",
            args.label("start"),
            args.label("end"),
            mode_label(by_step_value)
        )
    });
    let unit = unit_of(&collection, first);
    write_numeric(&mut collection, &name, values, unit)?;
    let metadata = collection.metadata_mut();
    metadata.insert("operation".into(), "blend_by_step".into());
    metadata.insert("by_step_value".into(), by_step_value.into());
    metadata.insert("compare_mode".into(), args.value("compare_mode").clone());
    metadata.insert("blend_method".into(), args.value("blend_method").clone());
    metadata.insert(
        "range".into(),
        Value::Array(vec![args.value("start").clone(), args.value("end").clone()]),
    );
    Ok(collection)
}

/// `column1` where the condition holds, `column2` elsewhere (including
/// rows with a null condition).
fn conditional_select(mut collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let first = args.str("column1")?;
    let second = args.str("column2")?;
    let condition = args.str("condition_column")?;
    let threshold = args.f64("threshold")?;
    let comparison = Comparison::parse(args, "compare")?;

    let left = numbers(&collection, first)?;
    let right = numbers(&collection, second)?;
    let flags = numbers(&collection, condition)?;
    let values = flags
        .iter()
        .enumerate()
        .map(|(position, flag)| match flag {
            Some(flag) if comparison.holds(*flag, threshold) => left[position],
            _ => right[position],
        })
        .collect();

    let name = result_name(args, || {
        format!(
            "select({first},{second},where:{condition}{}{})",
            comparison.as_str(),
            args.label("threshold")
        )
    });
    let unit = unit_of(&collection, first);
    write_numeric(&mut collection, &name, values, unit)?;
    Ok(collection)
}

/// Row-wise reduction over several numeric columns, skipping nulls.
fn reduce_columns(
    mut collection: Collection,
    args: &BoundArgs,
    prefix: &str,
    reduce: fn(&[Option<f64>]) -> Option<f64>,
) -> Result<Collection> {
    let names = args.strings("columns").unwrap_or_else(|| {
        collection
            .columns()
            .filter(|c| c.is_numeric())
            .map(|c| c.name().to_string())
            .collect()
    });
    if names.is_empty() {
        return Err(args.invalid("columns", "no columns to combine"));
    }
    let sources = names
        .iter()
        .map(|name| numbers(&collection, name))
        .collect::<Result<Vec<_>>>()?;
    let mut row = Vec::with_capacity(sources.len());
    let values = (0..collection.len())
        .map(|position| {
            row.clear();
            row.extend(sources.iter().map(|values| values[position]));
            reduce(&row)
        })
        .collect();

    let name = result_name(args, || format!("{prefix}({})", names.join("_")));
    let unit = unit_of(&collection, &names[0]);
    write_numeric(&mut collection, &name, values, unit)?;
    Ok(collection)
}

fn sum_columns(collection: Collection, args: &BoundArgs) -> Result<Collection> {
    reduce_columns(collection, args, "sum", stats::sum)
}

fn average_columns(collection: Collection, args: &BoundArgs) -> Result<Collection> {
    reduce_columns(collection, args, "average", stats::mean)
}

pub fn register(registry: &mut OperationRegistry) -> Result<()> {
    let operations: [(&str, &[Param], fn(Collection, &BoundArgs) -> Result<Collection>); 5] = [
        ("switch_by_step", SWITCH_BY_STEP, switch_by_step),
        ("blend_by_step", BLEND_BY_STEP, blend_by_step),
        ("conditional_select", CONDITIONAL_SELECT, conditional_select),
        ("sum_columns", REDUCE_COLUMNS, sum_columns),
        ("average_columns", REDUCE_COLUMNS, average_columns),
    ];
    for (name, params, func) in operations {
        registry.register(name, CORE_DOMAIN, OperationDef::collection(params, func), false)?;
    }
    Ok(())
}
