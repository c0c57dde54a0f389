//! Row searches. Every search keeps matching rows in their original order
//! and leaves the domain tag and metadata as they were.

use tasc_model::{CORE_DOMAIN, Collection, Result};

use crate::args::{BoundArgs, Param, ParamDefault, ParamKind};
use crate::operations::support::{Comparison, json_number, matching_rows, numbers};
use crate::registry::{OperationDef, OperationRegistry};

const SEARCH_BY_VALUE: &[Param] = &[
    Param::required("column_name", ParamKind::Column),
    Param::required("op_str", ParamKind::Text),
    Param::required("value", ParamKind::Number),
];

const SEARCH_BY_RANGE: &[Param] = &[
    Param::required("column_name", ParamKind::Column),
    Param::required("min_value", ParamKind::Number),
    Param::required("max_value", ParamKind::Number),
    Param::with_default("inclusive", ParamKind::Bool, ParamDefault::Bool(true)),
];

const SEARCH_BY_STEP_RANGE: &[Param] = &[
    Param::required("min", ParamKind::Number),
    Param::required("max", ParamKind::Number),
    Param::with_default("inclusive", ParamKind::Bool, ParamDefault::Bool(true)),
    Param::with_default("by_step_value", ParamKind::Bool, ParamDefault::Bool(true)),
    Param::optional("tolerance", ParamKind::Number),
];

const SEARCH_MISSING_VALUES: &[Param] = &[Param::optional("columns", ParamKind::Columns)];

const SEARCH_TOP_N: &[Param] = &[
    Param::required("column_name", ParamKind::Column),
    Param::required("n", ParamKind::Integer),
    Param::with_default("descending", ParamKind::Bool, ParamDefault::Bool(true)),
];

fn in_range(value: f64, min: f64, max: f64, inclusive: bool) -> bool {
    if inclusive {
        min <= value && value <= max
    } else {
        min < value && value < max
    }
}

fn search_by_value(mut collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let comparison = Comparison::parse(args, "op_str")?;
    let target = args.f64("value")?;
    let values = numbers(&collection, args.str("column_name")?)?;
    let positions = matching_rows(values, |v| comparison.holds(v, target));
    collection.retain_rows(&positions)?;
    Ok(collection)
}

fn search_by_range(mut collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let min = args.f64("min_value")?;
    let max = args.f64("max_value")?;
    let inclusive = args.bool("inclusive");
    let values = numbers(&collection, args.str("column_name")?)?;
    let positions = matching_rows(values, |v| in_range(v, min, max, inclusive));
    collection.retain_rows(&positions)?;
    Ok(collection)
}

/// Rows whose step value (or row position) lies in `[min, max]`, widened
/// by `tolerance` on both sides.
fn search_by_step_range(mut collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let tolerance = args.opt_f64("tolerance").unwrap_or(0.0);
    let min = args.f64("min")?;
    let max = args.f64("max")?;
    let inclusive = args.bool("inclusive");
    let by_step_value = args.bool("by_step_value");
    let positions: Vec<usize> = if by_step_value {
        collection
            .index()
            .iter()
            .enumerate()
            .filter(|(_, step)| in_range(*step, min - tolerance, max + tolerance, inclusive))
            .map(|(position, _)| position)
            .collect()
    } else {
        (0..collection.len())
            .filter(|&position| in_range(position as f64, min, max, inclusive))
            .collect()
    };
    collection.retain_rows(&positions)?;
    let metadata = collection.metadata_mut();
    metadata.insert("operation".into(), "search_by_step_range".into());
    metadata.insert("by_step_value".into(), by_step_value.into());
    metadata.insert("min".into(), json_number(min));
    metadata.insert("max".into(), json_number(max));
    metadata.insert("inclusive".into(), inclusive.into());
    Ok(collection)
}

/// Rows with a null in any of `columns` (all columns by default).
fn search_missing_values(mut collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let names = args
        .strings("columns")
        .unwrap_or_else(|| collection.column_names().map(str::to_string).collect());
    let mut missing = vec![false; collection.len()];
    for name in &names {
        let column = collection.column(name)?;
        for (position, flag) in missing.iter_mut().enumerate() {
            *flag |= column.get(position)?.is_null();
        }
    }
    let positions: Vec<usize> = missing
        .iter()
        .enumerate()
        .filter_map(|(position, &flag)| flag.then_some(position))
        .collect();
    collection.retain_rows(&positions)?;
    Ok(collection)
}

/// The `n` largest (or smallest) rows of a column, kept in original order.
fn search_top_n(mut collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let n = args.usize("n")?;
    let descending = args.bool("descending");
    let values = numbers(&collection, args.str("column_name")?)?;
    let mut ranked: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(position, value)| value.map(|v| (position, v)))
        .collect();
    if descending {
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    } else {
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    }
    let mut positions: Vec<usize> = ranked.into_iter().take(n).map(|(p, _)| p).collect();
    positions.sort_unstable();
    collection.retain_rows(&positions)?;
    Ok(collection)
}

pub fn register(registry: &mut OperationRegistry) -> Result<()> {
    let operations: [(&str, &[Param], fn(Collection, &BoundArgs) -> Result<Collection>); 5] = [
        ("search_by_value", SEARCH_BY_VALUE, search_by_value),
        ("search_by_range", SEARCH_BY_RANGE, search_by_range),
        ("search_by_step_range", SEARCH_BY_STEP_RANGE, search_by_step_range),
        ("search_missing_values", SEARCH_MISSING_VALUES, search_missing_values),
        ("search_top_n", SEARCH_TOP_N, search_top_n),
    ];
    for (name, params, func) in operations {
        registry.register(name, CORE_DOMAIN, OperationDef::collection(params, func), false)?;
    }
    Ok(())
}
