//! Column and row selection.

use serde_json::Value;
use tasc_model::{CORE_DOMAIN, Collection, Result, TascError};

use crate::args::{BoundArgs, Param, ParamKind};
use crate::operations::support::{json_number, matching_rows};
use crate::registry::{OperationDef, OperationRegistry};

const SELECT: &[Param] = &[
    Param::optional("columns", ParamKind::Columns),
    Param::optional("indices", ParamKind::Integers),
];

const SELECT_STEP: &[Param] = &[
    Param::required("steps", ParamKind::Numbers),
    Param::optional("columns", ParamKind::Columns),
];

const FILTER_BY_VALUE: &[Param] = &[
    Param::required("column_name", ParamKind::Column),
    Param::required("value", ParamKind::Json),
    Param::optional("tolerance", ParamKind::Number),
];

fn source_columns(collection: &Collection) -> Value {
    Value::from(collection.column_names().collect::<Vec<_>>())
}

fn row_positions(args: &BoundArgs, len: usize) -> Result<Option<Vec<usize>>> {
    let Some(indices) = args.integers("indices") else {
        return Ok(None);
    };
    indices
        .into_iter()
        .map(|index| {
            usize::try_from(index)
                .ok()
                .filter(|&position| position < len)
                .ok_or(TascError::IndexOutOfRange {
                    position: usize::try_from(index).unwrap_or(usize::MAX),
                    len,
                })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

fn select(mut collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let sources = source_columns(&collection);
    if let Some(columns) = args.strings("columns") {
        collection.retain_columns(&columns)?;
    }
    if let Some(positions) = row_positions(args, collection.len())? {
        collection.retain_rows(&positions)?;
    }
    let metadata = collection.metadata_mut();
    metadata.insert("operation".into(), "select".into());
    metadata.insert("source_columns".into(), sources);
    Ok(collection)
}

/// Rows whose step equals one of `steps`, in request order.
fn select_step(mut collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let steps = args.numbers("steps").unwrap_or_default();
    let sources = source_columns(&collection);
    let mut positions = Vec::with_capacity(steps.len());
    let mut found = Vec::new();
    let mut missing = Vec::new();
    for step in steps {
        match collection.index().position(step) {
            Some(position) => {
                positions.push(position);
                found.push(json_number(step));
            }
            None => missing.push(json_number(step)),
        }
    }
    if let Some(columns) = args.strings("columns") {
        collection.retain_columns(&columns)?;
    }
    collection.retain_rows(&positions)?;
    let metadata = collection.metadata_mut();
    metadata.insert("operation".into(), "select_step".into());
    metadata.insert("source_columns".into(), sources);
    metadata.insert("selected_steps".into(), Value::Array(found));
    metadata.insert("missing_steps".into(), Value::Array(missing));
    Ok(collection)
}

/// Rows whose cell equals `value`, or lies within `tolerance` of it.
///
/// Text columns compare exact strings and take no tolerance.
fn filter_by_value(mut collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let name = args.str("column_name")?;
    let column = collection.column(name)?;
    let tolerance = args.opt_f64("tolerance");
    let lookup = (args.value("value"), column.as_numbers(), column.as_texts());
    let positions: Vec<usize> = match lookup {
        (Value::Number(target), Some(values), _) => {
            let target = target
                .as_f64()
                .ok_or_else(|| args.invalid("value", "expected a finite number"))?;
            let tolerance = tolerance.unwrap_or(0.0);
            matching_rows(values, |v| (v - target).abs() <= tolerance)
        }
        (Value::String(target), _, Some(values)) if tolerance.is_none() => values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.as_deref() == Some(target.as_str()))
            .map(|(position, _)| position)
            .collect(),
        (other, _, _) => {
            return Err(args.invalid(
                "value",
                format!("{other} cannot be compared with {} column '{name}'", column.kind()),
            ));
        }
    };
    collection.retain_rows(&positions)?;
    Ok(collection)
}

pub fn register(registry: &mut OperationRegistry) -> Result<()> {
    registry.register("select", CORE_DOMAIN, OperationDef::collection(SELECT, select), false)?;
    registry.register(
        "select_step",
        CORE_DOMAIN,
        OperationDef::collection(SELECT_STEP, select_step),
        false,
    )?;
    registry.register(
        "filter_by_value",
        CORE_DOMAIN,
        OperationDef::collection(FILTER_BY_VALUE, filter_by_value),
        false,
    )?;
    Ok(())
}
