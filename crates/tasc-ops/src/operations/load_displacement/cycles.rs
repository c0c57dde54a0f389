//! Loading cycle detection and per-cycle splitting.

use tasc_domain::{LOAD_DISPLACEMENT_DOMAIN, LoadDisplacement};
use tasc_model::{Collection, Result};
use tracing::debug;

use crate::args::{BoundArgs, Param, ParamDefault, ParamKind};
use crate::operations::core::split::split_rows;
use crate::operations::support::{numbers, result_name, write_numeric};
use crate::registry::{OperationDef, OperationRegistry};

const CYCLE_COUNT: &[Param] = &[
    Param::optional("column", ParamKind::Column),
    Param::with_default("step", ParamKind::Number, ParamDefault::Float(0.5)),
    Param::optional("result_column", ParamKind::Column),
];

const SPLIT_BY_CYCLES: &[Param] = &[Param::optional("cycle_column", ParamKind::Column)];

/// Cycle numbers of a signal: the counter starts at 1.0 and grows by
/// `step` whenever two consecutive non-null values change sign. The
/// result is truncated to whole cycles.
pub(crate) fn count_cycles(values: &[Option<f64>], step: f64) -> Vec<Option<f64>> {
    let mut counter = 1.0_f64;
    let mut cycles = Vec::with_capacity(values.len());
    for (position, value) in values.iter().enumerate() {
        if position > 0
            && let (Some(previous), Some(current)) = (values[position - 1], value)
            && previous * current < 0.0
        {
            counter += step;
        }
        cycles.push(Some(counter.trunc()));
    }
    cycles
}

/// Adds the cycle number column; returns its name with the collection.
fn add_cycle_column(mut collection: Collection, args: &BoundArgs) -> Result<(Collection, String)> {
    let source = match args.opt_str("column") {
        Some(column) => column.to_string(),
        None => LoadDisplacement::of(&collection)?.load_column().to_string(),
    };
    let step = args.opt_f64("step").unwrap_or(0.5);
    let cycles = count_cycles(numbers(&collection, &source)?, step);
    let name = result_name(args, || format!("{source}_cycle"));
    write_numeric(&mut collection, &name, cycles, None)?;
    Ok((collection, name))
}

fn cycle_count(collection: Collection, args: &BoundArgs) -> Result<Collection> {
    add_cycle_column(collection, args).map(|(collection, _)| collection)
}

/// Cycle marker of every row. Uses `cycle_column`, else the first column
/// whose name contains "cycle", else counts cycles on the load column and
/// adds the result to the collection.
pub(crate) fn cycle_markers(
    collection: Collection,
    args: &BoundArgs,
) -> Result<(Collection, Vec<i64>)> {
    let explicit = args.opt_str("cycle_column").map(str::to_string);
    let existing = explicit.or_else(|| {
        collection
            .column_names()
            .find(|name| name.to_lowercase().contains("cycle"))
            .map(str::to_string)
    });
    let (collection, cycle_column) = match existing {
        Some(name) => (collection, name),
        None => {
            debug!("no cycle column; counting cycles on the load column");
            add_cycle_column(collection, args)?
        }
    };
    let markers = numbers(&collection, &cycle_column)?
        .iter()
        .map(|value| value.map_or(0, |v| v as i64))
        .collect();
    Ok((collection, markers))
}

/// Groups of rows per cycle, in first-seen cycle order.
fn split_by_cycles(collection: Collection, args: &BoundArgs) -> Result<Vec<Collection>> {
    let (collection, markers) = cycle_markers(collection, args)?;
    split_rows(&collection, &markers, args)
}

pub fn register(registry: &mut OperationRegistry) -> Result<()> {
    registry.register(
        "cycle_count",
        LOAD_DISPLACEMENT_DOMAIN,
        OperationDef::collection(CYCLE_COUNT, cycle_count),
        false,
    )?;
    registry.register(
        "split_by_cycles",
        LOAD_DISPLACEMENT_DOMAIN,
        OperationDef::group(SPLIT_BY_CYCLES, split_by_cycles),
        false,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_advances_on_sign_changes() {
        let load = [
            Some(0.0),
            Some(1.0),
            Some(-1.0),
            Some(2.0),
            None,
            Some(-2.0),
            Some(3.0),
        ];
        assert_eq!(
            count_cycles(&load, 0.5),
            vec![
                Some(1.0),
                Some(1.0),
                Some(1.0),
                Some(2.0),
                Some(2.0),
                Some(2.0),
                Some(2.0),
            ]
        );
    }
}
