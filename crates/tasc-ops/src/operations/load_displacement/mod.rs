//! Operations of the `load_displacement` domain.

pub mod analysis;
pub mod curves;
pub mod cycles;

use serde_json::Value;
use tasc_domain::{LOAD_DISPLACEMENT_DOMAIN, LoadDisplacement};
use tasc_model::{Collection, Result};

use crate::args::BoundArgs;
use crate::registry::{OperationDef, OperationRegistry};

/// Valid `(displacement, load)` pairs, skipping rows where either is null.
pub(crate) fn valid_pairs(collection: &Collection) -> Result<Vec<(f64, f64)>> {
    let state = LoadDisplacement::of(collection)?;
    let displacement = collection.column(state.displacement_column())?.numbers()?;
    let load = collection.column(state.load_column())?.numbers()?;
    Ok(displacement
        .iter()
        .zip(load)
        .filter_map(|pair| match pair {
            (Some(d), Some(l)) => Some((*d, *l)),
            _ => None,
        })
        .collect())
}

fn get_load_column(collection: &Collection, _: &BoundArgs) -> Result<Value> {
    Ok(Value::from(LoadDisplacement::of(collection)?.load_column()))
}

fn get_displacement_column(collection: &Collection, _: &BoundArgs) -> Result<Value> {
    Ok(Value::from(
        LoadDisplacement::of(collection)?.displacement_column(),
    ))
}

pub fn register(registry: &mut OperationRegistry) -> Result<()> {
    registry.register(
        "get_load_column",
        LOAD_DISPLACEMENT_DOMAIN,
        OperationDef::value(&[], get_load_column),
        false,
    )?;
    registry.register(
        "get_displacement_column",
        LOAD_DISPLACEMENT_DOMAIN,
        OperationDef::value(&[], get_displacement_column),
        false,
    )?;
    cycles::register(registry)?;
    analysis::register(registry)?;
    curves::register(registry)?;
    Ok(())
}
