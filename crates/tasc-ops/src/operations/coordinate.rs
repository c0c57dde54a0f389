//! Operations of the `coordinate` domain.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use tasc_domain::{COORDINATE_DOMAIN, CoordinateState, Coordinates};
use tasc_model::{Collection, Column, Result, TascError};

use crate::args::{BoundArgs, Param, ParamDefault, ParamKind};
use crate::operations::support::{json_number, json_optional, write_numeric};
use crate::registry::{OperationDef, OperationRegistry};

/// Unit of generated coordinate and distance columns.
const LENGTH_UNIT: &str = "m";

const COLUMN: &[Param] = &[Param::required("column", ParamKind::Column)];

const SET_COLUMN_COORDINATES: &[Param] = &[
    Param::required("column", ParamKind::Column),
    Param::optional("x", ParamKind::Number),
    Param::optional("y", ParamKind::Number),
    Param::optional("z", ParamKind::Number),
];

const EXTRACT_COORDINATES: &[Param] = &[Param::with_default(
    "result_prefix",
    ParamKind::Text,
    ParamDefault::Text("coord_"),
)];

const CALCULATE_DISTANCE: &[Param] = &[
    Param::required("column1", ParamKind::Column),
    Param::required("column2", ParamKind::Column),
];

const CALCULATE_DISTANCE_MATRIX: &[Param] = &[
    Param::optional("columns", ParamKind::Columns),
    Param::with_default(
        "result_column_prefix",
        ParamKind::Text,
        ParamDefault::Text("distance_"),
    ),
];

const FIND_NEAREST_NEIGHBORS: &[Param] = &[
    Param::required("column", ParamKind::Column),
    Param::with_default("n_neighbors", ParamKind::Integer, ParamDefault::Int(3)),
    Param::optional("result_column", ParamKind::Column),
];

fn get_column_coordinates(collection: &Collection, args: &BoundArgs) -> Result<Value> {
    let column = args.str("column")?;
    collection.column(column)?;
    let coordinates = CoordinateState::of(collection)?
        .get(column)
        .unwrap_or_default();
    Ok(coordinates.to_value())
}

fn set_column_coordinates(mut collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let column = args.str("column")?;
    collection.column(column)?;
    let update = Coordinates {
        x: args.opt_f64("x"),
        y: args.opt_f64("y"),
        z: args.opt_f64("z"),
    };
    let next = CoordinateState::of(&collection)?.with_coordinates(column, update);
    collection.replace_domain_state(Arc::new(next))?;
    Ok(collection)
}

fn get_columns_with_coordinates(collection: &Collection, _: &BoundArgs) -> Result<Value> {
    Ok(Value::from(
        CoordinateState::of(collection)?.columns_with_coordinates(),
    ))
}

/// Constant `{prefix}{column}_{axis}` columns for every set component.
fn extract_coordinates(mut collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let prefix = args.str("result_prefix")?;
    let state = CoordinateState::of(&collection)?.clone();
    let len = collection.len();
    for column in state.columns_with_coordinates() {
        let coordinates = state.get(column).unwrap_or_default();
        let components = [
            ("x", coordinates.x),
            ("y", coordinates.y),
            ("z", coordinates.z),
        ];
        for (axis, component) in components {
            if let Some(value) = component {
                write_numeric(
                    &mut collection,
                    &format!("{prefix}{column}_{axis}"),
                    vec![Some(value); len],
                    Some(LENGTH_UNIT.to_string()),
                )?;
            }
        }
    }
    Ok(collection)
}

fn calculate_distance(collection: &Collection, args: &BoundArgs) -> Result<Value> {
    let distance =
        CoordinateState::of(collection)?.distance(args.str("column1")?, args.str("column2")?)?;
    Ok(json_number(distance))
}

/// Pairwise distances between `columns` (all columns with coordinates by
/// default). Pairs lacking x or y have no distance: their columns are null
/// and the matrix holds null.
fn calculate_distance_matrix(mut collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let state = CoordinateState::of(&collection)?.clone();
    let columns = args.strings("columns").unwrap_or_else(|| {
        state
            .columns_with_coordinates()
            .into_iter()
            .map(str::to_string)
            .collect()
    });
    if columns.len() < 2 {
        return Err(args.invalid("columns", "at least two columns are required"));
    }
    let prefix = args.str("result_column_prefix")?;

    let n = columns.len();
    let mut matrix = vec![vec![Some(0.0); n]; n];
    for i in 0..n {
        for j in i + 1..n {
            let distance = match state.distance(&columns[i], &columns[j]) {
                Ok(distance) => Some(distance),
                Err(TascError::MissingRequiredField { .. }) => None,
                Err(err) => return Err(err),
            };
            matrix[i][j] = distance;
            matrix[j][i] = distance;
        }
    }

    let len = collection.len();
    for i in 0..n {
        for j in i + 1..n {
            write_numeric(
                &mut collection,
                &format!("{prefix}{}_to_{}", columns[i], columns[j]),
                vec![matrix[i][j]; len],
                Some(LENGTH_UNIT.to_string()),
            )?;
        }
    }

    let rows: Vec<Value> = matrix
        .iter()
        .map(|row| Value::Array(row.iter().copied().map(json_optional).collect()))
        .collect();
    record_analysis(
        &mut collection,
        "distance_matrix",
        json!({ "columns": columns, "matrix": rows }),
    );
    Ok(collection)
}

/// The `n_neighbors` closest columns with coordinates, recorded in
/// metadata and as a text column.
fn find_nearest_neighbors(mut collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let column = args.str("column")?;
    let n_neighbors = args.usize("n_neighbors")?;
    collection.column(column)?;
    let state = CoordinateState::of(&collection)?.clone();
    let with_coordinates = state.columns_with_coordinates();
    if !with_coordinates.contains(&column) {
        return Err(TascError::MissingRequiredField {
            domain: COORDINATE_DOMAIN.to_string(),
            field: format!("coordinates.{column}"),
        });
    }

    let mut neighbors: Vec<(&str, f64)> = with_coordinates
        .iter()
        .filter(|&&other| other != column)
        .filter_map(|&other| state.distance(column, other).ok().map(|d| (other, d)))
        .collect();
    neighbors.sort_by(|a, b| a.1.total_cmp(&b.1));
    neighbors.truncate(n_neighbors);

    let summary = neighbors
        .iter()
        .map(|(other, distance)| format!("{other}({distance:.4}{LENGTH_UNIT})"))
        .collect::<Vec<_>>()
        .join(", ");
    let name = args
        .opt_str("result_column")
        .map_or_else(|| format!("neighbors_of_{column}"), str::to_string);
    collection.set_column(Column::text(
        name,
        vec![Some(summary); collection.len()],
    ))?;

    let listed: Vec<Value> = neighbors
        .iter()
        .map(|(other, distance)| json!({ "column": other, "distance": distance }))
        .collect();
    record_analysis(
        &mut collection,
        "nearest_neighbors",
        json!({ "reference_column": column, "neighbors": listed }),
    );
    Ok(collection)
}

/// Stores `value` under `key` in the `analysis` metadata object.
fn record_analysis(collection: &mut Collection, key: &str, value: Value) {
    let entry = collection
        .metadata_mut()
        .entry("analysis".to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    match entry {
        Value::Object(map) => {
            map.insert(key.to_string(), value);
        }
        other => *other = json!({ key: value }),
    }
}

pub fn register(registry: &mut OperationRegistry) -> Result<()> {
    registry.register(
        "get_column_coordinates",
        COORDINATE_DOMAIN,
        OperationDef::value(COLUMN, get_column_coordinates),
        false,
    )?;
    registry.register(
        "set_column_coordinates",
        COORDINATE_DOMAIN,
        OperationDef::collection(SET_COLUMN_COORDINATES, set_column_coordinates),
        false,
    )?;
    registry.register(
        "get_columns_with_coordinates",
        COORDINATE_DOMAIN,
        OperationDef::value(&[], get_columns_with_coordinates),
        false,
    )?;
    registry.register(
        "extract_coordinates",
        COORDINATE_DOMAIN,
        OperationDef::collection(EXTRACT_COORDINATES, extract_coordinates),
        false,
    )?;
    registry.register(
        "calculate_distance",
        COORDINATE_DOMAIN,
        OperationDef::value(CALCULATE_DISTANCE, calculate_distance),
        false,
    )?;
    registry.register(
        "calculate_distance_matrix",
        COORDINATE_DOMAIN,
        OperationDef::collection(CALCULATE_DISTANCE_MATRIX, calculate_distance_matrix),
        false,
    )?;
    registry.register(
        "find_nearest_neighbors",
        COORDINATE_DOMAIN,
        OperationDef::collection(FIND_NEAREST_NEIGHBORS, find_nearest_neighbors),
        false,
    )?;
    Ok(())
}
