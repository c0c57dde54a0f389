//! Conversions between polars `DataFrame`s and collections.
//!
//! String columns become text columns; every other column is cast to
//! `Float64`. The step index comes from a chosen column, or is `0..n`.

use anyhow::{Context, Result, bail};
use polars::prelude::{AnyValue, DataFrame, DataType, IntoColumn, NamedFrom, Series};
use tasc_model::{Collection, CollectionParts, Column, ColumnValues};
use tracing::debug;

/// Name of the step column written by [`collection_to_frame`].
pub const STEP_COLUMN: &str = "step";

/// How a frame maps onto a collection.
#[derive(Debug, Clone, Default)]
pub struct FrameOptions {
    /// Column holding the step values. `None` numbers the rows `0..n`.
    pub step_column: Option<String>,
    /// Units per column name.
    pub units: Vec<(String, String)>,
}

impl FrameOptions {
    #[must_use]
    pub fn with_step_column(mut self, name: impl Into<String>) -> Self {
        self.step_column = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_unit(mut self, column: impl Into<String>, unit: impl Into<String>) -> Self {
        self.units.push((column.into(), unit.into()));
        self
    }

    fn unit_of(&self, column: &str) -> Option<String> {
        self.units
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, unit)| unit.clone())
    }
}

/// Converts a Polars `AnyValue` to `f64`, returning `None` for nulls and
/// values that are not numbers.
pub fn any_to_f64(value: AnyValue<'_>) -> Option<f64> {
    match value {
        AnyValue::Null => None,
        AnyValue::Int8(v) => Some(f64::from(v)),
        AnyValue::Int16(v) => Some(f64::from(v)),
        AnyValue::Int32(v) => Some(f64::from(v)),
        AnyValue::Int64(v) => Some(v as f64),
        AnyValue::UInt8(v) => Some(f64::from(v)),
        AnyValue::UInt16(v) => Some(f64::from(v)),
        AnyValue::UInt32(v) => Some(f64::from(v)),
        AnyValue::UInt64(v) => Some(v as f64),
        AnyValue::Float32(v) => Some(f64::from(v)),
        AnyValue::Float64(v) => Some(v),
        AnyValue::String(s) => parse_f64(s),
        AnyValue::StringOwned(s) => parse_f64(&s),
        _ => None,
    }
}

/// Parses a string as `f64`, returning `None` for invalid or empty strings.
pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Builds a core collection from `frame`.
///
/// # Errors
///
/// Fails when the step column is missing or contains nulls, or when a
/// column cannot be cast to `Float64`.
pub fn collection_from_frame(frame: &DataFrame, options: &FrameOptions) -> Result<Collection> {
    let index: Vec<f64> = match &options.step_column {
        Some(name) => {
            let steps = frame
                .column(name)
                .with_context(|| format!("step column '{name}' not found"))?
                .cast(&DataType::Float64)
                .with_context(|| format!("step column '{name}' is not numeric"))?;
            let steps: Option<Vec<f64>> = steps.f64()?.into_iter().collect();
            match steps {
                Some(steps) => steps,
                None => bail!("step column '{name}' contains nulls"),
            }
        }
        None => (0..frame.height()).map(|i| i as f64).collect(),
    };

    let mut parts = CollectionParts::new(index);
    for column in frame.get_columns() {
        let name = column.name().as_str();
        if options.step_column.as_deref() == Some(name) {
            continue;
        }
        let values = if column.dtype() == &DataType::String {
            let texts: Vec<Option<String>> = column
                .str()?
                .into_iter()
                .map(|v| v.map(str::to_string))
                .collect();
            ColumnValues::Text(texts.into())
        } else {
            let cast = column
                .cast(&DataType::Float64)
                .with_context(|| format!("column '{name}' cannot be read as numbers"))?;
            let numbers: Vec<Option<f64>> = cast.f64()?.into_iter().collect();
            ColumnValues::Number(numbers.into())
        };
        parts = parts.with_column(
            Column::new(name, values).with_optional_unit(options.unit_of(name)),
        );
    }
    debug!(
        rows = frame.height(),
        columns = parts.columns.len(),
        "read collection from frame"
    );
    Collection::from_parts(parts).context("frame does not form a valid collection")
}

/// Writes `collection` as a frame: the step index first, then every
/// column in order. Units and domain fields are not carried.
///
/// # Errors
///
/// Fails when a column is named like the step column.
pub fn collection_to_frame(collection: &Collection) -> Result<DataFrame> {
    if collection.contains_column(STEP_COLUMN) {
        bail!("column '{STEP_COLUMN}' clashes with the step index");
    }
    let mut columns = Vec::with_capacity(collection.column_count() + 1);
    let steps: Vec<f64> = collection.index().iter().collect();
    columns.push(Series::new(STEP_COLUMN.into(), steps).into_column());
    for column in collection.columns() {
        let series = match column.values() {
            ColumnValues::Number(values) => Series::new(column.name().into(), values.to_vec()),
            ColumnValues::Text(values) => Series::new(column.name().into(), values.to_vec()),
        };
        columns.push(series.into_column());
    }
    DataFrame::new(columns).context("failed to build frame from collection")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_to_f64() {
        assert_eq!(any_to_f64(AnyValue::Null), None);
        assert_eq!(any_to_f64(AnyValue::Int32(42)), Some(42.0));
        assert_eq!(any_to_f64(AnyValue::Float64(2.5)), Some(2.5));
        assert_eq!(any_to_f64(AnyValue::String("2.5")), Some(2.5));
        assert_eq!(any_to_f64(AnyValue::String("invalid")), None);
    }

    #[test]
    fn test_parse_f64() {
        assert_eq!(parse_f64(""), None);
        assert_eq!(parse_f64("  1.25  "), Some(1.25));
        assert_eq!(parse_f64("invalid"), None);
    }
}
