//! Named, typed value sequences aligned to a step index.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Result, TascError};
use crate::stats::{self, Summary};

/// Storage of a column: nullable numbers or nullable text.
///
/// Storage is reference counted and copy-on-write, so cloning a column is
/// cheap and writing to a clone never affects the original.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Number(Arc<Vec<Option<f64>>>),
    Text(Arc<Vec<Option<String>>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Number(values) => values.len(),
            ColumnValues::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            ColumnValues::Number(_) => ValueKind::Number,
            ColumnValues::Text(_) => ValueKind::Text,
        }
    }

    /// Null-filled storage of the same kind.
    pub fn nulls(kind: ValueKind, len: usize) -> Self {
        match kind {
            ValueKind::Number => ColumnValues::Number(Arc::new(vec![None; len])),
            ValueKind::Text => ColumnValues::Text(Arc::new(vec![None; len])),
        }
    }

    fn take(&self, positions: &[usize]) -> Self {
        match self {
            ColumnValues::Number(values) => {
                ColumnValues::Number(Arc::new(positions.iter().map(|&p| values[p]).collect()))
            }
            ColumnValues::Text(values) => ColumnValues::Text(Arc::new(
                positions.iter().map(|&p| values[p].clone()).collect(),
            )),
        }
    }

    fn cell(&self, position: usize) -> Option<CellValue> {
        match self {
            ColumnValues::Number(values) => values
                .get(position)
                .map(|v| v.map_or(CellValue::Null, CellValue::Number)),
            ColumnValues::Text(values) => values.get(position).map(|v| {
                v.as_ref()
                    .map_or(CellValue::Null, |text| CellValue::Text(text.clone()))
            }),
        }
    }
}

/// Value type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    Text,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Number => "number",
            ValueKind::Text => "text",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell read from a column.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Null,
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl From<CellValue> for Value {
    fn from(cell: CellValue) -> Self {
        match cell {
            CellValue::Number(value) => serde_json::Number::from_f64(value)
                .map_or(Value::Null, Value::Number),
            CellValue::Text(text) => Value::String(text),
            CellValue::Null => Value::Null,
        }
    }
}

/// A named column with channel id and unit.
///
/// Equality compares channel, name, unit and values; null equals null.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    channel: Option<String>,
    name: String,
    unit: Option<String>,
    values: ColumnValues,
}

impl Column {
    pub fn new(name: impl Into<String>, values: ColumnValues) -> Self {
        Self {
            channel: None,
            name: name.into(),
            unit: None,
            values,
        }
    }

    /// Numeric column with nullable entries.
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self::new(name, ColumnValues::Number(Arc::new(values)))
    }

    /// Numeric column without nulls.
    pub fn from_values(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::numeric(name, values.into_iter().map(Some).collect())
    }

    /// Text column with nullable entries.
    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self::new(name, ColumnValues::Text(Arc::new(values)))
    }

    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn with_optional_unit(mut self, unit: Option<String>) -> Self {
        self.unit = unit;
        self
    }

    /// Same column under another name.
    #[must_use]
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    pub fn kind(&self) -> ValueKind {
        self.values.kind()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.values, ColumnValues::Number(_))
    }

    pub fn as_numbers(&self) -> Option<&[Option<f64>]> {
        match &self.values {
            ColumnValues::Number(values) => Some(values.as_slice()),
            ColumnValues::Text(_) => None,
        }
    }

    pub fn as_texts(&self) -> Option<&[Option<String>]> {
        match &self.values {
            ColumnValues::Text(values) => Some(values.as_slice()),
            ColumnValues::Number(_) => None,
        }
    }

    /// Numeric values, or a column-type error for text columns.
    pub fn numbers(&self) -> Result<&[Option<f64>]> {
        self.as_numbers().ok_or_else(|| TascError::ColumnType {
            column: self.name.clone(),
        })
    }

    /// Mutable numeric storage; copies it first when shared.
    pub fn numbers_mut(&mut self) -> Result<&mut Vec<Option<f64>>> {
        match &mut self.values {
            ColumnValues::Number(values) => Ok(Arc::make_mut(values)),
            ColumnValues::Text(_) => Err(TascError::ColumnType {
                column: self.name.clone(),
            }),
        }
    }

    /// Cell at `position`, or an out-of-range error.
    pub fn get(&self, position: usize) -> Result<CellValue> {
        self.values
            .cell(position)
            .ok_or(TascError::IndexOutOfRange {
                position,
                len: self.len(),
            })
    }

    /// Column holding the values at `positions`. Positions must be in range.
    pub fn take(&self, positions: &[usize]) -> Self {
        Self {
            channel: self.channel.clone(),
            name: self.name.clone(),
            unit: self.unit.clone(),
            values: self.values.take(positions),
        }
    }

    /// True when both columns point at the same value storage.
    pub fn shares_storage(&self, other: &Column) -> bool {
        match (&self.values, &other.values) {
            (ColumnValues::Number(a), ColumnValues::Number(b)) => Arc::ptr_eq(a, b),
            (ColumnValues::Text(a), ColumnValues::Text(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn count(&self) -> Result<usize> {
        Ok(stats::count(self.numbers()?))
    }

    pub fn sum(&self) -> Result<Option<f64>> {
        Ok(stats::sum(self.numbers()?))
    }

    pub fn mean(&self) -> Result<Option<f64>> {
        Ok(stats::mean(self.numbers()?))
    }

    /// Population standard deviation.
    pub fn std(&self) -> Result<Option<f64>> {
        Ok(stats::std(self.numbers()?))
    }

    /// Quantile for `q` in `[0, 1]`.
    pub fn quantile(&self, q: f64) -> Result<Option<f64>> {
        if !(0.0..=1.0).contains(&q) {
            return Err(TascError::invalid_argument(
                "quantile",
                "q",
                format!("{q} is outside [0, 1]"),
            ));
        }
        Ok(stats::quantile(self.numbers()?, q))
    }

    /// Minimum value with its position.
    pub fn min(&self) -> Result<Option<(usize, f64)>> {
        Ok(stats::min_with_position(self.numbers()?))
    }

    /// Maximum value with its position.
    pub fn max(&self) -> Result<Option<(usize, f64)>> {
        Ok(stats::max_with_position(self.numbers()?))
    }

    pub fn summary(&self) -> Result<Summary> {
        Ok(Summary::of(self.numbers()?))
    }
}
