//! Helpers shared by the built-in operations.

use serde_json::Value;
use tasc_model::{Collection, Column, Result};

use crate::args::BoundArgs;

pub(crate) const RESULT_COLUMN: &str = "result_column";

/// `result_column` when given, else the derived default.
pub(crate) fn result_name(args: &BoundArgs, default: impl FnOnce() -> String) -> String {
    args.opt_str(RESULT_COLUMN)
        .map_or_else(default, str::to_string)
}

/// Store `values` under `name`, replacing an existing column in place.
pub(crate) fn write_numeric(
    collection: &mut Collection,
    name: &str,
    values: Vec<Option<f64>>,
    unit: Option<String>,
) -> Result<()> {
    collection.set_column(Column::numeric(name, values).with_optional_unit(unit))
}

/// Apply `func` to every non-null value of the `column` argument.
///
/// The result column inherits the source unit.
pub(crate) fn map_column<F>(
    mut collection: Collection,
    args: &BoundArgs,
    default_name: impl FnOnce(&str) -> String,
    func: F,
) -> Result<Collection>
where
    F: Fn(f64) -> Option<f64>,
{
    let source = args.str("column")?;
    let column = collection.column(source)?;
    let values = column
        .numbers()?
        .iter()
        .map(|value| value.and_then(&func))
        .collect();
    let unit = column.unit().map(str::to_string);
    let name = result_name(args, || default_name(source));
    write_numeric(&mut collection, &name, values, unit)?;
    Ok(collection)
}

/// Numeric column values; text columns are rejected.
pub(crate) fn numbers<'a>(collection: &'a Collection, name: &str) -> Result<&'a [Option<f64>]> {
    collection.column(name)?.numbers()
}

pub(crate) fn unit_of(collection: &Collection, name: &str) -> Option<String> {
    collection
        .get_column(name)
        .and_then(Column::unit)
        .map(str::to_string)
}

/// JSON number, or null for non-finite values.
pub(crate) fn json_number(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}

pub(crate) fn json_optional(value: Option<f64>) -> Value {
    value.map_or(Value::Null, json_number)
}

/// Positions whose value satisfies `keep`; nulls never match.
pub(crate) fn matching_rows(values: &[Option<f64>], keep: impl Fn(f64) -> bool) -> Vec<usize> {
    values
        .iter()
        .enumerate()
        .filter_map(|(position, value)| value.filter(|v| keep(*v)).map(|_| position))
        .collect()
}

/// Append `message` to the `warnings` list in the collection metadata.
pub(crate) fn push_warning(collection: &mut Collection, message: String) {
    let warnings = collection
        .metadata_mut()
        .entry("warnings".to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    match warnings {
        Value::Array(items) => items.push(Value::String(message)),
        other => *other = Value::Array(vec![Value::String(message)]),
    }
}

/// Comparison operators accepted by search and selection operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Comparison {
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    Equal,
    NotEqual,
}

impl Comparison {
    pub(crate) fn parse(args: &BoundArgs, parameter: &str) -> Result<Self> {
        let symbol = args.str(parameter)?;
        match symbol {
            ">" => Ok(Comparison::Greater),
            "<" => Ok(Comparison::Less),
            ">=" => Ok(Comparison::GreaterEqual),
            "<=" => Ok(Comparison::LessEqual),
            "==" => Ok(Comparison::Equal),
            "!=" => Ok(Comparison::NotEqual),
            other => Err(args.invalid(
                parameter,
                format!("unknown operator {other:?}; expected one of >, <, >=, <=, ==, !="),
            )),
        }
    }

    pub(crate) fn holds(self, left: f64, right: f64) -> bool {
        match self {
            Comparison::Greater => left > right,
            Comparison::Less => left < right,
            Comparison::GreaterEqual => left >= right,
            Comparison::LessEqual => left <= right,
            Comparison::Equal => left == right,
            Comparison::NotEqual => left != right,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Comparison::Greater => ">",
            Comparison::Less => "<",
            Comparison::GreaterEqual => ">=",
            Comparison::LessEqual => "<=",
            Comparison::Equal => "==",
            Comparison::NotEqual => "!=",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_rows_skips_nulls() {
        let values = [Some(1.0), None, Some(3.0), Some(-1.0)];
        assert_eq!(matching_rows(&values, |v| v > 0.0), vec![0, 2]);
    }

    #[test]
    fn warnings_accumulate() {
        let mut collection = Collection::empty();
        push_warning(&mut collection, "first".into());
        push_warning(&mut collection, "second".into());
        assert_eq!(
            collection.metadata()["warnings"],
            serde_json::json!(["first", "second"])
        );
    }

    #[test]
    fn non_finite_numbers_become_null() {
        assert_eq!(json_number(f64::NAN), Value::Null);
        assert_eq!(json_number(2.5), serde_json::json!(2.5));
    }
}
