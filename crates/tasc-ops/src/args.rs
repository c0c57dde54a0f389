//! Operation parameters and argument binding.
//!
//! Every operation declares an ordered list of [`Param`]s. Call sites pass
//! [`Args`] (positional and keyword JSON values), which [`bind`] checks
//! against the declaration before the operation runs. Defaults are filled
//! in, so operations read every declared parameter from [`BoundArgs`].

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tasc_model::{Kwargs, Result, TascError};

/// Name of the in-place flag accepted by mutating operations.
pub const IN_PLACE: &str = "in_place";

/// Semantic type category of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// A column name.
    Column,
    /// A list of column names (a single name is accepted).
    Columns,
    /// A column name or a number.
    ColumnOrNumber,
    Number,
    Numbers,
    Integer,
    Integers,
    Bool,
    Text,
    /// Any JSON value.
    Json,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::Column => "column",
            ParamKind::Columns => "columns",
            ParamKind::ColumnOrNumber => "column_or_number",
            ParamKind::Number => "number",
            ParamKind::Numbers => "numbers",
            ParamKind::Integer => "integer",
            ParamKind::Integers => "integers",
            ParamKind::Bool => "bool",
            ParamKind::Text => "text",
            ParamKind::Json => "json",
        }
    }

    /// Whether a non-null `value` fits this category.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamKind::Column | ParamKind::Text => value.is_string(),
            ParamKind::Columns => {
                value.is_string()
                    || value
                        .as_array()
                        .is_some_and(|items| items.iter().all(Value::is_string))
            }
            ParamKind::ColumnOrNumber => value.is_string() || value.is_number(),
            ParamKind::Number => value.is_number(),
            ParamKind::Numbers => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_number)),
            ParamKind::Integer => is_integer(value),
            ParamKind::Integers => value
                .as_array()
                .is_some_and(|items| items.iter().all(is_integer)),
            ParamKind::Bool => value.is_boolean(),
            ParamKind::Json => true,
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_integer(value: &Value) -> bool {
    value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|v| v.fract() == 0.0)
}

/// Default value of an optional parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDefault {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(&'static str),
}

impl ParamDefault {
    pub fn to_value(self) -> Value {
        match self {
            ParamDefault::Null => Value::Null,
            ParamDefault::Bool(value) => Value::Bool(value),
            ParamDefault::Int(value) => Value::from(value),
            ParamDefault::Float(value) => Value::from(value),
            ParamDefault::Text(value) => Value::from(value),
        }
    }
}

impl fmt::Display for ParamDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamDefault::Null => f.write_str("null"),
            ParamDefault::Bool(value) => write!(f, "{value}"),
            ParamDefault::Int(value) => write!(f, "{value}"),
            ParamDefault::Float(value) => write!(f, "{value:?}"),
            ParamDefault::Text(value) => write!(f, "{value:?}"),
        }
    }
}

/// A declared operation parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: Option<ParamDefault>,
}

impl Param {
    pub const fn required(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            default: None,
        }
    }

    /// Optional parameter defaulting to null.
    pub const fn optional(name: &'static str, kind: ParamKind) -> Self {
        Self::with_default(name, kind, ParamDefault::Null)
    }

    pub const fn with_default(name: &'static str, kind: ParamKind, default: ParamDefault) -> Self {
        Self {
            name,
            kind,
            default: Some(default),
        }
    }

    /// The `in_place` flag, defaulting to false.
    pub const fn in_place() -> Self {
        Self::with_default(IN_PLACE, ParamKind::Bool, ParamDefault::Bool(false))
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.kind)?;
        if let Some(default) = self.default {
            write!(f, " = {default}")?;
        }
        Ok(())
    }
}

/// Positional and keyword arguments of one call.
///
/// # Example
///
/// ```ignore
/// let args = Args::new().arg("A").arg(10).kwarg("result_column", "B");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    positional: Vec<Value>,
    keyword: IndexMap<String, Value>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    /// Request in-place execution.
    #[must_use]
    pub fn in_place(self) -> Self {
        self.kwarg(IN_PLACE, true)
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn keyword(&self) -> &IndexMap<String, Value> {
        &self.keyword
    }

    /// Keyword arguments only, as domain keyword arguments.
    pub fn to_kwargs(&self) -> Kwargs {
        self.keyword.clone()
    }
}

impl From<Kwargs> for Args {
    fn from(keyword: Kwargs) -> Self {
        Self {
            positional: Vec::new(),
            keyword,
        }
    }
}

/// Bind `args` to the declared `params` of `operation`.
///
/// # Errors
///
/// [`TascError::InvalidArgument`] for surplus positionals, unknown or
/// duplicated keywords, missing required parameters and values of the
/// wrong category.
pub fn bind(operation: &str, params: &[Param], args: &Args) -> Result<BoundArgs> {
    let invalid = |parameter: &str, message: String| {
        TascError::invalid_argument(operation, parameter, message)
    };

    if args.positional.len() > params.len() {
        return Err(invalid(
            "*args",
            format!(
                "takes at most {} positional arguments, got {}",
                params.len(),
                args.positional.len()
            ),
        ));
    }

    let mut values: IndexMap<&'static str, Value> = IndexMap::with_capacity(params.len());
    for (param, value) in params.iter().zip(&args.positional) {
        values.insert(param.name, value.clone());
    }
    for (name, value) in &args.keyword {
        let param = params
            .iter()
            .find(|p| p.name == name.as_str())
            .ok_or_else(|| invalid(name.as_str(), "unknown keyword argument".to_string()))?;
        if values.insert(param.name, value.clone()).is_some() {
            return Err(invalid(name.as_str(), "argument given twice".to_string()));
        }
    }

    let mut bound = IndexMap::with_capacity(params.len());
    for param in params {
        let value = values.swap_remove(param.name).unwrap_or(Value::Null);
        let value = match (value, param.default) {
            (Value::Null, None) => {
                return Err(invalid(param.name, "missing required argument".to_string()));
            }
            (Value::Null, Some(default)) => default.to_value(),
            (value, _) => {
                if !param.kind.accepts(&value) {
                    return Err(invalid(
                        param.name,
                        format!("expected {}, got {value}", param.kind),
                    ));
                }
                value
            }
        };
        bound.insert(param.name, value);
    }

    Ok(BoundArgs {
        operation: operation.to_string(),
        values: bound,
    })
}

static NULL: Value = Value::Null;

/// Column name or scalar operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand<'a> {
    Column(&'a str),
    Scalar(f64),
}

/// Arguments after binding: every declared parameter has a value.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArgs {
    operation: String,
    values: IndexMap<&'static str, Value>,
}

impl BoundArgs {
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Bound value; null for undeclared names.
    pub fn value(&self, name: &str) -> &Value {
        self.values.get(name).unwrap_or(&NULL)
    }

    /// Error naming this operation and `parameter`.
    pub fn invalid(&self, parameter: &str, message: impl Into<String>) -> TascError {
        TascError::invalid_argument(&self.operation, parameter, message)
    }

    pub fn in_place(&self) -> bool {
        self.value(IN_PLACE).as_bool().unwrap_or(false)
    }

    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.value(name).as_str()
    }

    pub fn str(&self, name: &str) -> Result<&str> {
        self.opt_str(name)
            .ok_or_else(|| self.invalid(name, "expected a string"))
    }

    pub fn opt_f64(&self, name: &str) -> Option<f64> {
        self.value(name).as_f64()
    }

    pub fn f64(&self, name: &str) -> Result<f64> {
        self.opt_f64(name)
            .ok_or_else(|| self.invalid(name, "expected a number"))
    }

    pub fn opt_i64(&self, name: &str) -> Option<i64> {
        let value = self.value(name);
        value
            .as_i64()
            .or_else(|| value.as_f64().filter(|v| v.fract() == 0.0).map(|v| v as i64))
    }

    pub fn i64(&self, name: &str) -> Result<i64> {
        self.opt_i64(name)
            .ok_or_else(|| self.invalid(name, "expected an integer"))
    }

    pub fn opt_usize(&self, name: &str) -> Result<Option<usize>> {
        match self.opt_i64(name) {
            None => Ok(None),
            Some(value) => usize::try_from(value)
                .map(Some)
                .map_err(|_| self.invalid(name, format!("{value} is negative"))),
        }
    }

    pub fn usize(&self, name: &str) -> Result<usize> {
        self.opt_usize(name)?
            .ok_or_else(|| self.invalid(name, "expected an integer"))
    }

    pub fn bool(&self, name: &str) -> bool {
        self.value(name).as_bool().unwrap_or(false)
    }

    /// Column names; a single string is a one-element list.
    pub fn strings(&self, name: &str) -> Option<Vec<String>> {
        match self.value(name) {
            Value::String(value) => Some(vec![value.clone()]),
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            ),
            _ => None,
        }
    }

    pub fn numbers(&self, name: &str) -> Option<Vec<f64>> {
        self.value(name)
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_f64).collect())
    }

    pub fn integers(&self, name: &str) -> Option<Vec<i64>> {
        self.value(name).as_array().map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_i64().or_else(|| item.as_f64().map(|v| v as i64)))
                .collect()
        })
    }

    pub fn operand(&self, name: &str) -> Result<Operand<'_>> {
        match self.value(name) {
            Value::String(column) => Ok(Operand::Column(column.as_str())),
            value => value
                .as_f64()
                .map(Operand::Scalar)
                .ok_or_else(|| self.invalid(name, "expected a column name or number")),
        }
    }

    /// Text rendering of an argument for derived column names.
    pub fn label(&self, name: &str) -> String {
        match self.value(name) {
            Value::String(value) => value.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: &[Param] = &[
        Param::required("column", ParamKind::Column),
        Param::with_default("window_size", ParamKind::Integer, ParamDefault::Int(3)),
        Param::optional("result_column", ParamKind::Column),
        Param::in_place(),
    ];

    #[test]
    fn positional_and_keyword_binding() {
        let args = Args::new().arg("A").kwarg("result_column", "B");
        let bound = bind("op", PARAMS, &args).unwrap();
        assert_eq!(bound.str("column").unwrap(), "A");
        assert_eq!(bound.usize("window_size").unwrap(), 3);
        assert_eq!(bound.opt_str("result_column"), Some("B"));
        assert!(!bound.in_place());
    }

    #[test]
    fn missing_required_argument() {
        let err = bind("op", PARAMS, &Args::new()).unwrap_err();
        assert_eq!(
            err,
            TascError::invalid_argument("op", "column", "missing required argument")
        );
    }

    #[test]
    fn unknown_and_duplicate_keywords() {
        let err = bind("op", PARAMS, &Args::new().arg("A").kwarg("colour", 1)).unwrap_err();
        assert!(matches!(
            err,
            TascError::InvalidArgument { parameter, .. } if parameter == "colour"
        ));

        let err = bind("op", PARAMS, &Args::new().arg("A").kwarg("column", "B")).unwrap_err();
        assert!(matches!(
            err,
            TascError::InvalidArgument { parameter, .. } if parameter == "column"
        ));
    }

    #[test]
    fn wrong_category_is_rejected() {
        let err = bind("op", PARAMS, &Args::new().arg("A").arg("three")).unwrap_err();
        assert!(matches!(
            err,
            TascError::InvalidArgument { parameter, .. } if parameter == "window_size"
        ));
    }

    #[test]
    fn too_many_positionals() {
        let args = Args::new().arg("A").arg(3).arg("B").arg(true).arg(1);
        assert!(bind("op", PARAMS, &args).is_err());
    }

    #[test]
    fn param_display() {
        let rendered: Vec<String> = PARAMS.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "column: column",
                "window_size: integer = 3",
                "result_column: column = null",
                "in_place: bool = false",
            ]
        );
    }
}
