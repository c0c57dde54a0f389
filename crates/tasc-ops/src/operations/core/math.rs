//! Element-wise arithmetic between a column and a column or a scalar.
//!
//! Nulls propagate: a null on either side yields a null result.

use tasc_model::{CORE_DOMAIN, Collection, Result};

use crate::args::{BoundArgs, Operand, Param, ParamDefault, ParamKind};
use crate::operations::support::{result_name, unit_of, write_numeric};
use crate::registry::{OperationDef, OperationRegistry};

const BINARY: &[Param] = &[
    Param::required("column1", ParamKind::Column),
    Param::required("column2_or_value", ParamKind::ColumnOrNumber),
    Param::optional("result_column", ParamKind::Column),
    Param::in_place(),
];

const DIVIDE: &[Param] = &[
    Param::required("column1", ParamKind::Column),
    Param::required("column2_or_value", ParamKind::ColumnOrNumber),
    Param::optional("result_column", ParamKind::Column),
    Param::in_place(),
    Param::with_default(
        "handle_zero_division",
        ParamKind::Text,
        ParamDefault::Text("error"),
    ),
];

/// Behaviour of `divide` when the divisor is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZeroDivision {
    Error,
    Null,
    Infinity,
}

impl ZeroDivision {
    fn parse(args: &BoundArgs) -> Result<Self> {
        match args.str("handle_zero_division")? {
            "error" => Ok(ZeroDivision::Error),
            "none" => Ok(ZeroDivision::Null),
            "inf" => Ok(ZeroDivision::Infinity),
            other => Err(args.invalid(
                "handle_zero_division",
                format!("unknown mode {other:?}; expected error, none or inf"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arithmetic {
    Add,
    Subtract,
    Multiply,
    Divide(ZeroDivision),
}

impl Arithmetic {
    fn apply(self, left: f64, right: f64, args: &BoundArgs) -> Result<Option<f64>> {
        let value = match self {
            Arithmetic::Add => left + right,
            Arithmetic::Subtract => left - right,
            Arithmetic::Multiply => left * right,
            Arithmetic::Divide(mode) if right == 0.0 => match mode {
                ZeroDivision::Error => {
                    return Err(args.invalid("column2_or_value", "division by zero"));
                }
                ZeroDivision::Null => return Ok(None),
                ZeroDivision::Infinity => left / right,
            },
            Arithmetic::Divide(_) => left / right,
        };
        Ok(Some(value))
    }

    fn default_name(self, left: &str, right: &str, scalar: bool) -> String {
        match self {
            Arithmetic::Add => format!("{left}+{right}"),
            Arithmetic::Subtract => format!("{left}-{right}"),
            Arithmetic::Multiply if scalar && left.contains(['+', '-', '*', '/']) => {
                format!("({left})*{right}")
            }
            Arithmetic::Multiply => format!("{left}*{right}"),
            Arithmetic::Divide(_) => format!("{left}/{right}"),
        }
    }
}

fn binary(mut collection: Collection, args: &BoundArgs, op: Arithmetic) -> Result<Collection> {
    let left_name = args.str("column1")?;
    let left = collection.column(left_name)?.numbers()?;
    let operand = args.operand("column2_or_value")?;
    let values = match operand {
        Operand::Column(right_name) => {
            let right = collection.column(right_name)?.numbers()?;
            left.iter()
                .zip(right)
                .map(|pair| match pair {
                    (Some(l), Some(r)) => op.apply(*l, *r, args),
                    _ => Ok(None),
                })
                .collect::<Result<Vec<_>>>()?
        }
        Operand::Scalar(right) => left
            .iter()
            .map(|l| match l {
                Some(l) => op.apply(*l, right, args),
                None => Ok(None),
            })
            .collect::<Result<Vec<_>>>()?,
    };
    let scalar = matches!(operand, Operand::Scalar(_));
    let name = result_name(args, || {
        op.default_name(left_name, &args.label("column2_or_value"), scalar)
    });
    let unit = unit_of(&collection, left_name);
    write_numeric(&mut collection, &name, values, unit)?;
    Ok(collection)
}

fn add(collection: Collection, args: &BoundArgs) -> Result<Collection> {
    binary(collection, args, Arithmetic::Add)
}

fn subtract(collection: Collection, args: &BoundArgs) -> Result<Collection> {
    binary(collection, args, Arithmetic::Subtract)
}

fn multiply(collection: Collection, args: &BoundArgs) -> Result<Collection> {
    binary(collection, args, Arithmetic::Multiply)
}

fn divide(collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let mode = ZeroDivision::parse(args)?;
    binary(collection, args, Arithmetic::Divide(mode))
}

pub fn register(registry: &mut OperationRegistry) -> Result<()> {
    registry.register("add", CORE_DOMAIN, OperationDef::collection(BINARY, add), false)?;
    registry.register(
        "subtract",
        CORE_DOMAIN,
        OperationDef::collection(BINARY, subtract),
        false,
    )?;
    registry.register(
        "multiply",
        CORE_DOMAIN,
        OperationDef::collection(BINARY, multiply),
        false,
    )?;
    registry.register("divide", CORE_DOMAIN, OperationDef::collection(DIVIDE, divide), false)?;
    Ok(())
}
