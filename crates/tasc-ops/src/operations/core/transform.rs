//! Single-column transforms: trigonometry, exponentials, rounding and
//! normalization.
//!
//! Values outside a function's domain (`log` of non-positive numbers,
//! `sqrt` of negatives) become null instead of failing the call.

use std::f64::consts::E;

use tasc_model::{CORE_DOMAIN, Collection, Result, stats};

use crate::args::{BoundArgs, Param, ParamDefault, ParamKind};
use crate::operations::support::map_column;
use crate::registry::{OperationDef, OperationRegistry};

const UNARY: &[Param] = &[
    Param::required("column", ParamKind::Column),
    Param::optional("result_column", ParamKind::Column),
    Param::in_place(),
];

const TRIG: &[Param] = &[
    Param::required("column", ParamKind::Column),
    Param::optional("result_column", ParamKind::Column),
    Param::in_place(),
    Param::with_default("degrees", ParamKind::Bool, ParamDefault::Bool(false)),
];

const LOG: &[Param] = &[
    Param::required("column", ParamKind::Column),
    Param::with_default("base", ParamKind::Number, ParamDefault::Float(E)),
    Param::optional("result_column", ParamKind::Column),
    Param::in_place(),
];

const POW: &[Param] = &[
    Param::required("column", ParamKind::Column),
    Param::required("exponent", ParamKind::Number),
    Param::optional("result_column", ParamKind::Column),
    Param::in_place(),
];

const ROUND: &[Param] = &[
    Param::required("column", ParamKind::Column),
    Param::with_default("decimals", ParamKind::Integer, ParamDefault::Int(0)),
    Param::optional("result_column", ParamKind::Column),
    Param::in_place(),
];

const NORMALIZE: &[Param] = &[
    Param::required("column", ParamKind::Column),
    Param::optional("result_column", ParamKind::Column),
    Param::in_place(),
    Param::with_default("method", ParamKind::Text, ParamDefault::Text("minmax")),
];

fn trig(
    collection: Collection,
    args: &BoundArgs,
    name: &'static str,
    func: fn(f64) -> f64,
) -> Result<Collection> {
    let degrees = args.bool("degrees");
    map_column(
        collection,
        args,
        |c| format!("{name}({c})"),
        |v| Some(func(if degrees { v.to_radians() } else { v })),
    )
}

fn sin(collection: Collection, args: &BoundArgs) -> Result<Collection> {
    trig(collection, args, "sin", f64::sin)
}

fn cos(collection: Collection, args: &BoundArgs) -> Result<Collection> {
    trig(collection, args, "cos", f64::cos)
}

fn tan(collection: Collection, args: &BoundArgs) -> Result<Collection> {
    trig(collection, args, "tan", f64::tan)
}

fn exp(collection: Collection, args: &BoundArgs) -> Result<Collection> {
    map_column(collection, args, |c| format!("exp({c})"), |v| Some(v.exp()))
}

fn log(collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let base = args.f64("base")?;
    if base <= 0.0 || base == 1.0 {
        return Err(args.invalid("base", format!("{base} is not a valid logarithm base")));
    }
    let (prefix, func): (String, fn(f64, f64) -> f64) = if base == E {
        ("log".to_string(), |v, _| v.ln())
    } else if base == 10.0 {
        ("log10".to_string(), |v, _| v.log10())
    } else {
        (format!("log{}", args.label("base")), f64::log)
    };
    map_column(
        collection,
        args,
        |c| format!("{prefix}({c})"),
        |v| (v > 0.0).then(|| func(v, base)),
    )
}

fn sqrt(collection: Collection, args: &BoundArgs) -> Result<Collection> {
    map_column(
        collection,
        args,
        |c| format!("sqrt({c})"),
        |v| (v >= 0.0).then(|| v.sqrt()),
    )
}

fn pow(collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let exponent = args.f64("exponent")?;
    let label = args.label("exponent");
    map_column(
        collection,
        args,
        |c| format!("{c}^{label}"),
        |v| Some(v.powf(exponent)).filter(|r| !r.is_nan()),
    )
}

fn abs_values(collection: Collection, args: &BoundArgs) -> Result<Collection> {
    map_column(collection, args, |c| format!("abs({c})"), |v| Some(v.abs()))
}

fn round_values(collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let decimals = args.i64("decimals")?;
    let exponent = i32::try_from(decimals)
        .map_err(|_| args.invalid("decimals", format!("{decimals} is out of range")))?;
    let factor = 10f64.powi(exponent);
    map_column(
        collection,
        args,
        |c| format!("round({c}, {decimals})"),
        |v| Some((v * factor).round() / factor),
    )
}

/// Normalization method of `normalize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Normalization {
    MinMax,
    ZScore,
}

impl Normalization {
    fn as_str(self) -> &'static str {
        match self {
            Normalization::MinMax => "minmax",
            Normalization::ZScore => "zscore",
        }
    }
}

const MIN_SPREAD: f64 = 1e-10;

fn normalize(collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let method = match args.str("method")? {
        "minmax" => Normalization::MinMax,
        "zscore" => Normalization::ZScore,
        other => {
            return Err(args.invalid(
                "method",
                format!("unknown method {other:?}; expected minmax or zscore"),
            ));
        }
    };
    let values = collection.column(args.str("column")?)?.numbers()?;
    let scale: Box<dyn Fn(f64) -> f64> = match method {
        Normalization::MinMax => {
            match (
                stats::min_with_position(values),
                stats::max_with_position(values),
            ) {
                (Some((_, min)), Some((_, max))) if max - min > 0.0 => {
                    Box::new(move |v| (v - min) / (max - min))
                }
                _ => Box::new(|_| 0.5),
            }
        }
        Normalization::ZScore => match (stats::mean(values), stats::std(values)) {
            (Some(mean), Some(std)) if std >= MIN_SPREAD => Box::new(move |v| (v - mean) / std),
            _ => Box::new(|_| 0.0),
        },
    };
    map_column(
        collection,
        args,
        |c| format!("norm_{}({c})", method.as_str()),
        |v| Some(scale(v)),
    )
}

pub fn register(registry: &mut OperationRegistry) -> Result<()> {
    let operations: [(&str, &[Param], fn(Collection, &BoundArgs) -> Result<Collection>); 10] = [
        ("sin", TRIG, sin),
        ("cos", TRIG, cos),
        ("tan", TRIG, tan),
        ("exp", UNARY, exp),
        ("log", LOG, log),
        ("sqrt", UNARY, sqrt),
        ("pow", POW, pow),
        ("abs_values", UNARY, abs_values),
        ("round_values", ROUND, round_values),
        ("normalize", NORMALIZE, normalize),
    ];
    for (name, params, func) in operations {
        registry.register(name, CORE_DOMAIN, OperationDef::collection(params, func), false)?;
    }
    Ok(())
}
