//! Slopes and stiffness of load/displacement curves.

use serde_json::Value;
use tasc_domain::{LOAD_DISPLACEMENT_DOMAIN, LoadDisplacement};
use tasc_model::{Collection, Result};

use crate::args::{BoundArgs, Param, ParamDefault, ParamKind};
use crate::operations::load_displacement::valid_pairs;
use crate::operations::support::{json_number, numbers, result_name, unit_of, write_numeric};
use crate::registry::{OperationDef, OperationRegistry};

const CALCULATE_SLOPES: &[Param] = &[
    Param::optional("result_column", ParamKind::Column),
    Param::optional("x_column", ParamKind::Column),
    Param::optional("y_column", ParamKind::Column),
];

const CALCULATE_STIFFNESS: &[Param] = &[
    Param::with_default("range_start", ParamKind::Number, ParamDefault::Float(0.2)),
    Param::with_default("range_end", ParamKind::Number, ParamDefault::Float(0.8)),
    Param::with_default(
        "method",
        ParamKind::Text,
        ParamDefault::Text("linear_regression"),
    ),
];

/// Forward-difference slope `dy/dx` between consecutive rows. The first
/// row, rows next to a null and flat steps (`dx == 0`) are null.
fn calculate_slopes(mut collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let (x_name, y_name) = {
        let state = LoadDisplacement::of(&collection)?;
        (
            args.opt_str("x_column")
                .unwrap_or(state.displacement_column())
                .to_string(),
            args.opt_str("y_column")
                .unwrap_or(state.load_column())
                .to_string(),
        )
    };
    let x = numbers(&collection, &x_name)?;
    let y = numbers(&collection, &y_name)?;
    if x.len() < 2 {
        return Err(args.invalid("x_column", "at least two rows are required"));
    }
    let mut slopes = Vec::with_capacity(x.len());
    slopes.push(None);
    for position in 1..x.len() {
        let slope = match (x[position - 1], x[position], y[position - 1], y[position]) {
            (Some(x0), Some(x1), Some(y0), Some(y1)) if x1 != x0 => Some((y1 - y0) / (x1 - x0)),
            _ => None,
        };
        slopes.push(slope);
    }

    let unit = match (unit_of(&collection, &y_name), unit_of(&collection, &x_name)) {
        (Some(y_unit), Some(x_unit)) if !y_unit.is_empty() && !x_unit.is_empty() => {
            Some(format!("{y_unit}/{x_unit}"))
        }
        _ => None,
    };
    let name = result_name(args, || format!("slope_{y_name}_{x_name}"));
    write_numeric(&mut collection, &name, slopes, unit)?;
    Ok(collection)
}

/// Stiffness method of `calculate_stiffness`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StiffnessMethod {
    /// Least-squares slope of load over displacement.
    LinearRegression,
    /// Slope between the first and last point in range.
    Secant,
}

/// Least-squares slope through `points`, `None` without x spread.
fn regression_slope(points: &[(f64, f64)]) -> Option<f64> {
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let (covariance, variance) = points.iter().fold((0.0, 0.0), |(cov, var), (x, y)| {
        (cov + (x - mean_x) * (y - mean_y), var + (x - mean_x).powi(2))
    });
    (variance > 0.0).then(|| covariance / variance)
}

/// Initial stiffness over the load window `[range_start, range_end]` of
/// the peak load.
fn calculate_stiffness(collection: &Collection, args: &BoundArgs) -> Result<Value> {
    let method = match args.str("method")? {
        "linear_regression" => StiffnessMethod::LinearRegression,
        "secant" => StiffnessMethod::Secant,
        other => {
            return Err(args.invalid(
                "method",
                format!("unknown method {other:?}; expected linear_regression or secant"),
            ));
        }
    };
    let range_start = args.f64("range_start")?;
    let range_end = args.f64("range_end")?;
    let pairs = valid_pairs(collection)?;
    if pairs.len() < 2 {
        return Err(args.invalid("range_start", "not enough data to calculate stiffness"));
    }

    let peak = pairs
        .iter()
        .map(|&(_, load)| load)
        .fold(f64::NEG_INFINITY, f64::max);
    let (lower, upper) = (peak * range_start, peak * range_end);
    let in_range: Vec<(f64, f64)> = pairs
        .into_iter()
        .filter(|&(_, load)| lower <= load && load <= upper)
        .collect();
    if in_range.len() < 2 {
        return Err(args.invalid(
            "range_start",
            format!(
                "fewer than two points between {}% and {}% of the peak load",
                range_start * 100.0,
                range_end * 100.0
            ),
        ));
    }

    let stiffness = match method {
        StiffnessMethod::LinearRegression => regression_slope(&in_range),
        StiffnessMethod::Secant => {
            let (first, last) = (in_range[0], in_range[in_range.len() - 1]);
            (last.0 != first.0).then(|| (last.1 - first.1) / (last.0 - first.0))
        }
    };
    stiffness
        .map(json_number)
        .ok_or_else(|| args.invalid("method", "displacement does not vary within the load range"))
}

pub fn register(registry: &mut OperationRegistry) -> Result<()> {
    registry.register(
        "calculate_slopes",
        LOAD_DISPLACEMENT_DOMAIN,
        OperationDef::collection(CALCULATE_SLOPES, calculate_slopes),
        false,
    )?;
    registry.register(
        "calculate_stiffness",
        LOAD_DISPLACEMENT_DOMAIN,
        OperationDef::value(CALCULATE_STIFFNESS, calculate_stiffness),
        false,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regression_slope_of_a_line() {
        let points = [(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)];
        assert_eq!(regression_slope(&points), Some(2.0));
        assert_eq!(regression_slope(&[(1.0, 1.0), (1.0, 2.0)]), None);
    }
}
