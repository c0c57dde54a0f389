//! Null-skipping reductions over numeric sequences.
//!
//! All functions ignore `None` entries. A reduction over a sequence with no
//! present values returns `None`.

use serde::{Deserialize, Serialize};

/// Number of present (non-null) values.
pub fn count(values: &[Option<f64>]) -> usize {
    values.iter().flatten().count()
}

pub fn sum(values: &[Option<f64>]) -> Option<f64> {
    let mut present = values.iter().flatten().peekable();
    present.peek()?;
    Some(present.sum())
}

pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    let n = count(values);
    if n == 0 {
        return None;
    }
    sum(values).map(|total| total / n as f64)
}

/// Population standard deviation (divisor `n`).
pub fn std(values: &[Option<f64>]) -> Option<f64> {
    let avg = mean(values)?;
    let n = count(values) as f64;
    let variance = values
        .iter()
        .flatten()
        .map(|v| (v - avg).powi(2))
        .sum::<f64>()
        / n;
    Some(variance.sqrt())
}

/// Quantile with linear interpolation between closest ranks.
///
/// `q` is expected in `[0, 1]`; values outside are clamped.
pub fn quantile(values: &[Option<f64>], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let q = q.clamp(0.0, 1.0);
    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Smallest present value and its first position.
pub fn min_with_position(values: &[Option<f64>]) -> Option<(usize, f64)> {
    extreme(values, |candidate, best| candidate < best)
}

/// Largest present value and its first position.
pub fn max_with_position(values: &[Option<f64>]) -> Option<(usize, f64)> {
    extreme(values, |candidate, best| candidate > best)
}

fn extreme(values: &[Option<f64>], better: impl Fn(f64, f64) -> bool) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (position, value) in values.iter().enumerate() {
        let Some(value) = *value else { continue };
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if !better(value, current) => {}
            _ => best = Some((position, value)),
        }
    }
    best
}

/// Descriptive statistics for one numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Summary {
    pub fn of(values: &[Option<f64>]) -> Self {
        Self {
            count: count(values),
            mean: mean(values),
            std: std(values),
            min: min_with_position(values).map(|(_, v)| v),
            max: max_with_position(values).map(|(_, v)| v),
        }
    }
}
