use std::sync::Arc;

use crate::error::{Result, TascError};

/// Ordered step identifiers shared by every column of a collection.
///
/// Steps need not be contiguous or integral. Storage is shared between
/// clones; the sequence itself is never re-ordered in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepIndex {
    steps: Arc<Vec<f64>>,
}

impl StepIndex {
    pub fn new(steps: Vec<f64>) -> Self {
        Self {
            steps: Arc::new(steps),
        }
    }

    /// `0, 1, ..., len - 1`.
    pub fn sequential(len: usize) -> Self {
        Self::new((0..len).map(|i| i as f64).collect())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.steps
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.steps.iter().copied()
    }

    /// Step at `position`, or an out-of-range error.
    pub fn get(&self, position: usize) -> Result<f64> {
        self.steps
            .get(position)
            .copied()
            .ok_or(TascError::IndexOutOfRange {
                position,
                len: self.len(),
            })
    }

    /// Position of the first step equal to `step`.
    pub fn position(&self, step: f64) -> Option<usize> {
        self.steps.iter().position(|s| *s == step)
    }

    /// New index holding the steps at `positions`, in that order.
    ///
    /// Positions must be in range; callers validate them first.
    pub fn take(&self, positions: &[usize]) -> Self {
        Self::new(positions.iter().map(|&p| self.steps[p]).collect())
    }

    /// True when both indexes point at the same storage.
    pub fn shares_storage(&self, other: &StepIndex) -> bool {
        Arc::ptr_eq(&self.steps, &other.steps)
    }
}

impl From<Vec<f64>> for StepIndex {
    fn from(steps: Vec<f64>) -> Self {
        Self::new(steps)
    }
}

impl From<Vec<i64>> for StepIndex {
    fn from(steps: Vec<i64>) -> Self {
        Self::new(steps.into_iter().map(|s| s as f64).collect())
    }
}

impl FromIterator<f64> for StepIndex {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
