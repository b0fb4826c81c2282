use serde::Serialize;

use crate::utility::{mean, sum_sq_dev, sum_sq_residual};

/// Result of scoring one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum R2 {
    Score(f64),
    /// Fewer than two ground-truth months were available.
    TooFewPoints(usize),
    /// Every selected ground-truth value was identical.
    ZeroVariance,
}

impl R2 {
    pub fn value(&self) -> Option<f64> {
        match self {
            R2::Score(v) => Some(*v),
            _ => None,
        }
    }
}

/// Coefficient of determination of `predicted` against `observed`:
/// `1 - SS_res / SS_tot`.
///
/// Degenerate selections are reported as unscored rather than as NaN or an
/// arbitrary constant.
pub fn r2_score(observed: &[f64], predicted: &[f64]) -> R2 {
    debug_assert_eq!(observed.len(), predicted.len());

    if observed.len() < 2 {
        return R2::TooFewPoints(observed.len());
    }

    let ss_tot = sum_sq_dev(observed, mean(observed));
    if ss_tot == 0.0 {
        return R2::ZeroVariance;
    }

    R2::Score(1.0 - sum_sq_residual(observed, predicted) / ss_tot)
}
