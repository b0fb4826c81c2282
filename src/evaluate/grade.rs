use serde::Serialize;
use std::fmt;

/// Verdict on whether recomputed and reported monthly series agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Consistency {
    #[serde(rename = "C")]
    Consistent,
    #[serde(rename = "NC")]
    NotConsistent,
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Consistency::Consistent => write!(f, "C"),
            Consistency::NotConsistent => write!(f, "NC"),
        }
    }
}

/// Classifies a global R² against `threshold`.
///
/// | Score             | Verdict |
/// |-------------------|---------|
/// | > threshold       | C       |
/// | <= threshold      | NC      |
/// | unscored          | NC      |
pub fn classify(score: Option<f64>, threshold: f64) -> Consistency {
    match score {
        Some(s) if s > threshold => Consistency::Consistent,
        _ => Consistency::NotConsistent,
    }
}
