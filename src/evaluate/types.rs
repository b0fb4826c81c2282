//! Data types produced by the scorer.

use serde::Serialize;

use crate::error::FileFailure;
use crate::evaluate::grade::Consistency;
use crate::evaluate::r2::R2;

/// R² of one reported column against its recomputed counterpart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnScore {
    pub ground_truth: String,
    pub computed: String,
    pub r2: R2,
}

/// Scores for one station; `average` covers scored columns only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationScore {
    pub station: String,
    pub columns: Vec<ColumnScore>,
    pub average: Option<f64>,
}

/// Outcome of scoring a whole batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreReport {
    pub stations: Vec<StationScore>,
    /// Stations that could not be read; excluded from the averages.
    pub failures: Vec<FileFailure>,
    pub global_average: Option<f64>,
    pub consistency: Consistency,
}

impl ScoreReport {
    /// R² of every scored column, station by station.
    pub fn per_column_r2(&self) -> Vec<f64> {
        self.stations
            .iter()
            .flat_map(|s| s.columns.iter().filter_map(|c| c.r2.value()))
            .collect()
    }

    pub fn summary(&self) -> Summary {
        Summary {
            r2: self.global_average,
            consistency: self.consistency,
        }
    }
}

/// Flat key-value record handed to the metrics sink.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    #[serde(rename = "R2")]
    pub r2: Option<f64>,
    #[serde(rename = "Consistency")]
    pub consistency: Consistency,
}
