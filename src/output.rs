//! Output formatting and persistence for evaluation results.
//!
//! Supports pretty-printing, a JSON metrics summary, and a CSV history that
//! grows by one row per evaluation.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::evaluate::{Consistency, ScoreReport, Summary};
use csv::WriterBuilder;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// Destination for the flat `{R2, Consistency}` summary of a run.
pub trait SummarySink {
    fn record(&mut self, summary: &Summary) -> Result<()>;
}

/// Writes the summary as a JSON object, replacing any previous one.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `metrics.json` inside `eval_dir`.
    pub fn in_dir(eval_dir: &Path) -> Self {
        Self::new(eval_dir.join("metrics.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SummarySink for JsonFileSink {
    fn record(&mut self, summary: &Summary) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(summary)?)?;
        debug!(path = %self.path.display(), "Summary written");
        Ok(())
    }
}

/// Keeps summaries in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<Summary>,
}

impl SummarySink for MemorySink {
    fn record(&mut self, summary: &Summary) -> Result<()> {
        self.records.push(*summary);
        Ok(())
    }
}

/// One row of the evaluation history CSV.
#[derive(Debug, Serialize)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub stations: usize,
    pub scored_stations: usize,
    pub failures: usize,
    pub r2: Option<f64>,
    pub consistency: Consistency,
}

impl HistoryRecord {
    pub fn from_report(report: &ScoreReport) -> Self {
        Self {
            timestamp: Utc::now(),
            stations: report.stations.len(),
            scored_stations: report
                .stations
                .iter()
                .filter(|s| s.average.is_some())
                .count(),
            failures: report.failures.len(),
            r2: report.global_average,
            consistency: report.consistency,
        }
    }
}

/// Logs the report using Rust's debug pretty-print format.
pub fn print_pretty(report: &ScoreReport) {
    debug!("{:#?}", report);
}

/// Logs per-station scores and the summary as pretty-printed JSON.
pub fn print_json(report: &ScoreReport) -> Result<()> {
    for station in &report.stations {
        info!("{}", serde_json::to_string_pretty(station)?);
    }
    info!("{}", serde_json::to_string_pretty(&report.summary())?);
    Ok(())
}

/// Appends a [`HistoryRecord`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &Path, record: &HistoryRecord) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV record");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::build_report;
    use tempfile::tempdir;

    fn report() -> ScoreReport {
        build_report(vec![], vec![], 0.9)
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&report());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&report()).unwrap();
    }

    #[test]
    fn test_json_sink_writes_summary_keys() {
        let dir = tempdir().unwrap();
        let mut sink = JsonFileSink::in_dir(&dir.path().join("eval"));

        let summary = Summary {
            r2: Some(0.97),
            consistency: Consistency::Consistent,
        };
        sink.record(&summary).unwrap();

        let content = fs::read_to_string(sink.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["R2"], 0.97);
        assert_eq!(value["Consistency"], "C");
    }

    #[test]
    fn test_json_sink_unscored_is_null() {
        let dir = tempdir().unwrap();
        let mut sink = JsonFileSink::in_dir(dir.path());
        sink.record(&report().summary()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(sink.path()).unwrap()).unwrap();
        assert!(value["R2"].is_null());
        assert_eq!(value["Consistency"], "NC");
    }

    #[test]
    fn test_append_record_writes_header_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.csv");

        let record = HistoryRecord::from_report(&report());
        append_record(&path, &record).unwrap();
        append_record(&path, &record).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("timestamp")).count();
        assert_eq!(header_count, 1);
        // 1 header + 2 data rows
        assert_eq!(content.lines().count(), 3);
        assert!(content.lines().nth(1).unwrap().ends_with(",NC"));
    }
}
