//! Batch drivers for each pipeline stage.
//!
//! Every stage walks a directory of station files in sorted order. A failure
//! on one file is logged with the file name and recorded in the
//! [`BatchSummary`]; only failures to list or create directories abort.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{FeaturePair, PipelineConfig};
use crate::error::FileFailure;
use crate::evaluate::{self, ScoreReport, pairing};
use crate::monthly::{self, MonthlySeries};
use crate::output::{HistoryRecord, SummarySink, append_record};
use crate::parser::StationTable;
use crate::validate::is_valid;

/// Per-stage tally of what happened to each file.
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Files the stage handled successfully (or kept, when screening).
    pub processed: Vec<PathBuf>,
    /// Files screened out and removed from disk.
    pub rejected: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

impl BatchSummary {
    fn fail(&mut self, path: &Path, error: impl std::fmt::Display) {
        warn!(file = %path.display(), error = %error, "File skipped");
        self.failures.push(FileFailure::new(path.display().to_string(), error));
    }
}

fn file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("unusable file name: {}", path.display()))
}

/// Validates every station file in `dir` and deletes those with no usable
/// feature pair. Unreadable files are deleted as well.
#[tracing::instrument(skip(pairs), fields(dir = %dir.display()))]
pub fn screen_directory(dir: &Path, pairs: &[FeaturePair]) -> Result<BatchSummary> {
    let files = pairing::list_csv_files(dir)
        .with_context(|| format!("listing station files in {}", dir.display()))?;
    let mut summary = BatchSummary::default();

    for path in files {
        let keep = match StationTable::from_path(&path) {
            Ok(table) => is_valid(&table, pairs),
            Err(e) => {
                summary.fail(&path, &e);
                false
            }
        };

        if keep {
            debug!(file = %path.display(), "Station file kept");
            summary.processed.push(path);
        } else {
            fs::remove_file(&path)
                .with_context(|| format!("removing rejected file {}", path.display()))?;
            info!(file = %path.display(), "Station file rejected and removed");
            summary.rejected.push(path);
        }
    }

    info!(
        kept = summary.processed.len(),
        rejected = summary.rejected.len(),
        "Screening complete"
    );
    Ok(summary)
}

/// Writes the reported monthly table of every station in `input_dir` to a
/// file of the same name in `output_dir`.
#[tracing::instrument(skip(pairs), fields(input_dir = %input_dir.display(), output_dir = %output_dir.display()))]
pub fn extract_directory(
    input_dir: &Path,
    output_dir: &Path,
    pairs: &[FeaturePair],
) -> Result<BatchSummary> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;
    let files = pairing::list_csv_files(input_dir)
        .with_context(|| format!("listing station files in {}", input_dir.display()))?;
    let mut summary = BatchSummary::default();

    for path in files {
        let out = output_dir.join(file_name(&path)?);

        let result = StationTable::from_path(&path)
            .and_then(|table| monthly::extract(&table, pairs))
            .and_then(|series| {
                series.write_csv(&out)?;
                Ok(series)
            });

        match result {
            Ok(series) => {
                debug!(file = %path.display(), columns = series.width(), "Monthly features extracted");
                summary.processed.push(out);
            }
            Err(e) => summary.fail(&path, e),
        }
    }

    info!(
        extracted = summary.processed.len(),
        failed = summary.failures.len(),
        "Extraction complete"
    );
    Ok(summary)
}

/// Recomputes the monthly averages of every station extracted into
/// `extracted_dir`, writing `computed_<name>` files into `computed_dir`.
///
/// Only hourly columns whose monthly partner was extracted are recomputed.
#[tracing::instrument(
    skip(pairs),
    fields(raw_dir = %raw_dir.display(), extracted_dir = %extracted_dir.display(), computed_dir = %computed_dir.display())
)]
pub fn aggregate_directory(
    raw_dir: &Path,
    extracted_dir: &Path,
    computed_dir: &Path,
    pairs: &[FeaturePair],
) -> Result<BatchSummary> {
    fs::create_dir_all(computed_dir)
        .with_context(|| format!("creating {}", computed_dir.display()))?;
    let files = pairing::ground_truth_files(extracted_dir)
        .with_context(|| format!("listing extracted tables in {}", extracted_dir.display()))?;
    let mut summary = BatchSummary::default();

    for extracted_path in files {
        let name = file_name(&extracted_path)?;
        let raw_path = raw_dir.join(name);
        let out = computed_dir.join(pairing::computed_file_name(name));

        let result = MonthlySeries::from_path(&extracted_path).and_then(|extracted| {
            let columns: Vec<&str> = extracted.names().collect();
            let hourly = monthly::hourly_names_for(&columns, pairs);
            let raw = StationTable::from_path(&raw_path)?;
            let computed = monthly::aggregate(&raw, &hourly)?;
            computed.write_csv(&out)?;
            Ok(computed)
        });

        match result {
            Ok(series) => {
                debug!(file = %raw_path.display(), columns = series.width(), "Monthly averages recomputed");
                summary.processed.push(out);
            }
            Err(e) => summary.fail(&raw_path, e),
        }
    }

    info!(
        computed = summary.processed.len(),
        failed = summary.failures.len(),
        "Aggregation complete"
    );
    Ok(summary)
}

/// Scores the computed tables, hands the summary to `sink`, and appends the
/// run to `<eval_dir>/history.csv`.
///
/// Stations in `skipped` failed an earlier stage; they are left out of the
/// pairing and listed in the report's failures.
pub fn evaluate(
    config: &PipelineConfig,
    sink: &mut dyn SummarySink,
    skipped: Vec<FileFailure>,
) -> Result<ScoreReport> {
    let report =
        evaluate::score_excluding(&config.output_dir, &config.computed_dir, config, skipped)
            .context("scoring computed monthly averages")?;

    sink.record(&report.summary())?;
    append_record(
        &config.eval_dir.join("history.csv"),
        &HistoryRecord::from_report(&report),
    )?;

    Ok(report)
}

/// Runs every stage in order: screen, extract, aggregate, evaluate.
///
/// Stations that fail extraction or aggregation are reported, not scored.
pub fn run(config: &PipelineConfig, sink: &mut dyn SummarySink) -> Result<ScoreReport> {
    screen_directory(&config.raw_dir, &config.pairs)?;
    let extracted = extract_directory(&config.raw_dir, &config.output_dir, &config.pairs)?;
    let aggregated = aggregate_directory(
        &config.raw_dir,
        &config.output_dir,
        &config.computed_dir,
        &config.pairs,
    )?;

    let mut skipped = extracted.failures;
    skipped.extend(aggregated.failures);
    evaluate(config, sink, skipped)
}
