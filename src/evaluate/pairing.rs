//! Matching ground-truth tables with their recomputed counterparts.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::config::{FeaturePair, PairingPolicy};
use crate::error::{PipelineError, Result};
use crate::monthly::MonthlySeries;

/// File-name prefix of recomputed monthly tables.
pub const COMPUTED_PREFIX: &str = "computed_";

/// A ground-truth file and the computed file scored against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePair {
    pub station: String,
    pub ground_truth: PathBuf,
    pub computed: PathBuf,
}

/// Station identifier of a monthly table: its file stem without the
/// `computed_` prefix.
pub fn station_id(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    Some(stem.strip_prefix(COMPUTED_PREFIX).unwrap_or(stem).to_string())
}

/// Name of the computed table written for a station file.
pub fn computed_file_name(file_name: &str) -> String {
    format!("{COMPUTED_PREFIX}{file_name}")
}

pub fn is_computed(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(COMPUTED_PREFIX))
}

/// Sorted CSV files directly inside `dir`.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type()?.is_file() && path.extension().and_then(|e| e.to_str()) == Some("csv")
        {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Ground-truth tables: every CSV in `ground_truth_dir` without the computed prefix.
pub fn ground_truth_files(ground_truth_dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(list_csv_files(ground_truth_dir)?
        .into_iter()
        .filter(|p| !is_computed(p))
        .collect())
}

/// Computed tables: prefixed CSVs, or every CSV when the computed directory is
/// separate from the ground truth.
pub fn computed_files(ground_truth_dir: &Path, computed_dir: &Path) -> Result<Vec<PathBuf>> {
    let shared = same_dir(ground_truth_dir, computed_dir);
    Ok(list_csv_files(computed_dir)?
        .into_iter()
        .filter(|p| !shared || is_computed(p))
        .collect())
}

/// Drops the files of `stations` from a listing.
pub fn without_stations(files: Vec<PathBuf>, stations: &BTreeSet<String>) -> Vec<PathBuf> {
    if stations.is_empty() {
        return files;
    }
    files
        .into_iter()
        .filter(|p| station_id(p).is_none_or(|id| !stations.contains(&id)))
        .collect()
}

/// Pairs ground-truth and computed files under `policy`.
///
/// # Errors
///
/// [`PipelineError::PairingMismatch`] when the listings differ in length or,
/// for [`PairingPolicy::Station`], when a station appears on one side only.
pub fn pair_files(
    ground_truth: Vec<PathBuf>,
    computed: Vec<PathBuf>,
    policy: PairingPolicy,
) -> Result<Vec<FilePair>> {
    if ground_truth.len() != computed.len() {
        return Err(PipelineError::PairingMismatch {
            reason: format!(
                "{} ground-truth files but {} computed files",
                ground_truth.len(),
                computed.len()
            ),
        });
    }

    match policy {
        PairingPolicy::Positional => Ok(ground_truth
            .into_iter()
            .zip(computed)
            .map(|(gt, comp)| FilePair {
                station: station_id(&gt).unwrap_or_default(),
                ground_truth: gt,
                computed: comp,
            })
            .collect()),
        PairingPolicy::Station => pair_by_station(ground_truth, computed),
    }
}

fn keyed(files: Vec<PathBuf>) -> Result<BTreeMap<String, PathBuf>> {
    let mut map = BTreeMap::new();
    for path in files {
        let id = station_id(&path).ok_or_else(|| PipelineError::PairingMismatch {
            reason: format!("cannot derive a station id from {}", path.display()),
        })?;
        if let Some(previous) = map.insert(id.clone(), path) {
            return Err(PipelineError::PairingMismatch {
                reason: format!("station {id} listed twice ({})", previous.display()),
            });
        }
    }
    Ok(map)
}

fn pair_by_station(ground_truth: Vec<PathBuf>, computed: Vec<PathBuf>) -> Result<Vec<FilePair>> {
    let ground_truth = keyed(ground_truth)?;
    let mut computed = keyed(computed)?;

    let mut pairs = Vec::with_capacity(ground_truth.len());
    let mut unmatched = Vec::new();

    for (station, gt) in ground_truth {
        match computed.remove(&station) {
            Some(comp) => pairs.push(FilePair {
                station,
                ground_truth: gt,
                computed: comp,
            }),
            None => unmatched.push(station),
        }
    }
    unmatched.extend(computed.into_keys());

    if !unmatched.is_empty() {
        return Err(PipelineError::PairingMismatch {
            reason: format!("stations without a counterpart: {}", unmatched.join(", ")),
        });
    }

    Ok(pairs)
}

/// Column names `(ground_truth, computed)` to score against each other.
///
/// [`PairingPolicy::Station`] joins by feature pair; [`PairingPolicy::Positional`]
/// zips the two column lists in file order.
pub fn pair_columns(
    ground_truth: &MonthlySeries,
    computed: &MonthlySeries,
    pairs: &[FeaturePair],
    policy: PairingPolicy,
) -> Vec<(String, String)> {
    match policy {
        PairingPolicy::Positional => {
            if ground_truth.width() != computed.width() {
                warn!(
                    ground_truth = ground_truth.width(),
                    computed = computed.width(),
                    "Column counts differ; extra columns are ignored"
                );
            }
            ground_truth
                .names()
                .zip(computed.names())
                .map(|(gt, comp)| (gt.to_string(), comp.to_string()))
                .collect()
        }
        PairingPolicy::Station => pairs
            .iter()
            .filter(|pair| ground_truth.column(&pair.monthly_name).is_some())
            .filter_map(|pair| {
                if computed.column(&pair.hourly_name).is_none() {
                    warn!(
                        monthly = %pair.monthly_name,
                        hourly = %pair.hourly_name,
                        "Reported column has no recomputed counterpart"
                    );
                    return None;
                }
                Some((pair.monthly_name.clone(), pair.hourly_name.clone()))
            })
            .collect(),
    }
}
