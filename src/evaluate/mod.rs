//! Scoring recomputed monthly series against the reported ones.
//!
//! Each station's columns are scored with R² over the months that carry a
//! non-zero reported value, averaged per station, then across stations, and
//! the global score is classified against the consistency threshold.

pub mod grade;
pub mod pairing;
pub mod r2;
pub mod types;

pub use grade::{Consistency, classify};
pub use pairing::{COMPUTED_PREFIX, FilePair};
pub use r2::{R2, r2_score};
pub use types::{ColumnScore, ScoreReport, StationScore, Summary};

use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

use crate::config::{FeaturePair, PipelineConfig, PairingPolicy};
use crate::error::{FileFailure, Result};
use crate::monthly::{MONTHS, MonthlySeries, MonthlyValues, SENTINEL};
use crate::utility::mean;

/// Scores every computed table in `computed_dir` against its ground truth
/// in `ground_truth_dir`.
///
/// # Errors
///
/// Fails when the directories cannot be listed or the listings cannot be
/// paired. Unreadable station tables are recorded in
/// [`ScoreReport::failures`] instead.
pub fn score(
    ground_truth_dir: &Path,
    computed_dir: &Path,
    config: &PipelineConfig,
) -> Result<ScoreReport> {
    score_excluding(ground_truth_dir, computed_dir, config, Vec::new())
}

/// Like [`score`], but leaves out the stations that failed an earlier stage.
///
/// Each entry of `skipped` names a station file; its tables are dropped from
/// both listings before pairing and the failure is carried into
/// [`ScoreReport::failures`]. Listings that still disagree are a
/// [`PipelineError::PairingMismatch`](crate::error::PipelineError::PairingMismatch).
#[tracing::instrument(
    skip_all,
    fields(ground_truth_dir = %ground_truth_dir.display(), computed_dir = %computed_dir.display(), skipped = skipped.len())
)]
pub fn score_excluding(
    ground_truth_dir: &Path,
    computed_dir: &Path,
    config: &PipelineConfig,
    skipped: Vec<FileFailure>,
) -> Result<ScoreReport> {
    let mut excluded = BTreeSet::new();
    let mut failures = Vec::with_capacity(skipped.len());
    for failure in skipped {
        match pairing::station_id(Path::new(&failure.file)) {
            Some(station) => {
                excluded.insert(station.clone());
                failures.push(FileFailure::new(station, failure.error));
            }
            None => failures.push(failure),
        }
    }

    let ground_truth =
        pairing::without_stations(pairing::ground_truth_files(ground_truth_dir)?, &excluded);
    let computed = pairing::without_stations(
        pairing::computed_files(ground_truth_dir, computed_dir)?,
        &excluded,
    );
    let files = pairing::pair_files(ground_truth, computed, config.pairing)?;

    let mut stations = Vec::with_capacity(files.len());

    for file in files {
        match score_file(&file, &config.pairs, config.pairing) {
            Ok(station) => stations.push(station),
            Err(e) => {
                warn!(station = %file.station, error = %e, "Station could not be scored");
                failures.push(FileFailure::new(file.station, e));
            }
        }
    }

    let report = build_report(stations, failures, config.threshold);
    info!(
        stations = report.stations.len(),
        failures = report.failures.len(),
        global_r2 = ?report.global_average,
        consistency = %report.consistency,
        "Scoring complete"
    );
    Ok(report)
}

fn score_file(file: &FilePair, pairs: &[FeaturePair], policy: PairingPolicy) -> Result<StationScore> {
    let ground_truth = MonthlySeries::from_path(&file.ground_truth)?;
    let computed = MonthlySeries::from_path(&file.computed)?;
    Ok(score_station(&file.station, &ground_truth, &computed, pairs, policy))
}

/// Scores one station's computed table against its ground truth.
pub fn score_station(
    station: &str,
    ground_truth: &MonthlySeries,
    computed: &MonthlySeries,
    pairs: &[FeaturePair],
    policy: PairingPolicy,
) -> StationScore {
    let columns: Vec<ColumnScore> = pairing::pair_columns(ground_truth, computed, pairs, policy)
        .into_iter()
        .filter_map(|(gt_name, comp_name)| {
            let gt = ground_truth.column(&gt_name)?;
            let comp = computed.column(&comp_name)?;
            Some(ColumnScore {
                r2: score_column(gt, comp),
                ground_truth: gt_name,
                computed: comp_name,
            })
        })
        .collect();

    let scored: Vec<f64> = columns.iter().filter_map(|c| c.r2.value()).collect();
    let average = if scored.is_empty() {
        warn!(station, columns = columns.len(), "No column could be scored");
        None
    } else {
        Some(mean(&scored))
    };

    StationScore {
        station: station.to_string(),
        columns,
        average,
    }
}

/// R² over the months whose reported value is present and not the sentinel.
/// Recomputed months without data count as the sentinel.
pub fn score_column(ground_truth: &MonthlyValues, computed: &MonthlyValues) -> R2 {
    let (observed, predicted): (Vec<f64>, Vec<f64>) = MONTHS
        .iter()
        .filter_map(|&month| {
            let reported = ground_truth.get(month).filter(|v| *v != SENTINEL)?;
            Some((reported, computed.or_sentinel(month)))
        })
        .unzip();

    r2_score(&observed, &predicted)
}

/// Averages station scores and classifies the result.
pub fn build_report(
    stations: Vec<StationScore>,
    failures: Vec<FileFailure>,
    threshold: f64,
) -> ScoreReport {
    let averages: Vec<f64> = stations.iter().filter_map(|s| s.average).collect();
    let global_average = if averages.is_empty() {
        None
    } else {
        Some(mean(&averages))
    };

    ScoreReport {
        stations,
        failures,
        global_average,
        consistency: classify(global_average, threshold),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Month;

    fn values(v: [f64; 12]) -> MonthlyValues {
        MONTHS.iter().zip(v).map(|(&m, x)| (m, Some(x))).collect()
    }

    fn temperature_pair() -> Vec<FeaturePair> {
        vec![FeaturePair::new("MonthlyMeanTemperature", "HourlyDryBulbTemperature")]
    }

    const SEASON: [f64; 12] = [5.0, 7.0, 11.0, 15.0, 19.0, 24.0, 27.0, 26.0, 21.0, 15.0, 9.0, 6.0];

    #[test]
    fn test_perfect_match_scores_one() {
        let mut gt = MonthlySeries::new();
        gt.push("MonthlyMeanTemperature", values(SEASON));
        let mut comp = MonthlySeries::new();
        comp.push("HourlyDryBulbTemperature", values(SEASON));

        let station = score_station("A", &gt, &comp, &temperature_pair(), PairingPolicy::Station);

        assert_eq!(station.columns.len(), 1);
        assert_eq!(station.columns[0].r2, R2::Score(1.0));
        assert_eq!(station.average, Some(1.0));
    }

    #[test]
    fn test_sentinel_months_excluded() {
        let mut reported = values(SEASON);
        reported.set(Month::June, Some(0.0));
        reported.set(Month::July, None);
        let mut recomputed = values(SEASON);
        // would ruin the fit if June/July were scored
        recomputed.set(Month::June, Some(500.0));
        recomputed.set(Month::July, Some(-500.0));

        assert_eq!(score_column(&reported, &recomputed), R2::Score(1.0));
    }

    #[test]
    fn test_missing_recomputed_month_counts_as_sentinel() {
        let reported = values([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
        let mut recomputed = reported;
        recomputed.set(Month::December, None);

        let r2 = score_column(&reported, &recomputed).value().unwrap();
        // SS_res = 144, SS_tot = 143
        assert!((r2 - (1.0 - 144.0 / 143.0)).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_column_left_unscored() {
        let mut reported = MonthlyValues::default();
        reported.set(Month::January, Some(5.0));

        assert_eq!(score_column(&reported, &reported), R2::TooFewPoints(1));
    }

    #[test]
    fn test_unscored_columns_excluded_from_station_average() {
        let mut single = MonthlyValues::default();
        single.set(Month::January, Some(5.0));

        let mut gt = MonthlySeries::new();
        gt.push("MonthlyMeanTemperature", values(SEASON));
        gt.push("MonthlyTotalPrecipitation", single);
        let mut comp = MonthlySeries::new();
        comp.push("HourlyDryBulbTemperature", values(SEASON));
        comp.push("HourlyPrecipitation", single);

        let pairs = vec![
            FeaturePair::new("MonthlyMeanTemperature", "HourlyDryBulbTemperature"),
            FeaturePair::new("MonthlyTotalPrecipitation", "HourlyPrecipitation"),
        ];
        let station = score_station("A", &gt, &comp, &pairs, PairingPolicy::Station);

        assert_eq!(station.columns.len(), 2);
        assert_eq!(station.average, Some(1.0));
    }

    fn station(name: &str, average: Option<f64>) -> StationScore {
        StationScore {
            station: name.to_string(),
            columns: vec![],
            average,
        }
    }

    #[test]
    fn test_report_averages_stations() {
        let report = build_report(
            vec![station("A", Some(1.0)), station("B", Some(0.9)), station("C", None)],
            vec![],
            0.90,
        );

        let global = report.global_average.unwrap();
        assert!((global - 0.95).abs() < 1e-12);
        assert_eq!(report.consistency, Consistency::Consistent);
        assert_eq!(report.summary().consistency.to_string(), "C");
    }

    #[test]
    fn test_report_below_threshold() {
        let report = build_report(vec![station("A", Some(0.85))], vec![], 0.90);
        assert_eq!(report.consistency, Consistency::NotConsistent);
    }

    #[test]
    fn test_report_at_threshold_is_not_consistent() {
        let report = build_report(vec![station("A", Some(0.90))], vec![], 0.90);
        assert_eq!(report.consistency, Consistency::NotConsistent);
    }

    #[test]
    fn test_report_without_scores() {
        let report = build_report(vec![], vec![], 0.90);
        assert_eq!(report.global_average, None);
        assert_eq!(report.consistency, Consistency::NotConsistent);
    }

    #[test]
    fn test_swapped_columns_misscored_by_position() {
        let precipitation = [3.1, 2.8, 3.5, 3.9, 4.2, 3.7, 3.3, 3.0, 2.9, 2.7, 3.4, 3.2];
        let pairs = vec![
            FeaturePair::new("MonthlyMeanTemperature", "HourlyDryBulbTemperature"),
            FeaturePair::new("MonthlyTotalPrecipitation", "HourlyPrecipitation"),
        ];

        let mut gt = MonthlySeries::new();
        gt.push("MonthlyMeanTemperature", values(SEASON));
        gt.push("MonthlyTotalPrecipitation", values(precipitation));
        let mut comp = MonthlySeries::new();
        comp.push("HourlyPrecipitation", values(precipitation));
        comp.push("HourlyDryBulbTemperature", values(SEASON));

        let keyed = score_station("A", &gt, &comp, &pairs, PairingPolicy::Station);
        assert_eq!(keyed.average, Some(1.0));

        let positional = score_station("A", &gt, &comp, &pairs, PairingPolicy::Positional);
        assert!(positional.average.unwrap() < 0.0);
    }
}
