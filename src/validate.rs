//! Station file validation.
//!
//! A station is usable when at least one configured feature pair has both a
//! reported monthly value and hourly readings to recompute it from.

use tracing::debug;

use crate::config::FeaturePair;
use crate::parser::StationTable;

/// Why a feature pair does or does not qualify for a station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureStatus<'a> {
    Qualifies,
    /// The named column is absent from the table.
    MissingColumn(&'a str),
    /// The named column exists but every cell is missing.
    EmptyFeature(&'a str),
}

/// Checks one feature pair against a table, monthly column first.
pub fn feature_status<'a>(table: &StationTable, pair: &'a FeaturePair) -> FeatureStatus<'a> {
    for name in [pair.monthly_name.as_str(), pair.hourly_name.as_str()] {
        if !table.has_column(name) {
            return FeatureStatus::MissingColumn(name);
        }
        if !table.has_values(name) {
            return FeatureStatus::EmptyFeature(name);
        }
    }
    FeatureStatus::Qualifies
}

/// Returns true on the first pair that qualifies.
pub fn is_valid(table: &StationTable, pairs: &[FeaturePair]) -> bool {
    pairs
        .iter()
        .any(|pair| feature_status(table, pair) == FeatureStatus::Qualifies)
}

/// All qualifying pairs, in configuration order.
pub fn qualifying_pairs<'a>(table: &StationTable, pairs: &'a [FeaturePair]) -> Vec<&'a FeaturePair> {
    pairs
        .iter()
        .filter(|pair| match feature_status(table, pair) {
            FeatureStatus::Qualifies => true,
            FeatureStatus::MissingColumn(column) => {
                debug!(column, monthly = %pair.monthly_name, "Feature skipped: column missing");
                false
            }
            FeatureStatus::EmptyFeature(column) => {
                debug!(column, monthly = %pair.monthly_name, "Feature skipped: no values");
                false
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> StationTable {
        StationTable::from_reader(csv.as_bytes()).unwrap()
    }

    fn temperature_pair() -> FeaturePair {
        FeaturePair::new("MonthlyMeanTemperature", "HourlyDryBulbTemperature")
    }

    #[test]
    fn test_rejects_unrelated_columns() {
        let t = table("DATE,TEMP\n2023-01-01T00:00:00,3\n");
        let pairs = vec![FeaturePair::new("MonthlyX", "HourlyY")];

        assert!(!is_valid(&t, &pairs));
        assert_eq!(
            feature_status(&t, &pairs[0]),
            FeatureStatus::MissingColumn("MonthlyX")
        );
    }

    #[test]
    fn test_accepts_when_both_columns_have_values() {
        let t = table(
            "DATE,HourlyDryBulbTemperature,MonthlyMeanTemperature\n\
             2023-01-01T00:00:00,3,\n\
             2023-01-31T23:59:00,,4.2\n",
        );
        assert!(is_valid(&t, &[temperature_pair()]));
    }

    #[test]
    fn test_rejects_empty_monthly_column() {
        let t = table(
            "DATE,HourlyDryBulbTemperature,MonthlyMeanTemperature\n\
             2023-01-01T00:00:00,3,\n",
        );
        assert!(!is_valid(&t, &[temperature_pair()]));
        assert_eq!(
            feature_status(&t, &temperature_pair()),
            FeatureStatus::EmptyFeature("MonthlyMeanTemperature")
        );
    }

    #[test]
    fn test_rejects_missing_hourly_column() {
        let t = table("DATE,MonthlyMeanTemperature\n2023-01-31T23:59:00,4.2\n");
        assert_eq!(
            feature_status(&t, &temperature_pair()),
            FeatureStatus::MissingColumn("HourlyDryBulbTemperature")
        );
    }

    #[test]
    fn test_any_pair_is_enough() {
        let t = table(
            "DATE,HourlyDryBulbTemperature,MonthlyMeanTemperature\n\
             2023-01-31T23:59:00,3,4.2\n",
        );
        let pairs = vec![FeaturePair::new("MonthlyX", "HourlyY"), temperature_pair()];

        assert!(is_valid(&t, &pairs));
        let qualifying = qualifying_pairs(&t, &pairs);
        assert_eq!(qualifying, vec![&pairs[1]]);
    }

    #[test]
    fn test_no_pairs_is_invalid() {
        let t = table("DATE\n2023-01-31T23:59:00\n");
        assert!(!is_valid(&t, &[]));
    }
}
