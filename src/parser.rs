//! CSV parser for per-station climate tables.
//!
//! Cells are kept as text so that every stage can decide for itself what
//! counts as missing, numeric, or a timestamp.

use chrono::{Datelike, Month, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{PipelineError, Result};

/// Name of the observation timestamp column.
pub const DATE_COLUMN: &str = "DATE";

/// Layout of [`DATE_COLUMN`] values, e.g. `2023-01-01T00:51:00`.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Tokens read as "no value", matching the NA markers of the archive tooling.
const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "#N/A", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "<NA>",
];

/// One station's table, read once and never mutated.
#[derive(Debug, Clone)]
pub struct StationTable {
    headers: Vec<String>,
    rows: Vec<StringRecord>,
}

impl StationTable {
    /// Reads a station CSV from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not valid CSV.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers = rdr.headers()?.iter().map(str::to_string).collect();
        let rows = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self { headers, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cells of column `name` in row order; short rows yield `""`.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &str> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row.get(idx).unwrap_or("")))
    }

    /// True when column `name` exists and holds at least one non-missing cell.
    pub fn has_values(&self, name: &str) -> bool {
        self.column(name)
            .map(|mut cells| cells.any(|c| !is_missing(c)))
            .unwrap_or(false)
    }

    /// Parses the calendar month of every row.
    ///
    /// # Errors
    ///
    /// Fails on the first `DATE` cell that does not match [`DATE_FORMAT`], or
    /// when the table has no `DATE` column at all.
    pub fn months(&self) -> Result<Vec<Month>> {
        let dates = self
            .column(DATE_COLUMN)
            .ok_or_else(|| PipelineError::MissingDateColumn {
                column: DATE_COLUMN.to_string(),
            })?;

        dates
            .enumerate()
            .map(|(row, cell)| {
                parse_month(cell).ok_or_else(|| PipelineError::MalformedTimestamp {
                    row: row + 1,
                    value: cell.to_string(),
                })
            })
            .collect()
    }
}

pub fn is_missing(cell: &str) -> bool {
    MISSING_TOKENS.contains(&cell.trim())
}

/// Coerces a cell to a number; missing or unparseable cells yield `None`.
pub fn parse_value(cell: &str) -> Option<f64> {
    if is_missing(cell) {
        return None;
    }
    cell.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Extracts the calendar month from a `YYYY-MM-DDTHH:MM:SS` timestamp.
pub fn parse_month(cell: &str) -> Option<Month> {
    let dt = NaiveDateTime::parse_from_str(cell.trim(), DATE_FORMAT).ok()?;
    Month::try_from(dt.month() as u8).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
STATION,DATE,HourlyDryBulbTemperature,MonthlyMeanTemperature
72530,2023-01-01T00:51:00,12,
72530,2023-01-01T01:51:00,,
72530,2023-01-31T23:59:00,14s,13.0
";

    fn sample() -> StationTable {
        StationTable::from_reader(SAMPLE.as_bytes()).unwrap()
    }

    #[test]
    fn test_read_headers_and_rows() {
        let table = sample();
        assert_eq!(table.len(), 3);
        assert_eq!(table.columns()[1], DATE_COLUMN);
        assert!(table.has_column("MonthlyMeanTemperature"));
        assert!(!table.has_column("MonthlyTotalSnowfall"));
    }

    #[test]
    fn test_has_values() {
        let table = sample();
        assert!(table.has_values("HourlyDryBulbTemperature"));
        assert!(table.has_values("MonthlyMeanTemperature"));
        assert!(!table.has_values("MonthlyTotalSnowfall"));
    }

    #[test]
    fn test_empty_column_has_no_values() {
        let table = StationTable::from_reader("DATE,X\n2023-01-01T00:00:00,\n".as_bytes()).unwrap();
        assert!(table.has_column("X"));
        assert!(!table.has_values("X"));
    }

    #[test]
    fn test_parse_value_coerces() {
        assert_eq!(parse_value("12"), Some(12.0));
        assert_eq!(parse_value(" -3.5 "), Some(-3.5));
        assert_eq!(parse_value("0"), Some(0.0));
        assert_eq!(parse_value("14s"), None);
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("NaN"), None);
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2023-01-31T23:59:00"), Some(Month::January));
        assert_eq!(parse_month("2023-12-01T00:00:00"), Some(Month::December));
        assert_eq!(parse_month("2023-13-01T00:00:00"), None);
        assert_eq!(parse_month("2023/01/01 00:00:00"), None);
        assert_eq!(parse_month("2023-01-01"), None);
    }

    #[test]
    fn test_months_reports_malformed_row() {
        let table = StationTable::from_reader(
            "DATE,X\n2023-01-01T00:00:00,1\nyesterday,2\n".as_bytes(),
        )
        .unwrap();

        match table.months() {
            Err(PipelineError::MalformedTimestamp { row, value }) => {
                assert_eq!(row, 2);
                assert_eq!(value, "yesterday");
            }
            other => panic!("expected MalformedTimestamp, got {other:?}"),
        }
    }

    #[test]
    fn test_months_without_date_column() {
        let table = StationTable::from_reader("X\n1\n".as_bytes()).unwrap();
        assert!(matches!(
            table.months(),
            Err(PipelineError::MissingDateColumn { .. })
        ));
    }
}
