//! Twelve-month tables shared by the extractor, aggregator and scorer.

use chrono::Month;
use csv::{ReaderBuilder, Writer};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::parser::parse_value;

/// Value written for a month without data. Also a legitimate reading, so the
/// two cannot be told apart once serialized.
pub const SENTINEL: f64 = 0.0;

/// Calendar months in row order.
pub const MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

fn slot(month: Month) -> usize {
    month.number_from_month() as usize - 1
}

/// One value per calendar month; `None` means no data for that month.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MonthlyValues([Option<f64>; 12]);

impl MonthlyValues {
    pub fn get(&self, month: Month) -> Option<f64> {
        self.0[slot(month)]
    }

    pub fn set(&mut self, month: Month, value: Option<f64>) {
        self.0[slot(month)] = value;
    }

    /// The value as serialized, with missing months collapsed to [`SENTINEL`].
    pub fn or_sentinel(&self, month: Month) -> f64 {
        self.get(month).unwrap_or(SENTINEL)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Month, Option<f64>)> + '_ {
        MONTHS.iter().map(|&m| (m, self.get(m)))
    }

    /// Number of months that hold a value.
    pub fn present(&self) -> usize {
        self.0.iter().filter(|v| v.is_some()).count()
    }
}

impl FromIterator<(Month, Option<f64>)> for MonthlyValues {
    fn from_iter<I: IntoIterator<Item = (Month, Option<f64>)>>(iter: I) -> Self {
        let mut values = Self::default();
        for (month, value) in iter {
            values.set(month, value);
        }
        values
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyColumn {
    pub name: String,
    pub values: MonthlyValues,
}

/// A table of exactly twelve rows (January..December) and any number of
/// named columns, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlySeries {
    columns: Vec<MonthlyColumn>,
}

impl MonthlySeries {
    /// Row count of every series, whatever its source.
    pub const ROWS: usize = 12;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, values: MonthlyValues) {
        self.columns.push(MonthlyColumn {
            name: name.into(),
            values,
        });
    }

    pub fn columns(&self) -> &[MonthlyColumn] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&MonthlyValues> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.values)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Writes the table as CSV, one row per month. A series without columns
    /// produces an empty file.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        self.to_writer(file)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = Writer::from_writer(writer);
        if self.columns.is_empty() {
            wtr.flush()?;
            return Ok(());
        }

        wtr.write_record(self.names())?;
        for month in MONTHS {
            wtr.write_record(
                self.columns
                    .iter()
                    .map(|c| format!("{:?}", c.values.or_sentinel(month))),
            )?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Reads a table written by [`MonthlySeries::write_csv`].
    ///
    /// Cells are read literally: a written sentinel comes back as `Some(0.0)`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().from_reader(reader);
        let headers = rdr.headers()?.clone();
        if headers.iter().all(str::is_empty) {
            return Ok(Self::new());
        }

        let records = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;
        if records.len() != Self::ROWS {
            return Err(PipelineError::MalformedSeries {
                rows: records.len(),
            });
        }

        let columns = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| MonthlyColumn {
                name: name.to_string(),
                values: MONTHS
                    .iter()
                    .zip(&records)
                    .map(|(&m, rec)| (m, rec.get(idx).and_then(parse_value)))
                    .collect(),
            })
            .collect();

        Ok(Self { columns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_default_to_missing() {
        let values = MonthlyValues::default();
        assert_eq!(values.present(), 0);
        assert_eq!(values.get(Month::March), None);
        assert_eq!(values.or_sentinel(Month::March), SENTINEL);
    }

    #[test]
    fn test_set_uses_calendar_slot() {
        let mut values = MonthlyValues::default();
        values.set(Month::December, Some(4.5));

        let collected: Vec<_> = values.iter().collect();
        assert_eq!(collected.len(), MonthlySeries::ROWS);
        assert_eq!(collected[11], (Month::December, Some(4.5)));
        assert_eq!(collected[0], (Month::January, None));
    }

    #[test]
    fn test_write_twelve_rows_with_sentinel() {
        let mut values = MonthlyValues::default();
        values.set(Month::January, Some(5.0));
        values.set(Month::February, Some(0.0));

        let mut series = MonthlySeries::new();
        series.push("MonthlyMeanTemperature", values);

        let mut buf = Vec::new();
        series.to_writer(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 1 + MonthlySeries::ROWS);
        assert_eq!(lines[0], "MonthlyMeanTemperature");
        assert_eq!(lines[1], "5.0");
        // true zero and missing month serialize identically
        assert_eq!(lines[2], "0.0");
        assert_eq!(lines[3], "0.0");
    }

    #[test]
    fn test_empty_series_writes_empty_file() {
        let mut buf = Vec::new();
        MonthlySeries::new().to_writer(&mut buf).unwrap();
        assert!(buf.is_empty());

        let read = MonthlySeries::from_reader(buf.as_slice()).unwrap();
        assert!(read.is_empty());
    }

    #[test]
    fn test_read_back_columns_in_order() {
        let mut series = MonthlySeries::new();
        series.push("A", MONTHS.iter().map(|&m| (m, Some(1.5))).collect());
        series.push("B", MonthlyValues::default());

        let mut buf = Vec::new();
        series.to_writer(&mut buf).unwrap();
        let read = MonthlySeries::from_reader(buf.as_slice()).unwrap();

        assert_eq!(read.names().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(read.column("A").unwrap().get(Month::July), Some(1.5));
        assert_eq!(read.column("B").unwrap().get(Month::July), Some(SENTINEL));
    }

    #[test]
    fn test_read_rejects_wrong_row_count() {
        let err = MonthlySeries::from_reader("A\n1.0\n2.0\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedSeries { rows: 2 }));
    }
}
