use chrono::Month;
use tracing::warn;

use crate::config::FeaturePair;
use crate::error::{PipelineError, Result};
use crate::monthly::types::{MonthlySeries, MonthlyValues};
use crate::parser::{DATE_COLUMN, StationTable, is_missing, parse_month, parse_value};
use crate::validate::qualifying_pairs;

/// Builds the reported monthly table for one station.
///
/// Only qualifying pairs produce a column, named after the monthly feature.
/// When several rows report the same month the last one wins.
///
/// # Errors
///
/// Returns [`PipelineError::MalformedTimestamp`] if a row carrying a reported
/// value has an unparseable `DATE`.
pub fn extract(table: &StationTable, pairs: &[FeaturePair]) -> Result<MonthlySeries> {
    let mut series = MonthlySeries::new();

    for pair in qualifying_pairs(table, pairs) {
        let values = reported_values(table, &pair.monthly_name)?;
        series.push(pair.monthly_name.clone(), values);
    }

    Ok(series)
}

fn reported_values(table: &StationTable, monthly_name: &str) -> Result<MonthlyValues> {
    let mut values = MonthlyValues::default();

    let dates = table
        .column(DATE_COLUMN)
        .ok_or_else(|| PipelineError::MissingDateColumn {
            column: DATE_COLUMN.to_string(),
        })?;
    let Some(cells) = table.column(monthly_name) else {
        return Ok(values);
    };

    for (row, (date, cell)) in dates.zip(cells).enumerate() {
        if is_missing(cell) {
            continue;
        }

        let month: Month = parse_month(date).ok_or_else(|| PipelineError::MalformedTimestamp {
            row: row + 1,
            value: date.to_string(),
        })?;

        // a later non-numeric report still replaces an earlier value
        let value = parse_value(cell);
        if value.is_none() {
            warn!(
                column = monthly_name,
                row = row + 1,
                value = cell,
                "Non-numeric reported value; month left missing"
            );
        }
        values.set(month, value);
    }

    Ok(values)
}
