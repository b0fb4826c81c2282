use chrono::Month;
use std::collections::HashMap;
use tracing::debug;

use crate::config::FeaturePair;
use crate::error::Result;
use crate::monthly::types::{MONTHS, MonthlySeries, MonthlyValues};
use crate::parser::{StationTable, parse_value};
use crate::utility::mean;

/// Hourly columns to recompute, given the columns of a station's extracted
/// table. Follows configuration order.
pub fn hourly_names_for<'a, S: AsRef<str>>(
    extracted_columns: &[S],
    pairs: &'a [FeaturePair],
) -> Vec<&'a str> {
    pairs
        .iter()
        .filter(|pair| {
            extracted_columns
                .iter()
                .any(|c| c.as_ref() == pair.monthly_name)
        })
        .map(|pair| pair.hourly_name.as_str())
        .collect()
}

/// Recomputes monthly means from hourly readings.
///
/// Unparseable readings are excluded from the mean. A month with no readings
/// at all stays `None`; a month whose readings average to zero is `Some(0.0)`.
/// Columns absent from `raw` come out with every month missing.
///
/// # Errors
///
/// Any `DATE` that does not parse fails the whole station.
pub fn aggregate(raw: &StationTable, hourly_names: &[&str]) -> Result<MonthlySeries> {
    let mut series = MonthlySeries::new();
    if hourly_names.is_empty() {
        return Ok(series);
    }

    let months = raw.months()?;

    for &name in hourly_names {
        let mut by_month: HashMap<Month, Vec<f64>> = HashMap::new();

        if let Some(cells) = raw.column(name) {
            for (&month, cell) in months.iter().zip(cells) {
                if let Some(v) = parse_value(cell) {
                    by_month.entry(month).or_default().push(v);
                }
            }
        }

        let values: MonthlyValues = MONTHS
            .iter()
            .map(|&m| {
                let avg = by_month
                    .get(&m)
                    .filter(|readings| !readings.is_empty())
                    .map(|readings| mean(readings));
                (m, avg)
            })
            .collect();

        debug!(
            column = name,
            months_with_data = values.present(),
            "Recomputed monthly averages"
        );
        series.push(name, values);
    }

    Ok(series)
}
