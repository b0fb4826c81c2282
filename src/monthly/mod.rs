//! Monthly tables: the reported series extracted from a station archive and
//! the series recomputed from its hourly readings.

pub mod aggregate;
pub mod extract;
pub mod types;

pub use aggregate::{aggregate, hourly_names_for};
pub use extract::extract;
pub use types::{MONTHS, MonthlyColumn, MonthlySeries, MonthlyValues, SENTINEL};
