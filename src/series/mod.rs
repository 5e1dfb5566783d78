//! Time-series alignment primitives
//!
//! Grouped, irregularly-dated observations are reconciled onto a uniform
//! grid with [`fill`], and accumulated per group with [`cumulative_sum`].
//! Nothing here performs I/O; callers hand in fully materialized records
//! and closures describing how to key and synthesize them.

mod cumulative;
mod fill;

pub use cumulative::{cumulative_sum, CumulativeSum};
pub use fill::fill;

use chrono::{Days, NaiveDate};

/// Every `step` days from `start` (inclusive) to `end` (exclusive).
///
/// An empty or inverted range yields nothing. A `step` of zero is treated as one.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use finmetrics::series::date_range;
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
/// let days: Vec<_> = date_range(start, end, 1).collect();
/// assert_eq!(days.len(), 3);
/// assert_eq!(days[2], NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
/// ```
pub fn date_range(start: NaiveDate, end: NaiveDate, step: u64) -> impl Iterator<Item = NaiveDate> {
    let span = u64::try_from((end - start).num_days()).unwrap_or(0);

    (0..span)
        .step_by(step.max(1) as usize)
        .filter_map(move |offset| start.checked_add_days(Days::new(offset)))
}
