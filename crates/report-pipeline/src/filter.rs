//! Time-selection filter over record sequences.

use report_core::{
    day_in_month, resolve_month, resolve_week, Granularity, Temporal, TemporalError, TimeFilter,
};
use tracing::warn;

/// Whether a record passes every active clause of `filter` for a view of
/// the given granularity.
///
/// - month: monthly views compare the record's own `Month`; the others
///   compare the resolved month.
/// - week: ignored for monthly views; weekly views compare the record's own
///   `Week`; daily and patient views compare the resolved week.
/// - day: only for daily and patient views, and only when a month is also
///   selected; compares the day within the resolved month.
pub fn matches<T: Temporal + ?Sized>(
    record: &T,
    filter: &TimeFilter,
    granularity: Granularity,
) -> Result<bool, TemporalError> {
    if let Some(month) = filter.month {
        let record_month = match granularity {
            Granularity::Monthly => record
                .explicit_month()
                .ok_or(TemporalError::MissingTemporalField { field: "Month" })?,
            _ => resolve_month(record)?,
        };
        if record_month != month {
            return Ok(false);
        }
    }

    if let Some(week) = filter.week {
        let record_week = match granularity {
            Granularity::Monthly => None,
            Granularity::Weekly => Some(
                record
                    .explicit_week()
                    .ok_or(TemporalError::MissingTemporalField { field: "Week" })?,
            ),
            Granularity::Daily | Granularity::PatientEvent => Some(resolve_week(record)?),
        };
        if record_week.is_some_and(|w| w != week) {
            return Ok(false);
        }
    }

    if let (Some(day), Some(_)) = (filter.day, filter.month) {
        if granularity.supports_day_filter() && day_in_month(record)? != i64::from(day) {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Apply `filter` to `records`, preserving input order.
///
/// Records that cannot be bucketed for an active clause are dropped and
/// logged; they never fail the whole pass.
pub fn filter_records<T: Temporal + Clone>(
    records: &[T],
    filter: &TimeFilter,
    granularity: Granularity,
) -> Vec<T> {
    let mut out = Vec::with_capacity(if filter.is_all() { records.len() } else { 0 });
    for (index, record) in records.iter().enumerate() {
        match matches(record, filter, granularity) {
            Ok(true) => out.push(record.clone()),
            Ok(false) => {}
            Err(err) => warn!(index, %granularity, error = %err, "record excluded from filter"),
        }
    }
    out
}
