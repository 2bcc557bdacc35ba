#![deny(warnings)]

//! Detail-view pipeline for the clinic report engine.
//!
//! Records flow through four stages: [`filter`] selects a time window,
//! [`merge`] collapses same-day patient events, [`aggregate`] totals the
//! summable columns and [`paginate`] cuts the displayable rows into pages.
//! [`view::build_view`] runs them in that order and [`table`] renders the
//! result.

pub mod aggregate;
pub mod filter;
pub mod merge;
pub mod paginate;
pub mod table;
pub mod view;

pub use aggregate::{aggregate, format_metric, summable_metrics, AggregationResult};
pub use filter::{filter_records, matches};
pub use merge::{merge_patient_events, MergedPatientRecord};
pub use paginate::{paginate, Page, PageWindow, DEFAULT_PAGE_SIZE};
pub use table::{columns, totals_row, Column, Table, TableRow};
pub use view::{build_view, DetailView, PageRows, ViewRows};
