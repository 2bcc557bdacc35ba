//! Detail-view composition: filter, merge, total and page one record set.

use crate::aggregate::{aggregate, AggregationResult};
use crate::filter::filter_records;
use crate::merge::{merge_patient_events, MergedPatientRecord};
use crate::paginate::PageWindow;
use crate::table::Table;
use report_core::{Granularity, SimulationRecord, TimeFilter};
use tracing::debug;

/// Displayable rows of a view before paging.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewRows {
    Records(Vec<SimulationRecord>),
    Merged(Vec<MergedPatientRecord>),
}

impl ViewRows {
    pub fn len(&self) -> usize {
        match self {
            ViewRows::Records(r) => r.len(),
            ViewRows::Merged(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rows on the current page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PageRows<'a> {
    Records(&'a [SimulationRecord]),
    Merged(&'a [MergedPatientRecord]),
}

impl PageRows<'_> {
    pub fn len(&self) -> usize {
        match self {
            PageRows::Records(r) => r.len(),
            PageRows::Merged(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A fully derived detail view.
#[derive(Clone, Debug, PartialEq)]
pub struct DetailView {
    pub granularity: Granularity,
    pub filter: TimeFilter,
    /// Filtered records, before merging.
    pub filtered: Vec<SimulationRecord>,
    pub rows: ViewRows,
    /// Totals over every filtered record, not just the current page.
    pub totals: AggregationResult,
    pub window: PageWindow,
}

impl DetailView {
    pub fn merged(&self) -> Option<&[MergedPatientRecord]> {
        match &self.rows {
            ViewRows::Merged(m) => Some(m),
            ViewRows::Records(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn page_rows(&self) -> PageRows<'_> {
        let range = self.window.range();
        match &self.rows {
            ViewRows::Records(r) => PageRows::Records(&r[range]),
            ViewRows::Merged(m) => PageRows::Merged(&m[range]),
        }
    }

    /// Render the current page with the view's totals row.
    pub fn table(&self) -> Table {
        match self.page_rows() {
            PageRows::Records(r) => Table::build(self.granularity, r, &self.totals),
            PageRows::Merged(m) => Table::build(self.granularity, m, &self.totals),
        }
    }
}

/// Derive a detail view from the raw records of one granularity.
///
/// Records of another granularity are skipped. Patient events are merged
/// before paging, so page geometry counts merged rows.
pub fn build_view(
    records: &[SimulationRecord],
    granularity: Granularity,
    filter: &TimeFilter,
    page: u32,
    page_size: usize,
) -> DetailView {
    let own: Vec<SimulationRecord> = records
        .iter()
        .filter(|r| r.granularity() == granularity)
        .cloned()
        .collect();
    if own.len() != records.len() {
        debug!(
            skipped = records.len() - own.len(),
            %granularity,
            "ignoring records of another granularity"
        );
    }

    let filtered = filter_records(&own, filter, granularity);
    let totals = aggregate(&filtered, granularity);
    let rows = match granularity {
        Granularity::PatientEvent => ViewRows::Merged(merge_patient_events(
            filtered.iter().filter_map(SimulationRecord::as_patient_event),
        )),
        _ => ViewRows::Records(filtered.clone()),
    };
    let window = PageWindow::new(page, page_size, rows.len());
    debug!(
        %granularity,
        input = records.len(),
        kept = filtered.len(),
        rows = rows.len(),
        page,
        pages = window.total_pages,
        "view built"
    );

    DetailView {
        granularity,
        filter: *filter,
        filtered,
        rows,
        totals,
        window,
    }
}
