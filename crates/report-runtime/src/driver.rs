//! Polling drivers for the detail and summary pages.
//!
//! A driver owns the last applied snapshot and the derived output. Each poll
//! is split into [`DetailDriver::begin`] (take a token) and
//! [`DetailDriver::complete`] (offer the response) so a slow fetch that
//! loses a race with a newer request or a state change is discarded.

use crate::source::{RecordSource, SourceError};
use crate::state::{RequestSequencer, RequestToken, ViewState};
use report_analytics::{AnalyticsReport, PeriodSeries};
use report_core::{Granularity, PatientEventRecord, SimulationRecord, SimulationState};
use report_pipeline::{build_view, DetailView};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

/// What happened to one response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new view was derived.
    Applied,
    /// Same input as the last applied snapshot; nothing recomputed.
    Unchanged,
    /// A newer request or state change superseded this response.
    Stale,
    /// The fetch failed; the previous output is kept.
    FetchFailed,
}

#[derive(Clone, Debug, PartialEq)]
struct DetailSnapshot {
    state: ViewState,
    records: Vec<SimulationRecord>,
}

/// Drives one detail view (daily, weekly, monthly or patient events).
#[derive(Debug)]
pub struct DetailDriver {
    state: ViewState,
    sequencer: RequestSequencer,
    snapshot: Option<DetailSnapshot>,
    view: Option<DetailView>,
    last_error: Option<String>,
}

impl DetailDriver {
    pub fn new(state: ViewState) -> Self {
        Self {
            state,
            sequencer: RequestSequencer::default(),
            snapshot: None,
            view: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    /// Last successfully derived view.
    pub fn view(&self) -> Option<&DetailView> {
        self.view.as_ref()
    }

    /// Message of the most recent fetch failure, cleared on success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Replace the view state. Requests in flight become stale.
    ///
    /// When only the page moved and records for the same selection are
    /// cached, the view is re-derived locally without a fetch. Switching
    /// granularity drops the cached view, since its records belong to
    /// another endpoint.
    pub fn set_state(&mut self, state: ViewState) {
        if state == self.state {
            return;
        }
        self.sequencer.invalidate();
        if state.granularity != self.state.granularity {
            self.snapshot = None;
            self.view = None;
        }
        let same_selection = state.granularity == self.state.granularity
            && state.filter == self.state.filter
            && state.page_size == self.state.page_size;
        self.state = state;
        if !same_selection {
            return;
        }
        if let Some(snapshot) = self.snapshot.take() {
            self.apply(snapshot.records);
        }
    }

    /// The view, if it was derived for the current selection.
    fn current_view(&self) -> Option<&DetailView> {
        self.view.as_ref().filter(|v| {
            v.granularity == self.state.granularity && v.filter == self.state.filter
        })
    }

    /// Move to the following page. Refused until a view for the current
    /// selection has been derived.
    pub fn next_page(&mut self) -> bool {
        let next = self
            .current_view()
            .and_then(|v| self.state.next_page(&v.window));
        match next {
            Some(state) => {
                self.set_state(state);
                true
            }
            None => false,
        }
    }

    pub fn previous_page(&mut self) -> bool {
        match self.state.previous_page() {
            Some(state) => {
                self.set_state(state);
                true
            }
            None => false,
        }
    }

    /// Start a fetch for the current state.
    pub fn begin(&mut self) -> (RequestToken, Granularity) {
        (self.sequencer.issue(), self.state.granularity)
    }

    /// Offer the response to the request identified by `token`.
    pub fn complete(
        &mut self,
        token: RequestToken,
        result: Result<Vec<SimulationRecord>, SourceError>,
    ) -> RefreshOutcome {
        if !self.sequencer.is_current(token) {
            debug!(token = token.value(), "discarding stale detail response");
            return RefreshOutcome::Stale;
        }
        let records = match result {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, granularity = %self.state.granularity, "detail fetch failed");
                self.last_error = Some(err.to_string());
                return RefreshOutcome::FetchFailed;
            }
        };
        self.last_error = None;
        if let Some(snapshot) = &self.snapshot {
            if snapshot.state == self.state && snapshot.records == records {
                debug!(granularity = %self.state.granularity, "records unchanged, skipping recompute");
                return RefreshOutcome::Unchanged;
            }
        }
        self.apply(records);
        RefreshOutcome::Applied
    }

    /// Fetch and apply in one step.
    pub fn refresh<S: RecordSource + ?Sized>(&mut self, source: &S) -> RefreshOutcome {
        let (token, granularity) = self.begin();
        let result = source.fetch_records(granularity);
        self.complete(token, result)
    }

    fn apply(&mut self, records: Vec<SimulationRecord>) {
        let s = self.state;
        let mut view = build_view(&records, s.granularity, &s.filter, s.page, s.page_size);
        let clamped = s.clamped_to(&view.window);
        if clamped != s {
            debug!(from = s.page, to = clamped.page, "page out of range, clamping");
            view = build_view(&records, clamped.granularity, &clamped.filter, clamped.page, clamped.page_size);
            self.state = clamped;
        }
        info!(
            granularity = %self.state.granularity,
            rows = view.rows.len(),
            page = view.window.page,
            pages = view.window.display_pages(),
            "detail view refreshed"
        );
        self.snapshot = Some(DetailSnapshot {
            state: self.state,
            records,
        });
        self.view = Some(view);
    }
}

/// Raw inputs of the summary page.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryInputs {
    pub monthly: Vec<SimulationRecord>,
    /// Only fetched when there is no monthly series.
    pub weekly: Vec<SimulationRecord>,
    pub events: Vec<PatientEventRecord>,
    pub state: SimulationState,
}

impl SummaryInputs {
    pub fn fetch<S: RecordSource + ?Sized>(source: &S) -> Result<Self, SourceError> {
        let monthly = source.fetch_records(Granularity::Monthly)?;
        let weekly = if monthly.is_empty() {
            source.fetch_records(Granularity::Weekly)?
        } else {
            Vec::new()
        };
        let events = source
            .fetch_records(Granularity::PatientEvent)?
            .into_iter()
            .filter_map(SimulationRecord::into_patient_event)
            .collect();
        let state = source.fetch_state()?;
        Ok(Self {
            monthly,
            weekly,
            events,
            state,
        })
    }
}

/// Drives the summary page: analytics over the full, unfiltered data.
#[derive(Debug)]
pub struct SummaryDriver {
    initial_investment: Decimal,
    sequencer: RequestSequencer,
    snapshot: Option<SummaryInputs>,
    report: Option<AnalyticsReport>,
    last_error: Option<String>,
}

impl SummaryDriver {
    pub fn new(initial_investment: Decimal) -> Self {
        Self {
            initial_investment,
            sequencer: RequestSequencer::default(),
            snapshot: None,
            report: None,
            last_error: None,
        }
    }

    pub fn report(&self) -> Option<&AnalyticsReport> {
        self.report.as_ref()
    }

    pub fn simulation_state(&self) -> Option<&SimulationState> {
        self.snapshot.as_ref().map(|s| &s.state)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn begin(&mut self) -> RequestToken {
        self.sequencer.issue()
    }

    pub fn complete(
        &mut self,
        token: RequestToken,
        result: Result<SummaryInputs, SourceError>,
    ) -> RefreshOutcome {
        if !self.sequencer.is_current(token) {
            debug!(token = token.value(), "discarding stale summary response");
            return RefreshOutcome::Stale;
        }
        let inputs = match result {
            Ok(inputs) => inputs,
            Err(err) => {
                warn!(error = %err, "summary fetch failed");
                self.last_error = Some(err.to_string());
                return RefreshOutcome::FetchFailed;
            }
        };
        self.last_error = None;
        if self.snapshot.as_ref() == Some(&inputs) {
            debug!("summary inputs unchanged, skipping recompute");
            return RefreshOutcome::Unchanged;
        }
        let series = PeriodSeries::choose(&inputs.monthly, &inputs.weekly);
        let report = AnalyticsReport::build(&series, &inputs.events, &inputs.state, self.initial_investment);
        info!(
            kind = ?report.kind,
            periods = series.points.len(),
            events = inputs.events.len(),
            status = %report.assessment.status,
            "summary refreshed"
        );
        self.report = Some(report);
        self.snapshot = Some(inputs);
        RefreshOutcome::Applied
    }

    pub fn refresh<S: RecordSource + ?Sized>(&mut self, source: &S) -> RefreshOutcome {
        let token = self.begin();
        let result = SummaryInputs::fetch(source);
        self.complete(token, result)
    }
}
