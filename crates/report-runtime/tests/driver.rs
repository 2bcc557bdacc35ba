//! Driver behaviour against an in-memory record source.

use report_analytics::{OperatingStatus, PeriodKind};
use report_core::{
    DailyRecord, Granularity, MonthlyRecord, PatientEventRecord, PeriodFigures, SimulationRecord,
    SimulationState, TimeFilter, WeeklyRecord,
};
use report_runtime::{
    DetailDriver, RecordSource, RefreshOutcome, SourceError, SummaryDriver, ViewState,
};
use rust_decimal::Decimal;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

#[derive(Default)]
struct MemorySource {
    records: RefCell<HashMap<Granularity, Vec<SimulationRecord>>>,
    state: RefCell<SimulationState>,
    failing: Cell<bool>,
    fetches: Cell<usize>,
}

impl MemorySource {
    fn set(&self, granularity: Granularity, records: Vec<SimulationRecord>) {
        self.records.borrow_mut().insert(granularity, records);
    }
}

impl RecordSource for MemorySource {
    fn fetch_records(
        &self,
        granularity: Granularity,
    ) -> Result<Vec<SimulationRecord>, SourceError> {
        self.fetches.set(self.fetches.get() + 1);
        if self.failing.get() {
            return Err(SourceError::Status {
                target: format!("/api/results/{granularity}"),
                status: 503,
            });
        }
        Ok(self
            .records
            .borrow()
            .get(&granularity)
            .cloned()
            .unwrap_or_default())
    }

    fn fetch_state(&self) -> Result<SimulationState, SourceError> {
        Ok(self.state.borrow().clone())
    }
}

fn days(n: u32) -> Vec<SimulationRecord> {
    (1..=n)
        .map(|d| {
            SimulationRecord::Daily(DailyRecord {
                day: Some(d),
                figures: PeriodFigures {
                    revenue_total: Decimal::from(100),
                    ..Default::default()
                },
                ..Default::default()
            })
        })
        .collect()
}

#[test]
fn stale_response_is_discarded() {
    let mut driver = DetailDriver::new(ViewState::new(Granularity::Daily));
    let (old, _) = driver.begin();
    let (new, _) = driver.begin();

    assert_eq!(driver.complete(new, Ok(days(5))), RefreshOutcome::Applied);
    assert_eq!(driver.complete(old, Ok(days(50))), RefreshOutcome::Stale);
    assert_eq!(driver.view().unwrap().filtered.len(), 5);
}

#[test]
fn filter_change_invalidates_in_flight_fetch() {
    let mut driver = DetailDriver::new(ViewState::new(Granularity::Daily));
    let (token, _) = driver.begin();
    let month2 = driver.state().with_filter(TimeFilter::all().with_month(Some(2)));
    driver.set_state(month2);
    assert_eq!(driver.complete(token, Ok(days(40))), RefreshOutcome::Stale);
    assert!(driver.view().is_none());

    let (token, _) = driver.begin();
    assert_eq!(driver.complete(token, Ok(days(40))), RefreshOutcome::Applied);
    assert_eq!(driver.view().unwrap().filtered.len(), 9);
}

#[test]
fn identical_snapshot_skips_recompute() {
    let source = MemorySource::default();
    source.set(Granularity::Daily, days(10));
    let mut driver = DetailDriver::new(ViewState::new(Granularity::Daily));

    assert_eq!(driver.refresh(&source), RefreshOutcome::Applied);
    assert_eq!(driver.refresh(&source), RefreshOutcome::Unchanged);
    source.set(Granularity::Daily, days(11));
    assert_eq!(driver.refresh(&source), RefreshOutcome::Applied);
    assert_eq!(source.fetches.get(), 3);

    // a new filter over the same records still recomputes
    driver.set_state(driver.state().with_filter(TimeFilter::all().with_week(Some(1))));
    assert_eq!(driver.refresh(&source), RefreshOutcome::Applied);
    assert_eq!(driver.view().unwrap().filtered.len(), 7);
}

#[test]
fn fetch_failure_keeps_last_view() {
    let source = MemorySource::default();
    source.set(Granularity::Daily, days(10));
    let mut driver = DetailDriver::new(ViewState::new(Granularity::Daily));
    driver.refresh(&source);

    source.failing.set(true);
    assert_eq!(driver.refresh(&source), RefreshOutcome::FetchFailed);
    assert!(driver.last_error().unwrap().contains("503"));
    assert_eq!(driver.view().unwrap().filtered.len(), 10);

    source.failing.set(false);
    assert_eq!(driver.refresh(&source), RefreshOutcome::Unchanged);
    assert!(driver.last_error().is_none());
}

#[test]
fn page_navigation_and_clamp() {
    let source = MemorySource::default();
    source.set(Granularity::Daily, days(250));
    let mut driver = DetailDriver::new(ViewState::new(Granularity::Daily));
    driver.refresh(&source);

    assert!(!driver.previous_page());
    assert!(driver.next_page());
    assert!(driver.next_page());
    assert!(!driver.next_page());
    let view = driver.view().unwrap();
    assert_eq!(view.window.page, 3);
    assert_eq!(view.page_rows().len(), 50);
    assert_eq!(source.fetches.get(), 1);

    // the data shrinks under the current page
    source.set(Granularity::Daily, days(120));
    assert_eq!(driver.refresh(&source), RefreshOutcome::Applied);
    assert_eq!(driver.state().page, 1);
    assert_eq!(driver.view().unwrap().window.page, 1);
}

#[test]
fn view_switch_waits_for_its_own_records() {
    let source = MemorySource::default();
    source.set(Granularity::Daily, days(250));
    let mut driver = DetailDriver::new(ViewState::new(Granularity::Daily));
    driver.refresh(&source);

    driver.set_state(driver.state().with_granularity(Granularity::Weekly));
    assert!(driver.view().is_none());
    assert!(!driver.next_page());
    assert_eq!(driver.state().page, 1);

    source.set(
        Granularity::Weekly,
        (1..=3)
            .map(|w| {
                SimulationRecord::Weekly(WeeklyRecord {
                    week: w,
                    start_day: Some((w - 1) * 7 + 1),
                    ..Default::default()
                })
            })
            .collect(),
    );
    assert_eq!(driver.refresh(&source), RefreshOutcome::Applied);
    let view = driver.view().unwrap();
    assert_eq!(view.granularity, Granularity::Weekly);
    assert_eq!(view.filtered.len(), 3);
}

#[test]
fn paging_waits_for_a_refiltered_view() {
    let source = MemorySource::default();
    source.set(Granularity::Daily, days(250));
    let mut driver = DetailDriver::new(ViewState::new(Granularity::Daily));
    driver.refresh(&source);

    driver.set_state(driver.state().with_filter(TimeFilter::all().with_month(Some(1))));
    // the cached view still describes the unfiltered selection
    assert!(!driver.next_page());
    assert_eq!(driver.refresh(&source), RefreshOutcome::Applied);
    assert!(!driver.next_page());
    assert_eq!(driver.view().unwrap().filtered.len(), 31);
}

#[test]
fn summary_prefers_monthly_and_keeps_report_on_failure() {
    let source = MemorySource::default();
    source.set(
        Granularity::Weekly,
        vec![SimulationRecord::Weekly(WeeklyRecord {
            week: 1,
            ..Default::default()
        })],
    );
    source.set(
        Granularity::PatientEvent,
        vec![SimulationRecord::PatientEvent(PatientEventRecord {
            patient_id: 1,
            day: Some(3),
            source: Some("native".into()),
            cash_flow: Decimal::from(120),
            ..Default::default()
        })],
    );
    *source.state.borrow_mut() = SimulationState {
        current_day: 7,
        current_week: 1,
        total_revenue: Decimal::from(1000),
        total_profit: Decimal::from(-50),
        ..Default::default()
    };

    let mut driver = SummaryDriver::new(Decimal::from(580_000));
    assert_eq!(driver.refresh(&source), RefreshOutcome::Applied);
    let report = driver.report().unwrap();
    assert_eq!(report.kind, PeriodKind::Weekly);
    assert_eq!(report.source_cash_flow.new_store, vec![Decimal::from(120)]);
    assert_eq!(report.assessment.status, OperatingStatus::LossMaking);
    assert_eq!(driver.refresh(&source), RefreshOutcome::Unchanged);

    source.set(
        Granularity::Monthly,
        vec![SimulationRecord::Monthly(MonthlyRecord {
            month: 1,
            ..Default::default()
        })],
    );
    assert_eq!(driver.refresh(&source), RefreshOutcome::Applied);
    assert_eq!(driver.report().unwrap().kind, PeriodKind::Monthly);

    source.failing.set(true);
    assert_eq!(driver.refresh(&source), RefreshOutcome::FetchFailed);
    assert_eq!(driver.report().unwrap().kind, PeriodKind::Monthly);
}
