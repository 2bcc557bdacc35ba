//! Column catalogue and cell formatting for the detail views.

use crate::aggregate::{format_metric, AggregationResult};
use crate::merge::MergedPatientRecord;
use chrono::NaiveDate;
use report_core::{
    resolve_month, resolve_week, Granularity, Metric, MetricSource, PatientSource,
    SimulationRecord,
};
use rust_decimal::Decimal;
use serde::Serialize;

/// A displayable column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Column {
    Date,
    Day,
    Week,
    Month,
    StartDay,
    EndDay,
    PatientId,
    Weekday,
    Age,
    Source,
    Action,
    CardType,
    RevenueType,
    Description,
    Value(Metric),
}

impl Column {
    pub fn label(self) -> &'static str {
        match self {
            Column::Date => "Date",
            Column::Day => "Day",
            Column::Week => "Week",
            Column::Month => "Month",
            Column::StartDay => "Start day",
            Column::EndDay => "End day",
            Column::PatientId => "Patient ID",
            Column::Weekday => "Weekday",
            Column::Age => "Age",
            Column::Source => "Source",
            Column::Action => "Action",
            Column::CardType => "Card type",
            Column::RevenueType => "Revenue type",
            Column::Description => "Description",
            Column::Value(m) => m.label(),
        }
    }
}

use Column::Value as V;

const DAILY_COLUMNS: &[Column] = &[
    Column::Date,
    Column::Day,
    Column::Week,
    Column::Month,
    V(Metric::NewCustomers),
    V(Metric::PatientsSeen),
    V(Metric::RevenueTotal),
    V(Metric::Costs),
    V(Metric::Profit),
    V(Metric::CashFlowToday),
    V(Metric::Cash),
    V(Metric::RevenueCard),
    V(Metric::RevenueTreatment),
    V(Metric::RevenueOrtho),
    V(Metric::CashFlowCard),
    V(Metric::CashFlowTreatment),
    V(Metric::CashFlowOrtho),
    V(Metric::DoctorSalary),
    V(Metric::NurseSalary),
    V(Metric::OpsSalary),
    V(Metric::TotalCustomers),
    V(Metric::TotalMembers),
];

const WEEKLY_COLUMNS: &[Column] = &[
    Column::Week,
    Column::StartDay,
    Column::EndDay,
    V(Metric::PatientsSeen),
    V(Metric::NewCustomers),
    V(Metric::TotalCustomers),
    V(Metric::RevenueTotal),
    V(Metric::Costs),
    V(Metric::Profit),
    V(Metric::CashFlowWeekly),
    V(Metric::Cash),
    V(Metric::RevenueCard),
    V(Metric::RevenueTreatment),
    V(Metric::RevenueOrtho),
    V(Metric::CashFlowCard),
    V(Metric::CashFlowTreatment),
    V(Metric::CashFlowOrtho),
    V(Metric::DoctorSalary),
    V(Metric::NurseSalary),
    V(Metric::OpsSalary),
    V(Metric::TotalMembers),
];

const MONTHLY_COLUMNS: &[Column] = &[
    Column::Month,
    V(Metric::PatientsSeen),
    V(Metric::NewCustomers),
    V(Metric::TotalCustomers),
    V(Metric::RevenueTotal),
    V(Metric::Costs),
    V(Metric::Profit),
    V(Metric::CashFlowMonthly),
    V(Metric::Cash),
    V(Metric::RevenueCard),
    V(Metric::RevenueTreatment),
    V(Metric::RevenueOrtho),
    V(Metric::CashFlowCard),
    V(Metric::CashFlowTreatment),
    V(Metric::CashFlowOrtho),
    V(Metric::DoctorSalary),
    V(Metric::NurseSalary),
    V(Metric::OpsSalary),
    V(Metric::TotalMembers),
];

const PATIENT_COLUMNS: &[Column] = &[
    Column::PatientId,
    Column::Date,
    Column::Day,
    Column::Week,
    Column::Month,
    Column::Weekday,
    Column::Age,
    Column::Source,
    Column::Action,
    Column::CardType,
    V(Metric::Amount),
    Column::RevenueType,
    V(Metric::CashFlow),
    V(Metric::Costs),
    V(Metric::Profit),
    Column::Description,
];

/// Display columns of a view, in order.
pub fn columns(granularity: Granularity) -> &'static [Column] {
    match granularity {
        Granularity::Daily => DAILY_COLUMNS,
        Granularity::Weekly => WEEKLY_COLUMNS,
        Granularity::Monthly => MONTHLY_COLUMNS,
        Granularity::PatientEvent => PATIENT_COLUMNS,
    }
}

/// Rows that can be rendered cell by cell.
pub trait TableRow {
    fn cell(&self, column: Column) -> String;
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

/// `NaiveDate` displays as `%Y-%m-%d`.
fn date(d: Option<NaiveDate>) -> String {
    opt(d)
}

/// Ages arrive fractional for members seeded before the simulation starts;
/// shown as whole years, halves rounding up.
fn age(v: Option<Decimal>) -> String {
    v.map(|v| format!("{:.0}", (v + Decimal::new(5, 1)).floor()))
        .unwrap_or_default()
}

impl TableRow for SimulationRecord {
    fn cell(&self, column: Column) -> String {
        use SimulationRecord as R;
        match (column, self) {
            (Column::Value(m), _) => self
                .metric(m)
                .map(|v| format_metric(m, v))
                .unwrap_or_default(),
            (Column::Date, R::Daily(r)) => date(r.date),
            (Column::Date, R::PatientEvent(r)) => date(r.date),
            (Column::Day, R::Daily(r)) => opt(r.day),
            (Column::Day, R::PatientEvent(r)) => opt(r.day),
            (Column::Week, _) => opt(resolve_week(self).ok()),
            (Column::Month, _) => opt(resolve_month(self).ok()),
            (Column::StartDay, R::Weekly(r)) => opt(r.start_day),
            (Column::StartDay, R::Monthly(r)) => opt(r.start_day),
            (Column::EndDay, R::Weekly(r)) => opt(r.end_day),
            (Column::EndDay, R::Monthly(r)) => opt(r.end_day),
            (Column::PatientId, R::PatientEvent(r)) => r.patient_id.to_string(),
            (Column::Weekday, R::PatientEvent(r)) => r.weekday.clone().unwrap_or_default(),
            (Column::Age, R::PatientEvent(r)) => age(r.age),
            (Column::Source, R::PatientEvent(r)) => r
                .source
                .as_deref()
                .map(|s| PatientSource::display(s).to_string())
                .unwrap_or_default(),
            (Column::Action, R::PatientEvent(r)) => r.action.clone().unwrap_or_default(),
            (Column::CardType, R::PatientEvent(r)) => r.card_type.clone().unwrap_or_default(),
            (Column::RevenueType, R::PatientEvent(r)) => {
                r.revenue_type.clone().unwrap_or_default()
            }
            (Column::Description, R::PatientEvent(r)) => {
                r.description.clone().unwrap_or_default()
            }
            _ => String::new(),
        }
    }
}

impl TableRow for MergedPatientRecord {
    fn cell(&self, column: Column) -> String {
        match column {
            Column::PatientId => self.patient_id.to_string(),
            Column::Date => date(self.date),
            Column::Day => opt(self.day),
            Column::Week => opt(self.week.or(self.day.map(report_core::week_of_day))),
            Column::Month => opt(self.month.or(self.day.map(report_core::month_of_day))),
            Column::Weekday => self.weekday.clone().unwrap_or_default(),
            Column::Age => age(self.age),
            Column::Source => self
                .source
                .split(", ")
                .map(PatientSource::display)
                .collect::<Vec<_>>()
                .join(", "),
            Column::Action => self.action.clone(),
            Column::CardType => self.card_type.clone(),
            Column::RevenueType => self.revenue_type.clone(),
            Column::Description => self.description.clone(),
            Column::Value(m @ Metric::Amount) => format_metric(m, self.amount),
            Column::Value(m @ Metric::CashFlow) => format_metric(m, self.cash_flow),
            Column::Value(m @ Metric::Costs) => format_metric(m, self.costs),
            Column::Value(m @ Metric::Profit) => format_metric(m, self.profit),
            Column::Value(_) | Column::StartDay | Column::EndDay => String::new(),
        }
    }
}

/// A rendered page: header labels, cell strings and an optional totals row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Table {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
    pub totals: Option<Vec<String>>,
}

impl Table {
    pub fn build<R: TableRow>(
        granularity: Granularity,
        rows: &[R],
        totals: &AggregationResult,
    ) -> Self {
        let cols = columns(granularity);
        Self {
            headers: cols.iter().map(|c| c.label()).collect(),
            rows: rows
                .iter()
                .map(|r| cols.iter().map(|c| r.cell(*c)).collect())
                .collect(),
            totals: totals_row(cols, totals),
        }
    }
}

/// Totals row aligned to `cols`; the first column carries the caption.
pub fn totals_row(cols: &[Column], totals: &AggregationResult) -> Option<Vec<String>> {
    if totals.is_empty() {
        return None;
    }
    let row = cols
        .iter()
        .enumerate()
        .map(|(i, col)| match col {
            Column::Value(m) => totals
                .get(*m)
                .map(|v| format_metric(*m, v))
                .unwrap_or_default(),
            _ if i == 0 => "Total".to_string(),
            _ => String::new(),
        })
        .collect();
    Some(row)
}
