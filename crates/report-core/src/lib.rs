#![deny(warnings)]

//! Core record models and time-bucket rules for the clinic report engine.
//!
//! The simulation backend emits daily, weekly and monthly period records plus
//! discrete patient events. This crate defines their decoded shape, the
//! nominal 31-day month convention used to bucket them, and the catalogue of
//! numeric columns the pipeline filters and sums.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Length of the simulation's nominal accounting month in days.
pub const NOMINAL_MONTH_DAYS: u32 = 31;
/// Days per simulated week.
pub const WEEK_DAYS: u32 = 7;

/// Time-aggregation level of a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One record per simulated day.
    Daily,
    /// One record per simulated week.
    Weekly,
    /// One record per nominal month.
    Monthly,
    /// One record per patient sub-event.
    PatientEvent,
}

impl Granularity {
    /// All granularities in display order.
    pub const ALL: [Granularity; 4] = [
        Granularity::Daily,
        Granularity::Weekly,
        Granularity::Monthly,
        Granularity::PatientEvent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
            Granularity::PatientEvent => "patient_event",
        }
    }

    /// Whether a week selection applies to this granularity.
    pub fn supports_week_filter(self) -> bool {
        !matches!(self, Granularity::Monthly)
    }

    /// Whether a day-of-month selection applies to this granularity.
    pub fn supports_day_filter(self) -> bool {
        matches!(self, Granularity::Daily | Granularity::PatientEvent)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Granularity::Daily),
            "weekly" => Ok(Granularity::Weekly),
            "monthly" => Ok(Granularity::Monthly),
            "patient" | "patient_event" | "patient_details" => Ok(Granularity::PatientEvent),
            other => Err(SelectionError::UnknownGranularity(other.to_string())),
        }
    }
}

/// Errors raised when a record cannot be assigned to a time bucket.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemporalError {
    /// The record has neither the explicit bucket field nor an absolute `Day`.
    #[error("record carries neither {field} nor Day")]
    MissingTemporalField { field: &'static str },
}

/// Errors raised while parsing user selections.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// Selection is neither `"all"` nor a positive integer.
    #[error("invalid {field} selection: {value:?}")]
    InvalidSelection { field: &'static str, value: String },
    /// Unknown view name.
    #[error("unknown granularity: {0}")]
    UnknownGranularity(String),
}

/// Month of an absolute simulation day: `floor((day - 1) / 31) + 1`.
///
/// Day 0 lies before the first month and maps to month 0.
pub fn month_of_day(day: u32) -> u32 {
    if day == 0 {
        0
    } else {
        (day - 1) / NOMINAL_MONTH_DAYS + 1
    }
}

/// Week of an absolute simulation day: `ceil(day / 7)`.
pub fn week_of_day(day: u32) -> u32 {
    day.div_ceil(WEEK_DAYS)
}

/// Access to the temporal fields a record may carry.
///
/// Explicit fields come from the backend and are authoritative; derived
/// buckets are only computed when they are absent.
pub trait Temporal {
    /// Absolute simulation day, if the record has one.
    fn absolute_day(&self) -> Option<u32>;
    /// Backend-assigned month, if present.
    fn explicit_month(&self) -> Option<u32>;
    /// Backend-assigned week, if present.
    fn explicit_week(&self) -> Option<u32>;
}

/// Resolve the month bucket, preferring an explicit `Month`.
pub fn resolve_month<T: Temporal + ?Sized>(record: &T) -> Result<u32, TemporalError> {
    record
        .explicit_month()
        .or_else(|| record.absolute_day().map(month_of_day))
        .ok_or(TemporalError::MissingTemporalField { field: "Month" })
}

/// Resolve the week bucket, preferring an explicit `Week`.
pub fn resolve_week<T: Temporal + ?Sized>(record: &T) -> Result<u32, TemporalError> {
    record
        .explicit_week()
        .or_else(|| record.absolute_day().map(week_of_day))
        .ok_or(TemporalError::MissingTemporalField { field: "Week" })
}

/// Day within the resolved month: `Day - (month - 1) * 31`.
///
/// Uses the resolved month so an explicit backend month is never second
/// guessed. May be out of `1..=31` when the explicit month disagrees with
/// the day.
pub fn day_in_month<T: Temporal + ?Sized>(record: &T) -> Result<i64, TemporalError> {
    let day = record
        .absolute_day()
        .ok_or(TemporalError::MissingTemporalField { field: "Day" })?;
    let month = resolve_month(record)?;
    Ok(i64::from(day) - (i64::from(month) - 1) * i64::from(NOMINAL_MONTH_DAYS))
}

/// Numeric columns known to the report engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    NewCustomers,
    PatientsSeen,
    TotalCustomers,
    TotalMembers,
    RevenueTotal,
    Costs,
    Profit,
    Cash,
    CashFlowToday,
    CashFlowWeekly,
    CashFlowMonthly,
    RevenueCard,
    RevenueTreatment,
    RevenueOrtho,
    ProfitCard,
    ProfitTreatment,
    ProfitOrtho,
    CashFlowCard,
    CashFlowTreatment,
    CashFlowOrtho,
    DoctorSalary,
    NurseSalary,
    OpsSalary,
    MonthlyCardRevenue,
    CardContractLiability,
    OrthoContractLiability,
    Amount,
    CashFlow,
}

impl Metric {
    /// Backend field name.
    pub fn name(self) -> &'static str {
        match self {
            Metric::NewCustomers => "NewCustomers",
            Metric::PatientsSeen => "PatientsSeen",
            Metric::TotalCustomers => "TotalCustomers",
            Metric::TotalMembers => "TotalMembers",
            Metric::RevenueTotal => "RevenueTotal",
            Metric::Costs => "Costs",
            Metric::Profit => "Profit",
            Metric::Cash => "Cash",
            Metric::CashFlowToday => "CashFlowToday",
            Metric::CashFlowWeekly => "CashFlowWeekly",
            Metric::CashFlowMonthly => "CashFlowMonthly",
            Metric::RevenueCard => "RevenueCard",
            Metric::RevenueTreatment => "RevenueTreatment",
            Metric::RevenueOrtho => "RevenueOrtho",
            Metric::ProfitCard => "ProfitCard",
            Metric::ProfitTreatment => "ProfitTreatment",
            Metric::ProfitOrtho => "ProfitOrtho",
            Metric::CashFlowCard => "CashFlowCard",
            Metric::CashFlowTreatment => "CashFlowTreatment",
            Metric::CashFlowOrtho => "CashFlowOrtho",
            Metric::DoctorSalary => "DoctorSalary",
            Metric::NurseSalary => "NurseSalary",
            Metric::OpsSalary => "OpsSalary",
            Metric::MonthlyCardRevenue => "MonthlyCardRevenue",
            Metric::CardContractLiability => "CardContractLiability",
            Metric::OrthoContractLiability => "OrthoContractLiability",
            Metric::Amount => "Amount",
            Metric::CashFlow => "CashFlow",
        }
    }

    /// Human-readable column label.
    pub fn label(self) -> &'static str {
        match self {
            Metric::NewCustomers => "New customers",
            Metric::PatientsSeen => "Patients seen",
            Metric::TotalCustomers => "Total customers",
            Metric::TotalMembers => "Total members",
            Metric::RevenueTotal => "Revenue",
            Metric::Costs => "Costs",
            Metric::Profit => "Profit",
            Metric::Cash => "Cash balance",
            Metric::CashFlowToday => "Cash flow (day)",
            Metric::CashFlowWeekly => "Cash flow (week)",
            Metric::CashFlowMonthly => "Cash flow (month)",
            Metric::RevenueCard => "Card revenue",
            Metric::RevenueTreatment => "Treatment revenue",
            Metric::RevenueOrtho => "Ortho revenue",
            Metric::ProfitCard => "Card profit",
            Metric::ProfitTreatment => "Treatment profit",
            Metric::ProfitOrtho => "Ortho profit",
            Metric::CashFlowCard => "Card cash flow",
            Metric::CashFlowTreatment => "Treatment cash flow",
            Metric::CashFlowOrtho => "Ortho cash flow",
            Metric::DoctorSalary => "Doctor salary",
            Metric::NurseSalary => "Nurse salary",
            Metric::OpsSalary => "Ops salary",
            Metric::MonthlyCardRevenue => "Monthly card revenue",
            Metric::CardContractLiability => "Card contract liability",
            Metric::OrthoContractLiability => "Ortho contract liability",
            Metric::Amount => "Amount",
            Metric::CashFlow => "Cash flow",
        }
    }

    /// Money columns render with two decimals; everything else is rounded
    /// to an integer.
    pub fn is_money(self) -> bool {
        matches!(
            self,
            Metric::RevenueTotal
                | Metric::Costs
                | Metric::Profit
                | Metric::Cash
                | Metric::CashFlowToday
                | Metric::CashFlowWeekly
                | Metric::CashFlowMonthly
                | Metric::MonthlyCardRevenue
                | Metric::CardContractLiability
                | Metric::OrthoContractLiability
                | Metric::Amount
                | Metric::CashFlow
        )
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Records that expose numeric columns by [`Metric`].
pub trait MetricSource {
    /// Value of the column, or `None` when the record has no such column.
    fn metric(&self, metric: Metric) -> Option<Decimal>;
}

/// Treat a JSON `null` like a missing field: the type's default (zero).
pub fn zero_if_null<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Figures shared by daily, weekly and monthly period records.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PeriodFigures {
    #[serde(deserialize_with = "zero_if_null")]
    pub new_customers: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub patients_seen: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub total_customers: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub total_members: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub revenue_total: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub costs: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub profit: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub cash: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub revenue_card: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub revenue_treatment: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub revenue_ortho: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub profit_card: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub profit_treatment: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub profit_ortho: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub cash_flow_card: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub cash_flow_treatment: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub cash_flow_ortho: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub doctor_salary: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub nurse_salary: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub ops_salary: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub monthly_card_revenue: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub card_contract_liability: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub ortho_contract_liability: Decimal,
}

impl PeriodFigures {
    /// Cash received from card, treatment and ortho sales.
    pub fn cash_inflow(&self) -> Decimal {
        self.cash_flow_card + self.cash_flow_treatment + self.cash_flow_ortho
    }
}

impl MetricSource for PeriodFigures {
    fn metric(&self, metric: Metric) -> Option<Decimal> {
        let v = match metric {
            Metric::NewCustomers => Decimal::from(self.new_customers),
            Metric::PatientsSeen => Decimal::from(self.patients_seen),
            Metric::TotalCustomers => Decimal::from(self.total_customers),
            Metric::TotalMembers => Decimal::from(self.total_members),
            Metric::RevenueTotal => self.revenue_total,
            Metric::Costs => self.costs,
            Metric::Profit => self.profit,
            Metric::Cash => self.cash,
            Metric::RevenueCard => self.revenue_card,
            Metric::RevenueTreatment => self.revenue_treatment,
            Metric::RevenueOrtho => self.revenue_ortho,
            Metric::ProfitCard => self.profit_card,
            Metric::ProfitTreatment => self.profit_treatment,
            Metric::ProfitOrtho => self.profit_ortho,
            Metric::CashFlowCard => self.cash_flow_card,
            Metric::CashFlowTreatment => self.cash_flow_treatment,
            Metric::CashFlowOrtho => self.cash_flow_ortho,
            Metric::DoctorSalary => self.doctor_salary,
            Metric::NurseSalary => self.nurse_salary,
            Metric::OpsSalary => self.ops_salary,
            Metric::MonthlyCardRevenue => self.monthly_card_revenue,
            Metric::CardContractLiability => self.card_contract_liability,
            Metric::OrthoContractLiability => self.ortho_contract_liability,
            Metric::CashFlowToday
            | Metric::CashFlowWeekly
            | Metric::CashFlowMonthly
            | Metric::Amount
            | Metric::CashFlow => return None,
        };
        Some(v)
    }
}

/// Simulation figures for a single day.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DailyRecord {
    #[serde(default)]
    pub day: Option<u32>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub week: Option<u32>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub cash_flow_today: Decimal,
    #[serde(flatten)]
    pub figures: PeriodFigures,
}

/// Simulation figures for a week. The week number is always present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WeeklyRecord {
    pub week: u32,
    #[serde(default)]
    pub start_day: Option<u32>,
    #[serde(default)]
    pub end_day: Option<u32>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub cash_flow_weekly: Decimal,
    #[serde(flatten)]
    pub figures: PeriodFigures,
}

/// Simulation figures for a nominal month. The month number is always present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MonthlyRecord {
    pub month: u32,
    #[serde(default)]
    pub start_day: Option<u32>,
    #[serde(default)]
    pub end_day: Option<u32>,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub cash_flow_monthly: Decimal,
    #[serde(flatten)]
    pub figures: PeriodFigures,
}

/// Patient-acquisition channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientSource {
    /// Pre-existing clinic clientele.
    Existing,
    /// Newly acquired patients.
    Native,
    /// Legacy tag folded into the existing clientele.
    All,
}

impl PatientSource {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "existing" => Some(PatientSource::Existing),
            "native" => Some(PatientSource::Native),
            "all" => Some(PatientSource::All),
            _ => None,
        }
    }

    /// Whether cash from this source counts towards the old store.
    pub fn is_old_store(self) -> bool {
        matches!(self, PatientSource::Existing | PatientSource::All)
    }

    /// Display label for the raw source tag.
    pub fn display(raw: &str) -> &str {
        match raw {
            "existing" => "Old store",
            "native" => "New store",
            other => other,
        }
    }
}

/// One patient sub-event. Several may share `(PatientID, Day)`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PatientEventRecord {
    #[serde(rename = "PatientID")]
    pub patient_id: u64,
    pub day: Option<u32>,
    pub date: Option<NaiveDate>,
    pub week: Option<u32>,
    pub month: Option<u32>,
    pub weekday: Option<String>,
    /// Years; fractional for members that existed before day 1.
    pub age: Option<Decimal>,
    pub source: Option<String>,
    pub action: Option<String>,
    pub card_type: Option<String>,
    #[serde(deserialize_with = "zero_if_null")]
    pub amount: Decimal,
    pub revenue_type: Option<String>,
    #[serde(deserialize_with = "zero_if_null")]
    pub cash_flow: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub costs: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub profit: Decimal,
    pub description: Option<String>,
}

impl PatientEventRecord {
    /// Parsed acquisition channel; unknown tags yield `None`.
    pub fn source_kind(&self) -> Option<PatientSource> {
        self.source.as_deref().and_then(PatientSource::parse)
    }
}

impl MetricSource for PatientEventRecord {
    fn metric(&self, metric: Metric) -> Option<Decimal> {
        match metric {
            Metric::Amount => Some(self.amount),
            Metric::CashFlow => Some(self.cash_flow),
            Metric::Costs => Some(self.costs),
            Metric::Profit => Some(self.profit),
            _ => None,
        }
    }
}

impl MetricSource for DailyRecord {
    fn metric(&self, metric: Metric) -> Option<Decimal> {
        match metric {
            Metric::CashFlowToday => Some(self.cash_flow_today),
            other => self.figures.metric(other),
        }
    }
}

impl MetricSource for WeeklyRecord {
    fn metric(&self, metric: Metric) -> Option<Decimal> {
        match metric {
            Metric::CashFlowWeekly => Some(self.cash_flow_weekly),
            other => self.figures.metric(other),
        }
    }
}

impl MetricSource for MonthlyRecord {
    fn metric(&self, metric: Metric) -> Option<Decimal> {
        match metric {
            Metric::CashFlowMonthly => Some(self.cash_flow_monthly),
            other => self.figures.metric(other),
        }
    }
}

impl Temporal for DailyRecord {
    fn absolute_day(&self) -> Option<u32> {
        self.day
    }
    fn explicit_month(&self) -> Option<u32> {
        self.month
    }
    fn explicit_week(&self) -> Option<u32> {
        self.week
    }
}

impl Temporal for WeeklyRecord {
    /// A week is anchored on its first day.
    fn absolute_day(&self) -> Option<u32> {
        self.start_day
    }
    fn explicit_month(&self) -> Option<u32> {
        self.month
    }
    fn explicit_week(&self) -> Option<u32> {
        Some(self.week)
    }
}

impl Temporal for MonthlyRecord {
    fn absolute_day(&self) -> Option<u32> {
        self.start_day
    }
    fn explicit_month(&self) -> Option<u32> {
        Some(self.month)
    }
    fn explicit_week(&self) -> Option<u32> {
        None
    }
}

impl Temporal for PatientEventRecord {
    fn absolute_day(&self) -> Option<u32> {
        self.day
    }
    fn explicit_month(&self) -> Option<u32> {
        self.month
    }
    fn explicit_week(&self) -> Option<u32> {
        self.week
    }
}

/// A decoded record of any granularity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "granularity", rename_all = "snake_case")]
pub enum SimulationRecord {
    Daily(DailyRecord),
    Weekly(WeeklyRecord),
    Monthly(MonthlyRecord),
    PatientEvent(PatientEventRecord),
}

impl SimulationRecord {
    pub fn granularity(&self) -> Granularity {
        match self {
            SimulationRecord::Daily(_) => Granularity::Daily,
            SimulationRecord::Weekly(_) => Granularity::Weekly,
            SimulationRecord::Monthly(_) => Granularity::Monthly,
            SimulationRecord::PatientEvent(_) => Granularity::PatientEvent,
        }
    }

    pub fn as_patient_event(&self) -> Option<&PatientEventRecord> {
        match self {
            SimulationRecord::PatientEvent(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_patient_event(self) -> Option<PatientEventRecord> {
        match self {
            SimulationRecord::PatientEvent(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_weekly(self) -> Option<WeeklyRecord> {
        match self {
            SimulationRecord::Weekly(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_monthly(self) -> Option<MonthlyRecord> {
        match self {
            SimulationRecord::Monthly(r) => Some(r),
            _ => None,
        }
    }

    fn temporal(&self) -> &dyn Temporal {
        match self {
            SimulationRecord::Daily(r) => r,
            SimulationRecord::Weekly(r) => r,
            SimulationRecord::Monthly(r) => r,
            SimulationRecord::PatientEvent(r) => r,
        }
    }
}

impl Temporal for SimulationRecord {
    fn absolute_day(&self) -> Option<u32> {
        self.temporal().absolute_day()
    }
    fn explicit_month(&self) -> Option<u32> {
        self.temporal().explicit_month()
    }
    fn explicit_week(&self) -> Option<u32> {
        self.temporal().explicit_week()
    }
}

impl MetricSource for SimulationRecord {
    fn metric(&self, metric: Metric) -> Option<Decimal> {
        match self {
            SimulationRecord::Daily(r) => r.metric(metric),
            SimulationRecord::Weekly(r) => r.metric(metric),
            SimulationRecord::Monthly(r) => r.metric(metric),
            SimulationRecord::PatientEvent(r) => r.metric(metric),
        }
    }
}

fn decode_one(
    granularity: Granularity,
    value: serde_json::Value,
) -> Result<SimulationRecord, serde_json::Error> {
    Ok(match granularity {
        Granularity::Daily => SimulationRecord::Daily(serde_json::from_value(value)?),
        Granularity::Weekly => SimulationRecord::Weekly(serde_json::from_value(value)?),
        Granularity::Monthly => SimulationRecord::Monthly(serde_json::from_value(value)?),
        Granularity::PatientEvent => {
            SimulationRecord::PatientEvent(serde_json::from_value(value)?)
        }
    })
}

/// Decode a JSON array of records whose granularity is known from the
/// endpoint that produced it.
///
/// Fails only when the payload is not a JSON array. Elements that do not
/// decode are logged and skipped so one bad record cannot void the report.
pub fn decode_records(
    granularity: Granularity,
    json: &str,
) -> Result<Vec<SimulationRecord>, serde_json::Error> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut records = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        match decode_one(granularity, value) {
            Ok(record) => records.push(record),
            Err(error) => warn!(index, %granularity, %error, "skipping undecodable record"),
        }
    }
    Ok(records)
}

/// Simulation progress summary reported by the backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationState {
    pub current_day: u32,
    #[serde(alias = "total_weeks")]
    pub current_week: u32,
    #[serde(alias = "current_cash", deserialize_with = "zero_if_null")]
    pub final_cash: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub total_revenue: Decimal,
    #[serde(deserialize_with = "zero_if_null")]
    pub total_profit: Decimal,
    pub total_customers: u64,
    pub total_members: u64,
}

/// A `{month, week, day}` selection. `None` means "all".
///
/// `day` is a day of the nominal month and only takes effect together with
/// a concrete `month`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeFilter {
    pub month: Option<u32>,
    pub week: Option<u32>,
    pub day: Option<u32>,
}

impl TimeFilter {
    /// The pass-everything filter.
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse the three selector values, each `"all"` or a positive integer.
    pub fn from_selections(month: &str, week: &str, day: &str) -> Result<Self, SelectionError> {
        Ok(Self {
            month: parse_selection("month", month)?,
            week: parse_selection("week", week)?,
            day: parse_selection("day", day)?,
        })
    }

    pub fn with_month(mut self, month: Option<u32>) -> Self {
        self.month = month;
        self
    }

    pub fn with_week(mut self, week: Option<u32>) -> Self {
        self.week = week;
        self
    }

    pub fn with_day(mut self, day: Option<u32>) -> Self {
        self.day = day;
        self
    }

    pub fn is_all(&self) -> bool {
        self.month.is_none() && self.week.is_none() && self.day.is_none()
    }
}

/// Parse one selector value: `"all"` (or empty) is `None`, otherwise a
/// positive integer.
pub fn parse_selection(field: &'static str, raw: &str) -> Result<Option<u32>, SelectionError> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    match raw.parse::<u32>() {
        Ok(v) if v > 0 => Ok(Some(v)),
        _ => Err(SelectionError::InvalidSelection {
            field,
            value: raw.to_string(),
        }),
    }
}

/// Selector choices offered for a view at the current simulation progress.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub months: Vec<u32>,
    pub weeks: Vec<u32>,
    pub days: Vec<u32>,
}

impl FilterOptions {
    pub fn for_view(granularity: Granularity, state: &SimulationState) -> Self {
        let months = (1..=month_of_day(state.current_day)).collect();
        let weeks = if granularity.supports_week_filter() {
            (1..=state.current_week).collect()
        } else {
            Vec::new()
        };
        let days = if granularity.supports_day_filter() {
            (1..=state.current_day.min(NOMINAL_MONTH_DAYS)).collect()
        } else {
            Vec::new()
        };
        Self {
            months,
            weeks,
            days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn event(day: Option<u32>, month: Option<u32>) -> PatientEventRecord {
        PatientEventRecord {
            patient_id: 1,
            day,
            month,
            ..Default::default()
        }
    }

    #[test]
    fn month_boundary_at_day_31_and_32() {
        assert_eq!(month_of_day(1), 1);
        assert_eq!(month_of_day(31), 1);
        assert_eq!(month_of_day(32), 2);
        assert_eq!(month_of_day(62), 2);
        assert_eq!(month_of_day(63), 3);
        assert_eq!(day_in_month(&event(Some(32), None)), Ok(1));
        assert_eq!(day_in_month(&event(Some(31), None)), Ok(31));
    }

    #[test]
    fn week_is_ceiling_of_day_over_seven() {
        assert_eq!(week_of_day(1), 1);
        assert_eq!(week_of_day(7), 1);
        assert_eq!(week_of_day(8), 2);
        assert_eq!(week_of_day(0), 0);
    }

    #[test]
    fn explicit_month_is_authoritative() {
        let r = event(Some(32), Some(1));
        assert_eq!(resolve_month(&r), Ok(1));
        assert_eq!(day_in_month(&r), Ok(32));
    }

    #[test]
    fn missing_day_and_month_is_reported() {
        let r = event(None, None);
        assert_eq!(
            resolve_month(&r),
            Err(TemporalError::MissingTemporalField { field: "Month" })
        );
        assert!(resolve_week(&r).is_err());
        assert!(day_in_month(&event(None, Some(2))).is_err());
    }

    #[test]
    fn weekly_record_anchors_on_start_day() {
        let w = WeeklyRecord {
            week: 5,
            start_day: Some(29),
            ..Default::default()
        };
        assert_eq!(resolve_week(&w), Ok(5));
        assert_eq!(resolve_month(&w), Ok(1));
        let unanchored = WeeklyRecord {
            week: 5,
            ..Default::default()
        };
        assert!(resolve_month(&unanchored).is_err());
    }

    #[test]
    fn selections_parse_all_and_positive_integers() {
        let f = TimeFilter::from_selections("2", "all", "31").unwrap();
        assert_eq!(f.month, Some(2));
        assert_eq!(f.week, None);
        assert_eq!(f.day, Some(31));
        assert!(TimeFilter::from_selections("all", "all", "all")
            .unwrap()
            .is_all());
        assert!(parse_selection("month", "0").is_err());
        assert!(parse_selection("week", "-3").is_err());
        assert!(parse_selection("day", "x").is_err());
    }

    #[test]
    fn granularity_parses_view_names() {
        assert_eq!("patient".parse::<Granularity>(), Ok(Granularity::PatientEvent));
        assert_eq!("Monthly".parse::<Granularity>(), Ok(Granularity::Monthly));
        assert!("yearly".parse::<Granularity>().is_err());
    }

    #[test]
    fn decodes_patient_events_with_nulls() {
        let json = r#"[
            {"PatientID": 3, "Day": 5, "Date": "2026-01-05", "Week": 1, "Month": 1,
             "Age": 9, "Action": "Treatment", "CardType": null, "Amount": 520,
             "RevenueType": "Treatment revenue", "CashFlow": 520.5, "Costs": null,
             "Profit": 494, "Description": "basic treatment", "Source": "native"}
        ]"#;
        let records = decode_records(Granularity::PatientEvent, json).unwrap();
        assert_eq!(records.len(), 1);
        let r = records[0].as_patient_event().unwrap();
        assert_eq!(r.patient_id, 3);
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2026, 1, 5));
        assert_eq!(r.card_type, None);
        assert_eq!(r.costs, Decimal::ZERO);
        assert_eq!(r.cash_flow, Decimal::new(5205, 1));
        assert_eq!(r.source_kind(), Some(PatientSource::Native));
    }

    #[test]
    fn bad_patient_event_is_skipped_not_fatal() {
        let json = r#"[
            {"PatientID": 1, "Day": 12, "Age": 8.734, "Source": "existing", "CashFlow": 80},
            {"PatientID": "not-a-number", "Day": 12},
            {"PatientID": 2, "Day": 12, "Age": 7, "Source": "native", "CashFlow": 95}
        ]"#;
        let records = decode_records(Granularity::PatientEvent, json).unwrap();
        assert_eq!(records.len(), 2);
        let first = records[0].as_patient_event().unwrap();
        assert_eq!(first.age, Some(Decimal::new(8734, 3)));
        assert_eq!(records[1].as_patient_event().unwrap().patient_id, 2);
        assert!(decode_records(Granularity::PatientEvent, r#"{"PatientID": 1}"#).is_err());
    }

    #[test]
    fn decodes_daily_figures_through_flatten() {
        let json = r#"[{"Day": 3, "Month": 1, "NewCustomers": 4, "RevenueTotal": 1200.25,
                        "CashFlowToday": -50, "DoctorSalary": null, "Unrelated": "x"}]"#;
        let records = decode_records(Granularity::Daily, json).unwrap();
        assert_eq!(records[0].granularity(), Granularity::Daily);
        assert_eq!(records[0].metric(Metric::NewCustomers), Some(Decimal::from(4)));
        assert_eq!(records[0].metric(Metric::RevenueTotal), Some(Decimal::new(120025, 2)));
        assert_eq!(records[0].metric(Metric::CashFlowToday), Some(Decimal::from(-50)));
        assert_eq!(records[0].metric(Metric::DoctorSalary), Some(Decimal::ZERO));
        assert_eq!(records[0].metric(Metric::CashFlowWeekly), None);
    }

    #[test]
    fn state_accepts_summary_aliases() {
        let s: SimulationState = serde_json::from_str(
            r#"{"current_day": 70, "total_weeks": 10, "current_cash": -1200.5,
                "total_revenue": 100000, "total_profit": 20000}"#,
        )
        .unwrap();
        assert_eq!(s.current_week, 10);
        assert_eq!(s.final_cash, Decimal::new(-12005, 1));
        assert_eq!(s.total_customers, 0);
    }

    #[test]
    fn filter_options_follow_progress() {
        let state = SimulationState {
            current_day: 40,
            current_week: 6,
            ..Default::default()
        };
        let daily = FilterOptions::for_view(Granularity::Daily, &state);
        assert_eq!(daily.months, vec![1, 2]);
        assert_eq!(daily.weeks.len(), 6);
        assert_eq!(daily.days.len(), 31);
        let monthly = FilterOptions::for_view(Granularity::Monthly, &state);
        assert!(monthly.weeks.is_empty());
        assert!(monthly.days.is_empty());
        let weekly = FilterOptions::for_view(Granularity::Weekly, &state);
        assert!(weekly.days.is_empty());
        assert_eq!(weekly.weeks, (1..=6).collect::<Vec<_>>());
    }

    #[test]
    fn source_tags() {
        assert!(PatientSource::Existing.is_old_store());
        assert!(PatientSource::All.is_old_store());
        assert!(!PatientSource::Native.is_old_store());
        assert_eq!(PatientSource::parse("walk-in"), None);
        assert_eq!(PatientSource::display("existing"), "Old store");
        assert_eq!(PatientSource::display("walk-in"), "walk-in");
    }

    proptest! {
        #[test]
        fn derived_month_matches_formula(day in 1u32..100_000) {
            let r = event(Some(day), None);
            prop_assert_eq!(resolve_month(&r).unwrap(), (day - 1) / 31 + 1);
            let dim = day_in_month(&r).unwrap();
            prop_assert!((1..=31).contains(&dim));
            prop_assert_eq!(dim, i64::from(day) - (i64::from(resolve_month(&r).unwrap()) - 1) * 31);
        }

        #[test]
        fn explicit_month_never_recomputed(day in 1u32..100_000, month in 1u32..1000) {
            let r = event(Some(day), Some(month));
            prop_assert_eq!(resolve_month(&r).unwrap(), month);
        }
    }
}
