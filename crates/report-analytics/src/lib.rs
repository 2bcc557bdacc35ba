#![deny(warnings)]

//! Summary analytics for the clinic report engine.
//!
//! This module derives chart-ready series and a narrative assessment from
//! the simulation's period records:
//! - Cumulative investment and revenue curves
//! - Old-store versus new-store cash flow from patient events
//! - Annualized return on the total capital put in
//! - Trend series and an operating assessment with recommendations

use report_core::{
    month_of_day, resolve_month, week_of_day, Metric, MetricSource, PatientEventRecord,
    PatientSource, SimulationRecord, SimulationState,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Fit-out (280000) plus equipment (300000).
pub const DEFAULT_INITIAL_INVESTMENT: Decimal = Decimal::from_parts(580_000, 0, 0, false, 0);

const DAYS_PER_YEAR: u32 = 365;

/// Longest horizon a period key may point into. Keys past it are treated as
/// corrupt input rather than back-filled.
pub const MAX_PERIOD_DAYS: u32 = 100 * DAYS_PER_YEAR;

/// Period length of a chart series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Monthly,
    Weekly,
}

impl PeriodKind {
    /// Largest period key accepted from event data.
    pub fn max_key(self) -> u32 {
        match self {
            PeriodKind::Monthly => month_of_day(MAX_PERIOD_DAYS),
            PeriodKind::Weekly => week_of_day(MAX_PERIOD_DAYS),
        }
    }

    /// Axis label of a period key, e.g. `"Month 3"`.
    pub fn label(self, key: u32) -> String {
        match self {
            PeriodKind::Monthly => format!("Month {key}"),
            PeriodKind::Weekly => format!("Week {key}"),
        }
    }
}

/// Figures of one period used by the charts.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PeriodPoint {
    pub key: u32,
    pub revenue_total: Decimal,
    pub costs: Decimal,
    pub cash: Decimal,
    /// `CashFlowMonthly` or `CashFlowWeekly`.
    pub cash_flow: Decimal,
    pub cash_inflow: Decimal,
    pub total_members: u64,
}

/// A weekly or monthly series in period order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PeriodSeries {
    pub kind: PeriodKind,
    pub points: Vec<PeriodPoint>,
}

impl PeriodSeries {
    /// Build a series from records of the matching granularity.
    ///
    /// Records of other granularities are ignored. A record whose key is
    /// missing (zero) takes its 1-based position in the series.
    pub fn from_records(kind: PeriodKind, records: &[SimulationRecord]) -> Self {
        let points = records
            .iter()
            .filter_map(|r| match (kind, r) {
                (PeriodKind::Monthly, SimulationRecord::Monthly(m)) => {
                    Some((m.month, m.cash_flow_monthly, &m.figures))
                }
                (PeriodKind::Weekly, SimulationRecord::Weekly(w)) => {
                    Some((w.week, w.cash_flow_weekly, &w.figures))
                }
                _ => None,
            })
            .enumerate()
            .map(|(index, (key, cash_flow, figures))| {
                let key = if key == 0 {
                    warn!(index, ?kind, "period record lacks its key, using position");
                    index as u32 + 1
                } else {
                    key
                };
                PeriodPoint {
                    key,
                    revenue_total: figures.revenue_total,
                    costs: figures.costs,
                    cash: figures.cash,
                    cash_flow,
                    cash_inflow: figures.cash_inflow(),
                    total_members: figures.total_members,
                }
            })
            .collect();
        Self { kind, points }
    }

    /// The monthly series when there is one, otherwise the weekly series.
    pub fn choose(monthly: &[SimulationRecord], weekly: &[SimulationRecord]) -> Self {
        let series = Self::from_records(PeriodKind::Monthly, monthly);
        if series.points.is_empty() {
            debug!("no monthly series, falling back to weekly");
            Self::from_records(PeriodKind::Weekly, weekly)
        } else {
            series
        }
    }

    pub fn labels(&self) -> Vec<String> {
        self.points.iter().map(|p| self.kind.label(p.key)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Running investment and revenue totals aligned to the period labels.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CumulativeCurves {
    pub labels: Vec<String>,
    pub investment: Vec<Decimal>,
    pub revenue: Vec<Decimal>,
}

/// Cumulative investment (seeded with `initial_investment`, then adding each
/// period's `Costs`) and cumulative revenue (seeded with zero).
///
/// Example:
/// costs [1000, 2000] with 580000 up front gives [581000, 583000].
pub fn cumulative_curves(series: &PeriodSeries, initial_investment: Decimal) -> CumulativeCurves {
    let mut invested = initial_investment;
    let mut earned = Decimal::ZERO;
    let mut investment = Vec::with_capacity(series.points.len());
    let mut revenue = Vec::with_capacity(series.points.len());
    for p in &series.points {
        invested += p.costs;
        earned += p.revenue_total;
        investment.push(invested);
        revenue.push(earned);
    }
    CumulativeCurves {
        labels: series.labels(),
        investment,
        revenue,
    }
}

/// Patient cash flow per period split by acquisition channel.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceCashFlow {
    pub kind: PeriodKind,
    pub labels: Vec<String>,
    pub old_store: Vec<Decimal>,
    pub new_store: Vec<Decimal>,
}

fn event_period(event: &PatientEventRecord, kind: PeriodKind) -> Option<u32> {
    match kind {
        PeriodKind::Monthly => resolve_month(event).ok(),
        // weekly buckets always come from the day
        PeriodKind::Weekly => event.day.map(week_of_day),
    }
}

/// Split the full patient-event set into old-store and new-store cash flow
/// per period.
///
/// `existing` and the legacy `all` tag count as old store, `native` as new
/// store; other tags still open their period but add nothing. The output is
/// dense over `1..=max_key`. Events that cannot be keyed, or whose key lies
/// past [`PeriodKind::max_key`], are skipped.
pub fn source_cash_flow(events: &[PatientEventRecord], kind: PeriodKind) -> SourceCashFlow {
    let mut buckets: BTreeMap<u32, (Decimal, Decimal)> = BTreeMap::new();
    for (index, event) in events.iter().enumerate() {
        let key = match event_period(event, kind) {
            Some(k) if k > kind.max_key() => {
                warn!(
                    index,
                    patient = event.patient_id,
                    key = k,
                    ?kind,
                    "patient event period out of range"
                );
                continue;
            }
            Some(k) if k > 0 => k,
            _ => {
                warn!(index, patient = event.patient_id, ?kind, "patient event has no period key");
                continue;
            }
        };
        let bucket = buckets.entry(key).or_default();
        match event.source_kind() {
            Some(s) if s.is_old_store() => bucket.0 += event.cash_flow,
            Some(PatientSource::Native) => bucket.1 += event.cash_flow,
            _ => {}
        }
    }

    let max_key = buckets.keys().next_back().copied().unwrap_or(0);
    let mut out = SourceCashFlow {
        kind,
        labels: Vec::with_capacity(max_key as usize),
        old_store: Vec::with_capacity(max_key as usize),
        new_store: Vec::with_capacity(max_key as usize),
    };
    for key in 1..=max_key {
        let (old, new) = buckets.get(&key).copied().unwrap_or_default();
        out.labels.push(kind.label(key));
        out.old_store.push(old);
        out.new_store.push(new);
    }
    out
}

/// Average annual return on the capital put into the clinic.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReturnEstimate {
    pub years_elapsed: Decimal,
    /// Revenue minus profit.
    pub total_costs: Decimal,
    /// Initial investment plus total costs.
    pub total_investment: Decimal,
    /// Percent; zero when the guard applies.
    pub avg_annual_return_pct: Decimal,
}

/// `((revenue / investment - 1) / years) * 100` with
/// `years = weeks * 7 / 365` and `investment = initial + revenue - profit`.
///
/// Returns zero instead of dividing when the investment or the elapsed time
/// is not positive.
pub fn annualized_return(state: &SimulationState, initial_investment: Decimal) -> ReturnEstimate {
    let years_elapsed = (Decimal::from(state.current_week) * Decimal::from(report_core::WEEK_DAYS))
        .checked_div(Decimal::from(DAYS_PER_YEAR))
        .unwrap_or_default();
    let total_costs = state.total_revenue - state.total_profit;
    let total_investment = initial_investment + total_costs;

    let avg_annual_return_pct = if total_investment <= Decimal::ZERO || years_elapsed <= Decimal::ZERO {
        Decimal::ZERO
    } else {
        state
            .total_revenue
            .checked_div(total_investment)
            .and_then(|ratio| (ratio - Decimal::ONE).checked_div(years_elapsed))
            .and_then(|per_year| per_year.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or_default()
    };

    ReturnEstimate {
        years_elapsed,
        total_costs,
        total_investment,
        avg_annual_return_pct,
    }
}

/// Single-valued trend charts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    Revenue,
    Cash,
    CashFlow,
    CashInflow,
    Members,
}

impl TrendMetric {
    pub const ALL: [TrendMetric; 5] = [
        TrendMetric::Revenue,
        TrendMetric::Cash,
        TrendMetric::CashFlow,
        TrendMetric::CashInflow,
        TrendMetric::Members,
    ];

    fn value(self, p: &PeriodPoint) -> Decimal {
        match self {
            TrendMetric::Revenue => p.revenue_total,
            TrendMetric::Cash => p.cash,
            TrendMetric::CashFlow => p.cash_flow,
            TrendMetric::CashInflow => p.cash_inflow,
            TrendMetric::Members => Decimal::from(p.total_members),
        }
    }
}

impl fmt::Display for TrendMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrendMetric::Revenue => Metric::RevenueTotal.label(),
            TrendMetric::Cash => Metric::Cash.label(),
            TrendMetric::CashFlow => "Cash flow",
            TrendMetric::CashInflow => "Cash inflow",
            TrendMetric::Members => Metric::TotalMembers.label(),
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrendSeries {
    pub metric: TrendMetric,
    pub labels: Vec<String>,
    pub values: Vec<Decimal>,
}

pub fn trend(series: &PeriodSeries, metric: TrendMetric) -> TrendSeries {
    TrendSeries {
        metric,
        labels: series.labels(),
        values: series.points.iter().map(|p| metric.value(p)).collect(),
    }
}

/// Cash received against costs per period.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InflowVsCost {
    pub labels: Vec<String>,
    pub inflow: Vec<Decimal>,
    pub costs: Vec<Decimal>,
}

pub fn inflow_vs_cost(series: &PeriodSeries) -> InflowVsCost {
    InflowVsCost {
        labels: series.labels(),
        inflow: series.points.iter().map(|p| p.cash_inflow).collect(),
        costs: series.points.iter().map(|p| p.costs).collect(),
    }
}

/// Headline state of the clinic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingStatus {
    NotStarted,
    Normal,
    CashTight,
    LossMaking,
}

impl fmt::Display for OperatingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperatingStatus::NotStarted => "Simulation not started",
            OperatingStatus::Normal => "Operating normally",
            OperatingStatus::CashTight => "Cash flow tight",
            OperatingStatus::LossMaking => "Loss-making",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Finding {
    CumulativeProfit(Decimal),
    CumulativeLoss(Decimal),
    CustomersServed(u64),
    Members(u64),
    AnnualReturn(Decimal),
    Investment {
        total: Decimal,
        initial: Decimal,
        costs: Decimal,
    },
}

fn money(v: Decimal) -> Decimal {
    v.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::CumulativeProfit(v) => write!(f, "Cumulative profit {:.2}", money(*v)),
            Finding::CumulativeLoss(v) => write!(f, "Cumulative loss {:.2}", money(*v)),
            Finding::CustomersServed(n) => write!(f, "Customers served {n}"),
            Finding::Members(n) => write!(f, "Members {n}"),
            Finding::AnnualReturn(p) => write!(f, "Average annual return {:.2}%", money(*p)),
            Finding::Investment {
                total,
                initial,
                costs,
            } => write!(
                f,
                "Total investment {:.2} (initial {:.2} + cumulative costs {:.2})",
                money(*total),
                money(*initial),
                money(*costs)
            ),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    AdjustParameters,
    RunWeekly,
    ReviewCashFlow,
    CutCosts,
    ImproveMemberConversion,
    KeepSimulating,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Recommendation::AdjustParameters => "Adjust the simulation parameters",
            Recommendation::RunWeekly => "Run the simulation week by week and watch the results",
            Recommendation::ReviewCashFlow => "Watch cash flow and consider restructuring costs",
            Recommendation::CutCosts => "Break down costs and look for savings",
            Recommendation::ImproveMemberConversion => {
                "Raise member conversion to improve customer retention"
            }
            Recommendation::KeepSimulating => "Keep running weekly to observe the long-term trend",
        })
    }
}

/// Narrative summary of the simulation state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OperatingAssessment {
    pub status: OperatingStatus,
    pub findings: Vec<Finding>,
    pub recommendations: Vec<Recommendation>,
    pub annual_return: ReturnEstimate,
}

/// Status is loss-making when profit is negative, else cash-tight when
/// final cash is negative, else normal.
pub fn assess(state: &SimulationState, initial_investment: Decimal) -> OperatingAssessment {
    let annual_return = annualized_return(state, initial_investment);
    if state.current_week == 0 {
        return OperatingAssessment {
            status: OperatingStatus::NotStarted,
            findings: Vec::new(),
            recommendations: vec![Recommendation::AdjustParameters, Recommendation::RunWeekly],
            annual_return,
        };
    }

    let status = if state.total_profit < Decimal::ZERO {
        OperatingStatus::LossMaking
    } else if state.final_cash < Decimal::ZERO {
        OperatingStatus::CashTight
    } else {
        OperatingStatus::Normal
    };

    let mut findings = Vec::with_capacity(5);
    if state.total_profit > Decimal::ZERO {
        findings.push(Finding::CumulativeProfit(state.total_profit));
    } else {
        findings.push(Finding::CumulativeLoss(state.total_profit.abs()));
    }
    findings.push(Finding::CustomersServed(state.total_customers));
    findings.push(Finding::Members(state.total_members));
    findings.push(Finding::AnnualReturn(annual_return.avg_annual_return_pct));
    findings.push(Finding::Investment {
        total: annual_return.total_investment,
        initial: initial_investment,
        costs: annual_return.total_costs,
    });

    let mut recommendations = Vec::new();
    if state.final_cash < Decimal::ZERO {
        recommendations.push(Recommendation::ReviewCashFlow);
    }
    if state.total_profit < Decimal::ZERO {
        recommendations.push(Recommendation::CutCosts);
    }
    if Decimal::from(state.total_members) < Decimal::from(state.total_customers) * Decimal::new(3, 1) {
        recommendations.push(Recommendation::ImproveMemberConversion);
    }
    recommendations.push(Recommendation::KeepSimulating);

    OperatingAssessment {
        status,
        findings,
        recommendations,
        annual_return,
    }
}

/// Everything the summary page shows.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub kind: PeriodKind,
    pub curves: CumulativeCurves,
    pub source_cash_flow: SourceCashFlow,
    pub trends: Vec<TrendSeries>,
    pub inflow_vs_cost: InflowVsCost,
    pub assessment: OperatingAssessment,
}

impl AnalyticsReport {
    /// `events` must be the full, unfiltered patient-event set.
    pub fn build(
        series: &PeriodSeries,
        events: &[PatientEventRecord],
        state: &SimulationState,
        initial_investment: Decimal,
    ) -> Self {
        Self {
            kind: series.kind,
            curves: cumulative_curves(series, initial_investment),
            source_cash_flow: source_cash_flow(events, series.kind),
            trends: TrendMetric::ALL.iter().map(|m| trend(series, *m)).collect(),
            inflow_vs_cost: inflow_vs_cost(series),
            assessment: assess(state, initial_investment),
        }
    }

    /// Total patient cash flow attributed to either store.
    pub fn attributed_cash_flow(&self) -> Decimal {
        self.source_cash_flow
            .old_store
            .iter()
            .chain(&self.source_cash_flow.new_store)
            .copied()
            .sum()
    }
}

/// Summed `Costs` over a series, for cross-checking the investment curve.
pub fn total_costs<T: MetricSource>(records: &[T]) -> Decimal {
    records
        .iter()
        .filter_map(|r| r.metric(Metric::Costs))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use report_core::{MonthlyRecord, PeriodFigures, WeeklyRecord};

    fn month(m: u32, costs: i64, revenue: i64) -> SimulationRecord {
        SimulationRecord::Monthly(MonthlyRecord {
            month: m,
            figures: PeriodFigures {
                costs: Decimal::from(costs),
                revenue_total: Decimal::from(revenue),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    fn week(w: u32) -> SimulationRecord {
        SimulationRecord::Weekly(WeeklyRecord {
            week: w,
            cash_flow_weekly: Decimal::from(w),
            figures: PeriodFigures {
                cash_flow_card: Decimal::from(10),
                cash_flow_treatment: Decimal::from(20),
                cash_flow_ortho: Decimal::from(30),
                costs: Decimal::from(5),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    fn event(day: u32, month: Option<u32>, source: &str, cash: i64) -> PatientEventRecord {
        PatientEventRecord {
            patient_id: 1,
            day: Some(day),
            month,
            source: Some(source.to_string()),
            cash_flow: Decimal::from(cash),
            ..Default::default()
        }
    }

    fn state(weeks: u32, revenue: i64, profit: i64, cash: i64) -> SimulationState {
        SimulationState {
            current_week: weeks,
            current_day: weeks * 7,
            total_revenue: Decimal::from(revenue),
            total_profit: Decimal::from(profit),
            final_cash: Decimal::from(cash),
            total_customers: 100,
            total_members: 50,
        }
    }

    #[test]
    fn cumulative_curves_scenario() {
        let records = vec![month(1, 1000, 500), month(2, 2000, 1500)];
        let series = PeriodSeries::from_records(PeriodKind::Monthly, &records);
        let curves = cumulative_curves(&series, DEFAULT_INITIAL_INVESTMENT);
        assert_eq!(curves.investment, vec![Decimal::from(581_000), Decimal::from(583_000)]);
        assert_eq!(curves.revenue, vec![Decimal::from(500), Decimal::from(2000)]);
        assert_eq!(curves.labels, vec!["Month 1", "Month 2"]);
    }

    #[test]
    fn falls_back_to_weekly_series() {
        let weekly: Vec<_> = (1..=3).map(week).collect();
        let series = PeriodSeries::choose(&[], &weekly);
        assert_eq!(series.kind, PeriodKind::Weekly);
        assert_eq!(series.labels(), vec!["Week 1", "Week 2", "Week 3"]);
        let monthly = vec![month(1, 1, 1)];
        assert_eq!(PeriodSeries::choose(&monthly, &weekly).kind, PeriodKind::Monthly);
    }

    #[test]
    fn missing_key_takes_position() {
        let records = vec![month(0, 1, 1), month(0, 1, 1)];
        let series = PeriodSeries::from_records(PeriodKind::Monthly, &records);
        assert_eq!(series.labels(), vec!["Month 1", "Month 2"]);
    }

    #[test]
    fn source_cash_flow_is_dense() {
        let events = vec![
            event(3, None, "existing", 100),
            event(4, None, "all", 50),
            event(5, None, "native", 70),
            event(70, None, "native", 30),
            event(71, None, "referral", 999),
        ];
        let flow = source_cash_flow(&events, PeriodKind::Monthly);
        assert_eq!(flow.labels, vec!["Month 1", "Month 2", "Month 3"]);
        assert_eq!(
            flow.old_store,
            vec![Decimal::from(150), Decimal::ZERO, Decimal::ZERO]
        );
        assert_eq!(
            flow.new_store,
            vec![Decimal::from(70), Decimal::ZERO, Decimal::from(30)]
        );
    }

    #[test]
    fn monthly_key_prefers_explicit_month_weekly_uses_day() {
        let events = vec![event(32, Some(1), "native", 10)];
        let monthly = source_cash_flow(&events, PeriodKind::Monthly);
        assert_eq!(monthly.new_store, vec![Decimal::from(10)]);
        let weekly = source_cash_flow(&events, PeriodKind::Weekly);
        assert_eq!(weekly.new_store.len(), 5);
        assert_eq!(weekly.new_store[4], Decimal::from(10));
    }

    #[test]
    fn unkeyed_events_are_skipped() {
        let mut e = event(1, None, "native", 10);
        e.day = None;
        let flow = source_cash_flow(&[e], PeriodKind::Weekly);
        assert!(flow.labels.is_empty());
    }

    #[test]
    fn outlier_period_keys_do_not_stretch_the_axis() {
        let events = vec![
            event(10, None, "native", 40),
            event(u32::MAX, None, "native", 5),
            event(12, Some(2_000_000_000), "existing", 7),
        ];
        let weekly = source_cash_flow(&events, PeriodKind::Weekly);
        assert_eq!(weekly.labels, vec!["Week 1", "Week 2"]);
        assert_eq!(weekly.new_store, vec![Decimal::ZERO, Decimal::from(40)]);
        let monthly = source_cash_flow(&events, PeriodKind::Monthly);
        assert_eq!(monthly.labels, vec!["Month 1"]);
        assert_eq!(monthly.old_store, vec![Decimal::ZERO]);
        assert_eq!(PeriodKind::Monthly.max_key(), month_of_day(MAX_PERIOD_DAYS));
    }

    #[test]
    fn annualized_return_follows_formula() {
        let est = annualized_return(&state(52, 100_000, 20_000, 0), DEFAULT_INITIAL_INVESTMENT);
        assert_eq!(est.total_costs, Decimal::from(80_000));
        assert_eq!(est.total_investment, Decimal::from(660_000));
        assert_eq!(est.years_elapsed.round_dp(4), Decimal::new(9973, 4));
        // 52 weeks are 364 days, so the loss is spread over slightly less than a year
        assert_eq!(est.avg_annual_return_pct.round_dp(2), Decimal::new(-8508, 2));
    }

    #[test]
    fn annualized_return_guards() {
        let est = annualized_return(&state(0, 100_000, 20_000, 0), DEFAULT_INITIAL_INVESTMENT);
        assert_eq!(est.avg_annual_return_pct, Decimal::ZERO);
        let est = annualized_return(&state(10, 0, 1_000_000, 0), Decimal::ZERO);
        assert!(est.total_investment <= Decimal::ZERO);
        assert_eq!(est.avg_annual_return_pct, Decimal::ZERO);
    }

    #[test]
    fn loss_overrides_cash_tight() {
        let a = assess(&state(10, 1000, -5, -1), DEFAULT_INITIAL_INVESTMENT);
        assert_eq!(a.status, OperatingStatus::LossMaking);
        assert_eq!(
            a.recommendations,
            vec![
                Recommendation::ReviewCashFlow,
                Recommendation::CutCosts,
                Recommendation::KeepSimulating
            ]
        );
        assert_eq!(a.findings[0], Finding::CumulativeLoss(Decimal::from(5)));
        let b = assess(&state(10, 1000, 5, -1), DEFAULT_INITIAL_INVESTMENT);
        assert_eq!(b.status, OperatingStatus::CashTight);
    }

    #[test]
    fn not_started_and_member_conversion() {
        let a = assess(&SimulationState::default(), DEFAULT_INITIAL_INVESTMENT);
        assert_eq!(a.status, OperatingStatus::NotStarted);
        assert!(a.findings.is_empty());
        let mut s = state(4, 1000, 100, 10);
        s.total_members = 10;
        let b = assess(&s, DEFAULT_INITIAL_INVESTMENT);
        assert_eq!(b.status, OperatingStatus::Normal);
        assert_eq!(
            b.recommendations,
            vec![Recommendation::ImproveMemberConversion, Recommendation::KeepSimulating]
        );
        assert_eq!(
            b.findings[4].to_string(),
            "Total investment 580900.00 (initial 580000.00 + cumulative costs 900.00)"
        );
    }

    #[test]
    fn trends_and_inflow() {
        let weekly: Vec<_> = (1..=2).map(week).collect();
        let series = PeriodSeries::choose(&[], &weekly);
        let t = trend(&series, TrendMetric::CashFlow);
        assert_eq!(t.values, vec![Decimal::from(1), Decimal::from(2)]);
        let io = inflow_vs_cost(&series);
        assert_eq!(io.inflow, vec![Decimal::from(60); 2]);
        assert_eq!(io.costs, vec![Decimal::from(5); 2]);
        assert_eq!(total_costs(&weekly), Decimal::from(10));
    }

    #[test]
    fn report_uses_series_period_for_sources() {
        let weekly: Vec<_> = (1..=2).map(week).collect();
        let series = PeriodSeries::choose(&[], &weekly);
        let events = vec![event(8, None, "existing", 40)];
        let report = AnalyticsReport::build(&series, &events, &state(2, 10, 1, 1), DEFAULT_INITIAL_INVESTMENT);
        assert_eq!(report.source_cash_flow.labels, vec!["Week 1", "Week 2"]);
        assert_eq!(report.trends.len(), 5);
        assert_eq!(report.attributed_cash_flow(), Decimal::from(40));
    }

    proptest! {
        #[test]
        fn investment_curve_ends_at_initial_plus_costs(
            costs in proptest::collection::vec(0i64..1_000_000, 0..40),
        ) {
            let records: Vec<_> = costs
                .iter()
                .enumerate()
                .map(|(i, c)| month(i as u32 + 1, *c, 0))
                .collect();
            let series = PeriodSeries::from_records(PeriodKind::Monthly, &records);
            let curves = cumulative_curves(&series, DEFAULT_INITIAL_INVESTMENT);
            let expected = DEFAULT_INITIAL_INVESTMENT + total_costs(&records);
            prop_assert_eq!(curves.investment.last().copied().unwrap_or(DEFAULT_INITIAL_INVESTMENT), expected);
            prop_assert!(curves.investment.windows(2).all(|w| w[0] <= w[1]));
        }

        #[test]
        fn source_split_conserves_attributed_cash(
            entries in proptest::collection::vec((1u32..400, 0usize..4, -5_000i64..5_000), 0..80),
        ) {
            let tags = ["existing", "native", "all", "other"];
            let events: Vec<_> = entries
                .iter()
                .map(|(d, t, c)| event(*d, None, tags[*t], *c))
                .collect();
            let expected: Decimal = events
                .iter()
                .filter(|e| e.source_kind().is_some())
                .map(|e| e.cash_flow)
                .sum();
            let flow = source_cash_flow(&events, PeriodKind::Weekly);
            let got: Decimal = flow.old_store.iter().chain(&flow.new_store).copied().sum();
            prop_assert_eq!(got, expected);
            let max_week = entries.iter().map(|(d, _, _)| week_of_day(*d)).max().unwrap_or(0);
            prop_assert_eq!(flow.labels.len(), max_week as usize);
        }
    }
}
