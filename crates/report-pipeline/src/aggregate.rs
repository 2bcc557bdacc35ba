//! Column totals over a filtered record set.

use report_core::{Granularity, Metric, MetricSource};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::ops::Add;

const DAILY_SUMS: &[Metric] = &[
    Metric::NewCustomers,
    Metric::PatientsSeen,
    Metric::RevenueTotal,
    Metric::Costs,
    Metric::Profit,
    Metric::CashFlowToday,
    Metric::RevenueCard,
    Metric::RevenueTreatment,
    Metric::RevenueOrtho,
    Metric::CashFlowCard,
    Metric::CashFlowTreatment,
    Metric::CashFlowOrtho,
    Metric::DoctorSalary,
    Metric::NurseSalary,
    Metric::OpsSalary,
];

const WEEKLY_SUMS: &[Metric] = &[
    Metric::PatientsSeen,
    Metric::NewCustomers,
    Metric::RevenueTotal,
    Metric::Costs,
    Metric::Profit,
    Metric::CashFlowWeekly,
    Metric::RevenueCard,
    Metric::RevenueTreatment,
    Metric::RevenueOrtho,
    Metric::CashFlowCard,
    Metric::CashFlowTreatment,
    Metric::CashFlowOrtho,
    Metric::DoctorSalary,
    Metric::NurseSalary,
    Metric::OpsSalary,
];

const MONTHLY_SUMS: &[Metric] = &[
    Metric::PatientsSeen,
    Metric::NewCustomers,
    Metric::RevenueTotal,
    Metric::Costs,
    Metric::Profit,
    Metric::CashFlowMonthly,
    Metric::RevenueCard,
    Metric::RevenueTreatment,
    Metric::RevenueOrtho,
    Metric::CashFlowCard,
    Metric::CashFlowTreatment,
    Metric::CashFlowOrtho,
    Metric::DoctorSalary,
    Metric::NurseSalary,
    Metric::OpsSalary,
];

/// Columns that get a total for a view. Patient events are never totalled.
pub fn summable_metrics(granularity: Granularity) -> &'static [Metric] {
    match granularity {
        Granularity::Daily => DAILY_SUMS,
        Granularity::Weekly => WEEKLY_SUMS,
        Granularity::Monthly => MONTHLY_SUMS,
        Granularity::PatientEvent => &[],
    }
}

/// Totals keyed by column, in the view's column order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregationResult {
    pub granularity: Granularity,
    totals: Vec<(Metric, Decimal)>,
}

impl AggregationResult {
    /// All-zero totals for a view.
    pub fn zero(granularity: Granularity) -> Self {
        Self {
            granularity,
            totals: summable_metrics(granularity)
                .iter()
                .map(|m| (*m, Decimal::ZERO))
                .collect(),
        }
    }

    pub fn get(&self, metric: Metric) -> Option<Decimal> {
        self.totals
            .iter()
            .find(|(m, _)| *m == metric)
            .map(|(_, v)| *v)
    }

    /// True when the view has no totals row.
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, Decimal)> + '_ {
        self.totals.iter().copied()
    }

    /// Totals rendered for display.
    pub fn formatted(&self) -> Vec<(Metric, String)> {
        self.totals
            .iter()
            .map(|(m, v)| (*m, format_metric(*m, *v)))
            .collect()
    }
}

impl Add for AggregationResult {
    type Output = AggregationResult;

    fn add(mut self, rhs: AggregationResult) -> AggregationResult {
        for (metric, total) in &mut self.totals {
            *total += rhs.get(*metric).unwrap_or_default();
        }
        self
    }
}

/// Sum the view's summable columns over every record given.
///
/// Callers pass the full filtered set, never a page of it. Columns a record
/// lacks contribute zero.
pub fn aggregate<T: MetricSource>(records: &[T], granularity: Granularity) -> AggregationResult {
    let mut result = AggregationResult::zero(granularity);
    for record in records {
        for (metric, total) in &mut result.totals {
            *total += record.metric(*metric).unwrap_or_default();
        }
    }
    result
}

/// Money to two decimals, everything else rounded half up to an integer.
pub fn format_metric(metric: Metric, value: Decimal) -> String {
    if metric.is_money() {
        let v = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        format!("{v:.2}")
    } else {
        let v = (value + Decimal::new(5, 1)).floor();
        format!("{v:.0}")
    }
}
