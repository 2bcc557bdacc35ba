//! Collapsing of same-patient, same-day events into one row.

use chrono::NaiveDate;
use report_core::PatientEventRecord;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// One row per `(PatientID, Day)` in the patient view.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MergedPatientRecord {
    #[serde(rename = "PatientID")]
    pub patient_id: u64,
    pub date: Option<NaiveDate>,
    pub day: Option<u32>,
    pub week: Option<u32>,
    pub month: Option<u32>,
    pub weekday: Option<String>,
    pub age: Option<Decimal>,
    pub source: String,
    pub action: String,
    pub card_type: String,
    pub amount: Decimal,
    pub revenue_type: String,
    pub cash_flow: Decimal,
    pub costs: Decimal,
    pub profit: Decimal,
    pub description: String,
    /// Number of events folded into this row.
    #[serde(skip)]
    pub event_count: usize,
}

impl From<&PatientEventRecord> for MergedPatientRecord {
    fn from(r: &PatientEventRecord) -> Self {
        Self {
            patient_id: r.patient_id,
            date: r.date,
            day: r.day,
            week: r.week,
            month: r.month,
            weekday: r.weekday.clone(),
            age: r.age,
            source: r.source.clone().unwrap_or_default(),
            action: r.action.clone().unwrap_or_default(),
            card_type: r.card_type.clone().unwrap_or_default(),
            amount: r.amount,
            revenue_type: r.revenue_type.clone().unwrap_or_default(),
            cash_flow: r.cash_flow,
            costs: r.costs,
            profit: r.profit,
            description: r.description.clone().unwrap_or_default(),
            event_count: 1,
        }
    }
}

/// Distinct meaningful values in first-seen order, joined with `", "`.
/// Empty strings and the literal `"None"` are not values.
fn join_distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for v in values.flatten() {
        if v.is_empty() || v == "None" || seen.contains(&v) {
            continue;
        }
        seen.push(v);
    }
    seen.join(", ")
}

fn fold_group(group: &[&PatientEventRecord]) -> MergedPatientRecord {
    let first = group[0];
    if group.len() == 1 {
        return MergedPatientRecord::from(first);
    }
    let sum = |f: fn(&PatientEventRecord) -> Decimal| group.iter().map(|r| f(r)).sum::<Decimal>();
    MergedPatientRecord {
        patient_id: first.patient_id,
        date: first.date,
        day: first.day,
        week: first.week,
        month: first.month,
        weekday: first.weekday.clone(),
        age: first.age,
        source: join_distinct(group.iter().map(|r| r.source.as_deref())),
        action: join_distinct(group.iter().map(|r| r.action.as_deref())),
        card_type: join_distinct(group.iter().map(|r| r.card_type.as_deref())),
        amount: sum(|r| r.amount),
        revenue_type: join_distinct(group.iter().map(|r| r.revenue_type.as_deref())),
        cash_flow: sum(|r| r.cash_flow),
        costs: sum(|r| r.costs),
        profit: sum(|r| r.profit),
        description: group
            .iter()
            .map(|r| r.description.as_deref().unwrap_or(""))
            .collect::<Vec<_>>()
            .join("; "),
        event_count: group.len(),
    }
}

/// Merge events sharing `(PatientID, Day)`.
///
/// Output order follows the first occurrence of each key. Identity fields
/// come from the first event, money fields are summed, categorical fields
/// are deduplicated and descriptions are concatenated in input order.
pub fn merge_patient_events<'a, I>(records: I) -> Vec<MergedPatientRecord>
where
    I: IntoIterator<Item = &'a PatientEventRecord>,
{
    let mut index: HashMap<(u64, Option<u32>), usize> = HashMap::new();
    let mut groups: Vec<Vec<&PatientEventRecord>> = Vec::new();
    for r in records {
        let slot = *index.entry((r.patient_id, r.day)).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(r);
    }
    groups.iter().map(|g| fold_group(g)).collect()
}
