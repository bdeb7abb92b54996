//! Headline indicators derived from the aggregated monthly series.

use crate::schema::MonthlyMetric;
use serde::{Deserialize, Serialize};

const FLAT_THRESHOLD: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

impl Trend {
    pub fn from_change(change: f64) -> Self {
        if change > FLAT_THRESHOLD {
            Trend::Up
        } else if change < -FLAT_THRESHOLD {
            Trend::Down
        } else {
            Trend::Neutral
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiData {
    pub label: String,
    pub value: String,
    /// Percentage (or percentage points for ratios).
    pub change: f64,
    pub trend: Trend,
    pub description: String,
}

/// Builds the dashboard indicators for the latest month with realized data.
///
/// `series` must be ordered by period, as returned by the parser. Returns an
/// empty list when no month has a realized value.
pub fn compute_kpis(series: &[MonthlyMetric]) -> Vec<KpiData> {
    let Some(latest_idx) = series.iter().rposition(|m| m.actual_value != 0.0) else {
        return Vec::new();
    };
    let latest = &series[latest_idx];
    let previous = latest_idx.checked_sub(1).map(|idx| &series[idx]);

    let balance_change = previous
        .and_then(|p| percent_change(p.actual_value, latest.actual_value))
        .unwrap_or(0.0);

    let current_attainment = attainment(latest);
    let attainment_change = match (current_attainment, previous.and_then(attainment)) {
        (Some(current), Some(before)) => (current - before) * 100.0,
        _ => 0.0,
    };

    let gap = latest.actual_value - latest.budget_value;
    let gap_ratio = percent_change(latest.budget_value, latest.actual_value).unwrap_or(0.0);

    vec![
        KpiData {
            label: "Realized Balance".to_string(),
            value: format!("R$ {:.2} mi", latest.actual_value),
            change: balance_change,
            trend: Trend::from_change(balance_change),
            description: format!("Total portfolio balance in {}", latest.date),
        },
        KpiData {
            label: "Budget Attainment".to_string(),
            value: current_attainment
                .map(|a| format!("{:.1}%", a * 100.0))
                .unwrap_or_else(|| "n/a".to_string()),
            change: attainment_change,
            trend: Trend::from_change(attainment_change),
            description: format!("Realized over budgeted balance in {}", latest.date),
        },
        KpiData {
            label: "Budget Gap".to_string(),
            value: format!("R$ {:+.2} mi", gap),
            change: gap_ratio,
            trend: Trend::from_change(gap),
            description: format!("Realized minus budgeted balance in {}", latest.date),
        },
    ]
}

fn attainment(metric: &MonthlyMetric) -> Option<f64> {
    if metric.budget_value == 0.0 {
        None
    } else {
        Some(metric.actual_value / metric.budget_value)
    }
}

fn percent_change(from: f64, to: f64) -> Option<f64> {
    if from == 0.0 {
        None
    } else {
        Some((to - from) / from.abs() * 100.0)
    }
}
