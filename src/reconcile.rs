//! Cross-checks the aggregated totals against the per-product balances.
//!
//! Reconciliation is diagnostic only: it never alters the parsed report.

use crate::error::{ReportError, Result};
use crate::schema::{LineType, MonthlyMetric, ParsedReport};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Measure {
    Budget,
    Actual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalDiscrepancy {
    pub date: String,
    pub measure: Measure,
    pub total: f64,
    pub products: f64,
    pub difference: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub months_checked: usize,
    pub discrepancies: Vec<TotalDiscrepancy>,
}

impl ReconciliationResult {
    pub fn is_balanced(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

pub struct TotalsReconciler<'a> {
    report: &'a ParsedReport,
}

impl<'a> TotalsReconciler<'a> {
    pub fn new(report: &'a ParsedReport) -> Self {
        Self { report }
    }

    /// Compares every monthly total with the summed product balances of the
    /// same month. Months without any product balance are not checked.
    pub fn reconcile(&self, tolerance: f64) -> ReconciliationResult {
        let sums = self.product_balance_sums();
        let mut result = ReconciliationResult::default();

        for metric in &self.report.aggregated {
            let Ok(period) = metric.period() else {
                continue;
            };
            let Some(&(budget_sum, actual_sum)) = sums.get(&period) else {
                continue;
            };

            result.months_checked += 1;
            for (measure, total, products) in [
                (Measure::Budget, metric.budget_value, budget_sum),
                (Measure::Actual, metric.actual_value, actual_sum),
            ] {
                if let Some(discrepancy) = compare(metric, measure, total, products, tolerance) {
                    warn!(
                        "{:?} total for {} is {:.4} but products sum to {:.4}",
                        measure, discrepancy.date, total, products
                    );
                    result.discrepancies.push(discrepancy);
                }
            }
        }

        result
    }

    pub fn verify(&self, tolerance: f64) -> Result<()> {
        let result = self.reconcile(tolerance);
        match result.discrepancies.into_iter().next() {
            Some(d) => Err(ReportError::TotalMismatch {
                date: d.date,
                total: d.total,
                products: d.products,
                difference: d.difference,
            }),
            None => Ok(()),
        }
    }

    fn product_balance_sums(&self) -> BTreeMap<(i32, u32), (f64, f64)> {
        let mut sums: BTreeMap<(i32, u32), (f64, f64)> = BTreeMap::new();

        for record in &self.report.detailed {
            if record.line_type != LineType::Balance {
                continue;
            }
            let entry = sums.entry((record.year, record.month)).or_default();
            entry.0 += record.budget_value;
            entry.1 += record.actual_value;
        }

        sums
    }
}

fn compare(
    metric: &MonthlyMetric,
    measure: Measure,
    total: f64,
    products: f64,
    tolerance: f64,
) -> Option<TotalDiscrepancy> {
    let difference = (total - products).abs();
    if difference <= tolerance {
        return None;
    }
    Some(TotalDiscrepancy {
        date: metric.date.clone(),
        measure,
        total,
        products,
        difference,
    })
}

pub fn reconcile_totals(report: &ParsedReport, tolerance: f64) -> ReconciliationResult {
    TotalsReconciler::new(report).reconcile(tolerance)
}

pub fn verify_totals(report: &ParsedReport, tolerance: f64) -> Result<()> {
    TotalsReconciler::new(report).verify(tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FinancialRecord;

    fn metric(date: &str, budget: f64, actual: f64) -> MonthlyMetric {
        MonthlyMetric {
            date: date.to_string(),
            budget_value: budget,
            actual_value: actual,
            churn_rate: 0.0,
        }
    }

    fn record(month: u32, product: &str, line_type: LineType, budget: f64, actual: f64) -> FinancialRecord {
        FinancialRecord {
            id: FinancialRecord::record_id(2022, month, product, line_type),
            year: 2022,
            month,
            month_label: String::new(),
            product: product.to_string(),
            line_type,
            budget_value: budget,
            actual_value: actual,
        }
    }

    #[test]
    fn test_balanced_totals() {
        let report = ParsedReport {
            aggregated: vec![metric("Jan/22", 3.0, 2.5)],
            detailed: vec![
                record(1, "A", LineType::Balance, 1.0, 1.0),
                record(1, "B", LineType::Balance, 2.0, 1.5),
                record(1, "B", LineType::Income, 50.0, 50.0),
            ],
            products: vec!["A".to_string(), "B".to_string()],
        };

        let result = reconcile_totals(&report, 1e-9);
        assert_eq!(result.months_checked, 1);
        assert!(result.is_balanced());
        assert!(verify_totals(&report, 1e-9).is_ok());
    }

    #[test]
    fn test_mismatch_is_reported() {
        let report = ParsedReport {
            aggregated: vec![metric("Jan/22", 3.0, 2.0), metric("Fev/22", 1.0, 1.0)],
            detailed: vec![record(1, "A", LineType::Balance, 3.0, 1.0)],
            products: vec!["A".to_string()],
        };

        let result = reconcile_totals(&report, 0.01);
        assert_eq!(result.months_checked, 1);
        assert_eq!(result.discrepancies.len(), 1);
        assert_eq!(result.discrepancies[0].measure, Measure::Actual);
        assert_eq!(result.discrepancies[0].difference, 1.0);

        match verify_totals(&report, 0.01) {
            Err(ReportError::TotalMismatch { date, .. }) => assert_eq!(date, "Jan/22"),
            other => panic!("expected mismatch, got {:?}", other),
        }
    }
}
