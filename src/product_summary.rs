use crate::schema::{FinancialRecord, LineType, ParsedReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LatestPeriod {
    pub year: i32,
    pub month: u32,
    pub month_label: String,
    pub budget_value: f64,
    pub actual_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductSummary {
    pub product: String,
    pub line_type: LineType,
    pub months: usize,
    pub total_budget: f64,
    pub total_actual: f64,
    pub latest: Option<LatestPeriod>,
}

impl ProductSummary {
    fn new(product: &str, line_type: LineType) -> Self {
        Self {
            product: product.to_string(),
            line_type,
            months: 0,
            total_budget: 0.0,
            total_actual: 0.0,
            latest: None,
        }
    }

    fn add(&mut self, record: &FinancialRecord) {
        self.months += 1;
        self.total_budget += record.budget_value;
        self.total_actual += record.actual_value;

        let is_later = self
            .latest
            .as_ref()
            .map_or(true, |l| (record.year, record.month) >= (l.year, l.month));
        if is_later {
            self.latest = Some(LatestPeriod {
                year: record.year,
                month: record.month,
                month_label: record.month_label.clone(),
                budget_value: record.budget_value,
                actual_value: record.actual_value,
            });
        }
    }

    /// Actual over budget for the latest period, when a budget exists.
    pub fn latest_attainment(&self) -> Option<f64> {
        let latest = self.latest.as_ref()?;
        if latest.budget_value == 0.0 {
            return None;
        }
        Some(latest.actual_value / latest.budget_value)
    }
}

/// Per-product view of the detailed records, split by line type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCatalog {
    pub balances: Vec<ProductSummary>,
    pub income: Vec<ProductSummary>,
}

impl ProductCatalog {
    pub fn from_records(records: &[FinancialRecord]) -> Self {
        let mut grouped: BTreeMap<(LineType, &str), ProductSummary> = BTreeMap::new();

        for record in records {
            grouped
                .entry((record.line_type, record.product.as_str()))
                .or_insert_with(|| ProductSummary::new(&record.product, record.line_type))
                .add(record);
        }

        let mut balances = Vec::new();
        let mut income = Vec::new();
        for ((line_type, _), summary) in grouped {
            match line_type {
                LineType::Balance => balances.push(summary),
                LineType::Income => income.push(summary),
            }
        }

        Self { balances, income }
    }

    pub fn from_report(report: &ParsedReport) -> Self {
        Self::from_records(&report.detailed)
    }

    pub fn get(&self, product: &str, line_type: LineType) -> Option<&ProductSummary> {
        let section = match line_type {
            LineType::Balance => &self.balances,
            LineType::Income => &self.income,
        };
        section.iter().find(|s| s.product == product)
    }

    pub fn total_products(&self) -> usize {
        let mut names: Vec<&str> = self
            .balances
            .iter()
            .chain(self.income.iter())
            .map(|s| s.product.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str("Type,Product,Months,Total Budget,Total Actual,Latest Period,Latest Budget,Latest Actual\n");

        for summary in self.balances.iter().chain(self.income.iter()) {
            let (period, budget, actual) = match &summary.latest {
                Some(l) => (
                    format!("{}/{}", l.month_label, l.year),
                    format!("{:.4}", l.budget_value),
                    format!("{:.4}", l.actual_value),
                ),
                None => (String::new(), String::new(), String::new()),
            };
            output.push_str(&format!(
                "{},{},{},{:.4},{:.4},{},{},{}\n",
                summary.line_type.as_str(),
                csv_field(&summary.product),
                summary.months,
                summary.total_budget,
                summary.total_actual,
                period,
                budget,
                actual
            ));
        }

        output
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("# Product Catalog\n\n");

        output.push_str("## Balances\n\n");
        push_markdown_section(&mut output, &self.balances);

        output.push_str("## Income\n\n");
        push_markdown_section(&mut output, &self.income);

        output
    }
}

fn push_markdown_section(output: &mut String, summaries: &[ProductSummary]) {
    if summaries.is_empty() {
        output.push_str("_No records._\n\n");
        return;
    }

    for summary in summaries {
        let latest = match (&summary.latest, summary.latest_attainment()) {
            (Some(l), Some(ratio)) => format!(
                " (latest {}/{}: {:.2} of {:.2}, {:.1}%)",
                l.month_label,
                l.year,
                l.actual_value,
                l.budget_value,
                ratio * 100.0
            ),
            (Some(l), None) => format!(" (latest {}/{}: {:.2})", l.month_label, l.year, l.actual_value),
            _ => String::new(),
        };
        output.push_str(&format!(
            "- **{}**: {} months{}\n",
            summary.product, summary.months, latest
        ));
    }
    output.push('\n');
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
