use crate::layout::LayoutResolver;
use crate::number::parse_locale_number;
use crate::schema::{
    ColumnLayout, FinancialRecord, LineType, MonthlyMetric, ParsedReport, ParserConfig,
    RawReport, RawYearBlock, RowKind,
};
use crate::utils::{date_label, month_label};
use log::{debug, info};
use std::collections::{BTreeSet, HashSet};

/// Data field holding the first month's budget.
pub const DATA_FIRST_FIELD: usize = 3;

/// Data fields per month. Budget and actual each span two fields because the
/// export splits their decimal comma; the difference columns take four more.
pub const DATA_FIELDS_PER_MONTH: usize = 8;

/// Output containers for a single parse. Each parse owns a fresh accumulator.
#[derive(Debug, Default)]
pub struct ReportAccumulator {
    aggregated: Vec<MonthlyMetric>,
    seen_dates: HashSet<String>,
    detailed: Vec<FinancialRecord>,
    products: BTreeSet<String>,
}

impl ReportAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a total balance for a month. The first non-empty entry for a
    /// date is kept; later entries for the same date are dropped.
    fn push_total(&mut self, date: String, budget: f64, actual: f64) -> bool {
        if self.seen_dates.contains(&date) {
            debug!("Dropping duplicate total for {}", date);
            return false;
        }
        if budget == 0.0 && actual == 0.0 {
            return false;
        }

        self.seen_dates.insert(date.clone());
        self.aggregated.push(MonthlyMetric {
            date,
            budget_value: budget,
            actual_value: actual,
            churn_rate: 0.0,
        });
        true
    }

    fn push_record(
        &mut self,
        year: i32,
        month: u32,
        product: &str,
        line_type: LineType,
        budget: f64,
        actual: f64,
    ) -> bool {
        if !self.products.contains(product) {
            self.products.insert(product.to_string());
        }
        if budget == 0.0 && actual == 0.0 {
            return false;
        }

        let Some(label) = month_label(month) else {
            return false;
        };

        self.detailed.push(FinancialRecord {
            id: FinancialRecord::record_id(year, month, product, line_type),
            year,
            month,
            month_label: label.to_string(),
            product: product.to_string(),
            line_type,
            budget_value: budget,
            actual_value: actual,
        });
        true
    }

    /// Sorts the aggregated series by (year, month) and returns the report.
    pub fn finish(self) -> ParsedReport {
        let mut aggregated = self.aggregated;
        aggregated.sort_by_cached_key(|metric| metric.period().ok());

        ParsedReport {
            aggregated,
            detailed: self.detailed,
            products: self.products.into_iter().collect(),
        }
    }
}

/// A classified data row, split into its comma-separated fields.
struct DataRow<'a> {
    line_type: LineType,
    product: &'a str,
    fields: Vec<&'a str>,
}

impl<'a> DataRow<'a> {
    fn parse(line: &'a str, config: &ParserConfig) -> Option<Self> {
        if line.trim().is_empty() {
            return None;
        }

        let fields: Vec<&str> = line.split(',').collect();
        let line_type = RowKind::classify(fields[0], config).line_type()?;

        let Some(product) = fields.get(1).copied().map(str::trim) else {
            debug!("Skipping {} row without a product field", line_type.as_str());
            return None;
        };

        Some(Self {
            line_type,
            product,
            fields,
        })
    }

    /// Raw budget and actual amounts for a month group, or `None` when the
    /// row is too short to hold that group.
    fn month_amounts(&self, block_index: usize) -> Option<(f64, f64)> {
        let base = DATA_FIRST_FIELD + block_index * DATA_FIELDS_PER_MONTH;
        if base + 3 >= self.fields.len() {
            return None;
        }

        let budget = format!("{},{}", self.fields[base], self.fields[base + 1]);
        let actual = format!("{},{}", self.fields[base + 2], self.fields[base + 3]);

        Some((parse_locale_number(&budget), parse_locale_number(&actual)))
    }
}

/// Walks the data rows of a year block and routes every amount into the
/// aggregated series or the detailed records.
pub struct RecordExtractor<'a> {
    config: &'a ParserConfig,
}

impl<'a> RecordExtractor<'a> {
    pub fn new(config: &'a ParserConfig) -> Self {
        Self { config }
    }

    pub fn process_year(
        &self,
        block: &RawYearBlock,
        layout: &ColumnLayout,
        acc: &mut ReportAccumulator,
    ) {
        let mut totals = 0;
        let mut records = 0;

        for line in block.lines.iter().skip(layout.data_start_index()) {
            let Some(row) = DataRow::parse(line, self.config) else {
                continue;
            };

            for month_block in &layout.blocks {
                let Some((budget, actual)) = row.month_amounts(month_block.block_index) else {
                    continue;
                };

                let budget = budget / self.config.unit_scale;
                let actual = actual / self.config.unit_scale;

                if row.product == self.config.total_marker {
                    if row.line_type != LineType::Balance {
                        continue;
                    }
                    let Ok(date) = date_label(block.year, month_block.month) else {
                        continue;
                    };
                    if acc.push_total(date, budget, actual) {
                        totals += 1;
                    }
                } else if acc.push_record(
                    block.year,
                    month_block.month,
                    row.product,
                    row.line_type,
                    budget,
                    actual,
                ) {
                    records += 1;
                }
            }
        }

        debug!(
            "Year {}: {} monthly totals, {} product records",
            block.year, totals, records
        );
    }
}

/// Parses every year block in chronological order into a fresh report.
pub fn process_report(report: &RawReport, config: &ParserConfig) -> ParsedReport {
    let resolver = LayoutResolver::new(config);
    let extractor = RecordExtractor::new(config);
    let mut acc = ReportAccumulator::new();

    for block in report.blocks() {
        let layout = resolver.resolve(block);
        extractor.process_year(block, &layout, &mut acc);
    }

    let parsed = acc.finish();
    info!(
        "Parsed {} years: {} monthly totals, {} product records, {} products",
        report.len(),
        parsed.aggregated.len(),
        parsed.detailed.len(),
        parsed.products.len()
    );
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(blocks: &[(i32, &str)]) -> ParsedReport {
        let report = RawReport::new(
            blocks
                .iter()
                .map(|(year, text)| RawYearBlock::from_text(*year, text))
                .collect(),
        )
        .unwrap();
        process_report(&report, &ParserConfig::default())
    }

    #[test]
    fn test_total_balance_row_becomes_monthly_metric() {
        let text = "Nivel 1,a,b,Mar,o,r,d,Abr,o,r,d,Total\n\
                    SALDO,Total,x,1.000.000,00,2.000.500,00,0,0,0,0,3.000.000,00,4.000.000,00,0,0,0,0";
        let parsed = parse(&[(2021, text)]);

        assert_eq!(parsed.aggregated.len(), 2);
        let mar = &parsed.aggregated[0];
        assert_eq!(mar.date, "Mar/21");
        assert!((mar.budget_value - 1.0).abs() < 1e-12);
        assert!((mar.actual_value - 2.0005).abs() < 1e-12);
        assert_eq!(mar.churn_rate, 0.0);
        assert_eq!(parsed.aggregated[1].date, "Abr/21");

        assert!(parsed.detailed.is_empty());
        assert!(parsed.products.is_empty());
    }

    #[test]
    fn test_income_totals_are_not_aggregated() {
        let text = "Nivel 1,a,b,Jan,o,r,d,Total\n\
                    RENDAS,Total,x,5.000.000,00,6.000.000,00";
        let parsed = parse(&[(2022, text)]);

        assert!(parsed.aggregated.is_empty());
        assert!(parsed.detailed.is_empty());
        assert!(parsed.products.is_empty());
    }

    #[test]
    fn test_first_total_for_a_date_wins() {
        let text = "Nivel 1,a,b,Jan,o,r,d,Total\n\
                    SALDO,Total,x,1.000.000,00,1.000.000,00\n\
                    SALDO MEDIO,Total,x,9.000.000,00,9.000.000,00";
        let parsed = parse(&[(2022, text)]);

        assert_eq!(parsed.aggregated.len(), 1);
        assert_eq!(parsed.aggregated[0].budget_value, 1.0);
    }

    #[test]
    fn test_zero_total_does_not_claim_the_date() {
        let text = "Nivel 1,a,b,Jan,o,r,d,Total\n\
                    SALDO,Total,x,0,00,0,00\n\
                    SALDO,Total,x,2.000.000,00,0,00";
        let parsed = parse(&[(2022, text)]);

        assert_eq!(parsed.aggregated.len(), 1);
        assert_eq!(parsed.aggregated[0].budget_value, 2.0);
    }

    #[test]
    fn test_product_rows_become_records() {
        let text = "Nivel 1,a,b,Jan,o,r,d,Fev,o,r,d,Total\n\
                    SALDO,Consignado ,x,1.500.000,00,1.000.000,00,0,0,0,0,0,00,0,00,0,0,0,0\n\
                    RENDAS,Consignado,x,(250.000,00),300.000,00,0,0,0,0,10.000,00,0,00,0,0,0,0";
        let parsed = parse(&[(2023, text)]);

        assert_eq!(parsed.products, vec!["Consignado"]);
        assert_eq!(parsed.detailed.len(), 3);

        let first = &parsed.detailed[0];
        assert_eq!(first.id, "2023-1-Consignado-saldo");
        assert_eq!(first.month_label, "Jan");
        assert_eq!(first.line_type, LineType::Balance);
        assert_eq!(first.budget_value, 1.5);
        assert_eq!(first.actual_value, 1.0);

        let income_jan = &parsed.detailed[1];
        assert_eq!(income_jan.id, "2023-1-Consignado-renda");
        assert_eq!(income_jan.budget_value, -0.25);
        assert_eq!(income_jan.actual_value, 0.3);

        assert_eq!(parsed.detailed[2].id, "2023-2-Consignado-renda");
        assert_eq!(parsed.detailed[2].budget_value, 0.01);
    }

    #[test]
    fn test_zero_product_values_are_suppressed_but_product_is_listed() {
        let text = "Nivel 1,a,b,Jan,o,r,d,Total\n\
                    SALDO,Cartao,x,0,00,,";
        let parsed = parse(&[(2024, text)]);

        assert!(parsed.detailed.is_empty());
        assert_eq!(parsed.products, vec!["Cartao"]);
    }

    #[test]
    fn test_unrecognized_and_blank_rows_are_skipped() {
        let text = "Nivel 1,a,b,Jan,o,r,d,Total\n\
                    \n\
                    Comentario,Cartao,x,1,00,1,00\n\
                    SALDO";
        let parsed = parse(&[(2024, text)]);

        assert!(parsed.is_empty());
    }

    #[test]
    fn test_truncated_row_skips_only_missing_months() {
        let text = "Nivel 1,a,b,Jan,o,r,d,Fev,o,r,d,Total\n\
                    SALDO,Total,x,1.000.000,00,1.000.000,00,0,0,0,0,2.000.000,00,2.000.000";
        let parsed = parse(&[(2024, text)]);

        assert_eq!(parsed.aggregated.len(), 1);
        assert_eq!(parsed.aggregated[0].date, "Jan/24");
    }

    #[test]
    fn test_rows_above_header_are_ignored() {
        let text = "SALDO,Total,x,7.000.000,00,7.000.000,00\n\
                    Nivel 1,a,b,Jan,o,r,d,Total\n\
                    SALDO,Total,x,1.000.000,00,1.000.000,00";
        let parsed = parse(&[(2022, text)]);

        assert_eq!(parsed.aggregated.len(), 1);
        assert_eq!(parsed.aggregated[0].budget_value, 1.0);
    }

    #[test]
    fn test_aggregated_series_is_sorted_across_years() {
        let y2022 = "Nivel 1,a,b,Nov,o,r,d,Dez,o,r,d,Total\n\
                     SALDO,Total,x,1,00,1,00,0,0,0,0,1,00,1,00";
        let y2021 = "SALDO,Total,x,1,00,1,00";
        let y2023 = "Nivel 1,a,b,Fev,o,r,d,Jan,o,r,d,Total\n\
                     SALDO,Total,x,1,00,1,00,0,0,0,0,1,00,1,00";
        let parsed = parse(&[(2023, y2023), (2022, y2022), (2021, y2021)]);

        let dates: Vec<&str> = parsed.aggregated.iter().map(|m| m.date.as_str()).collect();
        assert_eq!(dates, vec!["Mar/21", "Nov/22", "Dez/22", "Jan/23", "Fev/23"]);
    }

    #[test]
    fn test_products_are_sorted_and_distinct() {
        let text = "Nivel 1,a,b,Jan,o,r,d,Total\n\
                    SALDO,Veiculos,x,1,00,1,00\n\
                    SALDO,Agro,x,1,00,1,00\n\
                    RENDAS,Veiculos,x,1,00,1,00\n\
                    SALDO,Total,x,1,00,1,00";
        let parsed = parse(&[(2022, text), (2023, text)]);

        assert_eq!(parsed.products, vec!["Agro", "Veiculos"]);
        assert_eq!(parsed.detailed.len(), 6);
    }

    #[test]
    fn test_accumulators_are_independent_between_parses() {
        let text = "SALDO,Total,x,1,00,1,00";
        let first = parse(&[(2022, text)]);
        let second = parse(&[(2022, text)]);
        assert_eq!(first, second);
        assert_eq!(second.aggregated.len(), 1);
    }
}
