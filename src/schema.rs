use crate::error::{ReportError, Result};
use crate::utils::{last_day_of_month, parse_date_label, validate_month, MILLIONS};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Markers and scaling rules describing the raw report export format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct ParserConfig {
    #[schemars(description = "Token that opens the month header row of a year block")]
    pub header_marker: String,

    #[schemars(description = "First-field prefix of balance (portfolio position) rows")]
    pub balance_prefix: String,

    #[schemars(description = "First-field prefix of income rows")]
    pub income_prefix: String,

    #[schemars(description = "Product name denoting an aggregate row")]
    pub total_marker: String,

    #[schemars(description = "Divisor applied to every raw amount before storage")]
    pub unit_scale: f64,

    #[schemars(description = "First month assumed for headerless years not listed in fallback_start_months")]
    pub default_start_month: u32,

    #[schemars(description = "Per-year first month assumed when a year block has no header row")]
    pub fallback_start_months: BTreeMap<i32, u32>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            header_marker: "Nivel 1".to_string(),
            balance_prefix: "SALDO".to_string(),
            income_prefix: "RENDAS".to_string(),
            total_marker: "Total".to_string(),
            unit_scale: MILLIONS,
            default_start_month: 1,
            fallback_start_months: BTreeMap::from([(2021, 3)]),
        }
    }
}

impl ParserConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let markers = [
            ("header_marker", &self.header_marker),
            ("balance_prefix", &self.balance_prefix),
            ("income_prefix", &self.income_prefix),
            ("total_marker", &self.total_marker),
        ];
        for (name, value) in markers {
            if value.trim().is_empty() {
                return Err(ReportError::ConfigError(format!("{} must not be empty", name)));
            }
        }

        if !self.unit_scale.is_finite() || self.unit_scale <= 0.0 {
            return Err(ReportError::ConfigError(format!(
                "unit_scale must be a positive number, got {}",
                self.unit_scale
            )));
        }

        validate_month(self.default_start_month)?;
        for month in self.fallback_start_months.values() {
            validate_month(*month)?;
        }

        Ok(())
    }

    pub fn fallback_start_month(&self, year: i32) -> u32 {
        self.fallback_start_months
            .get(&year)
            .copied()
            .unwrap_or(self.default_start_month)
    }
}

/// The raw text lines of one fiscal year, as exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawYearBlock {
    pub year: i32,
    pub lines: Vec<String>,
}

impl RawYearBlock {
    pub fn from_text(year: i32, text: &str) -> Self {
        Self {
            year,
            lines: text.lines().map(str::to_string).collect(),
        }
    }
}

/// A validated set of year blocks, always iterated in chronological order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReport {
    years: BTreeMap<i32, RawYearBlock>,
}

impl RawReport {
    pub fn new(blocks: Vec<RawYearBlock>) -> Result<Self> {
        if blocks.is_empty() {
            return Err(ReportError::EmptyReport);
        }

        let mut years = BTreeMap::new();
        for block in blocks {
            if !(2000..=2099).contains(&block.year) {
                return Err(ReportError::UnsupportedYear(block.year));
            }
            let year = block.year;
            if years.insert(year, block).is_some() {
                return Err(ReportError::DuplicateYear(year));
            }
        }

        Ok(Self { years })
    }

    pub fn blocks(&self) -> impl Iterator<Item = &RawYearBlock> {
        self.years.values()
    }

    pub fn year(&self, year: i32) -> Option<&RawYearBlock> {
        self.years.get(&year)
    }

    pub fn years(&self) -> Vec<i32> {
        self.years.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
pub enum LineType {
    #[serde(rename = "saldo")]
    #[schemars(description = "Portfolio balance at month end")]
    Balance,

    #[serde(rename = "renda")]
    #[schemars(description = "Income generated during the month")]
    Income,
}

impl LineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineType::Balance => "saldo",
            LineType::Income => "renda",
        }
    }
}

/// Classification of a raw data row by its first field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Balance,
    Income,
    Unrecognized,
}

impl RowKind {
    pub fn classify(first_field: &str, config: &ParserConfig) -> Self {
        if first_field.starts_with(&config.balance_prefix) {
            RowKind::Balance
        } else if first_field.starts_with(&config.income_prefix) {
            RowKind::Income
        } else {
            RowKind::Unrecognized
        }
    }

    pub fn line_type(&self) -> Option<LineType> {
        match self {
            RowKind::Balance => Some(LineType::Balance),
            RowKind::Income => Some(LineType::Income),
            RowKind::Unrecognized => None,
        }
    }
}

/// One month group within a year's columns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthBlock {
    #[schemars(description = "Zero-based position of the month group within a row")]
    pub block_index: usize,
    #[schemars(description = "Calendar month, 1-12")]
    pub month: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum LayoutSource {
    /// Month groups were read from the header row at `line_index`.
    Header { line_index: usize },
    /// No header row; consecutive months were assumed from `start_month`.
    Fallback { start_month: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnLayout {
    pub source: LayoutSource,
    pub blocks: Vec<MonthBlock>,
}

impl ColumnLayout {
    /// Index of the first line that may hold data rows.
    pub fn data_start_index(&self) -> usize {
        match self.source {
            LayoutSource::Header { line_index } => line_index + 1,
            LayoutSource::Fallback { .. } => 0,
        }
    }

    pub fn months(&self) -> Vec<u32> {
        self.blocks.iter().map(|b| b.month).collect()
    }
}

/// Aggregated totals for one calendar month, in millions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyMetric {
    #[schemars(description = "Month label in Mmm/YY format, e.g. Mar/21")]
    pub date: String,
    #[serde(rename = "orcado")]
    pub budget_value: f64,
    #[serde(rename = "realizado")]
    pub actual_value: f64,
    pub churn_rate: f64,
}

impl MonthlyMetric {
    pub fn period(&self) -> Result<(i32, u32)> {
        parse_date_label(&self.date)
    }

    pub fn period_end(&self) -> Option<NaiveDate> {
        let (year, month) = self.period().ok()?;
        last_day_of_month(year, month)
    }
}

/// One (year, month, product, line type) observation, in millions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinancialRecord {
    pub id: String,
    pub year: i32,
    pub month: u32,
    pub month_label: String,
    pub product: String,
    #[serde(rename = "type")]
    pub line_type: LineType,
    #[serde(rename = "orcado")]
    pub budget_value: f64,
    #[serde(rename = "realizado")]
    pub actual_value: f64,
}

impl FinancialRecord {
    pub fn record_id(year: i32, month: u32, product: &str, line_type: LineType) -> String {
        format!("{}-{}-{}-{}", year, month, product, line_type.as_str())
    }

    pub fn period_end(&self) -> Option<NaiveDate> {
        last_day_of_month(self.year, self.month)
    }
}

/// The normalized output handed to the presentation layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParsedReport {
    #[schemars(description = "Total balance per month, ordered by year then month")]
    pub aggregated: Vec<MonthlyMetric>,
    #[schemars(description = "Per-product records in chronological processing order")]
    pub detailed: Vec<FinancialRecord>,
    #[schemars(description = "Distinct product names, sorted ascending")]
    pub products: Vec<String>,
}

impl ParsedReport {
    pub fn is_empty(&self) -> bool {
        self.aggregated.is_empty() && self.detailed.is_empty() && self.products.is_empty()
    }

    pub fn records_for<'a>(
        &'a self,
        product: &'a str,
        line_type: LineType,
    ) -> impl Iterator<Item = &'a FinancialRecord> + 'a {
        self.detailed
            .iter()
            .filter(move |r| r.product == product && r.line_type == line_type)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ParsedReport)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
