//! # Financial Report Normalizer
//!
//! A library for turning multi-year budget vs. actual report exports
//! (comma-delimited text with locale-formatted numbers and a column layout
//! that changes from year to year) into normalized monthly series.
//!
//! ## Core Concepts
//!
//! - **Year Block**: The raw lines exported for one fiscal year
//! - **Column Layout**: Which month each column group of a year holds, read from the
//!   `Nivel 1` header row or assumed when a year has no header
//! - **Aggregated Series**: One `MonthlyMetric` per month from the `Total` balance rows
//! - **Detailed Records**: One `FinancialRecord` per product, month and line type
//! - **Best Effort**: Malformed numbers, unknown months, unknown rows and truncated rows
//!   degrade to missing data instead of failing the parse
//!
//! All amounts are stored in millions.
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_report_normalizer::*;
//!
//! let raw = RawReport::from_sources([
//!     (2021, "SALDO,Total,x,1.000.000,00,2.000.500,00"),
//!     (2022, "Nivel 1,a,b,Jan,o,r,d,Total\nSALDO,Varejo,x,3.000.000,00,2.500.000,00"),
//! ])
//! .unwrap();
//!
//! let parsed = parse_financial_report(&raw);
//! assert_eq!(parsed.aggregated[0].date, "Mar/21");
//! assert_eq!(parsed.products, vec!["Varejo"]);
//! ```

pub mod engine;
pub mod error;
pub mod ingestion;
pub mod kpi;
pub mod layout;
pub mod number;
pub mod product_summary;
pub mod reconcile;
pub mod schema;
pub mod utils;

pub use engine::{process_report, RecordExtractor, ReportAccumulator};
pub use error::{ReportError, Result};
pub use ingestion::*;
pub use kpi::{compute_kpis, KpiData, Trend};
pub use layout::LayoutResolver;
pub use number::parse_locale_number;
pub use product_summary::{LatestPeriod, ProductCatalog, ProductSummary};
pub use reconcile::{
    reconcile_totals, verify_totals, ReconciliationResult, TotalDiscrepancy, TotalsReconciler,
};
pub use schema::*;
pub use utils::*;

use log::{debug, error};

pub struct ReportNormalizer;

impl ReportNormalizer {
    pub fn process(report: &RawReport, config: &ParserConfig) -> Result<ParsedReport> {
        config.validate()?;

        debug!(
            "Normalizing years {:?} with header marker '{}'",
            report.years(),
            config.header_marker
        );

        Ok(process_report(report, config))
    }

    pub fn process_with_reconciliation(
        report: &RawReport,
        config: &ParserConfig,
        tolerance: f64,
    ) -> Result<(ParsedReport, ReconciliationResult)> {
        let parsed = Self::process(report, config)?;
        let reconciliation = reconcile_totals(&parsed, tolerance);
        Ok((parsed, reconciliation))
    }
}

/// Parses a report with the default export format.
pub fn parse_financial_report(report: &RawReport) -> ParsedReport {
    process_report(report, &ParserConfig::default())
}

pub fn parse_sources<'a, I, S>(sources: I, config: &ParserConfig) -> Result<ParsedReport>
where
    I: IntoIterator<Item = S>,
    S: Into<YearSource<'a>>,
{
    let report = RawReport::from_sources(sources)?;
    ReportNormalizer::process(&report, config)
}

/// Parses raw year sources, logging any failure and returning an empty
/// report instead of an error.
pub fn parse_or_empty<'a, I, S>(sources: I, config: &ParserConfig) -> ParsedReport
where
    I: IntoIterator<Item = S>,
    S: Into<YearSource<'a>>,
{
    match parse_sources(sources, config) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!("Failed to process financial report: {}", e);
            ParsedReport::default()
        }
    }
}
