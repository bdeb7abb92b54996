use crate::error::Result;
use crate::schema::{RawReport, RawYearBlock};
use log::debug;
use std::io::BufRead;

/// One year of raw export text, as handed over by the caller.
#[derive(Debug, Clone)]
pub struct YearSource<'a> {
    pub year: i32,
    pub text: &'a str,
}

impl<'a> From<(i32, &'a str)> for YearSource<'a> {
    fn from((year, text): (i32, &'a str)) -> Self {
        Self { year, text }
    }
}

impl RawReport {
    /// Builds a validated report from `(year, text)` pairs in any order.
    pub fn from_sources<'a, I, S>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<YearSource<'a>>,
    {
        let blocks = sources
            .into_iter()
            .map(Into::into)
            .map(|source| RawYearBlock::from_text(source.year, source.text))
            .collect();
        Self::new(blocks)
    }
}

/// Reads one year block from any buffered reader, line by line.
pub fn read_year_block<R: BufRead>(year: i32, reader: R) -> Result<RawYearBlock> {
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line?;
        lines.push(line.trim_end_matches('\r').to_string());
    }

    debug!("Read {} lines for year {}", lines.len(), year);
    Ok(RawYearBlock { year, lines })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use std::io::Cursor;

    #[test]
    fn test_from_sources_sorts_years() {
        let report = RawReport::from_sources([(2025, "x"), (2021, "y"), (2023, "z")]).unwrap();
        assert_eq!(report.years(), vec![2021, 2023, 2025]);
        assert_eq!(report.len(), 3);
    }

    #[test]
    fn test_from_sources_rejects_duplicates() {
        let result = RawReport::from_sources([(2022, "a"), (2022, "b")]);
        assert!(matches!(result, Err(ReportError::DuplicateYear(2022))));
    }

    #[test]
    fn test_read_year_block_strips_carriage_returns() {
        let reader = Cursor::new("Nivel 1,a,b,Jan\r\nSALDO,Total,x\r\n");
        let block = read_year_block(2022, reader).unwrap();

        assert_eq!(block.year, 2022);
        assert_eq!(block.lines, vec!["Nivel 1,a,b,Jan", "SALDO,Total,x"]);
    }
}
