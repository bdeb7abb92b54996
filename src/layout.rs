use crate::schema::{ColumnLayout, LayoutSource, MonthBlock, ParserConfig, RawYearBlock};
use crate::utils::month_from_abbreviation;
use log::debug;

/// Header field holding the first month name.
pub const HEADER_FIRST_MONTH_FIELD: usize = 3;

/// Header fields per month: budget, actual, difference amount, difference percent.
pub const HEADER_FIELDS_PER_MONTH: usize = 4;

/// Determines which column group of a year block belongs to which month.
pub struct LayoutResolver<'a> {
    config: &'a ParserConfig,
}

impl<'a> LayoutResolver<'a> {
    pub fn new(config: &'a ParserConfig) -> Self {
        Self { config }
    }

    /// Reads the layout from the block's header row, or assumes the
    /// year's fallback layout when the export has no header.
    pub fn resolve(&self, block: &RawYearBlock) -> ColumnLayout {
        match self.find_header(block) {
            Some(line_index) => {
                let blocks = self.parse_header(&block.lines[line_index]);
                debug!(
                    "Year {}: header at line {} maps {} month blocks",
                    block.year,
                    line_index,
                    blocks.len()
                );
                ColumnLayout {
                    source: LayoutSource::Header { line_index },
                    blocks,
                }
            }
            None => {
                let start_month = self.config.fallback_start_month(block.year);
                debug!(
                    "Year {}: no header row, assuming months from {}",
                    block.year, start_month
                );
                ColumnLayout {
                    source: LayoutSource::Fallback { start_month },
                    blocks: fallback_blocks(start_month),
                }
            }
        }
    }

    fn find_header(&self, block: &RawYearBlock) -> Option<usize> {
        block
            .lines
            .iter()
            .position(|line| line.starts_with(&self.config.header_marker))
    }

    fn parse_header(&self, header: &str) -> Vec<MonthBlock> {
        let fields: Vec<&str> = header.split(',').collect();
        let mut blocks = Vec::new();

        let month_names = fields
            .iter()
            .skip(HEADER_FIRST_MONTH_FIELD)
            .step_by(HEADER_FIELDS_PER_MONTH)
            .map(|field| field.trim());

        for (block_index, name) in month_names.enumerate() {
            if name == self.config.total_marker {
                break;
            }

            match month_from_abbreviation(name) {
                Some(month) => blocks.push(MonthBlock { block_index, month }),
                None => debug!(
                    "Skipping unrecognized month token '{}' at block {}",
                    name, block_index
                ),
            }
        }

        blocks
    }
}

/// Consecutive months from `start_month` through December.
pub fn fallback_blocks(start_month: u32) -> Vec<MonthBlock> {
    (0..12)
        .map(|block_index| MonthBlock {
            block_index,
            month: start_month + block_index as u32,
        })
        .take_while(|block| block.month <= 12)
        .collect()
}
