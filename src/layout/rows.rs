//! Data row extraction below a resolved header
use crate::layout::section::SectionLocator;
use crate::spreadsheet::CellGrid;
use crate::spreadsheet::CellValue;
use serde::Deserialize;
use serde::Serialize;

/// Data rows that must precede a `Total` row for it to end the table
const ROWS_BEFORE_TOTAL: usize = 2;

/// What a row that is blank across the header width does
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyRowPolicy {
    /// Ignore the row and keep reading
    #[default]
    Skip,
    /// End the table
    Break,
}

/// Termination rules for one table
#[derive(Clone, Debug, Default)]
pub struct RowRules<'a> {
    pub empty_rows: EmptyRowPolicy,
    /// Rows whose first cell starts a section end the table
    pub boundary: Option<&'a SectionLocator>,
    /// First-cell markers of report footers; extraction stops there
    pub footer_markers: Vec<&'static str>,
    /// Rows with a blank first cell are ignored
    pub require_first_cell: bool,
    /// `Total` rows are ordinary data (statements with running subtotals)
    pub keep_totals: bool,
}

/// Raw rows of one table
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowBlock {
    /// Data rows, each exactly as wide as the header
    pub rows: Vec<Vec<CellValue>>,
    /// The `Total` row that ended the table, if any
    pub summary: Option<Vec<CellValue>>,
    /// Where scanning resumes
    pub next_row: usize,
}

fn is_total(first_cell: &str) -> bool {
    first_cell.to_lowercase().contains("total")
}

/// Reads rows from `start` until a terminating row or the end of the sheet
///
/// # Arguments
/// * `grid` - The sheet
/// * `start` - First row after the header
/// * `width` - Header column count; rows are truncated or padded to it
/// * `rules` - Empty-row policy, section boundary, footers
pub fn extract_rows(grid: &CellGrid, start: usize, width: usize, rules: &RowRules) -> RowBlock {
    let mut block = RowBlock { next_row: grid.height(), ..RowBlock::default() };
    for row in start..grid.height() {
        let first_cell = grid.text(row, 0);
        if rules.footer_markers.iter().any(|marker| first_cell.contains(marker)) {
            block.next_row = row;
            break;
        }
        if grid.is_row_empty(row, Some(width)) {
            match rules.empty_rows {
                EmptyRowPolicy::Skip => continue,
                EmptyRowPolicy::Break => {
                    block.next_row = row;
                    break;
                }
            }
        }
        if rules.require_first_cell && first_cell.is_empty() {
            continue;
        }
        if rules.boundary.map(|locator| locator.is_boundary(&first_cell)).unwrap_or(false) {
            block.next_row = row;
            break;
        }

        let mut cells: Vec<CellValue> = grid.row(row).iter().take(width).cloned().collect();
        cells.resize(width, CellValue::Empty);
        if !rules.keep_totals && is_total(&first_cell) && block.rows.len() >= ROWS_BEFORE_TOTAL {
            block.summary = Some(cells);
            block.next_row = row + 1;
            break;
        }
        block.rows.push(cells);
    }
    block
}
