use crate::spreadsheet::cell::CellValue;

static EMPTY: CellValue = CellValue::Empty;

/// A rectangular, 0-indexed grid of raw cell values read from one sheet.
///
/// Every row has the same width; coordinates outside the grid read as empty cells.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellGrid {
    name: String,
    rows: Vec<Vec<CellValue>>,
    width: usize,
}

impl CellGrid {
    /// Builds a grid from rows, padding shorter rows with empty cells.
    pub fn new(name: &str, mut rows: Vec<Vec<CellValue>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, CellValue::Empty);
        }
        Self { name: name.to_owned(), rows, width }
    }

    /// Builds a grid from plain strings. Empty strings become empty cells.
    pub fn from_text_rows(rows: &[&[&str]]) -> Self {
        let rows = rows.iter()
            .map(|row| row.iter().map(|text| CellValue::from(*text)).collect())
            .collect();
        Self::new("Sheet1", rows)
    }

    /// Builds a grid from sparse `(row, col, value)` triples anchored at A1.
    pub(crate) fn from_cells(name: &str, cells: Vec<(usize, usize, CellValue)>) -> Self {
        let height = cells.iter().map(|(row, _, _)| row + 1).max().unwrap_or(0);
        let width = cells.iter().map(|(_, col, _)| col + 1).max().unwrap_or(0);
        let mut rows = vec![vec![CellValue::Empty; width]; height];
        for (row, col, value) in cells {
            rows[row][col] = value;
        }
        Self { name: name.to_owned(), rows, width }
    }

    /// Sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at `(row, col)`, or an empty cell when out of range.
    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        self.rows.get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(&EMPTY)
    }

    /// All cells of a row, or an empty slice when out of range.
    pub fn row(&self, row: usize) -> &[CellValue] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Trimmed text of the cell at `(row, col)`.
    pub fn text(&self, row: usize, col: usize) -> String {
        self.get(row, col).text()
    }

    /// Trimmed texts of a row, truncated or padded to `width` when given.
    pub fn row_texts(&self, row: usize, width: Option<usize>) -> Vec<String> {
        let width = width.unwrap_or(self.width);
        (0..width).map(|col| self.text(row, col)).collect()
    }

    /// Non-empty cell texts of a row joined with single spaces.
    pub fn row_text(&self, row: usize) -> String {
        self.row(row).iter()
            .map(CellValue::text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// True when the first `width` cells (or all cells) of a row are empty.
    pub fn is_row_empty(&self, row: usize, width: Option<usize>) -> bool {
        let cells = self.row(row);
        let width = width.unwrap_or(cells.len()).min(cells.len());
        cells[..width].iter().all(CellValue::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_rows_to_common_width() {
        let grid = CellGrid::from_text_rows(&[&["a"], &["b", "c", "d"]]);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.row(0).len(), 3);
        assert!(grid.get(0, 2).is_empty());
    }

    #[test]
    fn out_of_range_reads_empty() {
        let grid = CellGrid::from_text_rows(&[&["a"]]);
        assert!(grid.get(10, 10).is_empty());
        assert!(grid.row(4).is_empty());
        assert!(grid.is_row_empty(4, None));
        assert_eq!(grid.text(3, 0), "");
    }

    #[test]
    fn row_text_joins_non_empty_cells() {
        let grid = CellGrid::from_text_rows(&[&["Marbella (marbla)", "", " Date = 07/01/2025 - 07/31/2025 "]]);
        assert_eq!(grid.row_text(0), "Marbella (marbla) Date = 07/01/2025 - 07/31/2025");
        assert_eq!(grid.row_texts(0, Some(2)), vec!["Marbella (marbla)", ""]);
    }

    #[test]
    fn row_emptiness_respects_width() {
        let grid = CellGrid::from_text_rows(&[&["", "", "note"]]);
        assert!(grid.is_row_empty(0, Some(2)));
        assert!(!grid.is_row_empty(0, None));
    }

    #[test]
    fn sparse_cells() {
        let grid = CellGrid::from_cells("Sheet", vec![(2, 1, CellValue::Number(5.0))]);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.width(), 2);
        assert_eq!(grid.text(2, 1), "5");
    }
}
