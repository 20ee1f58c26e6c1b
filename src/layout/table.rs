//! Typed tables built from a header and its data rows
use crate::layout::coerce::coerce;
use crate::layout::coerce::ColumnKind;
use crate::layout::coerce::ColumnRules;
use crate::layout::coerce::Value;
use crate::layout::header::Header;
use crate::layout::header::HeaderEnd;
use crate::layout::rows::extract_rows;
use crate::layout::rows::RowBlock;
use crate::layout::rows::RowRules;
use crate::spreadsheet::CellGrid;
use crate::spreadsheet::CellValue;
use serde::ser::SerializeMap;
use serde::ser::SerializeStruct;
use serde::Serialize;
use serde::Serializer;

/// Named columns and rows of typed values
///
/// Serialises as `{ "columns": [...], "rows": [{column: value}], "summary": {...} }`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtractedTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    summary: Option<Vec<Value>>,
}

impl ExtractedTable {
    /// A table from already typed rows; rows are padded or truncated to the column count.
    pub fn from_values(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows.into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Self { columns, rows, summary: None }
    }

    /// Coerces raw rows column by column.
    pub fn build(columns: Vec<String>, block: RowBlock, rules: &ColumnRules) -> Self {
        let kinds: Vec<ColumnKind> = columns.iter().map(|column| rules.kind_of(column)).collect();
        let coerce_row = |cells: Vec<CellValue>| -> Vec<Value> {
            kinds.iter()
                .enumerate()
                .map(|(index, kind)| coerce(*kind, cells.get(index).unwrap_or(&CellValue::Empty)))
                .collect()
        };
        let rows = block.rows.into_iter().map(coerce_row).collect();
        let summary = block.summary.map(coerce_row);
        Self { columns, rows, summary }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// The `Total` row that closed the table, coerced like the data rows.
    pub fn summary(&self) -> Option<&[Value]> {
        self.summary.as_deref()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by name, exact first and then ignoring case.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter()
            .position(|column| column == name)
            .or_else(|| self.columns.iter().position(|column| column.eq_ignore_ascii_case(name)))
    }

    /// First column whose lower-cased name contains every keyword.
    pub fn find_column(&self, keywords: &[&str]) -> Option<usize> {
        self.columns.iter().position(|column| {
            let column = column.to_lowercase();
            keywords.iter().all(|keyword| column.contains(keyword))
        })
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// Values of one column, top to bottom; empty when the column is absent.
    pub fn column_values(&self, column: &str) -> Vec<&Value> {
        match self.column_index(column) {
            Some(index) => self.rows.iter().filter_map(|row| row.get(index)).collect(),
            None => Vec::new(),
        }
    }

    /// Sum of the numeric values of a column.
    pub fn sum(&self, column: &str) -> f64 {
        self.column_values(column).iter().filter_map(|value| value.as_f64()).sum()
    }

    pub fn summary_value(&self, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.summary.as_ref()?.get(index)
    }

    /// Rows as `(column, value)` pairs.
    pub fn records(&self) -> impl Iterator<Item = Vec<(&str, &Value)>> {
        self.rows.iter().map(move |row| {
            self.columns.iter().map(String::as_str).zip(row.iter()).collect()
        })
    }
}

struct Record<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.columns.iter().zip(self.values) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl Serialize for ExtractedTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let columns = self.columns.as_slice();
        let rows: Vec<Record> = self.rows.iter()
            .map(|values| Record { columns, values })
            .collect();
        let summary = self.summary.as_ref().map(|values| Record { columns, values });
        let mut state = serializer.serialize_struct("ExtractedTable", 3)?;
        state.serialize_field("columns", &self.columns)?;
        state.serialize_field("rows", &rows)?;
        state.serialize_field("summary", &summary)?;
        state.end()
    }
}

/// How a table hangs off its header row
#[derive(Clone, Debug)]
pub struct TableLayout<'a> {
    /// Number of stacked header rows
    pub header_height: usize,
    pub header_end: HeaderEnd,
    pub rows: RowRules<'a>,
    pub columns: &'a ColumnRules,
}

/// A table read from a sheet with the row where scanning resumes
#[derive(Clone, Debug, PartialEq)]
pub struct TableRead {
    pub table: ExtractedTable,
    pub header: Header,
    pub next_row: usize,
}

/// Reads the header at `header_row`, the rows below it, and coerces them
///
/// # Returns
/// `None` when the header yields no columns
pub fn read_table(grid: &CellGrid, header_row: usize, layout: &TableLayout) -> Option<TableRead> {
    let header = Header::read(grid, header_row, layout.header_height, layout.header_end)?;
    let block = extract_rows(grid, header.data_start(), header.width(), &layout.rows);
    let next_row = block.next_row;
    let table = ExtractedTable::build(header.columns.clone(), block, layout.columns);
    Some(TableRead { table, header, next_row })
}
