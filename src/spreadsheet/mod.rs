//! Workbook loading: turns one sheet of an `.xlsx` file into a [`CellGrid`]
pub(crate) mod cell;
pub(crate) mod excel;
pub(crate) mod grid;
pub(crate) mod reference;
#[cfg(test)]
pub(crate) mod testing;
pub(crate) mod xlsx;

use crate::error::ReportSheetError;
use crate::helpers::reader::SourceReader;
use crate::spreadsheet::xlsx::XlsxWorkbook;
use std::fmt::Display;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub use cell::CellValue;
pub use grid::CellGrid;

/// Errors raised while opening a workbook or locating a sheet
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// A required part is missing from the package
    #[error("Missing part '{0}' in workbook package")]
    FileError(String),

    #[error("Cannot detect file format for '{0}': not an xlsx package")]
    InvalidFileFormat(String),

    #[error("Workbook '{0}' is password protected or a legacy binary file")]
    PasswordProtected(String),

    #[error("Workbook '{0}' contains no sheets")]
    SpreadsheetEmpty(String),

    #[error("Sheet {sheet} not found in '{file}'")]
    SheetNotFound { file: String, sheet: String },
}

/// Selects a sheet by 0-based position or by name
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

impl Display for SheetSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetSelector::Index(index) => write!(f, "#{}", index),
            SheetSelector::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// An opened workbook
///
/// Every failure while opening or reading a sheet surfaces as
/// [`ReportSheetError::FileRead`] carrying the workbook name.
pub struct Workbook {
    inner: XlsxWorkbook,
}

impl Workbook {
    /// Opens a workbook from a local path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReportSheetError> {
        let path = path.as_ref();
        let name = path.to_string_lossy().to_string();
        debug!(path = %name, "Opening workbook");
        SourceReader::open(path)
            .and_then(|reader| XlsxWorkbook::open(&name, reader))
            .map(|inner| Workbook { inner })
            .map_err(|error| ReportSheetError::file_read(&name, error))
    }

    /// Opens a workbook from bytes fetched by the caller (e.g. from object storage)
    ///
    /// # Arguments
    /// * `name` - Name reported in errors, usually the original file name
    /// * `bytes` - Complete package content
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<Self, ReportSheetError> {
        debug!(name, size = bytes.len(), "Opening workbook from memory");
        XlsxWorkbook::open(name, SourceReader::from_bytes(bytes))
            .map(|inner| Workbook { inner })
            .map_err(|error| ReportSheetError::file_read(name, error))
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&self) -> Vec<String> {
        self.inner.sheet_names()
    }

    /// Reads the selected sheet into a grid
    pub fn read_grid(&mut self, sheet: &SheetSelector) -> Result<CellGrid, ReportSheetError> {
        let grid = self.inner
            .read_grid(sheet)
            .map_err(|error| ReportSheetError::file_read(&self.inner.name, error))?;
        debug!(workbook = %self.inner.name, sheet = grid.name(), rows = grid.height(), cols = grid.width(), "Loaded sheet");
        Ok(grid)
    }
}

/// Loads one sheet of a local workbook
///
/// # Arguments
/// * `path` - Location of the `.xlsx` file
/// * `sheet` - Which sheet to read
///
/// # Returns
/// * `Result<CellGrid, ReportSheetError>` - the grid, or `FileRead` when the file is
///   missing, not a readable workbook, or lacks the sheet
pub fn load_grid(path: impl AsRef<Path>, sheet: &SheetSelector) -> Result<CellGrid, ReportSheetError> {
    Workbook::open(path)?.read_grid(sheet)
}

/// Loads one sheet of a workbook held in memory
pub fn load_grid_from_bytes(name: &str, bytes: Vec<u8>, sheet: &SheetSelector) -> Result<CellGrid, ReportSheetError> {
    Workbook::from_bytes(name, bytes)?.read_grid(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::testing::XlsxBuilder;
    use std::io::Write;

    #[test]
    fn missing_file_is_a_read_error() {
        let error = load_grid("does/not/exist.xlsx", &SheetSelector::default()).unwrap_err();
        assert!(error.is_file_read());
        assert!(error.to_string().contains("does/not/exist.xlsx"));
    }

    #[test]
    fn garbage_bytes_are_a_read_error() {
        let error = load_grid_from_bytes("junk.xlsx", b"not a workbook".to_vec(), &SheetSelector::default()).unwrap_err();
        assert!(error.is_file_read());
    }

    #[test]
    fn missing_sheet_is_a_read_error() {
        let bytes = XlsxBuilder::new().sheet("Report", &[&["a"]]).build();
        let error = load_grid_from_bytes("one.xlsx", bytes, &SheetSelector::Name("Other".to_owned())).unwrap_err();
        assert!(error.is_file_read());
    }

    #[test]
    fn loads_from_disk() {
        let bytes = XlsxBuilder::new().sheet("Report", &[&["Property", "Units"], &["marbla", "228"]]).build();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        let mut workbook = Workbook::open(file.path()).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Report"]);
        let grid = workbook.read_grid(&SheetSelector::default()).unwrap();
        assert_eq!(grid.text(1, 1), "228");
    }
}
