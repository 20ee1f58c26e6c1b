use thiserror::Error;

/// Main error type for the property sheet parser.
/// Aggregates errors from various sources including standard library, dependencies, and internal modules.
#[derive(Error, Debug)]
pub enum ReportSheetError {
    /// A source workbook could not be opened or the requested sheet is absent.
    /// This is the only error that reaches callers of the dispatcher.
    #[error("Read file '{path}' failed: {source}")]
    FileRead {
        path: String,
        #[source]
        source: Box<ReportSheetError>,
    },

    /// The sheet does not have the shape its report parser reads from.
    #[error("Unexpected {report} layout: {message}")]
    LayoutError { report: String, message: String },

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    #[error("{0}")]
    GlobError(#[from] glob::GlobError),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("Invalid configuration: {0}")]
    ConfigError(#[from] toml::de::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),
}

impl ReportSheetError {
    /// Wraps any error raised while loading `path` into a [`ReportSheetError::FileRead`].
    pub(crate) fn file_read(path: &str, error: ReportSheetError) -> Self {
        match error {
            error @ ReportSheetError::FileRead { .. } => error,
            error => ReportSheetError::FileRead {
                path: path.to_owned(),
                source: Box::new(error),
            },
        }
    }

    /// Returns true when the error means the source file itself could not be read.
    pub fn is_file_read(&self) -> bool {
        matches!(self, ReportSheetError::FileRead { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_read_wraps_once() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error = ReportSheetError::file_read("a.xlsx", ReportSheetError::from(io));
        assert!(error.is_file_read());
        let error = ReportSheetError::file_read("b.xlsx", error);
        match error {
            ReportSheetError::FileRead { path, .. } => assert_eq!(path, "a.xlsx"),
            _ => panic!("expected FileRead"),
        }
    }
}
