//! Office Open XML package helpers
use crate::error::ReportSheetError;
use crate::helpers::reader::SourceReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::borrow::Cow;
use std::collections::HashMap;
use zip::ZipArchive;

/// XML tag name for relationship elements
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Signature of compound binary files: legacy `.xls` workbooks and encrypted `.xlsx` packages.
const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Signature of a ZIP local file header.
const ZIP_SIGNATURE: [u8; 4] = [b'P', b'K', 0x03, 0x04];

/// Opens a workbook package and loads its structure
///
/// # Arguments
/// * `name` - Display name of the workbook, used in error messages
/// * `reader` - Source positioned at the beginning of the file
/// * `load_workbook` - Function to load the sheet list and date system
/// * `load_number_formats` - Function to load number formatting information
///
/// # Returns
/// Tuple containing:
/// - Zip archive handle
/// - Number format mappings
/// - List of sheet names and their paths
pub(super) fn open<W, F>(name: &str, mut reader: SourceReader, load_workbook: W, load_number_formats: F) -> Result<(
    ZipArchive<SourceReader>,
    Vec<CellType>,
    Vec<(String, String)>
), ReportSheetError>
where
    W: Fn(&mut ZipArchive<SourceReader>) -> Result<(Vec<(String, String)>, bool), ReportSheetError>,
    F: Fn(&mut ZipArchive<SourceReader>, bool) -> Result<Vec<CellType>, ReportSheetError>,
{
    if reader.peek::<8>() == Some(CFB_SIGNATURE) {
        Err(SpreadsheetError::PasswordProtected(name.to_owned()))?;
    }
    if reader.peek::<4>() != Some(ZIP_SIGNATURE) {
        Err(SpreadsheetError::InvalidFileFormat(name.to_owned()))?;
    }

    let mut zip = ZipArchive::new(reader)?;
    let (sheets, is_1904) = load_workbook(&mut zip)?;
    if sheets.is_empty() {
        Err(SpreadsheetError::SpreadsheetEmpty(name.to_owned()))?
    }

    let number_formats = load_number_formats(&mut zip, is_1904)?;
    Ok((zip, number_formats, sheets))
}

/// Loads worksheet relationships
///
/// # Arguments
/// * `zip` - Zip archive handle
/// * `path` - Path to the relationships XML part within the archive
///
/// # Returns
/// Mapping of relationship IDs to worksheet paths
pub(super) fn load_relationships(zip: &mut ZipArchive<SourceReader>, path: &str) -> Result<HashMap<String, String>, ReportSheetError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Maps style indexes to cell types using custom and built-in number formats
pub(super) fn load_number_formats(format_indexes: Vec<String>, custom_formats: HashMap<String, CellType>, is_1904: bool) -> Vec<CellType> {
    format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(id, is_1904))
                .unwrap_or(CellType::Number)
        })
        .collect()
}

/// Normalizes a relationship target to a path inside the package
pub(crate) fn to_zip_path(path: Cow<'_, str>) -> String {
    if let Some(path) = path.strip_prefix("/xl/") {
        format!("xl/{path}")
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{}", path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_paths() {
        assert_eq!(to_zip_path(Cow::Borrowed("worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path(Cow::Borrowed("/xl/worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path(Cow::Borrowed("xl/worksheets/sheet2.xml")), "xl/worksheets/sheet2.xml");
    }

    #[test]
    fn number_formats_fall_back_to_number() {
        let custom = HashMap::from([("164".to_owned(), CellType::NumberDate1900)]);
        let formats = load_number_formats(
            vec!["0".to_owned(), "164".to_owned(), "14".to_owned()],
            custom,
            false,
        );
        assert_eq!(formats, vec![CellType::Number, CellType::NumberDate1900, CellType::NumberDate1900]);
    }

    #[test]
    fn rejects_compound_files() {
        let mut bytes = CFB_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0u8; 64]);
        let result = open(
            "locked.xlsx",
            SourceReader::from_bytes(bytes),
            |_| Ok((Vec::new(), false)),
            |_, _| Ok(Vec::new()),
        );
        assert!(matches!(
            result,
            Err(ReportSheetError::SpreadsheetError(SpreadsheetError::PasswordProtected(_)))
        ));
    }

    #[test]
    fn rejects_non_zip_content() {
        let result = open(
            "notes.xlsx",
            SourceReader::from_bytes(b"just some text".to_vec()),
            |_| Ok((Vec::new(), false)),
            |_, _| Ok(Vec::new()),
        );
        assert!(matches!(
            result,
            Err(ReportSheetError::SpreadsheetError(SpreadsheetError::InvalidFileFormat(_)))
        ));
    }
}
