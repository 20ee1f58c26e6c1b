use crate::error::ReportSheetError;
use crate::helpers::reader::SourceReader;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::excel;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::grid::CellGrid;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::SheetSelector;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufReader;
use zip::read::ZipFile;
use zip::ZipArchive;

const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts");
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");
const TAG_FORMAT_INDEX: QName = QName(b"xf");
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");
const TAG_PHONETIC_TEXT: QName = QName(b"rPh"); // Phonetic runs are not part of the visible text
const TAG_TEXT: QName = QName(b"t");
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr");
const TAG_SHEET: QName = QName(b"sheet");
const TAG_ROW: QName = QName(b"row");
const TAG_CELL: QName = QName(b"c");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_VALUE: QName = QName(b"v");

/// An opened `.xlsx` package
pub(crate) struct XlsxWorkbook {
    /// Display name (file path or the name given with in-memory bytes)
    pub(crate) name: String,
    zip: ZipArchive<SourceReader>,
    /// Cell types indexed by style ID
    number_formats: Vec<CellType>,
    /// Worksheets as (name, zip_path) pairs, in workbook order
    sheets: Vec<(String, String)>,
}

impl XlsxWorkbook {
    /// Opens a package and parses its structure
    ///
    /// # Arguments
    /// * `name` - Display name used in errors and on the produced grids
    /// * `reader` - Source of the package bytes
    pub(crate) fn open(name: &str, reader: SourceReader) -> Result<XlsxWorkbook, ReportSheetError> {
        let (zip, number_formats, sheets) = excel::open(name, reader, load_workbook, load_number_formats)?;
        Ok(XlsxWorkbook {
            name: name.to_owned(),
            zip,
            number_formats,
            sheets,
        })
    }

    /// Sheet names in workbook order
    pub(crate) fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    /// Resolves a selector to the (name, zip_path) of a worksheet.
    /// Names match exactly first, then ignoring case.
    fn resolve(&self, selector: &SheetSelector) -> Option<(String, String)> {
        let sheet = match selector {
            SheetSelector::Index(index) => self.sheets.get(*index),
            SheetSelector::Name(name) => self.sheets.iter()
                .find(|(sheet, _)| sheet == name)
                .or_else(|| self.sheets.iter().find(|(sheet, _)| sheet.eq_ignore_ascii_case(name))),
        };
        sheet.cloned()
    }

    /// Loads the whole shared string table
    fn load_shared_strings(&mut self) -> Result<Vec<String>, ReportSheetError> {
        let mut shared_strings = Vec::<String>::new();
        let mut reader = match self.zip.xml_reader("xl/sharedStrings.xml")? {
            Some(reader) => reader,
            None => return Ok(shared_strings),
        };

        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
                let string = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
                shared_strings.push(string);
            }
        });
        Ok(shared_strings)
    }

    /// Reads one worksheet into a dense grid anchored at A1
    ///
    /// # Arguments
    /// * `selector` - Which sheet to read
    ///
    /// # Returns
    /// The grid of cell values; cells absent from the part are empty
    pub(crate) fn read_grid(&mut self, selector: &SheetSelector) -> Result<CellGrid, ReportSheetError> {
        let (sheet_name, zip_path) = self.resolve(selector)
            .ok_or_else(|| SpreadsheetError::SheetNotFound {
                file: self.name.to_owned(),
                sheet: selector.to_string(),
            })?;
        let cells = self.read_cells(&zip_path)?;
        let shared_strings = if cells.iter().any(|cell| cell.kind == CellType::SharedString) {
            self.load_shared_strings()?
        } else {
            Vec::new()
        };

        let values = cells.iter()
            .map(|cell| (cell.row, cell.col, cell.to_value(&shared_strings)))
            .collect();
        Ok(CellGrid::from_cells(&sheet_name, values))
    }

    fn read_cells(&mut self, zip_path: &str) -> Result<Vec<Cell>, ReportSheetError> {
        let mut cells = Vec::<Cell>::new();
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        let mut reader = self.zip.xml_reader(zip_path)?
            .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                if let Some(number) = event.parse_attribute_value::<usize>("r")? {
                    row_count = number.saturating_sub(1);
                }
                col_count = 0;
            }
            Event::End(event) if event.name() == TAG_ROW => {
                row_count += 1;
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                (row, col) = event.get_attribute_value("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row_count, col_count));
                col_count = col + 1;
                value.clear();
                kind = event.get_attribute_value("t")?.map(|t| {
                    match t.as_ref() {
                        "inlineStr" | "str" => CellType::InlineString,
                        "s" => CellType::SharedString,
                        "d" => CellType::IsoDateTime,
                        "b" => CellType::Boolean,
                        "e" => CellType::Error,
                        _ => CellType::Number,
                    }
                }).unwrap_or(CellType::Number);
                if let Some(format_id) = event.get_attribute_value("s")? {
                    if kind == CellType::Number && !format_id.is_empty() {
                        let index = format_id.parse::<usize>()?;
                        kind = self.number_formats.get(index).copied().unwrap_or(CellType::Number);
                    }
                }
            }
            Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if event.name() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
            }
            Event::End(event) if !value.is_empty() && event.name() == TAG_CELL => {
                cells.push(Cell {
                    row,
                    col,
                    kind,
                    value: std::mem::take(&mut value),
                });
            }
        });
        Ok(cells)
    }
}

/// Loads the sheet list and the date system from `xl/workbook.xml`
fn load_workbook(zip: &mut ZipArchive<SourceReader>) -> Result<(Vec<(String, String)>, bool), ReportSheetError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&id.to_string()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value.eq("1") || value.eq("true"))
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Loads number formats and cell style indexes from `xl/styles.xml`
fn load_number_formats(zip: &mut ZipArchive<SourceReader>, is_1904: bool) -> Result<Vec<CellType>, ReportSheetError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), CellType::parse_custom_number_format(&format, is_1904));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            format_indexes.push(
                event.get_attribute_value("numFmtId")?
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "0".to_owned()),
            );
        }
    });

    Ok(excel::load_number_formats(format_indexes, custom_formats, is_1904))
}

/// Reads string content up to `end_tag`, skipping phonetic runs
///
/// # Arguments
/// * `reader` - XML reader positioned inside the element
/// * `end_tag` - Tag that closes the string content
/// * `is_text_content` - Whether text directly inside the element counts (true for `<v>`)
fn read_string_value(
    reader: &mut XmlReader<BufReader<ZipFile<'_, SourceReader>>>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, ReportSheetError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&String::from_utf8_lossy(&event)),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::CellValue;
    use crate::spreadsheet::testing::XlsxBuilder;
    use chrono::NaiveDate;

    fn open(bytes: Vec<u8>) -> XlsxWorkbook {
        XlsxWorkbook::open("test.xlsx", SourceReader::from_bytes(bytes)).unwrap()
    }

    #[test]
    fn reads_shared_inline_and_numeric_cells() {
        let bytes = XlsxBuilder::new()
            .sheet("Report", &[
                &["Box Score Summary", "", ""],
                &["", "Units", "Rent"],
                &["marbla", "228", "1,250.00"],
            ])
            .build();
        let mut workbook = open(bytes);
        assert_eq!(workbook.sheet_names(), vec!["Report"]);
        let grid = workbook.read_grid(&SheetSelector::Index(0)).unwrap();
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.text(0, 0), "Box Score Summary");
        assert!(grid.get(0, 1).is_empty());
        assert_eq!(grid.get(2, 1), &CellValue::Number(228.0));
        assert_eq!(grid.text(2, 2), "1,250.00");
    }

    #[test]
    fn resolves_sheets_by_name_and_reports_missing() {
        let bytes = XlsxBuilder::new()
            .sheet("First", &[&["a"]])
            .sheet("Second", &[&["b"]])
            .build();
        let mut workbook = open(bytes);
        let grid = workbook.read_grid(&SheetSelector::Name("second".to_owned())).unwrap();
        assert_eq!(grid.text(0, 0), "b");
        assert_eq!(grid.name(), "Second");
        let error = workbook.read_grid(&SheetSelector::Name("Third".to_owned())).unwrap_err();
        assert!(matches!(
            error,
            ReportSheetError::SpreadsheetError(SpreadsheetError::SheetNotFound { .. })
        ));
        assert!(workbook.read_grid(&SheetSelector::Index(5)).is_err());
    }

    #[test]
    fn date_styled_numbers_become_dates() {
        let bytes = XlsxBuilder::new()
            .sheet("Dates", &[&["Notice Date"]])
            .date_cell("Dates", "A2", 45873.0)
            .build();
        let mut workbook = open(bytes);
        let grid = workbook.read_grid(&SheetSelector::Index(0)).unwrap();
        assert_eq!(grid.get(1, 0), &CellValue::Date(NaiveDate::from_ymd_opt(2025, 8, 4).unwrap()));
    }

    #[test]
    fn sparse_cells_are_anchored_at_a1() {
        let bytes = XlsxBuilder::new()
            .sheet("Sparse", &[])
            .text_cell("Sparse", "C4", "Total")
            .build();
        let mut workbook = open(bytes);
        let grid = workbook.read_grid(&SheetSelector::Index(0)).unwrap();
        assert_eq!(grid.height(), 4);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.text(3, 2), "Total");
        assert!(grid.is_row_empty(0, None));
    }
}
