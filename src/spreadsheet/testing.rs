//! In-memory `.xlsx` packages for tests
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::reference_to_index;
use std::io::Cursor;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

enum TestCell {
    Shared(usize),
    Inline(String),
    Number(String),
    Date(f64),
}

/// Builds minimal workbooks: shared strings for text, plain numbers, and a date style (`s="1"`).
pub(crate) struct XlsxBuilder {
    sheets: Vec<(String, Vec<(usize, usize, TestCell)>)>,
    shared_strings: Vec<String>,
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

impl XlsxBuilder {
    pub(crate) fn new() -> Self {
        Self { sheets: Vec::new(), shared_strings: Vec::new() }
    }

    /// Adds a sheet filled from string rows. Numbers are stored as numeric cells.
    pub(crate) fn sheet(mut self, name: &str, rows: &[&[&str]]) -> Self {
        let mut cells = Vec::new();
        for (row, values) in rows.iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let cell = if value.parse::<f64>().is_ok() {
                    TestCell::Number(value.to_string())
                } else {
                    self.shared_strings.push(value.to_string());
                    TestCell::Shared(self.shared_strings.len() - 1)
                };
                cells.push((row, col, cell));
            }
        }
        self.sheets.push((name.to_owned(), cells));
        self
    }

    fn push(mut self, sheet: &str, reference: &str, cell: TestCell) -> Self {
        let (row, col) = reference_to_index(reference).expect("valid reference");
        let cells = self.sheets.iter_mut()
            .find(|(name, _)| name == sheet)
            .map(|(_, cells)| cells)
            .expect("sheet added before cells");
        cells.push((row, col, cell));
        self
    }

    /// Adds a date-formatted serial number.
    pub(crate) fn date_cell(self, sheet: &str, reference: &str, serial: f64) -> Self {
        self.push(sheet, reference, TestCell::Date(serial))
    }

    /// Adds an inline string cell.
    pub(crate) fn text_cell(self, sheet: &str, reference: &str, text: &str) -> Self {
        self.push(sheet, reference, TestCell::Inline(text.to_owned()))
    }

    fn worksheet(cells: &[(usize, usize, TestCell)]) -> String {
        let mut ordered: Vec<&(usize, usize, TestCell)> = cells.iter().collect();
        ordered.sort_by_key(|(row, col, _)| (*row, *col));
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#);
        let mut current = None;
        for (row, col, cell) in ordered {
            if current != Some(*row) {
                if current.is_some() {
                    xml.push_str("</row>");
                }
                xml.push_str(&format!(r#"<row r="{}">"#, row + 1));
                current = Some(*row);
            }
            let reference = index_to_reference(*row, *col);
            xml.push_str(&match cell {
                TestCell::Shared(index) => format!(r#"<c r="{reference}" t="s"><v>{index}</v></c>"#),
                TestCell::Inline(text) => format!(r#"<c r="{reference}" t="inlineStr"><is><t>{}</t></is></c>"#, escape(text)),
                TestCell::Number(number) => format!(r#"<c r="{reference}"><v>{number}</v></c>"#),
                TestCell::Date(serial) => format!(r#"<c r="{reference}" s="1"><v>{serial}</v></c>"#),
            });
        }
        if current.is_some() {
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData></worksheet>");
        xml
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        let mut parts: Vec<(String, String)> = Vec::new();

        let mut workbook = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><workbookPr/><sheets>"#);
        let mut relationships = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
        for (index, (name, cells)) in self.sheets.iter().enumerate() {
            let number = index + 1;
            workbook.push_str(&format!(r#"<sheet name="{}" sheetId="{number}" r:id="rId{number}"/>"#, escape(name)));
            relationships.push_str(&format!(
                r#"<Relationship Id="rId{number}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{number}.xml"/>"#
            ));
            parts.push((format!("xl/worksheets/sheet{number}.xml"), Self::worksheet(cells)));
        }
        workbook.push_str("</sheets></workbook>");
        relationships.push_str("</Relationships>");
        parts.push(("xl/workbook.xml".to_owned(), workbook));
        parts.push(("xl/_rels/workbook.xml.rels".to_owned(), relationships));

        parts.push(("xl/styles.xml".to_owned(), String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="1"><numFmt numFmtId="164" formatCode="mm/dd/yyyy"/></numFmts><cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="164"/></cellXfs></styleSheet>"#,
        )));

        let mut shared = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#);
        for string in &self.shared_strings {
            shared.push_str(&format!("<si><t>{}</t></si>", escape(string)));
        }
        shared.push_str("</sst>");
        parts.push(("xl/sharedStrings.xml".to_owned(), shared));

        for (path, content) in parts {
            writer.start_file(path, options).expect("start zip entry");
            writer.write_all(content.as_bytes()).expect("write zip entry");
        }
        writer.finish().expect("finish zip").into_inner()
    }
}
