//! ResAnalytics Unit Availability Details: units grouped under `<code> - <description>` rows
use crate::config::ParserConfig;
use crate::error::ReportSheetError;
use crate::layout::coerce::ColumnKind;
use crate::layout::coerce::ColumnRules;
use crate::layout::header::Header;
use crate::layout::header::HeaderAnchor;
use crate::layout::header::HeaderEnd;
use crate::layout::metadata::extract_metadata;
use crate::layout::metadata::Converter;
use crate::layout::metadata::MetadataRule;
use crate::layout::metadata::MetadataValue;
use crate::layout::metadata::RowWindow;
use crate::layout::rows::EmptyRowPolicy;
use crate::layout::rows::RowBlock;
use crate::layout::table::ExtractedTable;
use crate::reports::strip_property_suffix;
use crate::reports::ReportBody;
use crate::reports::ReportContent;
use crate::reports::ReportKind;
use crate::reports::ReportParser;
use crate::reports::Section;
use crate::spreadsheet::CellGrid;
use crate::spreadsheet::CellValue;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;
use tracing::warn;

static PROPERTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\s*\((\w+)\)").expect("valid property regex"));
static AS_OF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"As Of: (.+)").expect("valid as-of regex"));
static PRE_LEASED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Pre-Leased:(.*)").expect("valid pre-leased regex"));
static OCCUPIED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Occupied:(.*)").expect("valid occupied regex"));
static GROUP_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Group By:(.+)").expect("valid group-by regex"));

pub fn identify(filename: &str) -> bool {
    strip_property_suffix(filename, false).starts_with("resanalytics_unit")
}

/// A row starting a unit group: `" - "` in the first cell, next two cells blank
fn is_group_row(cells: &[String]) -> bool {
    let first = cells.first().map(String::as_str).unwrap_or("");
    first.contains(" - ") && cells.iter().skip(1).take(2).all(String::is_empty)
}

pub struct UnitAvailabilityParser {
    metadata_window: usize,
    empty_rows: EmptyRowPolicy,
    columns: ColumnRules,
}

impl UnitAvailabilityParser {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            metadata_window: config.metadata_window,
            empty_rows: config.empty_rows(ReportKind::UnitAvailability, EmptyRowPolicy::Skip),
            columns: ColumnRules::new().contains(&["rent", "deposit"], ColumnKind::Decimal),
        }
    }

    /// Collects data rows into their groups, in order of first appearance.
    fn collect_groups(&self, grid: &CellGrid, header: &Header) -> Vec<(String, Vec<Vec<CellValue>>)> {
        let width = header.width();
        let mut groups: Vec<(String, Vec<Vec<CellValue>>)> = Vec::new();
        let mut current: Option<usize> = None;
        for row in header.data_start()..grid.height() {
            let cells = grid.row_texts(row, Some(width));
            if cells.iter().all(String::is_empty) {
                match self.empty_rows {
                    EmptyRowPolicy::Skip => continue,
                    EmptyRowPolicy::Break => break,
                }
            }
            if cells[0].is_empty() {
                continue;
            }
            if is_group_row(&cells) {
                let name = cells[0].clone();
                current = match groups.iter().position(|(existing, _)| *existing == name) {
                    Some(index) => {
                        groups[index].1.clear();
                        Some(index)
                    }
                    None => {
                        groups.push((name, Vec::new()));
                        Some(groups.len() - 1)
                    }
                };
                continue;
            }
            if let Some(index) = current {
                let mut values: Vec<CellValue> = grid.row(row).iter().take(width).cloned().collect();
                values.resize(width, CellValue::Empty);
                groups[index].1.push(values);
            }
        }
        groups
    }
}

impl ReportParser for UnitAvailabilityParser {
    fn kind(&self) -> ReportKind {
        ReportKind::UnitAvailability
    }

    fn parse(&self, grid: &CellGrid) -> Result<ReportContent, ReportSheetError> {
        let rules = [
            MetadataRule::new(PROPERTY.clone(), RowWindow::Row(1))
                .capture(1, "property_name")
                .capture(2, "property_code"),
            MetadataRule::new(AS_OF.clone(), RowWindow::Row(2))
                .capture_as(1, "as_of_date", Converter::Date),
            MetadataRule::new(PRE_LEASED.clone(), RowWindow::Rows(3..6))
                .capture_as(1, "showing_pre_leased", Converter::Flag("Yes")),
            MetadataRule::new(OCCUPIED.clone(), RowWindow::Rows(3..6))
                .capture_as(1, "showing_occupied", Converter::Flag("Yes")),
            MetadataRule::new(GROUP_BY.clone(), RowWindow::Rows(3..6))
                .capture(1, "group_by"),
        ];
        let mut metadata = extract_metadata(grid, &rules, self.metadata_window);

        let anchor = HeaderAnchor::All(vec![(0, "Unit"), (1, "Resident")]);
        let header = anchor.find(grid, 0)
            .and_then(|row| Header::read(grid, row, 2, HeaderEnd::TrailingBlanks));
        let Some(header) = header else {
            warn!(report = %self.kind(), sheet = grid.name(), "Header row not found");
            return Ok(ReportContent { metadata, body: ReportBody::Sections(Vec::new()) });
        };

        let sections: Vec<Section> = self.collect_groups(grid, &header)
            .into_iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(name, rows)| {
                debug!(group = %name, rows = rows.len(), "Extracted unit group");
                let block = RowBlock { rows, ..RowBlock::default() };
                Section { name, table: ExtractedTable::build(header.columns.clone(), block, &self.columns) }
            })
            .collect();

        let names = sections.iter().map(|section| section.name.clone()).collect();
        let total_units: usize = sections.iter().map(|section| section.table.len()).sum();
        metadata.insert("sections_found", MetadataValue::List(names));
        metadata.insert_integer("total_units", total_units as i64);

        Ok(ReportContent { metadata, body: ReportBody::Sections(sections) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::coerce::Value;
    use chrono::NaiveDate;

    fn sheet() -> CellGrid {
        CellGrid::from_text_rows(&[
            &["Unit Availability Details", "", "", "", ""],
            &["Marbella (marbla)", "", "", "", ""],
            &["As Of: 08/04/2025", "", "", "", ""],
            &["Show Pre-Leased: Yes", "", "", "", ""],
            &["Show Occupied: No", "", "", "", ""],
            &["Group By: Status", "", "", "", ""],
            &["Unit", "Resident", "Market", "", ""],
            &["", "", "Rent", "Deposit", ""],
            &["ignored", "before any group", "1", "", ""],
            &["VU - Vacant Unrented", "", "", "", ""],
            &["101", "", "$1,200.00", "$500", ""],
            &["", "", "", "", ""],
            &["102", "", "1,250", "", ""],
            &["NU - Notice Unrented", "", "", "", ""],
            &["", "stray", "", "", ""],
            &["201", "Jane Doe", "1300", "(50)", ""],
            &["EMPTY - Group", "", "", "", ""],
        ])
    }

    #[test]
    fn identifies_unit_availability_files() {
        assert!(identify("ResAnalytics_Unit_Availability_Details_marbla.xlsx"));
        assert!(!identify("ResAnalytics_Market_Rent_Schedule_marbla.xlsx"));
    }

    #[test]
    fn groups_become_sections() {
        let content = UnitAvailabilityParser::new(&ParserConfig::default()).parse(&sheet()).unwrap();
        let metadata = &content.metadata;
        assert_eq!(metadata.property_name(), Some("Marbella"));
        assert_eq!(metadata.as_of_date(), NaiveDate::from_ymd_opt(2025, 8, 4));
        assert_eq!(metadata.flag("showing_pre_leased"), Some(true));
        assert_eq!(metadata.flag("showing_occupied"), Some(false));
        assert_eq!(metadata.text("group_by"), Some("Status"));
        assert_eq!(metadata.list("sections_found"), Some(&["VU - Vacant Unrented".to_owned(), "NU - Notice Unrented".to_owned()][..]));
        assert_eq!(metadata.integer("total_units"), Some(3));

        let ReportBody::Sections(sections) = content.body else { panic!("expected sections") };
        let vacant = &sections[0].table;
        assert_eq!(vacant.columns(), ["Unit", "Resident", "Market Rent", "Deposit"]);
        assert_eq!(vacant.len(), 2);
        assert_eq!(vacant.value(0, "Market Rent"), Some(&Value::Float(1200.0)));
        assert_eq!(vacant.value(1, "Market Rent"), Some(&Value::Float(1250.0)));
        let notice = &sections[1].table;
        assert_eq!(notice.value(0, "Deposit"), Some(&Value::Float(-50.0)));
    }

    #[test]
    fn break_policy_stops_at_blank_row() {
        let config = ParserConfig::from_toml_str("[reports.resanalytics_unit_availability]\nempty_rows = \"break\"\n").unwrap();
        let content = UnitAvailabilityParser::new(&config).parse(&sheet()).unwrap();
        assert_eq!(content.metadata.integer("total_units"), Some(1));
    }
}
