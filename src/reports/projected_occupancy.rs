//! Projected Occupancy: a six-week move-in/move-out forecast at fixed cell positions
use crate::config::ParserConfig;
use crate::error::ReportSheetError;
use crate::layout::coerce::coerce;
use crate::layout::coerce::ColumnKind;
use crate::layout::coerce::Value;
use crate::layout::metadata::extract_metadata;
use crate::layout::metadata::Converter;
use crate::layout::metadata::MetadataRule;
use crate::layout::metadata::RowWindow;
use crate::layout::table::ExtractedTable;
use crate::reports::ReportBody;
use crate::reports::ReportContent;
use crate::reports::ReportKind;
use crate::reports::ReportParser;
use crate::spreadsheet::CellGrid;
use regex::Regex;
use std::sync::LazyLock;

static TOTAL_UNITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Total units\s*:\s*(\d+)").expect("valid total units regex"));
static OCCUPANCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Occupancy as of[^:]*:\s*(\d+)").expect("valid occupancy regex"));
static WEEK_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Week end date\s*:\s*(.+)").expect("valid week end regex"));

const NUMBER_OF_WEEKS: usize = 6;
const PROPERTY_ROW: usize = 10;
const FORECAST_START: usize = 11;

/// Forecast columns: sheet column and kind
const FORECAST_COLUMNS: [(&str, usize, ColumnKind); 5] = [
    ("Date", 0, ColumnKind::Date),
    ("Move Ins", 2, ColumnKind::Decimal),
    ("Move Outs", 3, ColumnKind::Decimal),
    ("Projected Occupancy", 4, ColumnKind::Decimal),
    ("Projected Occupancy %", 5, ColumnKind::Decimal),
];

pub fn identify(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    lower.contains("projected") && lower.contains("occupancy")
}

pub struct ProjectedOccupancyParser {
    metadata_window: usize,
}

impl ProjectedOccupancyParser {
    pub fn new(config: &ParserConfig) -> Self {
        Self { metadata_window: config.metadata_window }
    }
}

impl ReportParser for ProjectedOccupancyParser {
    fn kind(&self) -> ReportKind {
        ReportKind::ProjectedOccupancy
    }

    fn parse(&self, grid: &CellGrid) -> Result<ReportContent, ReportSheetError> {
        if grid.height() <= PROPERTY_ROW {
            return Err(ReportSheetError::LayoutError {
                report: self.kind().to_string(),
                message: format!("sheet '{}' has {} rows, the forecast starts at row {}", grid.name(), grid.height(), FORECAST_START + 1),
            });
        }

        let rules = [
            MetadataRule::new(TOTAL_UNITS.clone(), RowWindow::Row(3))
                .capture_as(1, "total_units", Converter::Integer),
            MetadataRule::new(OCCUPANCY.clone(), RowWindow::Row(4))
                .capture_as(1, "current_occupancy", Converter::Integer),
            MetadataRule::new(WEEK_END.clone(), RowWindow::Row(5))
                .capture_as(1, "week_end_date", Converter::Date)
                .capture_as(1, "as_of_date", Converter::Date),
        ];
        let mut metadata = extract_metadata(grid, &rules, self.metadata_window);
        metadata.insert_text("report_type", self.kind().as_str());
        let frequency = grid.text(1, 1).replace("Frequency = ", "");
        let frequency = frequency.trim();
        metadata.insert_text("frequency", if frequency.is_empty() { "Weekly" } else { frequency });
        metadata.insert_integer("number_of_weeks", NUMBER_OF_WEEKS as i64);
        let property = grid.text(PROPERTY_ROW, 0);
        if !property.is_empty() {
            metadata.insert_text("property_name", property);
        }

        let last = (FORECAST_START + NUMBER_OF_WEEKS).min(grid.height());
        let rows: Vec<Vec<Value>> = (FORECAST_START..last)
            .map(|row| {
                FORECAST_COLUMNS.iter()
                    .map(|(_, col, kind)| coerce(*kind, grid.get(row, *col)))
                    .collect()
            })
            .collect();
        let columns: Vec<String> = FORECAST_COLUMNS.iter().map(|(name, _, _)| name.to_string()).collect();
        let table = ExtractedTable::from_values(columns, rows);

        Ok(ReportContent { metadata, body: ReportBody::Table(table) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sheet() -> CellGrid {
        let head: &[&[&str]] = &[
            &["Projected Occupancy", "", "", "", "", ""],
            &["", "Frequency = Weekly", "", "", "", ""],
            &["", "", "", "", "", ""],
            &["", "Total units : 228", "", "", "", ""],
            &["", "Occupancy as of 08/04/2025 : 210", "", "", "", ""],
            &["", "Week end date : 08/09/2025", "", "", "", ""],
            &["", "", "", "", "", ""],
            &["", "", "", "", "", ""],
            &["", "", "", "", "", ""],
            &["Date", "", "Move Ins", "Move Outs", "Projected", "%"],
            &["Marbella", "", "", "", "", ""],
            &["08/09/2025", "", "3", "1", "212", "92.98"],
            &["08/16/2025", "", "", "2", "210", "92.11"],
        ];
        CellGrid::from_text_rows(head)
    }

    #[test]
    fn reads_fixed_positions() {
        let content = ProjectedOccupancyParser::new(&ParserConfig::default()).parse(&sheet()).unwrap();
        let metadata = &content.metadata;
        assert_eq!(metadata.integer("total_units"), Some(228));
        assert_eq!(metadata.integer("current_occupancy"), Some(210));
        assert_eq!(metadata.as_of_date(), NaiveDate::from_ymd_opt(2025, 8, 9));
        assert_eq!(metadata.text("frequency"), Some("Weekly"));
        assert_eq!(metadata.property_name(), Some("Marbella"));
        assert_eq!(metadata.integer("number_of_weeks"), Some(6));

        let ReportBody::Table(table) = content.body else { panic!("expected a table") };
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, "Move Ins"), Some(&Value::Float(3.0)));
        assert_eq!(table.value(1, "Move Ins"), Some(&Value::Float(0.0)));
        assert_eq!(table.value(1, "Projected Occupancy %"), Some(&Value::Float(92.11)));
        assert_eq!(table.value(1, "Date"), Some(&Value::Date(NaiveDate::from_ymd_opt(2025, 8, 16).unwrap())));
    }

    #[test]
    fn short_sheet_is_a_layout_error() {
        let grid = CellGrid::from_text_rows(&[&["Projected Occupancy"], &["", "Frequency = Weekly"]]);
        let error = ProjectedOccupancyParser::new(&ParserConfig::default()).parse(&grid).unwrap_err();
        assert!(matches!(error, ReportSheetError::LayoutError { .. }));
    }

    #[test]
    fn identifies_projected_occupancy_files() {
        assert!(identify("Projected_Occupancy_55pharr.xlsx"));
        assert!(!identify("Occupancy_Summary_55pharr.xlsx"));
    }
}
