//! ResAnalytics Market Rent Schedule: one row per property under a three-row header
use crate::config::ParserConfig;
use crate::error::ReportSheetError;
use crate::layout::coerce::ColumnKind;
use crate::layout::coerce::ColumnRules;
use crate::layout::header::HeaderAnchor;
use crate::layout::header::HeaderEnd;
use crate::layout::metadata::extract_metadata;
use crate::layout::metadata::Converter;
use crate::layout::metadata::MetadataRule;
use crate::layout::metadata::RowWindow;
use crate::layout::rows::EmptyRowPolicy;
use crate::layout::rows::RowRules;
use crate::layout::table::TableLayout;
use crate::reports::anchored_table;
use crate::reports::strip_property_suffix;
use crate::reports::ReportBody;
use crate::reports::ReportContent;
use crate::reports::ReportKind;
use crate::reports::ReportParser;
use crate::spreadsheet::CellGrid;
use regex::Regex;
use std::sync::LazyLock;

static PROPERTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\s*\((\w+)\)").expect("valid property regex"));
static AS_OF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"As Of = (.+)").expect("valid as-of regex"));

/// Stacked rows forming the column names
const HEADER_ROWS: usize = 3;

pub fn identify(filename: &str) -> bool {
    strip_property_suffix(filename, false).starts_with("resanalytics_market")
}

pub struct MarketRentParser {
    metadata_window: usize,
    empty_rows: EmptyRowPolicy,
    columns: ColumnRules,
}

impl MarketRentParser {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            metadata_window: config.metadata_window,
            empty_rows: config.empty_rows(ReportKind::MarketRent, EmptyRowPolicy::Skip),
            columns: ColumnRules::new()
                .contains(&["units"], ColumnKind::Integer)
                .contains(&["rent", "average"], ColumnKind::Decimal),
        }
    }
}

impl ReportParser for MarketRentParser {
    fn kind(&self) -> ReportKind {
        ReportKind::MarketRent
    }

    fn parse(&self, grid: &CellGrid) -> Result<ReportContent, ReportSheetError> {
        let rules = [
            MetadataRule::new(PROPERTY.clone(), RowWindow::Row(1))
                .capture(1, "property_name")
                .capture(2, "property_code"),
            MetadataRule::new(AS_OF.clone(), RowWindow::Row(2))
                .capture_as(1, "as_of_date", Converter::Date),
        ];
        let mut metadata = extract_metadata(grid, &rules, self.metadata_window);

        let anchor = HeaderAnchor::All(vec![(0, "Property"), (1, "Name")]);
        let layout = TableLayout {
            header_height: HEADER_ROWS,
            header_end: HeaderEnd::TrailingBlanks,
            rows: RowRules { empty_rows: self.empty_rows, ..RowRules::default() },
            columns: &self.columns,
        };
        let table = anchored_table(grid, self.kind(), &anchor, &layout);
        metadata.insert_integer("total_properties", table.len() as i64);

        Ok(ReportContent { metadata, body: ReportBody::Table(table) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::coerce::Value;
    use chrono::NaiveDate;

    #[test]
    fn identifies_market_rent_files() {
        assert!(identify("ResAnalytics_Market_Rent_Schedule_marbla.xlsx"));
        assert!(!identify("ResAnalytic_Lease_Expiration_marbla.xlsx"));
    }

    #[test]
    fn merges_three_header_rows() {
        let grid = CellGrid::from_text_rows(&[
            &["Market Rent Schedule", "", "", "", ""],
            &["Marbella (marbla)", "", "", "", ""],
            &["As Of = 08/04/2025", "", "", "", ""],
            &["Property", "Name", "Units", "Market", ""],
            &["", "", "", "Rent", "Average"],
            &["", "", "", "Rent", "Sq Ft"],
            &["marbla", "Marbella", "228", "1,450.50", "900"],
            &["", "", "", "", ""],
            &["elm", "Elm Court", "12", "", "750"],
        ]);
        let content = MarketRentParser::new(&ParserConfig::default()).parse(&grid).unwrap();
        assert_eq!(content.metadata.property_code(), Some("marbla"));
        assert_eq!(content.metadata.as_of_date(), NaiveDate::from_ymd_opt(2025, 8, 4));
        assert_eq!(content.metadata.integer("total_properties"), Some(2));

        let ReportBody::Table(table) = content.body else { panic!("expected a table") };
        assert_eq!(table.columns(), ["Property", "Name", "Units", "Market Rent", "Average Sq Ft"]);
        assert_eq!(table.value(0, "Units"), Some(&Value::Int(228)));
        assert_eq!(table.value(0, "Market Rent"), Some(&Value::Float(1450.5)));
        assert_eq!(table.value(1, "Market Rent"), Some(&Value::Float(0.0)));
        assert_eq!(table.value(1, "Average Sq Ft"), Some(&Value::Float(750.0)));
    }
}
