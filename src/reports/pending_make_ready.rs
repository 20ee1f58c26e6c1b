//! Pending Make Ready Unit Details: units waiting to be turned, under a two-row header
use crate::config::ParserConfig;
use crate::error::ReportSheetError;
use crate::layout::coerce::ColumnKind;
use crate::layout::coerce::ColumnRules;
use crate::layout::header::HeaderAnchor;
use crate::layout::header::HeaderEnd;
use crate::layout::metadata::extract_metadata;
use crate::layout::metadata::value_counts;
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
    LazyLock::new(|| Regex::new(r"Property=(\w+)").expect("valid property regex"));
static TILL_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Till Dates\([^)]+\)=(\d{2}/\d{2}/\d{4})").expect("valid till date regex"));

pub fn identify(filename: &str) -> bool {
    strip_property_suffix(filename, false)
        .replace("._", "_")
        .starts_with("pending_make")
}

pub struct PendingMakeReadyParser {
    metadata_window: usize,
    empty_rows: EmptyRowPolicy,
    columns: ColumnRules,
}

impl PendingMakeReadyParser {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            metadata_window: config.metadata_window,
            empty_rows: config.empty_rows(ReportKind::PendingMakeReady, EmptyRowPolicy::Skip),
            columns: ColumnRules::new()
                .contains(&["bedrooms"], ColumnKind::Integer)
                .contains(&["date"], ColumnKind::Date),
        }
    }
}

impl ReportParser for PendingMakeReadyParser {
    fn kind(&self) -> ReportKind {
        ReportKind::PendingMakeReady
    }

    fn parse(&self, grid: &CellGrid) -> Result<ReportContent, ReportSheetError> {
        let rules = [
            MetadataRule::new(PROPERTY.clone(), RowWindow::Row(1))
                .capture(1, "property_code"),
            MetadataRule::new(TILL_DATE.clone(), RowWindow::Row(1))
                .capture_as(1, "till_date", Converter::Date),
        ];
        let mut metadata = extract_metadata(grid, &rules, self.metadata_window);

        let anchor = HeaderAnchor::All(vec![(0, "Property"), (1, "Date")]);
        let layout = TableLayout {
            header_height: 2,
            header_end: HeaderEnd::FirstBlank,
            rows: RowRules { empty_rows: self.empty_rows, ..RowRules::default() },
            columns: &self.columns,
        };
        let table = anchored_table(grid, self.kind(), &anchor, &layout);
        metadata.insert_integer("pending_units", table.len() as i64);
        if let Some(bedrooms) = table.find_column(&["bedrooms"]) {
            if !table.is_empty() {
                let values = table.rows().iter()
                    .filter(|row| !row[bedrooms].is_null())
                    .map(|row| row[bedrooms].to_string());
                metadata.insert("bedroom_breakdown", value_counts(values));
            }
        }

        Ok(ReportContent { metadata, body: ReportBody::Table(table) })
    }
}
