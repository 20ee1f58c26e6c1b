//! ResARAnalytics Delinquency Summary: balances per property, closed by a user/date/time footer
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

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.+)").expect("valid title regex"));
static AS_OF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"As Of: (\d{1,2}/\d{1,2}/\d{4})").expect("valid as-of regex"));
static SCOPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(All Selected Accounts)").expect("valid scope regex"));
static USER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"UserId : (\w+)").expect("valid user regex"));
static REPORT_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Date : (\d{1,2}/\d{1,2}/\d{4})").expect("valid report date regex"));
static REPORT_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Time : (.+)").expect("valid report time regex"));

/// Footer lines that end the data
const FOOTER_MARKERS: [&str; 3] = ["UserId", "Date :", "Time :"];

/// Footer rows searched at the bottom of the sheet
const FOOTER_ROWS: usize = 3;

pub fn identify(filename: &str) -> bool {
    strip_property_suffix(filename, false).starts_with("resaranalytics_delinquency")
}

pub struct DelinquencyParser {
    metadata_window: usize,
    empty_rows: EmptyRowPolicy,
    columns: ColumnRules,
}

impl DelinquencyParser {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            metadata_window: config.metadata_window,
            empty_rows: config.empty_rows(ReportKind::Delinquency, EmptyRowPolicy::Skip),
            columns: ColumnRules::new()
                .contains(&["total", "charges", "owed", "future"], ColumnKind::Decimal),
        }
    }
}

impl ReportParser for DelinquencyParser {
    fn kind(&self) -> ReportKind {
        ReportKind::Delinquency
    }

    fn parse(&self, grid: &CellGrid) -> Result<ReportContent, ReportSheetError> {
        let rules = [
            MetadataRule::new(TITLE.clone(), RowWindow::Row(0)).capture(1, "report_title"),
            MetadataRule::new(AS_OF.clone(), RowWindow::Row(1))
                .capture_as(1, "as_of_date", Converter::Date),
            MetadataRule::new(SCOPE.clone(), RowWindow::Row(1)).capture(1, "account_scope"),
            MetadataRule::new(USER.clone(), RowWindow::Trailing(FOOTER_ROWS)).capture(1, "user_id"),
            MetadataRule::new(REPORT_DATE.clone(), RowWindow::Trailing(FOOTER_ROWS))
                .capture_as(1, "report_date", Converter::Date),
            MetadataRule::new(REPORT_TIME.clone(), RowWindow::Trailing(FOOTER_ROWS)).capture(1, "report_time"),
        ];
        let mut metadata = extract_metadata(grid, &rules, self.metadata_window);

        let anchor = HeaderAnchor::All(vec![(0, "Property"), (1, "Total")]);
        let layout = TableLayout {
            header_height: 2,
            header_end: HeaderEnd::FirstBlank,
            rows: RowRules {
                empty_rows: self.empty_rows,
                footer_markers: FOOTER_MARKERS.to_vec(),
                ..RowRules::default()
            },
            columns: &self.columns,
        };
        let table = anchored_table(grid, self.kind(), &anchor, &layout);
        metadata.insert_integer("property_count", table.len() as i64);
        if !table.is_empty() {
            if let Some(index) = table.find_column(&["total", "charges"]) {
                let column = table.columns()[index].clone();
                metadata.insert_number("total_charges", table.sum(&column));
            }
        }

        Ok(ReportContent { metadata, body: ReportBody::Table(table) })
    }
}
