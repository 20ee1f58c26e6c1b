//! Work Order Report: one table of work orders under a `WO#` header
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
    LazyLock::new(|| Regex::new(r"Property=(\w+)").expect("valid property regex"));
static STATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Status='((?:[^']|',')+)'").expect("valid status regex"));

pub fn identify(filename: &str) -> bool {
    strip_property_suffix(filename, true).starts_with("work_order")
}

pub struct WorkOrderParser {
    metadata_window: usize,
    empty_rows: EmptyRowPolicy,
    columns: ColumnRules,
}

impl WorkOrderParser {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            metadata_window: config.metadata_window,
            empty_rows: config.empty_rows(ReportKind::WorkOrder, EmptyRowPolicy::Skip),
            columns: ColumnRules::new()
                .exact(&["WO#"], ColumnKind::Integer)
                .exact(&["Caller Phone"], ColumnKind::Digits),
        }
    }
}

impl ReportParser for WorkOrderParser {
    fn kind(&self) -> ReportKind {
        ReportKind::WorkOrder
    }

    fn parse(&self, grid: &CellGrid) -> Result<ReportContent, ReportSheetError> {
        let rules = [
            MetadataRule::new(PROPERTY.clone(), RowWindow::Rows(0..3))
                .capture(1, "property_code"),
            MetadataRule::new(STATUS.clone(), RowWindow::Rows(0..3))
                .capture_as(1, "status_filters", Converter::List("','")),
        ];
        let mut metadata = extract_metadata(grid, &rules, self.metadata_window);

        let anchor = HeaderAnchor::Any(vec![(0, "WO#"), (1, "Brief Desc")]);
        let layout = TableLayout {
            header_height: 1,
            header_end: HeaderEnd::TrailingBlanks,
            rows: RowRules { empty_rows: self.empty_rows, ..RowRules::default() },
            columns: &self.columns,
        };
        let table = anchored_table(grid, self.kind(), &anchor, &layout);
        metadata.insert_integer("work_order_count", table.len() as i64);

        Ok(ReportContent { metadata, body: ReportBody::Table(table) })
    }
}
