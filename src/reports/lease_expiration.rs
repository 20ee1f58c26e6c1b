//! ResAnalytic Lease Expiration: expiring units and month-to-month leases per property
use crate::config::ParserConfig;
use crate::error::ReportSheetError;
use crate::layout::coerce::ColumnKind;
use crate::layout::coerce::ColumnRules;
use crate::layout::header::HeaderAnchor;
use crate::layout::header::HeaderEnd;
use crate::layout::metadata::extract_metadata;
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
static MONTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Month Year = (.+)").expect("valid month-year regex"));

pub fn identify(filename: &str) -> bool {
    strip_property_suffix(filename, false).starts_with("resanalytic_lease")
}

pub struct LeaseExpirationParser {
    metadata_window: usize,
    empty_rows: EmptyRowPolicy,
    columns: ColumnRules,
}

impl LeaseExpirationParser {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            metadata_window: config.metadata_window,
            empty_rows: config.empty_rows(ReportKind::LeaseExpiration, EmptyRowPolicy::Skip),
            columns: ColumnRules::new().exact(&["Units", "MTM"], ColumnKind::Integer),
        }
    }
}

impl ReportParser for LeaseExpirationParser {
    fn kind(&self) -> ReportKind {
        ReportKind::LeaseExpiration
    }

    fn parse(&self, grid: &CellGrid) -> Result<ReportContent, ReportSheetError> {
        let rules = [
            MetadataRule::new(PROPERTY.clone(), RowWindow::Row(1))
                .capture(1, "property_name")
                .capture(2, "property_code"),
            MetadataRule::new(MONTH_YEAR.clone(), RowWindow::Row(2))
                .capture(1, "month_year"),
        ];
        let mut metadata = extract_metadata(grid, &rules, self.metadata_window);

        let anchor = HeaderAnchor::All(vec![(0, "Property"), (1, "Address")]);
        let layout = TableLayout {
            header_height: 1,
            header_end: HeaderEnd::TrailingBlanks,
            rows: RowRules { empty_rows: self.empty_rows, ..RowRules::default() },
            columns: &self.columns,
        };
        let table = anchored_table(grid, self.kind(), &anchor, &layout);
        metadata.insert_integer("total_properties", table.len() as i64);
        if !table.is_empty() && table.column_index("Units").is_some() {
            metadata.insert_integer("total_units", table.sum("Units") as i64);
            if table.column_index("MTM").is_some() {
                metadata.insert_integer("total_mtm", table.sum("MTM") as i64);
            }
        }

        Ok(ReportContent { metadata, body: ReportBody::Table(table) })
    }
}
