//! Residents on Notice: residents who gave notice, with notice and move-out dates
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
use crate::layout::metadata::ReportMetadata;
use crate::layout::metadata::RowWindow;
use crate::layout::rows::EmptyRowPolicy;
use crate::layout::rows::RowRules;
use crate::layout::table::ExtractedTable;
use crate::layout::table::TableLayout;
use crate::reports::anchored_table;
use crate::reports::strip_property_suffix;
use crate::reports::ReportBody;
use crate::reports::ReportContent;
use crate::reports::ReportKind;
use crate::reports::ReportParser;
use crate::spreadsheet::CellGrid;
use chrono::Duration;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

static PROPERTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Property=(\w+)").expect("valid property regex"));
static AS_OF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"As of Date=(\d{2}/\d{2}/\d{4})").expect("valid as-of regex"));

const NOTICE_DATE: &str = "Notice Date";
const MOVEOUT_DATE: &str = "Moveout Date";

/// Days ahead counted as an upcoming move-out
const UPCOMING_DAYS: i64 = 30;

pub fn identify(filename: &str) -> bool {
    let base = strip_property_suffix(filename, false);
    base.starts_with("residents_on_notice") || (base.contains("residents") && base.contains("notice"))
}

fn dates(table: &ExtractedTable, column: &str) -> Vec<NaiveDate> {
    table.column_values(column).into_iter().filter_map(|value| value.as_date()).collect()
}

/// Notice and move-out statistics measured from the report date.
fn day_statistics(table: &ExtractedTable, as_of: NaiveDate, metadata: &mut ReportMetadata) {
    if table.column_index(NOTICE_DATE).is_some() {
        let days: Vec<i64> = dates(table, NOTICE_DATE).iter()
            .map(|notice| (as_of - *notice).num_days())
            .collect();
        let (average, max) = match days.iter().max() {
            Some(max) => (days.iter().sum::<i64>() / days.len() as i64, *max),
            None => (0, 0),
        };
        metadata.insert_integer("avg_days_on_notice", average);
        metadata.insert_integer("max_days_on_notice", max);
    }

    if table.column_index(MOVEOUT_DATE).is_some() {
        let moveouts = dates(table, MOVEOUT_DATE);
        let horizon = as_of + Duration::days(UPCOMING_DAYS);
        let upcoming = moveouts.iter().filter(|date| **date >= as_of && **date <= horizon).count();
        let overdue = moveouts.iter().filter(|date| **date < as_of).count();
        metadata.insert_integer("moveouts_next_30_days", upcoming as i64);
        metadata.insert_integer("overdue_moveouts", overdue as i64);
    }
}

pub struct ResidentsOnNoticeParser {
    metadata_window: usize,
    empty_rows: EmptyRowPolicy,
    columns: ColumnRules,
}

impl ResidentsOnNoticeParser {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            metadata_window: config.metadata_window,
            empty_rows: config.empty_rows(ReportKind::ResidentsOnNotice, EmptyRowPolicy::Skip),
            columns: ColumnRules::new().exact(&[NOTICE_DATE, MOVEOUT_DATE], ColumnKind::Date),
        }
    }
}

impl ReportParser for ResidentsOnNoticeParser {
    fn kind(&self) -> ReportKind {
        ReportKind::ResidentsOnNotice
    }

    fn parse(&self, grid: &CellGrid) -> Result<ReportContent, ReportSheetError> {
        let rules = [
            MetadataRule::new(PROPERTY.clone(), RowWindow::Row(1)).capture(1, "property_code"),
            MetadataRule::new(AS_OF.clone(), RowWindow::Row(1))
                .capture_as(1, "as_of_date", Converter::Date),
        ];
        let mut metadata = extract_metadata(grid, &rules, self.metadata_window);

        let anchor = HeaderAnchor::Labels(vec!["Property", "Unit", "Resident", NOTICE_DATE]);
        let layout = TableLayout {
            header_height: 1,
            header_end: HeaderEnd::TrailingBlanks,
            rows: RowRules { empty_rows: self.empty_rows, ..RowRules::default() },
            columns: &self.columns,
        };
        let table = anchored_table(grid, self.kind(), &anchor, &layout);

        if !table.is_empty() {
            metadata.insert_integer("total_residents", table.len() as i64);
            if table.column_index("Status").is_some() {
                let statuses: Vec<String> = table.column_values("Status").iter()
                    .filter(|value| !value.is_null())
                    .map(|value| value.to_string())
                    .collect();
                let count = |status: &str| statuses.iter().filter(|value| *value == status).count() as i64;
                metadata.insert_integer("notice_count", count("Notice"));
                metadata.insert_integer("eviction_count", count("Eviction"));
                metadata.insert("status_breakdown", value_counts(statuses));
            }
            if let Some(as_of) = metadata.as_of_date() {
                day_statistics(&table, as_of, &mut metadata);
            }
        }

        Ok(ReportContent { metadata, body: ReportBody::Table(table) })
    }
}
