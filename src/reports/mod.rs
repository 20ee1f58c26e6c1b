//! Report parsers, one module per property-management report
//!
//! Every parser turns the [`CellGrid`] of a report's first sheet into
//! [`ReportContent`]: metadata from the leading rows and either one table or
//! a list of named section tables.
pub mod box_score;
pub mod budget_comparison;
pub mod delinquency;
pub mod lease_expiration;
pub mod market_rent;
pub mod pending_make_ready;
pub mod projected_occupancy;
pub mod residents_on_notice;
pub mod unit_availability;
pub mod work_order;

use crate::error::ReportSheetError;
use crate::layout::header::HeaderAnchor;
use crate::layout::metadata::ReportMetadata;
use crate::layout::table::read_table;
use crate::layout::table::ExtractedTable;
use crate::layout::table::TableLayout;
use crate::spreadsheet::CellGrid;
use crate::spreadsheet::SheetSelector;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::fmt::Formatter;
use std::sync::LazyLock;
use tracing::warn;

static PROPERTY_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_[a-z]+\.xlsx$").expect("valid property suffix regex"));
static PROPERTY_CODE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_[a-z0-9]+\.xlsx$").expect("valid property code suffix regex"));

/// The report families the dispatcher recognises
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum ReportKind {
    #[serde(rename = "resanalytics_box_score")]
    BoxScore,
    #[serde(rename = "work_order_report")]
    WorkOrder,
    #[serde(rename = "resanalytics_unit_availability")]
    UnitAvailability,
    #[serde(rename = "resanalytics_market_rent")]
    MarketRent,
    #[serde(rename = "resanalytic_lease_expiration")]
    LeaseExpiration,
    #[serde(rename = "budget_comparison")]
    BudgetComparison,
    #[serde(rename = "pending_make_ready")]
    PendingMakeReady,
    #[serde(rename = "resaranalytics_delinquency")]
    Delinquency,
    #[serde(rename = "residents_on_notice")]
    ResidentsOnNotice,
    #[serde(rename = "projected_occupancy")]
    ProjectedOccupancy,
}

impl ReportKind {
    /// All kinds in dispatch order
    pub const ALL: [ReportKind; 10] = [
        ReportKind::BoxScore,
        ReportKind::WorkOrder,
        ReportKind::UnitAvailability,
        ReportKind::MarketRent,
        ReportKind::LeaseExpiration,
        ReportKind::BudgetComparison,
        ReportKind::PendingMakeReady,
        ReportKind::Delinquency,
        ReportKind::ResidentsOnNotice,
        ReportKind::ProjectedOccupancy,
    ];

    /// Parser type name used in serialized output and configuration keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::BoxScore => "resanalytics_box_score",
            ReportKind::WorkOrder => "work_order_report",
            ReportKind::UnitAvailability => "resanalytics_unit_availability",
            ReportKind::MarketRent => "resanalytics_market_rent",
            ReportKind::LeaseExpiration => "resanalytic_lease_expiration",
            ReportKind::BudgetComparison => "budget_comparison",
            ReportKind::PendingMakeReady => "pending_make_ready",
            ReportKind::Delinquency => "resaranalytics_delinquency",
            ReportKind::ResidentsOnNotice => "residents_on_notice",
            ReportKind::ProjectedOccupancy => "projected_occupancy",
        }
    }

    /// Filename pattern reported to callers.
    pub fn pattern(&self) -> &'static str {
        match self {
            ReportKind::BoxScore => "resanalytics_box",
            ReportKind::WorkOrder => "work_order",
            ReportKind::UnitAvailability => "resanalytics_unit",
            ReportKind::MarketRent => "resanalytics_market",
            ReportKind::LeaseExpiration => "resanalytic_lease",
            ReportKind::BudgetComparison => "budget_comparison",
            ReportKind::PendingMakeReady => "pending_make",
            ReportKind::Delinquency => "resaranalytics_delinquency",
            ReportKind::ResidentsOnNotice => "residents_on_notice",
            ReportKind::ProjectedOccupancy => "projected_occupancy",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ReportKind::BoxScore => "ResAnalytics Box Score Summary",
            ReportKind::WorkOrder => "Work Order Report",
            ReportKind::UnitAvailability => "ResAnalytics Unit Availability Details",
            ReportKind::MarketRent => "ResAnalytics Market Rent Schedule",
            ReportKind::LeaseExpiration => "ResAnalytic Lease Expiration",
            ReportKind::BudgetComparison => "Budget Comparison",
            ReportKind::PendingMakeReady => "Pending Make Ready Unit Details",
            ReportKind::Delinquency => "ResARAnalytics Delinquency Summary",
            ReportKind::ResidentsOnNotice => "Residents on Notice Report",
            ReportKind::ProjectedOccupancy => "Projected Occupancy",
        }
    }
}

impl Display for ReportKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named table of a multi-section report
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Section {
    pub name: String,
    pub table: ExtractedTable,
}

/// The tabular part of a report
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportBody {
    /// Named sections in sheet order; absent sections are omitted
    Sections(Vec<Section>),
    Table(ExtractedTable),
}

/// What a parser extracts from one grid
#[derive(Clone, Debug, PartialEq)]
pub struct ReportContent {
    pub metadata: ReportMetadata,
    pub body: ReportBody,
}

/// A parsed report file
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParsedReport {
    #[serde(rename = "parser_type")]
    kind: ReportKind,
    source_path: String,
    metadata: ReportMetadata,
    #[serde(flatten)]
    body: ReportBody,
}

impl ParsedReport {
    pub fn new(kind: ReportKind, source_path: impl Into<String>, content: ReportContent) -> Self {
        Self {
            kind,
            source_path: source_path.into(),
            metadata: content.metadata,
            body: content.body,
        }
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    pub fn metadata(&self) -> &ReportMetadata {
        &self.metadata
    }

    pub fn body(&self) -> &ReportBody {
        &self.body
    }

    /// Section tables, empty for single-table reports.
    pub fn sections(&self) -> &[Section] {
        match &self.body {
            ReportBody::Sections(sections) => sections,
            ReportBody::Table(_) => &[],
        }
    }

    pub fn section(&self, name: &str) -> Option<&ExtractedTable> {
        self.sections().iter()
            .find(|section| section.name == name)
            .map(|section| &section.table)
    }

    /// The table of a single-table report.
    pub fn table(&self) -> Option<&ExtractedTable> {
        match &self.body {
            ReportBody::Table(table) => Some(table),
            ReportBody::Sections(_) => None,
        }
    }
}

/// A report-specific parser
pub trait ReportParser {
    fn kind(&self) -> ReportKind;

    /// Sheet holding the report; the first one unless overridden.
    fn sheet(&self) -> SheetSelector {
        SheetSelector::default()
    }

    /// Extracts metadata and tables from the sheet
    ///
    /// # Arguments
    /// * `grid` - The raw sheet
    ///
    /// # Returns
    /// Absent sections and headers are omitted from the content, not errors
    fn parse(&self, grid: &CellGrid) -> Result<ReportContent, ReportSheetError>;
}

/// Lower-cased filename without its `_<property>.xlsx` suffix.
///
/// # Arguments
/// * `filename` - Bare file name
/// * `allow_digits` - Whether the property code may contain digits
pub(crate) fn strip_property_suffix(filename: &str, allow_digits: bool) -> String {
    let lower = filename.to_lowercase();
    let suffix = if allow_digits { &PROPERTY_CODE_SUFFIX } else { &PROPERTY_SUFFIX };
    suffix.replace(&lower, "").into_owned()
}

/// Reads the single table hanging off the first row matching `anchor`.
///
/// A missing header yields an empty table; the caller still reports metadata.
pub(crate) fn anchored_table(grid: &CellGrid, kind: ReportKind, anchor: &HeaderAnchor, layout: &TableLayout) -> ExtractedTable {
    let table = anchor.find(grid, 0).and_then(|row| read_table(grid, row, layout));
    match table {
        Some(read) => read.table,
        None => {
            warn!(report = %kind, sheet = grid.name(), "Header row not found");
            ExtractedTable::default()
        }
    }
}
