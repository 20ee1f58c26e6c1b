//! Budget Comparison: account lines with month-to-date and year-to-date actuals against budget
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
static REPORT_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.+)").expect("valid report type regex"));
static PERIOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Period = (.+)").expect("valid period regex"));
static BOOK_TREE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Book = ([^;]+);(?:\s*Tree = (.+))?").expect("valid book regex"));
static PARENTHESISED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("valid parenthesis regex"));
static CARET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^[^_]*").expect("valid caret regex"));

/// Budget files carry accounting-basis decorations such as `(Accrual)` or `^Cash`.
pub fn identify(filename: &str) -> bool {
    let base = strip_property_suffix(filename, false);
    let base = PARENTHESISED.replace_all(&base, "");
    let base = CARET.replace_all(&base, "");
    base.trim().starts_with("budget_comparison")
}

pub struct BudgetComparisonParser {
    metadata_window: usize,
    empty_rows: EmptyRowPolicy,
    columns: ColumnRules,
}

impl BudgetComparisonParser {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            metadata_window: config.metadata_window,
            empty_rows: config.empty_rows(ReportKind::BudgetComparison, EmptyRowPolicy::Skip),
            columns: ColumnRules::new()
                .contains(&["actual", "budget", "variance", "ytd"], ColumnKind::Decimal),
        }
    }
}

impl ReportParser for BudgetComparisonParser {
    fn kind(&self) -> ReportKind {
        ReportKind::BudgetComparison
    }

    fn parse(&self, grid: &CellGrid) -> Result<ReportContent, ReportSheetError> {
        let rules = [
            MetadataRule::new(PROPERTY.clone(), RowWindow::Row(0))
                .capture(1, "property_name")
                .capture(2, "property_code"),
            MetadataRule::new(REPORT_TYPE.clone(), RowWindow::Row(1))
                .capture(1, "report_type"),
            MetadataRule::new(PERIOD.clone(), RowWindow::Row(2))
                .capture(1, "period"),
            MetadataRule::new(BOOK_TREE.clone(), RowWindow::Row(3))
                .capture_as(1, "books", Converter::List(","))
                .capture(2, "tree"),
        ];
        let mut metadata = extract_metadata(grid, &rules, self.metadata_window);

        let anchor = HeaderAnchor::Any(vec![(2, "MTD Actual"), (3, "MTD Budget")]);
        let layout = TableLayout {
            header_height: 1,
            header_end: HeaderEnd::TrailingBlanks,
            rows: RowRules {
                empty_rows: self.empty_rows,
                keep_totals: true,
                ..RowRules::default()
            },
            columns: &self.columns,
        };
        let table = anchored_table(grid, self.kind(), &anchor, &layout);
        metadata.insert_integer("budget_line_items", table.len() as i64);

        Ok(ReportContent { metadata, body: ReportBody::Table(table) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::coerce::Value;

    #[test]
    fn identifies_decorated_budget_files() {
        assert!(identify("Budget_Comparison_marbla.xlsx"));
        assert!(identify("Budget_Comparison(Accrual)_marbla.xlsx"));
        assert!(identify("Budget_Comparison_^Cash_marbla.xlsx"));
        assert!(!identify("Work_Order_Report_marbla.xlsx"));
    }

    #[test]
    fn parses_statement_with_subtotals() {
        let grid = CellGrid::from_text_rows(&[
            &["Marbella (marbla)", "", "", "", ""],
            &["Budget Comparison", "", "", "", ""],
            &["Period = Jul 2025", "", "", "", ""],
            &["Book = Accrual, Budget; Tree = ysi_is", "", "", "", ""],
            &["", "", "MTD Actual", "MTD Budget", "Variance"],
            &["4000", "Rent Income", "$10,000.00", "9,500.00", "500.00"],
            &["4100", "Vacancy Loss", "(1,000.00)", "-", "(1,000.00)"],
            &["", "Total Income", "9,000.00", "9,500.00", "(500.00)"],
            &["", "", "", "", ""],
            &["5000", "Repairs", "n/a", "200", ""],
        ]);
        let content = BudgetComparisonParser::new(&ParserConfig::default()).parse(&grid).unwrap();
        let metadata = &content.metadata;
        assert_eq!(metadata.property_code(), Some("marbla"));
        assert_eq!(metadata.text("report_type"), Some("Budget Comparison"));
        assert_eq!(metadata.text("period"), Some("Jul 2025"));
        assert_eq!(metadata.list("books"), Some(&["Accrual".to_owned(), "Budget".to_owned()][..]));
        assert_eq!(metadata.text("tree"), Some("ysi_is"));
        assert_eq!(metadata.integer("budget_line_items"), Some(4));

        let ReportBody::Table(table) = content.body else { panic!("expected a table") };
        assert_eq!(table.columns(), ["Column_0", "Column_1", "MTD Actual", "MTD Budget", "Variance"]);
        assert_eq!(table.value(0, "MTD Actual"), Some(&Value::Float(10000.0)));
        assert_eq!(table.value(1, "MTD Actual"), Some(&Value::Float(-1000.0)));
        assert_eq!(table.value(1, "MTD Budget"), Some(&Value::Float(0.0)));
        assert_eq!(table.value(3, "MTD Actual"), Some(&Value::Null));
    }
}
