//! ResAnalytics Box Score Summary: availability, resident activity and conversion ratio sections
use crate::config::ParserConfig;
use crate::error::ReportSheetError;
use crate::layout::coerce::ColumnKind;
use crate::layout::coerce::ColumnRules;
use crate::layout::header::resolve_scored;
use crate::layout::header::HeaderEnd;
use crate::layout::header::HeaderVocabulary;
use crate::layout::metadata::extract_metadata;
use crate::layout::metadata::MetadataRule;
use crate::layout::metadata::RowWindow;
use crate::layout::rows::EmptyRowPolicy;
use crate::layout::rows::RowRules;
use crate::layout::section::SectionGroup;
use crate::layout::section::SectionLocator;
use crate::layout::table::read_table;
use crate::layout::table::TableLayout;
use crate::reports::strip_property_suffix;
use crate::reports::ReportBody;
use crate::reports::ReportContent;
use crate::reports::ReportKind;
use crate::reports::ReportParser;
use crate::reports::Section;
use crate::spreadsheet::CellGrid;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;
use tracing::warn;

pub const AVAILABILITY: &str = "availability";
pub const RESIDENT_ACTIVITY: &str = "resident_activity";
pub const CONVERSION_RATIOS: &str = "conversion_ratios";

static PROPERTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\s*\((\w+)\)").expect("valid property regex"));
static DATE_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Date.*?=.*?([0-9/\-]+.*?[0-9/\-]+)").expect("valid date range regex"));

pub fn identify(filename: &str) -> bool {
    strip_property_suffix(filename, true).starts_with("resanalytics_box")
}

fn column_rules(section: &str) -> ColumnRules {
    match section {
        AVAILABILITY => ColumnRules::new()
            .contains(&["units", "occupied", "vacant"], ColumnKind::Integer)
            .contains(&["sq ft", "rent"], ColumnKind::Decimal),
        RESIDENT_ACTIVITY => ColumnRules::new()
            .contains(&["units", "move", "reverse", "cancel", "notice", "term"], ColumnKind::Integer),
        CONVERSION_RATIOS => ColumnRules::new()
            .contains(&["calls", "walk", "email", "sms", "web", "chat", "contact", "other"], ColumnKind::Integer),
        _ => ColumnRules::new()
            .contains(&["units", "count", "total"], ColumnKind::Integer),
    }
}

/// Parser for box score summaries
pub struct BoxScoreParser {
    header_lookahead: usize,
    metadata_window: usize,
    empty_rows: EmptyRowPolicy,
    locator: SectionLocator,
    vocabulary: HeaderVocabulary,
}

impl BoxScoreParser {
    pub fn new(config: &ParserConfig) -> Self {
        let locator = SectionLocator::new(vec![
            SectionGroup::any(AVAILABILITY, &["availability", "avail"]),
            SectionGroup::any(RESIDENT_ACTIVITY, &["resident", "activity"]),
            SectionGroup::all(CONVERSION_RATIOS, &["conversion", "ratios"]),
        ]).with_overwrite(config.section_overwrite(ReportKind::BoxScore));
        let vocabulary = HeaderVocabulary::new(&[
            "code", "name", "units", "calls", "move", "rent", "contact", "walk", "email", "web", "sms",
        ]).with_label("code", 5);

        Self {
            header_lookahead: config.header_lookahead,
            metadata_window: config.metadata_window,
            empty_rows: config.empty_rows(ReportKind::BoxScore, EmptyRowPolicy::Skip),
            locator,
            vocabulary,
        }
    }

    fn metadata_rules() -> Vec<MetadataRule> {
        vec![
            MetadataRule::new(PROPERTY.clone(), RowWindow::Leading(5))
                .capture(1, "property_name")
                .capture(2, "property_code"),
            MetadataRule::new(DATE_RANGE.clone(), RowWindow::Header)
                .capture(1, "date_range"),
        ]
    }
}

impl ReportParser for BoxScoreParser {
    fn kind(&self) -> ReportKind {
        ReportKind::BoxScore
    }

    fn parse(&self, grid: &CellGrid) -> Result<ReportContent, ReportSheetError> {
        let metadata = extract_metadata(grid, &Self::metadata_rules(), self.metadata_window);

        let mut sections = Vec::new();
        for start in self.locator.locate(grid) {
            let Some(header_row) = resolve_scored(grid, start.row, self.header_lookahead, &self.vocabulary) else {
                warn!(section = start.name, row = start.row, "No header row found for section");
                continue;
            };
            let columns = column_rules(start.name);
            let layout = TableLayout {
                header_height: 1,
                header_end: HeaderEnd::FirstBlank,
                rows: RowRules {
                    empty_rows: self.empty_rows,
                    boundary: Some(&self.locator),
                    ..RowRules::default()
                },
                columns: &columns,
            };
            match read_table(grid, header_row, &layout) {
                Some(read) if !read.table.is_empty() => {
                    debug!(section = start.name, rows = read.table.len(), "Extracted section");
                    sections.push(Section { name: start.name.to_owned(), table: read.table });
                }
                _ => warn!(section = start.name, row = header_row, "Section has no data rows"),
            }
        }

        Ok(ReportContent { metadata, body: ReportBody::Sections(sections) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::coerce::Value;
    use crate::layout::section::SectionOverwrite;

    fn parser() -> BoxScoreParser {
        BoxScoreParser::new(&ParserConfig::default())
    }

    fn sections(content: &ReportContent) -> &[Section] {
        match &content.body {
            ReportBody::Sections(sections) => sections,
            ReportBody::Table(_) => panic!("expected sections"),
        }
    }

    #[test]
    fn identifies_box_score_files() {
        assert!(identify("ResAnalytics_Box_Score_Summary_marbla.xlsx"));
        assert!(identify("ResAnalytics_Box_Score_Summary_55pharr.xlsx"));
        assert!(!identify("ResAnalytics_Unit_Availability_Details_marbla.xlsx"));
    }

    #[test]
    fn twenty_row_sheet_with_availability_section() {
        let head: &[&[&str]] = &[
            &["Box Score Summary", "", ""],
            &["Marbella (marbla)", "", ""],
            &["Date = 07/01/2025-07/31/2025", "", ""],
            &["", "", ""],
            &["Availability", "", ""],
            &["Name", "Units", "Vacant Rented"],
            &["a1", "10", "1"],
            &["b2", "20", "0"],
            &["c3", "30", "2"],
            &["Total", "60", "3"],
        ];
        let mut rows = head.to_vec();
        rows.resize(20, &["", "", ""]);
        let grid = CellGrid::from_text_rows(&rows);
        assert_eq!(grid.height(), 20);

        let content = parser().parse(&grid).unwrap();
        assert_eq!(content.metadata.property_name(), Some("Marbella"));
        assert_eq!(content.metadata.property_code(), Some("marbla"));
        assert_eq!(content.metadata.text("date_range"), Some("07/01/2025-07/31/2025"));

        let sections = sections(&content);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, AVAILABILITY);
        let table = &sections[0].table;
        assert_eq!(table.columns(), ["Name", "Units", "Vacant Rented"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.column_values("Units"), vec![&Value::Int(10), &Value::Int(20), &Value::Int(30)]);
        assert_eq!(table.summary_value("Units"), Some(&Value::Int(60)));
    }

    fn three_sections() -> CellGrid {
        CellGrid::from_text_rows(&[
            &["Marbella (marbla)", "", "", ""],
            &["Availability", "", "", ""],
            &["Code", "Name", "Units", "Market Rent"],
            &["a1", "One Bed", "10", "$1,200.00"],
            &["b2", "Two Bed", "20", "$1,500.00"],
            &["Resident Activity", "", "", ""],
            &["", "", "", ""],
            &["Code", "Move In", "Move Out", "Notice"],
            &["a1", "2", "1", "0"],
            &["b2", "", "3", "1"],
            &["", "", "", ""],
            &["Conversion Ratios", "", "", ""],
            &["Calls", "Walk In", "Email", "Web"],
            &["12", "3", "4", "5"],
        ])
    }

    #[test]
    fn extracts_each_section_up_to_the_next() {
        let content = parser().parse(&three_sections()).unwrap();
        let sections = sections(&content);
        let names: Vec<&str> = sections.iter().map(|section| section.name.as_str()).collect();
        assert_eq!(names, vec![AVAILABILITY, RESIDENT_ACTIVITY, CONVERSION_RATIOS]);

        let availability = &sections[0].table;
        assert_eq!(availability.len(), 2);
        assert_eq!(availability.value(1, "Market Rent"), Some(&Value::Float(1500.0)));

        let activity = &sections[1].table;
        assert_eq!(activity.columns(), ["Code", "Move In", "Move Out", "Notice"]);
        assert_eq!(activity.len(), 2);
        assert_eq!(activity.value(1, "Move In"), Some(&Value::Int(0)));

        let ratios = &sections[2].table;
        assert_eq!(ratios.value(0, "Walk In"), Some(&Value::Int(3)));
    }

    #[test]
    fn break_policy_from_configuration() {
        let config = ParserConfig::from_toml_str("[reports.resanalytics_box_score]\nempty_rows = \"break\"\n").unwrap();
        let grid = CellGrid::from_text_rows(&[
            &["Availability", ""],
            &["Code", "Units"],
            &["a1", "1"],
            &["", ""],
            &["b2", "2"],
        ]);
        let content = BoxScoreParser::new(&config).parse(&grid).unwrap();
        assert_eq!(sections(&content)[0].table.len(), 1);
        let content = parser().parse(&grid).unwrap();
        assert_eq!(sections(&content)[0].table.len(), 2);
    }

    #[test]
    fn repeated_section_keyword_uses_overwrite_policy() {
        let grid = CellGrid::from_text_rows(&[
            &["Availability", ""],
            &["Code", "Units"],
            &["a1", "1"],
            &["b2", "2"],
            &["Availability (continued)", ""],
            &["Code", "Units"],
            &["c3", "3"],
        ]);
        let content = parser().parse(&grid).unwrap();
        assert_eq!(sections(&content)[0].table.value(0, "Code"), Some(&Value::Text("c3".to_owned())));

        let mut config = ParserConfig::default();
        config.reports.insert(ReportKind::BoxScore, crate::config::ReportOverrides {
            section_overwrite: Some(SectionOverwrite::FirstWins),
            ..Default::default()
        });
        let content = BoxScoreParser::new(&config).parse(&grid).unwrap();
        assert_eq!(sections(&content)[0].table.len(), 2);
    }

    #[test]
    fn section_without_header_is_omitted() {
        let grid = CellGrid::from_text_rows(&[
            &["Availability", ""],
            &["1", "2"],
            &["3", "4"],
        ]);
        let content = parser().parse(&grid).unwrap();
        assert!(sections(&content).is_empty());
    }
}
