//! Filename-driven dispatch of report files to their parsers
//!
//! The [`Dispatcher`] holds an explicit, ordered registration table. The first
//! registration whose predicate accepts a filename parses the file. Unknown
//! files and parser failures come back as [`DispatchOutcome`] values so a
//! directory batch keeps going past them; only unreadable files are errors.
use crate::config::ParserConfig;
use crate::error::ReportSheetError;
use crate::reports::box_score;
use crate::reports::budget_comparison;
use crate::reports::delinquency;
use crate::reports::lease_expiration;
use crate::reports::market_rent;
use crate::reports::pending_make_ready;
use crate::reports::projected_occupancy;
use crate::reports::residents_on_notice;
use crate::reports::unit_availability;
use crate::reports::work_order;
use crate::reports::ParsedReport;
use crate::reports::ReportKind;
use crate::reports::ReportParser;
use crate::spreadsheet::load_grid;
use crate::spreadsheet::load_grid_from_bytes;
use crate::spreadsheet::CellGrid;
use glob::Pattern;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;
use tracing::info;
use tracing::warn;

static BUDGET_PROPERTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Budget_Comparison.*?_([^_]+)_.*\.xlsx$").expect("valid budget filename regex"));
static XLSX_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.xlsx$").expect("valid extension regex"));

/// Copy markers appended by browsers and file managers to re-downloaded reports
const COPY_SUFFIXES: [&str; 4] = ["_1", "_2", " (1)", " (2)"];

/// One entry of the dispatch table
pub struct Registration {
    pub kind: ReportKind,
    /// Accepts the bare file name
    pub predicate: fn(&str) -> bool,
    pub parser: Box<dyn ReportParser>,
}

impl Registration {
    pub fn new(predicate: fn(&str) -> bool, parser: impl ReportParser + 'static) -> Self {
        Self {
            kind: parser.kind(),
            predicate,
            parser: Box::new(parser),
        }
    }
}

/// Result of dispatching one file
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Parsed(ParsedReport),
    /// No registration accepted the filename
    Unknown {
        filename: String,
        supported: Vec<&'static str>,
    },
    /// The chosen parser rejected the sheet
    Failed {
        filename: String,
        pattern: &'static str,
        message: String,
    },
}

impl DispatchOutcome {
    pub fn parsed(&self) -> Option<&ParsedReport> {
        match self {
            DispatchOutcome::Parsed(report) => Some(report),
            _ => None,
        }
    }

    /// Error text for unknown and failed files.
    pub fn error_message(&self) -> Option<String> {
        match self {
            DispatchOutcome::Parsed(_) => None,
            DispatchOutcome::Unknown { filename, .. } => Some(format!("Unknown file type for: {}", filename)),
            DispatchOutcome::Failed { filename, message, .. } => Some(format!("Error parsing {}: {}", filename, message)),
        }
    }
}

/// What the filename alone says about a report
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FileAnalysis {
    pub filename: String,
    pub kind: Option<ReportKind>,
    pub property_code: Option<String>,
    /// Display name from the configured property table
    pub property_name: Option<String>,
    pub message: Option<String>,
}

impl FileAnalysis {
    pub fn is_valid(&self) -> bool {
        self.kind.is_some() && self.property_code.is_some()
    }
}

/// A file the batch could not turn into a report
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchError {
    pub filename: String,
    pub error: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total_files_found: usize,
    pub files_successfully_parsed: usize,
    pub files_with_errors: usize,
    /// Parsed files per report pattern
    pub file_types_found: BTreeMap<&'static str, usize>,
}

/// Outcome of parsing every report in a directory
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub directory: String,
    pub property_filter: Option<String>,
    /// Parsed reports keyed by file name
    pub parsed: BTreeMap<String, ParsedReport>,
    pub errors: Vec<BatchError>,
    pub summary: BatchSummary,
}

/// Routes report files to the parser registered for their filename
pub struct Dispatcher {
    registrations: Vec<Registration>,
    config: ParserConfig,
}

impl Dispatcher {
    /// Creates a dispatcher over `registrations`, tried in order
    pub fn new(registrations: Vec<Registration>) -> Self {
        Self {
            registrations,
            config: ParserConfig::default(),
        }
    }

    /// The registration table for every supported report
    ///
    /// # Arguments
    /// * `config` - Parser settings and the property code table
    pub fn standard(config: &ParserConfig) -> Self {
        let registrations = vec![
            Registration::new(box_score::identify, box_score::BoxScoreParser::new(config)),
            Registration::new(work_order::identify, work_order::WorkOrderParser::new(config)),
            Registration::new(unit_availability::identify, unit_availability::UnitAvailabilityParser::new(config)),
            Registration::new(market_rent::identify, market_rent::MarketRentParser::new(config)),
            Registration::new(lease_expiration::identify, lease_expiration::LeaseExpirationParser::new(config)),
            Registration::new(budget_comparison::identify, budget_comparison::BudgetComparisonParser::new(config)),
            Registration::new(pending_make_ready::identify, pending_make_ready::PendingMakeReadyParser::new(config)),
            Registration::new(delinquency::identify, delinquency::DelinquencyParser::new(config)),
            Registration::new(residents_on_notice::identify, residents_on_notice::ResidentsOnNoticeParser::new(config)),
            Registration::new(projected_occupancy::identify, projected_occupancy::ProjectedOccupancyParser::new(config)),
        ];
        Self {
            registrations,
            config: config.clone(),
        }
    }

    fn registration(&self, filename: &str) -> Option<&Registration> {
        self.registrations.iter().find(|registration| (registration.predicate)(filename))
    }

    /// Report kind of the first registration accepting `filename`
    pub fn identify(&self, filename: &str) -> Option<ReportKind> {
        self.registration(filename).map(|registration| registration.kind)
    }

    /// Filename patterns in dispatch order
    pub fn supported_patterns(&self) -> Vec<&'static str> {
        self.registrations.iter().map(|registration| registration.kind.pattern()).collect()
    }

    /// Reads the report kind and property code from a file name
    ///
    /// # Arguments
    /// * `filename` - Bare file name, e.g. `Work_Order_Report_marbla.xlsx`
    ///
    /// # Returns
    /// * `FileAnalysis` - with `message` set when the name is not recognised
    pub fn analyze_filename(&self, filename: &str) -> FileAnalysis {
        let filename = filename.trim();
        let kind = self.identify(filename);
        let property_code = kind.and_then(|kind| property_code(kind, filename));
        let property_name = property_code.as_deref()
            .and_then(|code| self.config.property_name(code))
            .map(str::to_owned);
        let message = match (&kind, &property_code) {
            (Some(_), Some(_)) => None,
            (Some(kind), None) => Some(format!("No property code in {} file name: {}", kind, filename)),
            (None, _) if !XLSX_EXTENSION.is_match(filename) => {
                Some(format!("Filename pattern not recognized: {} (file should have .xlsx extension)", filename))
            }
            (None, _) => Some(format!("Filename pattern not recognized: {}", filename)),
        };
        FileAnalysis {
            filename: filename.to_owned(),
            kind,
            property_code,
            property_name,
            message,
        }
    }

    fn outcome(&self, registration: &Registration, filename: &str, source_path: &str, grid: &CellGrid) -> DispatchOutcome {
        debug!(filename, report = %registration.kind, "Dispatching");
        match registration.parser.parse(grid) {
            Ok(content) => DispatchOutcome::Parsed(ParsedReport::new(registration.kind, source_path, content)),
            Err(error) => {
                warn!(filename, report = %registration.kind, %error, "Parser failed");
                DispatchOutcome::Failed {
                    filename: filename.to_owned(),
                    pattern: registration.kind.pattern(),
                    message: error.to_string(),
                }
            }
        }
    }

    fn unknown(&self, filename: &str) -> DispatchOutcome {
        warn!(filename, "Unknown file type");
        DispatchOutcome::Unknown {
            filename: filename.to_owned(),
            supported: self.supported_patterns(),
        }
    }

    /// Parses one report file from disk
    ///
    /// # Arguments
    /// * `path` - Location of the `.xlsx` report
    ///
    /// # Returns
    /// * `Result<DispatchOutcome, ReportSheetError>` - `FileRead` when the path is
    ///   missing or the workbook cannot be opened; every other outcome is a value
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<DispatchOutcome, ReportSheetError> {
        let path = path.as_ref();
        let source_path = path.to_string_lossy().to_string();
        if !path.is_file() {
            let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
            return Err(ReportSheetError::file_read(&source_path, missing.into()));
        }
        let filename = file_name(path);
        let Some(registration) = self.registration(&filename) else {
            return Ok(self.unknown(&filename));
        };
        let grid = load_grid(path, &registration.parser.sheet())?;
        Ok(self.outcome(registration, &filename, &source_path, &grid))
    }

    /// Parses a report fetched by the caller, e.g. from object storage
    pub fn parse_bytes(&self, filename: &str, bytes: Vec<u8>) -> Result<DispatchOutcome, ReportSheetError> {
        let Some(registration) = self.registration(filename) else {
            return Ok(self.unknown(filename));
        };
        let grid = load_grid_from_bytes(filename, bytes, &registration.parser.sheet())?;
        Ok(self.outcome(registration, filename, filename, &grid))
    }

    /// Parses every `.xlsx` report in a directory
    ///
    /// # Arguments
    /// * `dir` - Directory holding the reports (not searched recursively)
    /// * `property_filter` - Only files whose name contains this text
    ///
    /// # Returns
    /// * `Result<BatchReport, ReportSheetError>` - `FileRead` only when the directory
    ///   itself is missing; per-file problems are collected in `errors`
    pub fn parse_directory(&self, dir: impl AsRef<Path>, property_filter: Option<&str>) -> Result<BatchReport, ReportSheetError> {
        let dir = dir.as_ref();
        let directory = dir.to_string_lossy().to_string();
        if !dir.is_dir() {
            let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "directory not found");
            return Err(ReportSheetError::file_read(&directory, missing.into()));
        }

        let pattern = format!("{}/*.xlsx", Pattern::escape(&directory));
        let mut files = glob::glob(&pattern)?
            .collect::<Result<Vec<_>, _>>()?;
        files.retain(|path| {
            let name = file_name(path);
            !name.starts_with("~$") && property_filter.map_or(true, |filter| name.contains(filter))
        });
        files.sort();

        let mut batch = BatchReport {
            directory,
            property_filter: property_filter.map(str::to_owned),
            ..BatchReport::default()
        };
        for path in &files {
            let filename = file_name(path);
            let outcome = self.parse_file(path);
            match outcome {
                Ok(DispatchOutcome::Parsed(report)) => {
                    *batch.summary.file_types_found.entry(report.kind().pattern()).or_default() += 1;
                    batch.parsed.insert(filename, report);
                }
                Ok(outcome) => {
                    let error = outcome.error_message().unwrap_or_default();
                    batch.errors.push(BatchError { filename, error });
                }
                Err(error) => {
                    warn!(filename, %error, "Skipping unreadable file");
                    batch.errors.push(BatchError { filename, error: error.to_string() });
                }
            }
        }

        batch.summary.total_files_found = files.len();
        batch.summary.files_successfully_parsed = batch.parsed.len();
        batch.summary.files_with_errors = batch.errors.len();
        info!(
            directory = %batch.directory,
            found = batch.summary.total_files_found,
            parsed = batch.summary.files_successfully_parsed,
            errors = batch.summary.files_with_errors,
            "Batch finished"
        );
        Ok(batch)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Property code carried by the file name: the segment before `.xlsx`, or for
/// budget comparisons the segment before the accounting-basis suffix.
fn property_code(kind: ReportKind, filename: &str) -> Option<String> {
    if kind == ReportKind::BudgetComparison {
        if let Some(captures) = BUDGET_PROPERTY.captures(filename) {
            return Some(captures[1].to_lowercase());
        }
    }
    let stem = XLSX_EXTENSION.replace(filename, "").to_lowercase();
    let mut stem = stem.as_str();
    for suffix in COPY_SUFFIXES {
        stem = stem.strip_suffix(suffix).unwrap_or(stem);
    }
    let (_, code) = stem.rsplit_once('_')?;
    let code = code.trim();
    (!code.is_empty()).then(|| code.to_owned())
}
