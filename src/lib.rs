//! # Property Report Parser
//!
//! Reads the weekly Excel reports exported by property-management systems
//! (box scores, unit availability, work orders, delinquency, ...) and turns
//! their loosely laid-out sheets into typed tables and report metadata.
//!
//! ## Features
//!
//! - **Native xlsx reading**: workbooks are opened from a path or from bytes and
//!   one sheet becomes a dense [`spreadsheet::CellGrid`]
//! - **Layout heuristics**: metadata regexes over the leading rows, keyword
//!   section locators, scored or anchored header rows, multi-row header merging
//!   and report-specific row termination
//! - **Typed columns**: currency, parenthesised negatives, percentages and dates
//!   are coerced per column
//! - **Dispatch by filename**: an explicit registration table picks the parser;
//!   unknown files and parser failures are values, not errors
//! - **Batch processing**: a whole directory is parsed with per-file isolation
//! - **KPIs**: occupancy, projected occupancy, collections rate and net to rent
//!
//! ## Example
//!
//! ```no_run
//! use property_sheet::config::ParserConfig;
//! use property_sheet::dispatch::Dispatcher;
//!
//! let dispatcher = Dispatcher::standard(&ParserConfig::default());
//! let batch = dispatcher.parse_directory("reports/2025-08-04", Some("marbla"))?;
//! println!("{} of {} files parsed", batch.summary.files_successfully_parsed, batch.summary.total_files_found);
//! # Ok::<(), property_sheet::error::ReportSheetError>(())
//! ```
pub mod config;
pub mod dispatch;
pub mod error;
pub mod kpi;
pub mod layout;
pub mod reports;
pub mod spreadsheet;

pub(crate) mod helpers;

pub use config::ParserConfig;
pub use dispatch::DispatchOutcome;
pub use dispatch::Dispatcher;
pub use error::ReportSheetError;
pub use reports::ParsedReport;
pub use reports::ReportKind;
