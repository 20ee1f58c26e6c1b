//! Parser configuration loaded from TOML
use crate::error::ReportSheetError;
use crate::layout::EmptyRowPolicy;
use crate::layout::SectionOverwrite;
use crate::reports::ReportKind;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Rows after a section start searched for its header
pub const DEFAULT_HEADER_LOOKAHEAD: usize = 4;

/// Leading rows scanned by metadata rules that use the header window
pub const DEFAULT_METADATA_WINDOW: usize = 10;

fn default_header_lookahead() -> usize {
    DEFAULT_HEADER_LOOKAHEAD
}

fn default_metadata_window() -> usize {
    DEFAULT_METADATA_WINDOW
}

/// Per-report-kind layout overrides
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReportOverrides {
    pub empty_rows: Option<EmptyRowPolicy>,
    pub section_overwrite: Option<SectionOverwrite>,
}

/// Knobs shared by all report parsers
///
/// Every field has a default, so an empty document is a valid configuration:
///
/// ```toml
/// header_lookahead = 4
/// metadata_window = 10
///
/// [reports.resanalytics_box_score]
/// empty_rows = "break"
/// section_overwrite = "first"
///
/// [properties]
/// marbla = "Marbella"
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ParserConfig {
    #[serde(default = "default_header_lookahead")]
    pub header_lookahead: usize,
    #[serde(default = "default_metadata_window")]
    pub metadata_window: usize,
    #[serde(default)]
    pub reports: BTreeMap<ReportKind, ReportOverrides>,
    /// Display names by property code
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            header_lookahead: DEFAULT_HEADER_LOOKAHEAD,
            metadata_window: DEFAULT_METADATA_WINDOW,
            reports: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }
}

impl ParserConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ReportSheetError> {
        Ok(toml::from_str(content)?)
    }

    /// Reads a configuration file
    ///
    /// # Arguments
    /// * `path` - Location of the TOML document
    ///
    /// # Returns
    /// The configuration; a missing file is an I/O error, a malformed one a config error
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReportSheetError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// The empty-row policy for `kind`, or `default` when not overridden.
    pub fn empty_rows(&self, kind: ReportKind, default: EmptyRowPolicy) -> EmptyRowPolicy {
        self.reports.get(&kind)
            .and_then(|overrides| overrides.empty_rows)
            .unwrap_or(default)
    }

    pub fn section_overwrite(&self, kind: ReportKind) -> SectionOverwrite {
        self.reports.get(&kind)
            .and_then(|overrides| overrides.section_overwrite)
            .unwrap_or_default()
    }

    /// Configured display name for a property code, ignoring case.
    pub fn property_name(&self, code: &str) -> Option<&str> {
        self.properties.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(code))
            .map(|(_, name)| name.as_str())
    }
}
