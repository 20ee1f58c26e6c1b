//! Report metadata found by pattern-matching the rows around a table
use crate::layout::coerce::parse_date;
use crate::spreadsheet::CellGrid;
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Range;

/// A scalar (or small collection) stored under one metadata key
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Text(String),
    Integer(i64),
    Number(f64),
    Flag(bool),
    Date(NaiveDate),
    List(Vec<String>),
    /// Occurrences per distinct value
    Counts(BTreeMap<String, i64>),
}

/// String-keyed report metadata, ordered by key
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReportMetadata {
    entries: BTreeMap<String, MetadataValue>,
}

impl ReportMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: MetadataValue) {
        self.entries.insert(key.to_owned(), value);
    }

    pub fn insert_text(&mut self, key: &str, value: impl Into<String>) {
        self.insert(key, MetadataValue::Text(value.into()));
    }

    pub fn insert_integer(&mut self, key: &str, value: i64) {
        self.insert(key, MetadataValue::Integer(value));
    }

    pub fn insert_number(&mut self, key: &str, value: f64) {
        self.insert(key, MetadataValue::Number(value));
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.entries.iter()
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.entries.get(key)? {
            MetadataValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Integer value; whole `Number` values are accepted too.
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.entries.get(key)? {
            MetadataValue::Integer(value) => Some(*value),
            MetadataValue::Number(value) if value.fract() == 0.0 => Some(*value as i64),
            _ => None,
        }
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.entries.get(key)? {
            MetadataValue::Number(value) => Some(*value),
            MetadataValue::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.entries.get(key)? {
            MetadataValue::Flag(value) => Some(*value),
            _ => None,
        }
    }

    /// Date value; text that reads as a date is accepted too.
    pub fn date(&self, key: &str) -> Option<NaiveDate> {
        match self.entries.get(key)? {
            MetadataValue::Date(date) => Some(*date),
            MetadataValue::Text(text) => parse_date(text),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<&[String]> {
        match self.entries.get(key)? {
            MetadataValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn counts(&self, key: &str) -> Option<&BTreeMap<String, i64>> {
        match self.entries.get(key)? {
            MetadataValue::Counts(counts) => Some(counts),
            _ => None,
        }
    }

    pub fn property_name(&self) -> Option<&str> {
        self.text("property_name")
    }

    pub fn property_code(&self) -> Option<&str> {
        self.text("property_code")
    }

    pub fn as_of_date(&self) -> Option<NaiveDate> {
        self.date("as_of_date")
    }
}

/// Rows a metadata rule scans
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowWindow {
    /// The leading rows of the sheet, as many as the configured metadata window
    Header,
    /// The first `n` rows
    Leading(usize),
    /// One fixed row
    Row(usize),
    /// A half-open row range
    Rows(Range<usize>),
    /// The last `n` rows of the sheet
    Trailing(usize),
}

impl RowWindow {
    fn rows(&self, height: usize, header_rows: usize) -> Range<usize> {
        let range = match self {
            RowWindow::Header => 0..header_rows,
            RowWindow::Leading(count) => 0..*count,
            RowWindow::Row(row) => *row..row + 1,
            RowWindow::Rows(range) => range.clone(),
            RowWindow::Trailing(count) => height.saturating_sub(*count)..height,
        };
        range.start.min(height)..range.end.min(height)
    }
}

/// Conversion applied to captured text
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Converter {
    Text,
    /// Whole number; text that does not parse is kept as text
    Integer,
    /// Date; text that does not parse is kept as text
    Date,
    /// Splits on a separator and trims each item
    List(&'static str),
    /// `true` when the capture contains the marker word
    Flag(&'static str),
}

impl Converter {
    fn convert(&self, text: &str) -> MetadataValue {
        let text = text.trim();
        match self {
            Converter::Text => MetadataValue::Text(text.to_owned()),
            Converter::Integer => text.replace(',', "")
                .parse::<i64>()
                .map(MetadataValue::Integer)
                .unwrap_or_else(|_| MetadataValue::Text(text.to_owned())),
            Converter::Date => parse_date(text)
                .map(MetadataValue::Date)
                .unwrap_or_else(|| MetadataValue::Text(text.to_owned())),
            Converter::List(separator) => MetadataValue::List(
                text.split(separator)
                    .map(|item| item.trim().to_owned())
                    .filter(|item| !item.is_empty())
                    .collect(),
            ),
            Converter::Flag(marker) => MetadataValue::Flag(text.contains(marker)),
        }
    }
}

/// A pattern scanned over a window of rows
///
/// The first row in the window whose text matches sets every captured key;
/// a rule that matches nowhere leaves its keys absent.
#[derive(Clone, Debug)]
pub struct MetadataRule {
    pattern: Regex,
    window: RowWindow,
    captures: Vec<(usize, &'static str, Converter)>,
}

impl MetadataRule {
    pub fn new(pattern: Regex, window: RowWindow) -> Self {
        Self { pattern, window, captures: Vec::new() }
    }

    /// Stores capture group `group` under `key` as text.
    pub fn capture(self, group: usize, key: &'static str) -> Self {
        self.capture_as(group, key, Converter::Text)
    }

    pub fn capture_as(mut self, group: usize, key: &'static str, converter: Converter) -> Self {
        self.captures.push((group, key, converter));
        self
    }

    fn apply(&self, grid: &CellGrid, header_rows: usize, metadata: &mut ReportMetadata) -> bool {
        for row in self.window.rows(grid.height(), header_rows) {
            let text = grid.row_text(row);
            if let Some(captures) = self.pattern.captures(&text) {
                for (group, key, converter) in &self.captures {
                    if let Some(capture) = captures.get(*group) {
                        metadata.insert(key, converter.convert(capture.as_str()));
                    }
                }
                return true;
            }
        }
        false
    }
}

/// Applies metadata rules in order
///
/// # Arguments
/// * `grid` - The sheet
/// * `rules` - Rules to evaluate; each scans independently
/// * `header_rows` - Size of the [`RowWindow::Header`] window
///
/// # Returns
/// The metadata found; unmatched rules add nothing
pub fn extract_metadata(grid: &CellGrid, rules: &[MetadataRule], header_rows: usize) -> ReportMetadata {
    let mut metadata = ReportMetadata::new();
    for rule in rules {
        rule.apply(grid, header_rows, &mut metadata);
    }
    metadata
}

/// Counts occurrences of each distinct, non-blank value.
pub fn value_counts(values: impl IntoIterator<Item = String>) -> MetadataValue {
    let mut counts = BTreeMap::new();
    for value in values.into_iter().filter(|value| !value.is_empty()) {
        *counts.entry(value).or_insert(0) += 1;
    }
    MetadataValue::Counts(counts)
}
