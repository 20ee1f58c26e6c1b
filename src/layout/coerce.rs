//! Cleaning of messy numeric and date cells into typed values
use crate::spreadsheet::cell::format_number;
use crate::spreadsheet::cell::serial_to_datetime;
use crate::spreadsheet::CellValue;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use serde::Serialize;
use std::fmt::Display;

/// Text layouts accepted for date-only values; two-digit years are tried first.
const DATE_FORMATS: [&str; 3] = ["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d"];

/// Text layouts accepted for date-time values.
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M", "%m/%d/%Y %H:%M:%S"];

/// A typed value in an extracted table
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Bool(bool),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of `Int` and `Float` values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Calendar date of `Date` and `DateTime` values.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(date) => Some(*date),
            Value::DateTime(datetime) => Some(datetime.date()),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{}", format_number(*value)),
            Value::Text(text) => write!(f, "{}", text),
            Value::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Value::DateTime(datetime) => write!(f, "{}", datetime.format("%Y-%m-%d %H:%M:%S")),
            Value::Bool(value) => write!(f, "{}", value),
        }
    }
}

/// How the cells of one column are coerced
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// Counts: whole numbers become `Int`, fractional ones stay `Float`
    Integer,
    /// Amounts and rates, always `Float`
    Decimal,
    Date,
    Text,
    /// Text reduced to its ASCII digits (phone numbers)
    Digits,
}

/// Strips currency noise from a numeric string.
///
/// `$` and thousands separators are removed, a trailing `%` is dropped,
/// `(x)` becomes `-x`, and blank or a lone `-` becomes `0`.
pub fn clean_numeric(text: &str) -> String {
    let cleaned: String = text.trim().chars().filter(|c| *c != '$' && *c != ',').collect();
    let mut cleaned = cleaned.trim();
    if let Some(stripped) = cleaned.strip_suffix('%') {
        cleaned = stripped.trim_end();
    }
    if cleaned.is_empty() || cleaned == "-" {
        return "0".to_owned();
    }
    match cleaned.strip_prefix('(').and_then(|inner| inner.strip_suffix(')')) {
        Some(inner) => format!("-{}", inner.trim()),
        None => cleaned.to_owned(),
    }
}

/// Reads a cell as a number. Blank cells are `0`; anything unparsable is `None`.
pub fn coerce_number(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(value) => Some(*value),
        CellValue::Empty => Some(0.0),
        CellValue::Text(text) => clean_numeric(text)
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite()),
        _ => None,
    }
}

/// Parses date text in the layouts seen in property reports.
pub fn parse_date_text(text: &str) -> Option<Value> {
    let text = text.trim();
    DATE_FORMATS.iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .map(Value::Date)
        .or_else(|| DATETIME_FORMATS.iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            .map(date_or_datetime))
}

/// Parses a date, discarding any time of day.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    parse_date_text(text).and_then(|value| value.as_date())
}

fn date_or_datetime(datetime: NaiveDateTime) -> Value {
    if datetime.time() == NaiveTime::MIN {
        Value::Date(datetime.date())
    } else {
        Value::DateTime(datetime)
    }
}

fn to_integer(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::Int(value as i64)
    } else {
        Value::Float(value)
    }
}

/// Coerces one cell according to its column kind. Never fails: values that do
/// not fit become `Null` (numbers) or keep their text (dates).
pub fn coerce(kind: ColumnKind, cell: &CellValue) -> Value {
    match kind {
        ColumnKind::Integer => coerce_number(cell).map(to_integer).unwrap_or(Value::Null),
        ColumnKind::Decimal => coerce_number(cell).map(Value::Float).unwrap_or(Value::Null),
        ColumnKind::Date => match cell {
            CellValue::Empty => Value::Null,
            CellValue::Date(date) => Value::Date(*date),
            CellValue::DateTime(datetime) => date_or_datetime(*datetime),
            CellValue::Number(serial) => serial_to_datetime(*serial, false)
                .map(date_or_datetime)
                .unwrap_or_else(|| Value::Text(cell.text())),
            _ if cell.is_empty() => Value::Null,
            _ => {
                let text = cell.text();
                parse_date_text(&text).unwrap_or(Value::Text(text))
            }
        },
        ColumnKind::Digits => {
            let digits: String = cell.text().chars().filter(char::is_ascii_digit).collect();
            if digits.is_empty() { Value::Null } else { Value::Text(digits) }
        }
        ColumnKind::Text => match cell {
            _ if cell.is_empty() => Value::Null,
            CellValue::Bool(value) => Value::Bool(*value),
            CellValue::Date(date) => Value::Date(*date),
            CellValue::DateTime(datetime) => Value::DateTime(*datetime),
            _ => Value::Text(cell.text()),
        },
    }
}

/// How a column rule recognises column names (compared lower-cased)
#[derive(Clone, Debug)]
pub enum ColumnMatch {
    /// Any keyword is a substring of the name
    Contains(Vec<&'static str>),
    /// Every keyword is a substring of the name
    ContainsAll(Vec<&'static str>),
    /// The name equals one of the labels
    Exact(Vec<&'static str>),
}

impl ColumnMatch {
    fn matches(&self, column: &str) -> bool {
        let column = column.trim().to_lowercase();
        match self {
            ColumnMatch::Contains(keywords) => keywords.iter().any(|keyword| column.contains(keyword)),
            ColumnMatch::ContainsAll(keywords) => keywords.iter().all(|keyword| column.contains(keyword)),
            ColumnMatch::Exact(labels) => labels.iter().any(|label| column == label.to_lowercase()),
        }
    }
}

/// Ordered column rules; the first rule matching a column name decides its kind.
#[derive(Clone, Debug, Default)]
pub struct ColumnRules {
    rules: Vec<(ColumnMatch, ColumnKind)>,
}

impl ColumnRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, matcher: ColumnMatch, kind: ColumnKind) -> Self {
        self.rules.push((matcher, kind));
        self
    }

    /// Shorthand for a [`ColumnMatch::Contains`] rule.
    pub fn contains(self, keywords: &[&'static str], kind: ColumnKind) -> Self {
        self.rule(ColumnMatch::Contains(keywords.to_vec()), kind)
    }

    /// Shorthand for a [`ColumnMatch::Exact`] rule.
    pub fn exact(self, labels: &[&'static str], kind: ColumnKind) -> Self {
        self.rule(ColumnMatch::Exact(labels.to_vec()), kind)
    }

    pub fn kind_of(&self, column: &str) -> ColumnKind {
        self.rules.iter()
            .find(|(matcher, _)| matcher.matches(column))
            .map(|(_, kind)| *kind)
            .unwrap_or(ColumnKind::Text)
    }
}
